//! Write path: moving Serato frames between MP3 files

use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{debug, info};

use serato_core::id3::{empty_tag, locate_tag};
use serato_core::serato::metadata;
use serato_core::Id3Tag;

use crate::config::Config;

/// ID3 minor version used when the destination has no tag yet
const NEW_TAG_MINOR_VERSION: u8 = 3;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CopyReport {
    pub frames_copied: usize,
    /// The tag outgrew its padding and the file was rewritten
    pub rebuilt: bool,
    pub tag_size: usize,
}

/// Copy every Serato GEOB frame from `src` into `dst`
///
/// When the frames fit in the destination's padding only the tag region is
/// overwritten; otherwise the whole file is rewritten with the new tag.
pub fn copy_markers(config: &Config, src: &Path, dst: &Path) -> anyhow::Result<CopyReport> {
    let src_bytes = fs::read(src).with_context(|| format!("reading {:?}", src))?;
    let source =
        Id3Tag::parse(&src_bytes).with_context(|| format!("parsing ID3 tag of {:?}", src))?;

    let dst_bytes = fs::read(dst).with_context(|| format!("reading {:?}", dst))?;
    let existing = locate_tag(&dst_bytes);
    if let Some(len) = existing {
        if len > dst_bytes.len() {
            bail!(
                "ID3 tag of {:?} claims {} bytes but the file has {}",
                dst,
                len,
                dst_bytes.len()
            );
        }
    }
    let (tag_bytes, audio_start) = match existing {
        Some(len) => (Cow::Borrowed(&dst_bytes[..len]), len),
        None => {
            debug!("{:?} has no ID3v2 tag, starting from an empty one", dst);
            (Cow::Owned(empty_tag(NEW_TAG_MINOR_VERSION, 0)?), 0)
        }
    };

    let mut target =
        Id3Tag::parse(&tag_bytes).with_context(|| format!("parsing ID3 tag of {:?}", dst))?;
    let frames_copied = metadata::copy_serato_frames(&source, &mut target);
    if frames_copied == 0 {
        info!("No Serato frames in {:?}, nothing to copy", src);
        return Ok(CopyReport {
            frames_copied,
            rebuilt: false,
            tag_size: audio_start,
        });
    }

    let rewritten = target.write_frames(config.padding)?;
    let tag_size = rewritten.buffer.len();

    if rewritten.needed_new_buffer {
        info!(
            "Tag of {:?} outgrew its padding, rewriting file ({} -> {} bytes)",
            dst, audio_start, tag_size
        );
        let mut out = rewritten.buffer;
        out.extend_from_slice(&dst_bytes[audio_start..]);
        fs::write(dst, out).with_context(|| format!("writing {:?}", dst))?;
    } else {
        info!("Updated tag of {:?} in place ({} bytes)", dst, tag_size);
        let mut file = OpenOptions::new()
            .write(true)
            .open(dst)
            .with_context(|| format!("opening {:?}", dst))?;
        file.write_all(&rewritten.buffer)?;
        file.flush()?;
    }

    Ok(CopyReport {
        frames_copied,
        rebuilt: rewritten.needed_new_buffer,
        tag_size,
    })
}
