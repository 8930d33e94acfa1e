//! Read-only commands: crates and per-track Serato data

use std::fs::{self, File};
use std::path::Path;

use anyhow::{bail, Context};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, Tag, Value};
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use serato_core::serato::metadata;
use serato_core::{Crate, CratePlaylist, FileType, Id3Tag, SeratoTrackMetadata};

use crate::config::Config;

/// Decode one `.crate` file; the playlist is named after the file
pub fn read_crate(path: &Path) -> anyhow::Result<CratePlaylist> {
    if !is_crate_file(path) {
        bail!("{:?} is not a .crate file", path);
    }

    let bytes = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    let crate_file = Crate::decode(&bytes).with_context(|| format!("decoding {:?}", path))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    debug!(
        "Crate {:?}: version {:?}, {} tracks",
        name,
        crate_file.version(),
        crate_file.track_paths().len()
    );
    Ok(crate_file.to_playlist(name))
}

/// Every crate under `dir`; unreadable crates are skipped
pub fn read_crate_dir(dir: &Path) -> anyhow::Result<Vec<CratePlaylist>> {
    if !dir.is_dir() {
        bail!("{:?} is not a directory", dir);
    }

    let mut playlists = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !is_crate_file(path) {
            continue;
        }
        match read_crate(path) {
            Ok(playlist) => playlists.push(playlist),
            Err(e) => warn!("Skipping {:?}: {:#}", path, e),
        }
    }

    info!("Read {} crates from {:?}", playlists.len(), dir);
    Ok(playlists)
}

/// Serato cues, loops, colour and beat grid of an audio file
pub fn read_markers(config: &Config, path: &Path) -> anyhow::Result<SeratoTrackMetadata> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match FileType::from_extension(ext) {
        FileType::Mp3 => read_mp3(config, path),
        FileType::Flac => read_flac(config, path),
        FileType::Unknown => bail!("unsupported file type: {:?}", path),
    }
}

fn read_mp3(config: &Config, path: &Path) -> anyhow::Result<SeratoTrackMetadata> {
    let bytes = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    if serato_core::id3::locate_tag(&bytes).is_none() {
        warn!("No ID3v2 tag in {:?}", path);
        return Ok(SeratoTrackMetadata::default());
    }

    let tag = Id3Tag::parse(&bytes).with_context(|| format!("parsing ID3 tag of {:?}", path))?;
    debug!(
        "ID3v2.{} tag: {} frames, {} bytes padding",
        tag.version().minor,
        tag.frames().len(),
        tag.padding_size()
    );
    Ok(metadata::read_id3(&tag, config.strict)?)
}

fn read_flac(config: &Config, path: &Path) -> anyhow::Result<SeratoTrackMetadata> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("flac");

    let mut probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probing {:?}", path))?;

    // Vorbis comments live in the FLAC stream; anything found while probing comes first
    let mut comments: Vec<(String, String)> = Vec::new();
    if let Some(revision) = probed.metadata.get().as_ref().and_then(|m| m.current()) {
        comments.extend(revision.tags().iter().filter_map(text_tag));
    }
    if let Some(revision) = probed.format.metadata().current() {
        comments.extend(revision.tags().iter().filter_map(text_tag));
    }
    debug!("{} Vorbis comments in {:?}", comments.len(), path);

    Ok(metadata::read_vorbis(
        comments.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        config.strict,
    )?)
}

fn text_tag(tag: &Tag) -> Option<(String, String)> {
    match &tag.value {
        Value::String(s) => Some((tag.key.clone(), s.clone())),
        _ => None,
    }
}

fn is_crate_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("crate"))
        .unwrap_or(false)
}
