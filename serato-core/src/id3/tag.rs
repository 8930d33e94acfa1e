//! ID3v2.3 / ID3v2.4 tag parsing and padding-aware rewriting
//!
//! Tag structure:
//! - 10-byte header: "ID3", major version, revision, flags, synch-safe body size
//! - optional extended header (flag 0x40)
//! - frames, back to back
//! - zero padding up to the end of the body
//! - optional 10-byte footer (v2.4 only, flag 0x10): "3DI" + copy of the header fields
//!
//! Edits are collected with [`Id3Tag::add_frame`] and [`Id3Tag::remove_frame`]
//! and applied in one pass by [`Id3Tag::write_frames`]. When the edits fit in
//! the existing padding the tag keeps its size, so the caller can overwrite it
//! in place without moving any audio data.

use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::id3::frame::{Frame, GeobFrame};
use crate::synchsafe;

pub const HEADER_SIZE: usize = 10;
pub const FOOTER_SIZE: usize = 10;

const HEADER_MAGIC: &[u8; 3] = b"ID3";
const FOOTER_MAGIC: &[u8; 3] = b"3DI";

const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;

/// Offset of the 4-byte size field in header and footer
const SIZE_FIELD_OFFSET: usize = 6;

/// ID3v2 version, e.g. 2.4.0 is `{ minor: 4, patch: 0 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub minor: u8,
    pub patch: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedHeader {
    /// Size as stored on the wire
    pub size: u32,
    pub body: Vec<u8>,
}

/// Where an `add_frame` call ended up
#[derive(Debug, Clone, Copy)]
enum PendingSlot {
    Matched(usize),
    New(usize),
}

/// A parsed tag plus the edits queued against it
#[derive(Debug)]
pub struct Id3Tag<'a> {
    /// Header, body and footer exactly as parsed
    data: &'a [u8],
    version: Version,
    flags: u8,
    size: u32,
    padding_size: u32,
    extended_header: Option<ExtendedHeader>,
    frames: Vec<Frame>,
    added_frames: Vec<PendingSlot>,
    /// (index into `frames`, replacement or `Removed`)
    matching_frames: Vec<(usize, Frame)>,
    new_frames: Vec<Frame>,
}

/// Output of [`Id3Tag::write_frames`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenTag {
    pub buffer: Vec<u8>,
    /// The tag grew, so the host file's tag region must be resized
    pub needed_new_buffer: bool,
}

impl<'a> Id3Tag<'a> {
    /// Parse the tag at the start of `buffer`
    ///
    /// `buffer` may extend past the tag (e.g. a whole MP3 file); only the
    /// tag's own bytes are kept.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::MalformedHeader(format!(
                "buffer too short for an ID3 header: {} bytes",
                buffer.len()
            )));
        }

        let mut cursor = ByteCursor::new(buffer);
        if cursor.read_fixed(3)? != HEADER_MAGIC {
            return Err(Error::MalformedHeader("missing ID3 magic".into()));
        }

        let minor = cursor.read_u8()?;
        let patch = cursor.read_u8()?;
        if minor == 0xFF || patch == 0xFF {
            return Err(Error::MalformedHeader(format!(
                "invalid version bytes {:02x} {:02x}",
                minor, patch
            )));
        }
        if minor != 3 && minor != 4 {
            return Err(Error::MalformedHeader(format!(
                "unsupported ID3v2.{} tag",
                minor
            )));
        }

        let flags = cursor.read_u8()?;
        let raw_size = cursor.read_u32be()?;
        if !synchsafe::is_valid(raw_size) {
            return Err(Error::MalformedHeader(format!(
                "size field {:08x} is not synch-safe",
                raw_size
            )));
        }
        let size = synchsafe::decode(raw_size);

        let has_footer = minor >= 4 && flags & FLAG_FOOTER != 0;
        let body_end = HEADER_SIZE + size as usize;
        let tag_size = body_end + if has_footer { FOOTER_SIZE } else { 0 };
        if buffer.len() < tag_size {
            return Err(Error::eof(tag_size, buffer.len(), 0));
        }

        let data = &buffer[..tag_size];
        let body = &data[..body_end];
        let mut cursor = ByteCursor::at(body, HEADER_SIZE);

        let extended_header = if flags & FLAG_EXTENDED_HEADER != 0 {
            Some(read_extended_header(&mut cursor, minor)?)
        } else {
            None
        };

        let mut frames = Vec::new();
        let mut offset = cursor.position();
        while offset < body_end {
            if body[offset] == 0 {
                break;
            }
            let frame = Frame::parse(body, minor, offset as u32)?;
            offset += frame.total_size() as usize;
            frames.push(frame);
        }

        let padding_size = (body_end - offset) as u32;
        debug!(
            "Parsed ID3v2.{}.{} tag: {} frames, {} bytes padding",
            minor,
            patch,
            frames.len(),
            padding_size
        );

        Ok(Self {
            data,
            version: Version { minor, patch },
            flags,
            size,
            padding_size,
            extended_header,
            frames,
            added_frames: Vec::new(),
            matching_frames: Vec::new(),
            new_frames: Vec::new(),
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Body size from the header (excludes header and footer)
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn padding_size(&self) -> u32 {
        self.padding_size
    }

    pub fn extended_header(&self) -> Option<&ExtendedHeader> {
        self.extended_header.as_ref()
    }

    pub fn has_footer(&self) -> bool {
        self.version.minor >= 4 && self.flags & FLAG_FOOTER != 0
    }

    /// Total bytes the tag occupies in its file
    pub fn tag_size(&self) -> usize {
        self.data.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn find_geob(&self, description: &str) -> Option<&GeobFrame> {
        self.frames
            .iter()
            .filter_map(Frame::as_geob)
            .find(|geob| geob.description == description)
    }

    /// Queued replacements and removals as (old, new) pairs
    pub fn pending_matches(&self) -> Vec<(&Frame, &Frame)> {
        self.matching_frames
            .iter()
            .map(|(idx, new)| (&self.frames[*idx], new))
            .collect()
    }

    /// Queued frames with no counterpart in the parsed tag
    pub fn pending_new(&self) -> &[Frame] {
        &self.new_frames
    }

    /// Number of `add_frame` calls so far
    pub fn added_count(&self) -> usize {
        self.added_frames.len()
    }

    /// Queue a frame: it replaces the first unclaimed parsed frame with the
    /// same identity, or is appended after the existing frames.
    pub fn add_frame(&mut self, frame: Frame) {
        let matched = frame
            .identity_key()
            .and_then(|key| self.first_unclaimed(|f| f.identity_key() == Some(key)));

        let slot = match matched {
            Some(idx) => {
                self.matching_frames.push((idx, frame));
                PendingSlot::Matched(self.matching_frames.len() - 1)
            }
            None => {
                self.new_frames.push(frame);
                PendingSlot::New(self.new_frames.len() - 1)
            }
        };
        self.added_frames.push(slot);
    }

    /// Queue removal of the first unclaimed parsed frame matching `predicate`.
    /// Returns false if nothing matched.
    pub fn remove_frame<P>(&mut self, predicate: P) -> bool
    where
        P: Fn(&Frame) -> bool,
    {
        match self.first_unclaimed(predicate) {
            Some(idx) => {
                self.matching_frames.push((idx, Frame::Removed));
                true
            }
            None => false,
        }
    }

    fn first_unclaimed<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&Frame) -> bool,
    {
        self.frames.iter().enumerate().position(|(idx, frame)| {
            predicate(frame) && !self.matching_frames.iter().any(|(claimed, _)| *claimed == idx)
        })
    }

    fn padding_start(&self) -> usize {
        HEADER_SIZE + self.size as usize - self.padding_size as usize
    }

    fn frame_start(&self, idx: usize) -> usize {
        // Every parsed frame carries its offset
        self.frames[idx].frame_offset().unwrap_or_default() as usize
    }

    /// Apply the queued edits and produce the new tag bytes
    ///
    /// If the edits fit in the current padding the result has exactly the
    /// original tag size. Otherwise the tag is rebuilt with
    /// `requested_padding` zero bytes of fresh padding and a new size field.
    pub fn write_frames(mut self, requested_padding: u32) -> Result<RewrittenTag> {
        let minor = self.version.minor;

        let total_added: i64 = self
            .added_frames
            .iter()
            .map(|slot| match *slot {
                PendingSlot::Matched(i) => self.matching_frames[i].1.total_size() as i64,
                PendingSlot::New(i) => self.new_frames[i].total_size() as i64,
            })
            .sum();

        // Edits must be applied in original-buffer order
        let mut matching = std::mem::take(&mut self.matching_frames);
        matching.sort_by_key(|(idx, _)| self.frame_start(*idx));

        let total_matched: i64 = matching
            .iter()
            .filter(|(_, new)| !new.is_removed())
            .map(|(idx, _)| self.frames[*idx].total_size() as i64)
            .sum();
        let net_growth = total_added - total_matched;
        let remaining_padding = self.padding_size as i64 - net_growth;

        let mut segments: Vec<Vec<u8>> = Vec::with_capacity(matching.len() * 2 + 1);
        let mut cursor = 0usize;
        for (idx, new) in &matching {
            let start = self.frame_start(*idx);
            segments.push(self.data[cursor..start].to_vec());
            segments.push(new.serialize(minor)?);
            cursor = start + self.frames[*idx].total_size() as usize;
        }
        segments.push(self.data[cursor..self.padding_start()].to_vec());
        for frame in &self.new_frames {
            segments.push(frame.serialize(minor)?);
        }

        let content_len: usize = segments.iter().map(Vec::len).sum();
        let body_end = HEADER_SIZE + self.size as usize;

        if remaining_padding >= 0 && content_len <= body_end {
            let mut buffer = vec![0u8; self.tag_size()];
            let mut pos = 0;
            for segment in &segments {
                buffer[pos..pos + segment.len()].copy_from_slice(segment);
                pos += segment.len();
            }
            if self.has_footer() {
                buffer[body_end..].copy_from_slice(&self.data[body_end..]);
            }
            debug!(
                "Rewrote tag in place: {} bytes of padding left",
                remaining_padding
            );
            return Ok(RewrittenTag {
                buffer,
                needed_new_buffer: false,
            });
        }

        segments.push(vec![0u8; requested_padding as usize]);
        let mut buffer = segments.concat();

        let new_size = buffer.len() - HEADER_SIZE;
        if new_size > synchsafe::MAX as usize {
            return Err(Error::TagTooLarge(new_size));
        }
        buffer[SIZE_FIELD_OFFSET..SIZE_FIELD_OFFSET + 4]
            .copy_from_slice(&synchsafe::to_bytes(new_size as u32));

        if self.has_footer() {
            let mut footer = [0u8; FOOTER_SIZE];
            footer[..3].copy_from_slice(FOOTER_MAGIC);
            footer[3..].copy_from_slice(&buffer[3..HEADER_SIZE]);
            buffer.extend_from_slice(&footer);
        }

        debug!(
            "Rebuilt tag: {} -> {} bytes ({} bytes over the padding budget)",
            self.tag_size(),
            buffer.len(),
            -remaining_padding
        );
        Ok(RewrittenTag {
            buffer,
            needed_new_buffer: true,
        })
    }
}

fn read_extended_header(cursor: &mut ByteCursor<'_>, minor: u8) -> Result<ExtendedHeader> {
    let (size, body_len) = if minor >= 4 {
        // v2.4 counts the size field itself
        let size = cursor.read_u32_synchsafe()?;
        if size < 4 {
            return Err(Error::MalformedHeader(format!(
                "extended header size {} too small",
                size
            )));
        }
        (size, size as usize - 4)
    } else {
        let size = cursor.read_u32be()?;
        (size, size as usize)
    };

    Ok(ExtendedHeader {
        size,
        body: cursor.read_fixed(body_len)?.to_vec(),
    })
}

/// Bytes of a tag with no frames and `padding` bytes of padding
pub fn empty_tag(minor_version: u8, padding: u32) -> Result<Vec<u8>> {
    if padding > synchsafe::MAX {
        return Err(Error::TagTooLarge(padding as usize));
    }
    let mut buffer = Vec::with_capacity(HEADER_SIZE + padding as usize);
    buffer.extend_from_slice(HEADER_MAGIC);
    buffer.push(minor_version);
    buffer.push(0);
    buffer.push(0);
    buffer.extend_from_slice(&synchsafe::to_bytes(padding));
    buffer.resize(HEADER_SIZE + padding as usize, 0);
    Ok(buffer)
}

/// Size of the ID3v2 tag at the start of `file`, header and footer included
pub fn locate_tag(file: &[u8]) -> Option<usize> {
    if file.len() < HEADER_SIZE || &file[..3] != HEADER_MAGIC {
        return None;
    }
    let raw_size = u32::from_be_bytes([file[6], file[7], file[8], file[9]]);
    if !synchsafe::is_valid(raw_size) {
        return None;
    }
    let has_footer = file[3] >= 4 && file[5] & FLAG_FOOTER != 0;
    let size = HEADER_SIZE + synchsafe::decode(raw_size) as usize;
    Some(if has_footer { size + FOOTER_SIZE } else { size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::frame::FRAME_HEADER_SIZE;

    fn frame_bytes(minor: u8, id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        if minor >= 4 {
            out.extend_from_slice(&synchsafe::to_bytes(body.len() as u32));
        } else {
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(body);
        out
    }

    fn geob_body(description: &str, data: &[u8]) -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend_from_slice(b"application/octet-stream\0\0");
        body.extend_from_slice(description.as_bytes());
        body.push(0);
        body.extend_from_slice(data);
        body
    }

    /// Header + frames + padding (+ footer)
    fn build_tag(minor: u8, flags: u8, frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
        let body: Vec<u8> = frames.concat();
        let size = (body.len() + padding) as u32;
        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[minor, 0, flags]);
        out.extend_from_slice(&synchsafe::to_bytes(size));
        out.extend_from_slice(&body);
        out.resize(out.len() + padding, 0);
        if flags & FLAG_FOOTER != 0 {
            let mut footer = b"3DI".to_vec();
            footer.extend_from_slice(&out[3..10]);
            out.extend_from_slice(&footer);
        }
        out
    }

    fn sample_frames(minor: u8) -> Vec<Vec<u8>> {
        vec![
            frame_bytes(minor, b"TIT2", b"\0Opening Track"),
            frame_bytes(minor, b"GEOB", &geob_body("Serato Markers2", &[0x01, 0x01, 0x41, 0x51])),
            frame_bytes(minor, b"GEOB", &geob_body("Serato BeatGrid", &[0x01, 0x00, 0, 0, 0, 0, 0])),
            frame_bytes(minor, b"TPE1", b"\0Artist"),
        ]
    }

    #[test]
    fn test_parse_frames_and_padding() {
        let frames = sample_frames(3);
        let frames_len: usize = frames.iter().map(Vec::len).sum();
        let data = build_tag(3, 0, &frames, 100);

        let tag = Id3Tag::parse(&data).unwrap();
        assert_eq!(tag.version(), Version { minor: 3, patch: 0 });
        assert_eq!(tag.frames().len(), 4);
        assert_eq!(tag.padding_size(), 100);
        assert_eq!(tag.size() as usize, frames_len + 100);
        assert_eq!(tag.tag_size(), data.len());
        assert_eq!(tag.frames()[1].frame_offset(), Some(10 + frames[0].len() as u32));
        assert!(tag.find_geob("Serato BeatGrid").is_some());
        assert!(tag.find_geob("Serato Overview").is_none());
    }

    #[test]
    fn test_parse_ignores_trailing_audio() {
        let mut data = build_tag(4, 0, &sample_frames(4), 16);
        let tag_len = data.len();
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);

        let tag = Id3Tag::parse(&data).unwrap();
        assert_eq!(tag.tag_size(), tag_len);
        assert_eq!(locate_tag(&data), Some(tag_len));
    }

    #[test]
    fn test_frames_without_padding() {
        let data = build_tag(4, 0, &sample_frames(4), 0);
        let tag = Id3Tag::parse(&data).unwrap();
        assert_eq!(tag.frames().len(), 4);
        assert_eq!(tag.padding_size(), 0);
    }

    #[test]
    fn test_malformed_headers() {
        assert!(matches!(Id3Tag::parse(b"ID3\x03"), Err(Error::MalformedHeader(_))));

        let mut data = build_tag(3, 0, &[], 10);
        data[0] = b'X';
        assert!(matches!(Id3Tag::parse(&data), Err(Error::MalformedHeader(_))));

        let mut data = build_tag(3, 0, &[], 10);
        data[3] = 2;
        assert!(matches!(Id3Tag::parse(&data), Err(Error::MalformedHeader(_))));

        let mut data = build_tag(3, 0, &[], 10);
        data[9] = 0x80;
        assert!(matches!(Id3Tag::parse(&data), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_truncated_tag_is_eof() {
        let data = build_tag(3, 0, &sample_frames(3), 50);
        assert!(matches!(
            Id3Tag::parse(&data[..data.len() - 1]),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_frame_overrunning_body_is_eof() {
        let mut frame = frame_bytes(3, b"TIT2", b"\0Title");
        // Claim far more than the tag holds
        frame[4..8].copy_from_slice(&500u32.to_be_bytes());
        let data = build_tag(3, 0, &[frame], 20);
        assert!(matches!(Id3Tag::parse(&data), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_noop_roundtrip_v3() {
        let data = build_tag(3, 0, &sample_frames(3), 256);
        let out = Id3Tag::parse(&data).unwrap().write_frames(0).unwrap();
        assert!(!out.needed_new_buffer);
        assert_eq!(out.buffer, data);
    }

    #[test]
    fn test_noop_roundtrip_v4_footer_and_extended_header() {
        let frames = sample_frames(4);
        let mut data = build_tag(4, FLAG_FOOTER | FLAG_EXTENDED_HEADER, &frames, 0);
        // Splice a 6-byte v2.4 extended header in front of the frames
        let ext = [0x00, 0x00, 0x00, 0x06, 0x01, 0x00];
        let body_len = synchsafe::decode(u32::from_be_bytes([data[6], data[7], data[8], data[9]]));
        let new_size = body_len + ext.len() as u32 + 32;
        let mut rebuilt = data[..6].to_vec();
        rebuilt.extend_from_slice(&synchsafe::to_bytes(new_size));
        rebuilt.extend_from_slice(&ext);
        rebuilt.extend_from_slice(&frames.concat());
        rebuilt.resize(rebuilt.len() + 32, 0);
        let mut footer = b"3DI".to_vec();
        footer.extend_from_slice(&rebuilt[3..10]);
        rebuilt.extend_from_slice(&footer);
        data = rebuilt;

        let tag = Id3Tag::parse(&data).unwrap();
        assert!(tag.has_footer());
        assert_eq!(tag.extended_header().unwrap().body, vec![0x01, 0x00]);
        assert_eq!(tag.frames().len(), 4);
        assert_eq!(tag.padding_size(), 32);

        let out = tag.write_frames(0).unwrap();
        assert!(!out.needed_new_buffer);
        assert_eq!(out.buffer, data);
    }

    #[test]
    fn test_replace_within_padding() {
        let data = build_tag(3, 0, &sample_frames(3), 64);
        let mut tag = Id3Tag::parse(&data).unwrap();

        let old_len = tag.find_geob("Serato Markers2").unwrap().body.len();
        let new_body = vec![0x01, 0x01, 0x42, 0x42, 0x42, 0x42];
        let delta = new_body.len() - old_len;
        assert!(delta <= 64);

        tag.add_frame(Frame::geob("Serato Markers2", new_body.clone()));
        let out = tag.write_frames(0).unwrap();
        assert!(!out.needed_new_buffer);
        assert_eq!(out.buffer.len(), data.len());

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        assert_eq!(reparsed.frames().len(), 4);
        assert_eq!(reparsed.padding_size() as usize, 64 - delta);
        assert_eq!(reparsed.find_geob("Serato Markers2").unwrap().body, new_body);
        // Order of the other frames is untouched
        assert_eq!(reparsed.frames()[0].frame_type(), Some(*b"TIT2"));
        assert_eq!(reparsed.frames()[3].frame_type(), Some(*b"TPE1"));
    }

    #[test]
    fn test_overflow_forces_rebuild() {
        let data = build_tag(3, 0, &sample_frames(3), 8);
        let mut tag = Id3Tag::parse(&data).unwrap();
        tag.add_frame(Frame::geob("Serato Autotags", vec![0x55; 40]));

        let out = tag.write_frames(128).unwrap();
        assert!(out.needed_new_buffer);

        let size = u32::from_be_bytes([out.buffer[6], out.buffer[7], out.buffer[8], out.buffer[9]]);
        assert_eq!(synchsafe::decode(size) as usize, out.buffer.len() - HEADER_SIZE);

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        assert_eq!(reparsed.frames().len(), 5);
        assert_eq!(reparsed.padding_size(), 128);
        assert_eq!(reparsed.find_geob("Serato Autotags").unwrap().body, vec![0x55; 40]);
    }

    #[test]
    fn test_rebuild_with_footer() {
        let data = build_tag(4, FLAG_FOOTER, &sample_frames(4), 0);
        let mut tag = Id3Tag::parse(&data).unwrap();
        tag.add_frame(Frame::unknown(*b"TIT2", b"\0A much longer replacement title".to_vec()));

        let out = tag.write_frames(0).unwrap();
        assert!(out.needed_new_buffer);

        let len = out.buffer.len();
        let size = u32::from_be_bytes([out.buffer[6], out.buffer[7], out.buffer[8], out.buffer[9]]);
        assert_eq!(synchsafe::decode(size) as usize, len - HEADER_SIZE - FOOTER_SIZE);

        let footer = &out.buffer[len - FOOTER_SIZE..];
        assert_eq!(&footer[..3], b"3DI");
        assert_eq!(&footer[3..], &out.buffer[3..HEADER_SIZE]);

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        assert_eq!(reparsed.frames().len(), 4);
        assert_eq!(reparsed.tag_size(), len);
    }

    #[test]
    fn test_in_place_keeps_footer_offset() {
        let frames = sample_frames(4);
        let mut data = build_tag(4, 0, &frames, 40);
        // Turn on the footer flag and append one
        data[5] = FLAG_FOOTER;
        let mut footer = b"3DI".to_vec();
        footer.extend_from_slice(&data[3..10]);
        data.extend_from_slice(&footer);

        let mut tag = Id3Tag::parse(&data).unwrap();
        assert!(tag.remove_frame(|f| f.frame_type() == Some(*b"TPE1")));
        let out = tag.write_frames(0).unwrap();

        assert!(!out.needed_new_buffer);
        assert_eq!(out.buffer.len(), data.len());
        assert_eq!(&out.buffer[data.len() - FOOTER_SIZE..], &data[data.len() - FOOTER_SIZE..]);

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        assert_eq!(reparsed.frames().len(), 3);
        assert!(reparsed.frames().iter().all(|f| f.frame_type() != Some(*b"TPE1")));
    }

    #[test]
    fn test_geob_identity_matching() {
        let data = build_tag(3, 0, &sample_frames(3), 512);

        let mut tag = Id3Tag::parse(&data).unwrap();
        tag.add_frame(Frame::geob("Serato Overview", vec![1]));
        tag.add_frame(Frame::geob("Serato Analysis", vec![2]));
        assert_eq!(tag.pending_matches().len(), 0);
        assert_eq!(tag.pending_new().len(), 2);

        let mut tag = Id3Tag::parse(&data).unwrap();
        tag.add_frame(Frame::geob("Serato BeatGrid", vec![3]));
        let matches = tag.pending_matches();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0.as_geob().unwrap().description, "Serato BeatGrid");
        assert!(tag.pending_new().is_empty());
        assert_eq!(tag.added_count(), 1);
    }

    #[test]
    fn test_claimed_frame_is_not_matched_twice() {
        let data = build_tag(3, 0, &sample_frames(3), 512);
        let mut tag = Id3Tag::parse(&data).unwrap();

        tag.add_frame(Frame::geob("Serato Markers2", vec![1]));
        tag.add_frame(Frame::geob("Serato Markers2", vec![2]));
        assert_eq!(tag.pending_matches().len(), 1);
        assert_eq!(tag.pending_new().len(), 1);

        // Already claimed by the first add
        assert!(!tag.remove_frame(|f| {
            f.as_geob().map(|g| g.description == "Serato Markers2").unwrap_or(false)
        }));
    }

    #[test]
    fn test_edits_applied_in_buffer_order() {
        let data = build_tag(3, 0, &sample_frames(3), 512);
        let mut tag = Id3Tag::parse(&data).unwrap();

        // Queue the later frame first
        tag.add_frame(Frame::unknown(*b"TPE1", b"\0Other Artist".to_vec()));
        tag.add_frame(Frame::unknown(*b"TIT2", b"\0Other Title".to_vec()));
        let out = tag.write_frames(0).unwrap();

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        let types: Vec<_> = reparsed.frames().iter().filter_map(Frame::frame_type).collect();
        assert_eq!(types, vec![*b"TIT2", *b"GEOB", *b"GEOB", *b"TPE1"]);
        match &reparsed.frames()[3] {
            Frame::Unknown(f) => assert_eq!(f.body, b"\0Other Artist".to_vec()),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_empty_tag_then_add() {
        let data = empty_tag(4, 0).unwrap();
        let mut tag = Id3Tag::parse(&data).unwrap();
        assert!(tag.frames().is_empty());
        tag.add_frame(Frame::geob("Serato Markers2", vec![0x01, 0x01]));
        let out = tag.write_frames(1024).unwrap();
        assert!(out.needed_new_buffer);

        let reparsed = Id3Tag::parse(&out.buffer).unwrap();
        assert_eq!(reparsed.frames().len(), 1);
        assert_eq!(reparsed.padding_size(), 1024);

        let roomy = empty_tag(3, 4096).unwrap();
        let mut tag = Id3Tag::parse(&roomy).unwrap();
        tag.add_frame(Frame::geob("Serato Markers2", vec![0x01, 0x01]));
        let out = tag.write_frames(0).unwrap();
        assert!(!out.needed_new_buffer);
        assert_eq!(out.buffer.len(), HEADER_SIZE + 4096);
        assert_eq!(
            Id3Tag::parse(&out.buffer).unwrap().frames()[0].total_size() as usize,
            FRAME_HEADER_SIZE + 1 + 25 + 1 + 16 + 2
        );
    }
}
