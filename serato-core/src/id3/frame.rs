//! ID3v2 frames
//!
//! Frame layout (10-byte header, then body):
//! - 4 bytes: frame id (ASCII)
//! - 4 bytes: body size (synch-safe in v2.4, plain big-endian in v2.3)
//! - 2 bytes: flags
//!
//! Only GEOB frames are interpreted, because that is where Serato keeps its
//! data. Everything else is carried as opaque bytes and written back verbatim.

use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::synchsafe;

pub const FRAME_HEADER_SIZE: usize = 10;

pub const GEOB: [u8; 4] = *b"GEOB";

/// MIME type Serato uses for every GEOB frame it writes
pub const SERATO_MIME_TYPE: &str = "application/octet-stream";

/// v2.3 format flags: compression, encryption
const V3_OPAQUE_FLAGS: u16 = 0x0080 | 0x0040;
/// v2.4 format flags: compression, encryption, unsynchronisation, data length indicator
const V4_OPAQUE_FLAGS: u16 = 0x0008 | 0x0004 | 0x0002 | 0x0001;

/// Fields shared by every concrete frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: [u8; 4],
    pub flags: u16,
    /// Absolute offset of the frame in the buffer it was parsed from
    pub frame_offset: Option<u32>,
}

impl FrameHeader {
    pub fn new(frame_type: [u8; 4]) -> Self {
        Self {
            frame_type,
            flags: 0,
            frame_offset: None,
        }
    }
}

/// General Encapsulated Object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeobFrame {
    pub header: FrameHeader,
    pub text_encoding: u8,
    pub mime_type: String,
    pub file_name: String,
    pub description: String,
    pub body: Vec<u8>,
}

/// Any frame this crate does not interpret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFrame {
    pub header: FrameHeader,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Geob(GeobFrame),
    Unknown(UnknownFrame),
    /// Tombstone: the matched frame is dropped on rewrite
    Removed,
}

/// What makes two frames "the same frame" when editing a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKey<'a> {
    Type([u8; 4]),
    Geob(&'a str),
}

impl Frame {
    /// Build a GEOB frame the way Serato writes them
    pub fn geob(description: impl Into<String>, body: Vec<u8>) -> Self {
        Frame::Geob(GeobFrame {
            header: FrameHeader::new(GEOB),
            text_encoding: 0,
            mime_type: SERATO_MIME_TYPE.to_string(),
            file_name: String::new(),
            description: description.into(),
            body,
        })
    }

    pub fn unknown(frame_type: [u8; 4], body: Vec<u8>) -> Self {
        Frame::Unknown(UnknownFrame {
            header: FrameHeader::new(frame_type),
            body,
        })
    }

    /// Parse the frame starting at `frame_offset` in `buffer`
    ///
    /// `buffer` must end where the tag body ends, so a frame whose size runs
    /// past the tag fails with `UnexpectedEof`.
    pub fn parse(buffer: &[u8], minor_version: u8, frame_offset: u32) -> Result<Frame> {
        let mut cursor = ByteCursor::at(buffer, frame_offset as usize);

        let frame_type = cursor.read_array::<4>()?;
        let size = if minor_version >= 4 {
            cursor.read_u32_synchsafe()?
        } else {
            cursor.read_u32be()?
        };
        let flags = cursor.read_u16be()?;
        let body = cursor.read_fixed(size as usize)?;

        let header = FrameHeader {
            frame_type,
            flags,
            frame_offset: Some(frame_offset),
        };

        let opaque_flags = if minor_version >= 4 {
            V4_OPAQUE_FLAGS
        } else {
            V3_OPAQUE_FLAGS
        };

        if frame_type == GEOB && flags & opaque_flags == 0 {
            match GeobFrame::parse_body(header.clone(), body) {
                Ok(geob) => return Ok(Frame::Geob(geob)),
                Err(e) => debug!("GEOB frame at {} kept opaque: {}", frame_offset, e),
            }
        }

        Ok(Frame::Unknown(UnknownFrame {
            header,
            body: body.to_vec(),
        }))
    }

    pub fn header(&self) -> Option<&FrameHeader> {
        match self {
            Frame::Geob(f) => Some(&f.header),
            Frame::Unknown(f) => Some(&f.header),
            Frame::Removed => None,
        }
    }

    pub fn frame_type(&self) -> Option<[u8; 4]> {
        self.header().map(|h| h.frame_type)
    }

    pub fn frame_offset(&self) -> Option<u32> {
        self.header().and_then(|h| h.frame_offset)
    }

    /// Body length in bytes, always derived from the body itself
    pub fn size(&self) -> u32 {
        let len = match self {
            Frame::Geob(f) => f.body_len(),
            Frame::Unknown(f) => f.body.len(),
            Frame::Removed => 0,
        };
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    /// Size on disk including the frame header; zero for `Removed`
    pub fn total_size(&self) -> u64 {
        match self {
            Frame::Removed => 0,
            _ => self.size() as u64 + FRAME_HEADER_SIZE as u64,
        }
    }

    pub fn identity_key(&self) -> Option<FrameKey<'_>> {
        match self {
            Frame::Geob(f) => Some(FrameKey::Geob(&f.description)),
            Frame::Unknown(f) => Some(FrameKey::Type(f.header.frame_type)),
            Frame::Removed => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Frame::Removed)
    }

    pub fn as_geob(&self) -> Option<&GeobFrame> {
        match self {
            Frame::Geob(f) => Some(f),
            _ => None,
        }
    }

    /// Serialize header and body; `Removed` serializes to nothing
    pub fn serialize(&self, minor_version: u8) -> Result<Vec<u8>> {
        let (header, body) = match self {
            Frame::Removed => return Ok(Vec::new()),
            Frame::Geob(f) => (&f.header, f.body_bytes()),
            Frame::Unknown(f) => (&f.header, f.body.clone()),
        };

        let limit = if minor_version >= 4 {
            synchsafe::MAX as usize
        } else {
            u32::MAX as usize
        };
        if body.len() > limit || body.len() != self.size() as usize {
            return Err(Error::InvalidFrameSize {
                frame: String::from_utf8_lossy(&header.frame_type).into_owned(),
                declared: self.size() as usize,
                actual: body.len(),
            });
        }

        let size = body.len() as u32;
        let mut buffer = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
        buffer.extend_from_slice(&header.frame_type);
        if minor_version >= 4 {
            buffer.extend_from_slice(&synchsafe::to_bytes(size));
        } else {
            buffer.extend_from_slice(&size.to_be_bytes());
        }
        buffer.extend_from_slice(&header.flags.to_be_bytes());
        buffer.extend_from_slice(&body);

        Ok(buffer)
    }
}

impl GeobFrame {
    /// encoding byte, MIME type, file name, description (all NUL-terminated), then data
    fn parse_body(header: FrameHeader, body: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(body);

        let text_encoding = cursor.read_u8()?;
        // Only single-byte-terminated encodings: ISO-8859-1 and UTF-8
        if text_encoding != 0 && text_encoding != 3 {
            return Err(Error::InvalidText(format!(
                "unsupported GEOB text encoding {}",
                text_encoding
            )));
        }

        let mime_type = cursor.read_nul_terminated_ascii()?;
        let file_name = cursor.read_nul_terminated_ascii()?;
        let description = cursor.read_nul_terminated_ascii()?;

        Ok(Self {
            header,
            text_encoding,
            mime_type,
            file_name,
            description,
            body: cursor.rest().to_vec(),
        })
    }

    fn body_len(&self) -> usize {
        1 + self.mime_type.len() + 1 + self.file_name.len() + 1 + self.description.len() + 1 + self.body.len()
    }

    fn body_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body_len());
        out.push(self.text_encoding);
        for s in [&self.mime_type, &self.file_name, &self.description] {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out.extend_from_slice(&self.body);
        out
    }
}
