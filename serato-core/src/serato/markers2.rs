//! Serato Markers2 (cues, loops, track colour, BPM lock)
//!
//! Decoded payload layout (big-endian):
//! - 2 bytes: version `01 01`
//! - repeated entries:
//!   - type name, NUL-terminated ASCII (`COLOR`, `CUE`, `LOOP`, `BPMLOCK`, ...)
//!   - 4 bytes: body length
//!   - body
//!
//! The entry list has no count. `BPMLOCK` is the last entry Serato writes,
//! so the strict decoder stops right after it; whatever follows belongs to
//! the surrounding container (usually NUL padding).
//!
//! Entry bodies:
//! - COLOR: 1 reserved, r, g, b
//! - CUE: 1 reserved, index, u32 position (ms), 1 reserved, r, g, b,
//!   2 reserved, NUL-terminated name
//! - LOOP: 1 reserved, index, u32 start (ms), u32 end (ms), 4 reserved
//!   (`ff ff ff ff`), 4-byte ARGB colour, 1 reserved, locked, NUL-terminated name
//! - BPMLOCK: 1 boolean byte

use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::track::{CuePoint, LoopPoint, SeratoTrackMetadata, TrackColor};

const VERSION: [u8; 2] = [0x01, 0x01];

const NAME_COLOR: &str = "COLOR";
const NAME_CUE: &str = "CUE";
const NAME_LOOP: &str = "LOOP";
const NAME_BPMLOCK: &str = "BPMLOCK";

/// How the decoder decides the entry list is over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// Stop right after the BPMLOCK entry; running out of bytes first is an error
    #[default]
    Strict,
    /// Stop at the end of the buffer or when the next byte is 0x00
    Tolerant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTag {
    pub index: u8,
    pub position_ms: u32,
    pub color: TrackColor,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopTag {
    pub index: u8,
    pub start_ms: u32,
    pub end_ms: u32,
    pub color: TrackColor,
    pub locked: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markers2Tag {
    Color(TrackColor),
    Cue(CueTag),
    Loop(LoopTag),
    BpmLock(bool),
    /// Anything not understood, or not reproducible byte-for-byte
    Unknown { name: String, body: Vec<u8> },
}

impl Markers2Tag {
    pub fn name(&self) -> &str {
        match self {
            Markers2Tag::Color(_) => NAME_COLOR,
            Markers2Tag::Cue(_) => NAME_CUE,
            Markers2Tag::Loop(_) => NAME_LOOP,
            Markers2Tag::BpmLock(_) => NAME_BPMLOCK,
            Markers2Tag::Unknown { name, .. } => name,
        }
    }

    fn decode(name: &str, body: &[u8]) -> Self {
        let parsed = match name {
            NAME_COLOR => decode_color(body),
            NAME_CUE => decode_cue(body),
            NAME_LOOP => decode_loop(body),
            NAME_BPMLOCK => decode_bpmlock(body),
            _ => None,
        };

        match parsed {
            // Only keep the typed form if it writes back the same bytes
            Some(tag) if tag.body() == body => tag,
            Some(_) | None => {
                if matches!(name, NAME_COLOR | NAME_CUE | NAME_LOOP | NAME_BPMLOCK) {
                    debug!("Markers2 {} entry kept opaque ({} bytes)", name, body.len());
                }
                Markers2Tag::Unknown {
                    name: name.to_string(),
                    body: body.to_vec(),
                }
            }
        }
    }

    pub fn body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Markers2Tag::Color(color) => {
                out.push(0x00);
                out.extend_from_slice(&color.to_bytes());
            }
            Markers2Tag::Cue(cue) => {
                out.push(0x00);
                out.push(cue.index);
                out.extend_from_slice(&cue.position_ms.to_be_bytes());
                out.push(0x00);
                out.extend_from_slice(&cue.color.to_bytes());
                out.extend_from_slice(&[0x00, 0x00]);
                out.extend_from_slice(cue.name.as_bytes());
                out.push(0x00);
            }
            Markers2Tag::Loop(lp) => {
                out.push(0x00);
                out.push(lp.index);
                out.extend_from_slice(&lp.start_ms.to_be_bytes());
                out.extend_from_slice(&lp.end_ms.to_be_bytes());
                out.extend_from_slice(&[0xFF; 4]);
                out.push(0x00);
                out.extend_from_slice(&lp.color.to_bytes());
                out.push(0x00);
                out.push(u8::from(lp.locked));
                out.extend_from_slice(lp.name.as_bytes());
                out.push(0x00);
            }
            Markers2Tag::BpmLock(locked) => out.push(u8::from(*locked)),
            Markers2Tag::Unknown { body, .. } => out.extend_from_slice(body),
        }
        out
    }
}

fn decode_color(body: &[u8]) -> Option<Markers2Tag> {
    let mut cursor = ByteCursor::new(body);
    cursor.skip(1).ok()?;
    let rgb = cursor.read_array::<3>().ok()?;
    Some(Markers2Tag::Color(TrackColor::from_bytes(rgb)))
}

fn decode_cue(body: &[u8]) -> Option<Markers2Tag> {
    let mut cursor = ByteCursor::new(body);
    cursor.skip(1).ok()?;
    let index = cursor.read_u8().ok()?;
    let position_ms = cursor.read_u32be().ok()?;
    cursor.skip(1).ok()?;
    let rgb = cursor.read_array::<3>().ok()?;
    cursor.skip(2).ok()?;
    let name = read_name(&mut cursor)?;
    Some(Markers2Tag::Cue(CueTag {
        index,
        position_ms,
        color: TrackColor::from_bytes(rgb),
        name,
    }))
}

fn decode_loop(body: &[u8]) -> Option<Markers2Tag> {
    let mut cursor = ByteCursor::new(body);
    cursor.skip(1).ok()?;
    let index = cursor.read_u8().ok()?;
    let start_ms = cursor.read_u32be().ok()?;
    let end_ms = cursor.read_u32be().ok()?;
    cursor.skip(4).ok()?;
    let [_alpha, r, g, b] = cursor.read_array::<4>().ok()?;
    cursor.skip(1).ok()?;
    let locked = cursor.read_u8().ok()? != 0;
    let name = read_name(&mut cursor)?;
    Some(Markers2Tag::Loop(LoopTag {
        index,
        start_ms,
        end_ms,
        color: TrackColor::new(r, g, b),
        locked,
        name,
    }))
}

fn decode_bpmlock(body: &[u8]) -> Option<Markers2Tag> {
    match body {
        [flag] => Some(Markers2Tag::BpmLock(*flag != 0)),
        _ => None,
    }
}

fn read_name(cursor: &mut ByteCursor<'_>) -> Option<String> {
    let raw = cursor.read_nul_terminated().ok()?;
    String::from_utf8(raw.to_vec()).ok()
}

/// A decoded Markers2 payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers2 {
    pub tags: Vec<Markers2Tag>,
}

impl Markers2 {
    /// Strict decode (stops after BPMLOCK)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, Termination::Strict).map(|(markers, _)| markers)
    }

    /// Strict decode, falling back to tolerant when the strict pass fails
    pub fn decode_auto(bytes: &[u8]) -> Result<Self> {
        match Self::decode(bytes) {
            Ok(markers) => Ok(markers),
            Err(e) => {
                warn!("Strict Markers2 decode failed ({}), retrying tolerant", e);
                Self::decode_with(bytes, Termination::Tolerant).map(|(markers, _)| markers)
            }
        }
    }

    /// Decode and report how many bytes the entry list used
    pub fn decode_with(bytes: &[u8], termination: Termination) -> Result<(Self, usize)> {
        let mut cursor = ByteCursor::new(bytes);

        let version = cursor.read_array::<2>()?;
        if version != VERSION {
            return Err(Error::MalformedHeader(format!(
                "unexpected Markers2 version {:02x} {:02x}",
                version[0], version[1]
            )));
        }

        let mut tags = Vec::new();
        loop {
            if termination == Termination::Tolerant
                && (cursor.is_empty() || cursor.peek_u8()? == 0x00)
            {
                break;
            }

            let name = cursor.read_nul_terminated_ascii()?;
            let length = cursor.read_u32be()?;
            let body = cursor.read_fixed(length as usize)?;

            let done = name == NAME_BPMLOCK && termination == Termination::Strict;
            tags.push(Markers2Tag::decode(&name, body));
            if done {
                break;
            }
        }

        Ok((Self { tags }, cursor.position()))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = VERSION.to_vec();
        for tag in &self.tags {
            let body = tag.body();
            out.extend_from_slice(tag.name().as_bytes());
            out.push(0x00);
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            out.extend_from_slice(&body);
        }
        out
    }

    /// Build the entry list Serato writes for the given cues, loops and flags
    pub fn from_metadata(meta: &SeratoTrackMetadata) -> Self {
        let mut tags = Vec::new();
        if let Some(color) = meta.color {
            tags.push(Markers2Tag::Color(color));
        }
        tags.extend(meta.cue_points.iter().map(|cue| {
            Markers2Tag::Cue(CueTag {
                index: cue.index,
                position_ms: cue.position_ms,
                color: TrackColor::from_hex(&cue.color).unwrap_or_default(),
                name: cue.name.clone(),
            })
        }));
        tags.extend(meta.loops.iter().map(|lp| {
            Markers2Tag::Loop(LoopTag {
                index: lp.index,
                start_ms: lp.start_ms,
                end_ms: lp.end_ms,
                color: TrackColor::from_hex(&lp.color).unwrap_or_default(),
                locked: lp.locked,
                name: lp.name.clone(),
            })
        }));
        tags.push(Markers2Tag::BpmLock(meta.bpm_locked.unwrap_or(false)));
        Self { tags }
    }

    pub fn cue_points(&self) -> Vec<CuePoint> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                Markers2Tag::Cue(cue) => Some(CuePoint {
                    index: cue.index,
                    position_ms: cue.position_ms,
                    color: cue.color.to_hex(),
                    name: cue.name.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn loops(&self) -> Vec<LoopPoint> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                Markers2Tag::Loop(lp) => Some(LoopPoint {
                    index: lp.index,
                    start_ms: lp.start_ms,
                    end_ms: lp.end_ms,
                    color: lp.color.to_hex(),
                    locked: lp.locked,
                    name: lp.name.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn track_color(&self) -> Option<TrackColor> {
        self.tags.iter().find_map(|tag| match tag {
            Markers2Tag::Color(color) => Some(*color),
            _ => None,
        })
    }

    pub fn bpm_locked(&self) -> Option<bool> {
        self.tags.iter().find_map(|tag| match tag {
            Markers2Tag::BpmLock(locked) => Some(*locked),
            _ => None,
        })
    }
}
