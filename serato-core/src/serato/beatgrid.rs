//! Serato BeatGrid
//!
//! Layout (big-endian):
//! - 2 bytes: version `01 00`
//! - 4 bytes: marker count
//! - count - 1 non-terminal markers: f32 position (s), u32 beats until next marker
//! - 1 terminal marker: f32 position (s), f32 BPM
//! - 1 footer byte
//!
//! A count of zero means no grid at all. Tempo between two markers is not
//! stored; it follows from the beat count and the distance to the next marker.

use std::io::Cursor;

use binrw::{binrw, BinWrite, Endian};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::track::TempoAnchor;

const VERSION: [u8; 2] = [0x01, 0x00];

/// Size of either marker record
const MARKER_SIZE: usize = 8;

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonTerminalMarker {
    pub position_secs: f32,
    pub beats_until_next: u32,
}

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalMarker {
    pub position_secs: f32,
    pub bpm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeratoBeatGrid {
    pub non_terminal_markers: Vec<NonTerminalMarker>,
    pub terminal_marker: Option<TerminalMarker>,
    pub footer: u8,
}

impl SeratoBeatGrid {
    /// A single-tempo grid anchored at `position_secs`
    pub fn constant(position_secs: f32, bpm: f32) -> Self {
        Self {
            non_terminal_markers: Vec::new(),
            terminal_marker: Some(TerminalMarker { position_secs, bpm }),
            footer: 0,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);

        let version = cursor.read_array::<2>()?;
        if version != VERSION {
            return Err(Error::MalformedHeader(format!(
                "unexpected BeatGrid version {:02x} {:02x}",
                version[0], version[1]
            )));
        }

        let count = cursor.read_u32be()? as usize;
        if count == 0 {
            let footer = if cursor.is_empty() { 0 } else { cursor.read_u8()? };
            return Ok(Self {
                footer,
                ..Default::default()
            });
        }

        // Never trust the count for the allocation
        let mut non_terminal_markers =
            Vec::with_capacity((count - 1).min(cursor.remaining() / MARKER_SIZE));
        for _ in 0..count - 1 {
            non_terminal_markers.push(cursor.read_record::<NonTerminalMarker>()?);
        }
        let terminal_marker = cursor.read_record::<TerminalMarker>()?;
        let footer = cursor.read_u8()?;

        Ok(Self {
            non_terminal_markers,
            terminal_marker: Some(terminal_marker),
            footer,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.terminal_marker.is_none() && !self.non_terminal_markers.is_empty() {
            return Err(Error::MalformedHeader(
                "beat grid has markers but no terminal marker".into(),
            ));
        }

        let count = self.marker_count();
        let mut writer = Cursor::new(Vec::with_capacity(7 + count * MARKER_SIZE));
        VERSION.write_options(&mut writer, Endian::Big, ())?;
        (count as u32).write_options(&mut writer, Endian::Big, ())?;
        for marker in &self.non_terminal_markers {
            marker.write_options(&mut writer, Endian::Big, ())?;
        }
        if let Some(terminal) = &self.terminal_marker {
            terminal.write_options(&mut writer, Endian::Big, ())?;
        }
        self.footer.write_options(&mut writer, Endian::Big, ())?;

        Ok(writer.into_inner())
    }

    pub fn marker_count(&self) -> usize {
        self.non_terminal_markers.len() + usize::from(self.terminal_marker.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.marker_count() == 0
    }

    /// BPM between non-terminal marker `i` and the marker after it
    pub fn interval_bpm(&self, i: usize) -> Option<f32> {
        let marker = self.non_terminal_markers.get(i)?;
        let next_position = match self.non_terminal_markers.get(i + 1) {
            Some(next) => next.position_secs,
            None => self.terminal_marker?.position_secs,
        };
        let delta = next_position - marker.position_secs;
        if delta <= 0.0 {
            return None;
        }
        Some(marker.beats_until_next as f32 * (60.0 / delta))
    }

    /// Tempo at every marker: derived for non-terminal ones, stored for the last
    pub fn anchors(&self) -> Vec<TempoAnchor> {
        let mut anchors: Vec<TempoAnchor> = self
            .non_terminal_markers
            .iter()
            .enumerate()
            .filter_map(|(i, marker)| {
                self.interval_bpm(i).map(|bpm| TempoAnchor {
                    position_secs: marker.position_secs,
                    bpm,
                })
            })
            .collect();
        if let Some(terminal) = self.terminal_marker {
            anchors.push(TempoAnchor {
                position_secs: terminal.position_secs,
                bpm: terminal.bpm,
            });
        }
        anchors
    }
}
