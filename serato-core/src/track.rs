//! Track metadata handed to the migration layer
//!
//! These are the decoded, format-independent values the Serato codecs
//! produce. They serialize with serde so they can be cached or exported.

use serde::{Deserialize, Serialize};

/// Everything Serato stores about a track's performance data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeratoTrackMetadata {
    /// Hot cues in the order they were stored
    pub cue_points: Vec<CuePoint>,
    /// Saved loops
    pub loops: Vec<LoopPoint>,
    /// Track colour shown in the library
    pub color: Option<TrackColor>,
    /// Whether the beat grid is locked
    pub bpm_locked: Option<bool>,
    /// One anchor per beat grid marker
    pub tempo_anchors: Vec<TempoAnchor>,
}

/// A hot cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuePoint {
    /// Pad slot (0-based)
    pub index: u8,
    /// Position from track start in milliseconds
    pub position_ms: u32,
    /// Lowercase `#rrggbb`
    pub color: String,
    pub name: String,
}

/// A saved loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPoint {
    pub index: u8,
    pub start_ms: u32,
    pub end_ms: u32,
    /// Lowercase `#rrggbb`
    pub color: String,
    pub locked: bool,
    pub name: String,
}

/// Tempo from one beat grid marker onward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoAnchor {
    /// Marker position in seconds
    pub position_secs: f32,
    pub bpm: f32,
}

/// An ordered playlist read from a crate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CratePlaylist {
    pub name: String,
    pub track_paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrackColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TrackColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Render as lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb` or `rrggbb` (any case)
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Container formats that carry Serato tags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Unknown,
    /// ID3v2 GEOB frames
    Mp3,
    /// Vorbis comments
    Flac,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => FileType::Mp3,
            "flac" => FileType::Flac,
            _ => FileType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        assert_eq!(TrackColor::new(0xFF, 0x00, 0x00).to_hex(), "#ff0000");
        assert_eq!(TrackColor::new(0x0A, 0xBC, 0x0D).to_hex(), "#0abc0d");
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(TrackColor::from_hex("#FF8800"), Some(TrackColor::new(0xFF, 0x88, 0x00)));
        assert_eq!(TrackColor::from_hex("00ff00"), Some(TrackColor::new(0, 0xFF, 0)));
        assert_eq!(TrackColor::from_hex("#fff"), None);
        assert_eq!(TrackColor::from_hex("#gg0000"), None);
        assert_eq!(TrackColor::from_hex("#ä0000"), None);
    }

    #[test]
    fn test_metadata_serializes() {
        let meta = SeratoTrackMetadata {
            cue_points: vec![CuePoint {
                index: 0,
                position_ms: 1500,
                color: "#ff0000".into(),
                name: "Intro".into(),
            }],
            bpm_locked: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"position_ms\":1500"));
        let back: SeratoTrackMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("mp3"), FileType::Mp3);
        assert_eq!(FileType::from_extension("FLAC"), FileType::Flac);
        assert_eq!(FileType::from_extension("wav"), FileType::Unknown);
    }
}
