//! serato-core: Serato DJ tag formats with lossless write support
//!
//! This crate provides binary decoding and encoding for:
//! - ID3v2.3/2.4 tags (GEOB frames, padding-aware in-place rewrite)
//! - Serato `.crate` playlists
//! - Serato Markers2 (cues, loops, colour, BPM lock)
//! - Serato BeatGrid
//!
//! Nothing here does I/O; every codec works on byte slices.
//!
//! Based on the reverse engineering in Holzhaus' serato-tags documentation.

pub mod cursor;
pub mod error;
pub mod id3;
pub mod serato;
pub mod synchsafe;
pub mod track;

pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use id3::{Frame, Id3Tag, RewrittenTag};
pub use serato::{Crate, CrateNode, Markers2, SeratoBeatGrid, Termination};
pub use track::{CratePlaylist, CuePoint, FileType, LoopPoint, SeratoTrackMetadata, TempoAnchor, TrackColor};
