//! Serato's proprietary formats

pub mod beatgrid;
pub mod crate_file;
pub mod envelope;
pub mod markers2;
pub mod metadata;

pub use beatgrid::{NonTerminalMarker, SeratoBeatGrid, TerminalMarker};
pub use crate_file::{Crate, CrateNode};
pub use markers2::{CueTag, LoopTag, Markers2, Markers2Tag, Termination};
