//! ID3v2 tag model and rewriting

pub mod frame;
pub mod tag;

pub use frame::{Frame, FrameHeader, FrameKey, GeobFrame, UnknownFrame};
pub use tag::{empty_tag, locate_tag, ExtendedHeader, Id3Tag, RewrittenTag, Version};
