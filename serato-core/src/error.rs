//! Error types for serato-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Unexpected end of buffer: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEof {
        needed: usize,
        available: usize,
        offset: usize,
    },

    #[error("Invalid size for frame {frame}: declared {declared}, actual {actual}")]
    InvalidFrameSize {
        frame: String,
        declared: usize,
        actual: usize,
    },

    #[error("Invalid text: {0}")]
    InvalidText(String),

    #[error("Tag too large for a synch-safe size field: {0} bytes")]
    TagTooLarge(usize),

    #[error("Base64 error: {0}")]
    Base64(String),

    #[error("Binary format error: {0}")]
    BinRw(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn eof(needed: usize, available: usize, offset: usize) -> Self {
        Error::UnexpectedEof {
            needed,
            available,
            offset,
        }
    }
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        if e.is_eof() {
            Error::UnexpectedEof {
                needed: 0,
                available: 0,
                offset: 0,
            }
        } else {
            Error::BinRw(e.to_string())
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Base64(e.to_string())
    }
}
