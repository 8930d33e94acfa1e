//! How Serato payloads are wrapped inside host tags
//!
//! MP3 (ID3 GEOB frames, description names the payload):
//! - `Serato BeatGrid`: the GEOB data is the raw beat grid
//! - `Serato Markers2`: `01 01` then base64 text of the Markers2 payload,
//!   broken into 72-character lines and NUL-padded
//!
//! FLAC (Vorbis comments):
//! - the comment value is base64 of
//!   `application/octet-stream\0` + `\0` + `<description>\0` + data,
//!   i.e. a GEOB body without the encoding byte
//! - for Markers2 that data is the GEOB frame data (`01 01` + base64 text),
//!   so it decodes twice

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::id3::frame::SERATO_MIME_TYPE;

pub const MARKERS2_DESCRIPTION: &str = "Serato Markers2";
pub const BEATGRID_DESCRIPTION: &str = "Serato BeatGrid";

pub const MARKERS2_VORBIS_KEY: &str = "SERATO_MARKERS_V2";
pub const BEATGRID_VORBIS_KEY: &str = "SERATO_BEATGRID";

const GEOB_PREFIX: [u8; 2] = [0x01, 0x01];
const LINE_LENGTH: usize = 72;

/// Serato leaves off `=` padding and sometimes adds a stray trailing character
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode base64 text the way Serato writes it: line breaks, no padding,
/// optional NUL padding at the end
pub fn decode_base64(text: &[u8]) -> Result<Vec<u8>> {
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    let mut compact: Vec<u8> = text[..end]
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace() && *b != b'=')
        .collect();
    // A length of 4n+1 can never be valid base64; Serato emits it anyway
    if compact.len() % 4 == 1 {
        compact.pop();
    }
    Ok(LENIENT.decode(&compact)?)
}

/// Base64 without padding, broken into 72-character lines
pub fn encode_base64_lines(data: &[u8]) -> Vec<u8> {
    let text = base64::engine::general_purpose::STANDARD_NO_PAD.encode(data);
    let mut out = Vec::with_capacity(text.len() + text.len() / LINE_LENGTH + 1);
    for (i, chunk) in text.as_bytes().chunks(LINE_LENGTH).enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(chunk);
    }
    out
}

/// Markers2 payload from the data of a `Serato Markers2` GEOB frame
pub fn unwrap_geob_markers2(data: &[u8]) -> Result<Vec<u8>> {
    let mut rest = data;
    let marker = format!("{}\0", MARKERS2_DESCRIPTION);
    if let Some(stripped) = rest.strip_prefix(marker.as_bytes()) {
        rest = stripped;
    }
    if let Some(stripped) = rest.strip_prefix(&GEOB_PREFIX) {
        rest = stripped;
    }
    decode_base64(rest)
}

/// GEOB frame data for a Markers2 payload
pub fn wrap_geob_markers2(payload: &[u8]) -> Vec<u8> {
    let mut out = GEOB_PREFIX.to_vec();
    out.extend(encode_base64_lines(payload));
    out
}

/// Data carried by a Serato Vorbis comment, checked against `description`
pub fn unwrap_vorbis(comment: &str, description: &str) -> Result<Vec<u8>> {
    let decoded = decode_base64(comment.as_bytes())?;
    let mut cursor = ByteCursor::new(&decoded);

    let mime_type = cursor.read_nul_terminated_ascii()?;
    let _file_name = cursor.read_nul_terminated_ascii()?;
    let found = cursor.read_nul_terminated_ascii()?;
    if found != description {
        return Err(Error::MalformedHeader(format!(
            "expected {:?} payload ({}), found {:?}",
            description, mime_type, found
        )));
    }

    Ok(cursor.rest().to_vec())
}

/// Vorbis comment value for `data`
pub fn wrap_vorbis(description: &str, data: &[u8]) -> String {
    let mut raw = Vec::with_capacity(SERATO_MIME_TYPE.len() + description.len() + 3 + data.len());
    raw.extend_from_slice(SERATO_MIME_TYPE.as_bytes());
    raw.extend_from_slice(&[0x00, 0x00]);
    raw.extend_from_slice(description.as_bytes());
    raw.push(0x00);
    raw.extend_from_slice(data);
    STANDARD.encode(raw)
}

/// Markers2 payload from a `SERATO_MARKERS_V2` comment
pub fn unwrap_vorbis_markers2(comment: &str) -> Result<Vec<u8>> {
    let inner = unwrap_vorbis(comment, MARKERS2_DESCRIPTION)?;
    unwrap_geob_markers2(&inner)
}

/// `SERATO_MARKERS_V2` comment value for a Markers2 payload
pub fn wrap_vorbis_markers2(payload: &[u8]) -> String {
    wrap_vorbis(MARKERS2_DESCRIPTION, &wrap_geob_markers2(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vorbis_header_is_42_bytes() {
        let comment = wrap_vorbis(MARKERS2_DESCRIPTION, b"");
        let raw = STANDARD.decode(comment).unwrap();
        assert_eq!(raw.len(), 42);
        assert_eq!(&raw[..24], b"application/octet-stream");
    }

    #[test]
    fn test_geob_markers2_roundtrip() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let data = wrap_geob_markers2(&payload);

        assert_eq!(&data[..2], &[0x01, 0x01]);
        assert!(data[2..].split(|&b| b == b'\n').all(|line| line.len() <= 72));
        assert_eq!(unwrap_geob_markers2(&data).unwrap(), payload);
    }

    #[test]
    fn test_geob_markers2_with_padding_and_marker() {
        let payload = vec![0x01, 0x01, 0x42, 0x50, 0x4D];
        let mut data = b"Serato Markers2\0".to_vec();
        data.extend(wrap_geob_markers2(&payload));
        data.extend_from_slice(&[0x00; 32]);
        assert_eq!(unwrap_geob_markers2(&data).unwrap(), payload);
    }

    #[test]
    fn test_stray_trailing_character() {
        // "AQE" decodes to 01 01; Serato sometimes appends one extra char
        assert_eq!(decode_base64(b"AQEA").unwrap(), vec![0x01, 0x01, 0x00]);
        assert_eq!(decode_base64(b"AQE").unwrap(), vec![0x01, 0x01]);
        assert_eq!(decode_base64(b"AQEAA").unwrap(), vec![0x01, 0x01, 0x00]);
        assert_eq!(decode_base64(b"AQE=").unwrap(), vec![0x01, 0x01]);
    }

    #[test]
    fn test_vorbis_markers2_double_wrapped() {
        let payload = vec![0x01, 0x01, 0x43, 0x55, 0x45, 0x00];
        let comment = wrap_vorbis_markers2(&payload);
        assert_eq!(unwrap_vorbis_markers2(&comment).unwrap(), payload);
    }

    #[test]
    fn test_vorbis_markers2_from_serato_bytes() {
        // Header, then `01 01` and the inner base64 of 01 01 42
        let mut raw = b"application/octet-stream\0\0Serato Markers2\0".to_vec();
        raw.extend_from_slice(&[0x01, 0x01]);
        raw.extend_from_slice(b"AQFC");
        raw.push(0x00);
        let comment = STANDARD.encode(&raw);

        assert_eq!(unwrap_vorbis_markers2(&comment).unwrap(), vec![0x01, 0x01, 0x42]);

        let inner = unwrap_vorbis(&wrap_vorbis_markers2(&[0x01, 0x01, 0x42]), MARKERS2_DESCRIPTION)
            .unwrap();
        assert_eq!(&inner[..2], &[0x01, 0x01]);
    }

    #[test]
    fn test_vorbis_wrong_description() {
        let comment = wrap_vorbis(BEATGRID_DESCRIPTION, &[0x01, 0x00]);
        assert_eq!(unwrap_vorbis(&comment, BEATGRID_DESCRIPTION).unwrap(), vec![0x01, 0x00]);
        assert!(matches!(
            unwrap_vorbis(&comment, MARKERS2_DESCRIPTION),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(decode_base64(b"!!!!"), Err(Error::Base64(_))));
    }
}
