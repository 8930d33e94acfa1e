//! Reading and writing Serato data through a host tag
//!
//! The caller supplies the tag: a parsed [`Id3Tag`] for MP3, or the Vorbis
//! comments of a FLAC file as `(key, value)` pairs.

use tracing::debug;

use crate::error::Result;
use crate::id3::{Frame, Id3Tag};
use crate::serato::beatgrid::SeratoBeatGrid;
use crate::serato::envelope::{
    self, BEATGRID_DESCRIPTION, BEATGRID_VORBIS_KEY, MARKERS2_DESCRIPTION, MARKERS2_VORBIS_KEY,
};
use crate::serato::markers2::Markers2;
use crate::track::SeratoTrackMetadata;

/// Markers2 decode; `strict` disables the tolerant fallback
pub fn decode_markers2(payload: &[u8], strict: bool) -> Result<Markers2> {
    if strict {
        Markers2::decode(payload)
    } else {
        Markers2::decode_auto(payload)
    }
}

/// Serato data found in an ID3 tag; missing frames leave fields empty
pub fn read_id3(tag: &Id3Tag<'_>, strict: bool) -> Result<SeratoTrackMetadata> {
    let markers = tag
        .find_geob(MARKERS2_DESCRIPTION)
        .map(|geob| envelope::unwrap_geob_markers2(&geob.body))
        .transpose()?
        .map(|payload| decode_markers2(&payload, strict))
        .transpose()?;

    let grid = tag
        .find_geob(BEATGRID_DESCRIPTION)
        .map(|geob| SeratoBeatGrid::decode(&geob.body))
        .transpose()?;

    debug!(
        "ID3 Serato frames: markers2={}, beatgrid={}",
        markers.is_some(),
        grid.is_some()
    );
    Ok(combine(markers, grid))
}

/// Serato data found in Vorbis comments
pub fn read_vorbis<'c, I>(comments: I, strict: bool) -> Result<SeratoTrackMetadata>
where
    I: IntoIterator<Item = (&'c str, &'c str)>,
{
    let mut markers = None;
    let mut grid = None;

    for (key, value) in comments {
        if key.eq_ignore_ascii_case(MARKERS2_VORBIS_KEY) {
            let payload = envelope::unwrap_vorbis_markers2(value)?;
            markers = Some(decode_markers2(&payload, strict)?);
        } else if key.eq_ignore_ascii_case(BEATGRID_VORBIS_KEY) {
            let payload = envelope::unwrap_vorbis(value, BEATGRID_DESCRIPTION)?;
            grid = Some(SeratoBeatGrid::decode(&payload)?);
        }
    }

    debug!(
        "Vorbis Serato comments: markers2={}, beatgrid={}",
        markers.is_some(),
        grid.is_some()
    );
    Ok(combine(markers, grid))
}

fn combine(markers: Option<Markers2>, grid: Option<SeratoBeatGrid>) -> SeratoTrackMetadata {
    let mut meta = SeratoTrackMetadata::default();
    if let Some(markers) = markers {
        meta.cue_points = markers.cue_points();
        meta.loops = markers.loops();
        meta.color = markers.track_color();
        meta.bpm_locked = markers.bpm_locked();
    }
    if let Some(grid) = grid {
        meta.tempo_anchors = grid.anchors();
    }
    meta
}

/// GEOB frame carrying a Markers2 payload
pub fn markers2_frame(markers: &Markers2) -> Frame {
    Frame::geob(
        MARKERS2_DESCRIPTION,
        envelope::wrap_geob_markers2(&markers.encode()),
    )
}

/// GEOB frame carrying a beat grid
pub fn beatgrid_frame(grid: &SeratoBeatGrid) -> Result<Frame> {
    Ok(Frame::geob(BEATGRID_DESCRIPTION, grid.encode()?))
}

/// Queue every Serato GEOB frame of `source` onto `target`, replacing any
/// frames with the same description. Returns how many frames were queued.
pub fn copy_serato_frames(source: &Id3Tag<'_>, target: &mut Id3Tag<'_>) -> usize {
    let mut copied = 0;
    for frame in source.frames() {
        if let Some(geob) = frame.as_geob() {
            if geob.description.starts_with("Serato ") {
                let mut fresh = geob.clone();
                fresh.header.frame_offset = None;
                // Status flag bits differ between v2.3 and v2.4
                fresh.header.flags = 0;
                target.add_frame(Frame::Geob(fresh));
                copied += 1;
            }
        }
    }
    copied
}
