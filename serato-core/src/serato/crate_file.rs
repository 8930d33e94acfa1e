//! Serato `.crate` files (playlists)
//!
//! A crate is a flat run of TLV records with no header, count or terminator:
//! - 4 bytes: tag (ASCII)
//! - 4 bytes: body length (big-endian)
//! - body
//!
//! Tags starting with `o` hold nested records; `t`/`p`/`vrsn` hold UTF-16BE
//! text without a terminator; `brev` holds a single boolean byte.

use crate::cursor::{decode_utf16be, encode_utf16be, ByteCursor};
use crate::error::{Error, Result};
use crate::track::CratePlaylist;

const TAG_VERSION: [u8; 4] = *b"vrsn";
const TAG_SORT_COLUMN: [u8; 4] = *b"osrt";
const TAG_SORT_DIRECTION: [u8; 4] = *b"brev";
const TAG_COLUMN_LIST: [u8; 4] = *b"ovct";
const TAG_COLUMN_NAME: [u8; 4] = *b"tvcn";
const TAG_COLUMN_WIDTH: [u8; 4] = *b"tvcw";
const TAG_TRACK: [u8; 4] = *b"otrk";
const TAG_FILE_PATH: [u8; 4] = *b"ptrk";

/// Version string written by Serato DJ into new crates
pub const CRATE_VERSION: &str = "1.0/Serato ScratchLive Crate";

/// Deepest nesting accepted; Serato itself nests two levels
const MAX_DEPTH: usize = 8;

/// Columns a freshly created crate shows
const DEFAULT_COLUMNS: [&str; 4] = ["song", "artist", "album", "length"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrateNode {
    Version(String),
    SortColumn(Vec<CrateNode>),
    /// true = descending
    SortDirection(bool),
    ColumnList(Vec<CrateNode>),
    ColumnName(String),
    ColumnWidth(String),
    Track(Vec<CrateNode>),
    FilePath(String),
    Unknown { tag: [u8; 4], body: Vec<u8> },
}

impl CrateNode {
    pub fn tag(&self) -> [u8; 4] {
        match self {
            CrateNode::Version(_) => TAG_VERSION,
            CrateNode::SortColumn(_) => TAG_SORT_COLUMN,
            CrateNode::SortDirection(_) => TAG_SORT_DIRECTION,
            CrateNode::ColumnList(_) => TAG_COLUMN_LIST,
            CrateNode::ColumnName(_) => TAG_COLUMN_NAME,
            CrateNode::ColumnWidth(_) => TAG_COLUMN_WIDTH,
            CrateNode::Track(_) => TAG_TRACK,
            CrateNode::FilePath(_) => TAG_FILE_PATH,
            CrateNode::Unknown { tag, .. } => *tag,
        }
    }

    pub fn children(&self) -> &[CrateNode] {
        match self {
            CrateNode::SortColumn(children)
            | CrateNode::ColumnList(children)
            | CrateNode::Track(children) => children,
            _ => &[],
        }
    }

    fn decode(tag: [u8; 4], body: &[u8], depth: usize) -> Result<Self> {
        let text = |make: fn(String) -> CrateNode| match decode_utf16be(body) {
            Ok(s) => make(s),
            // Keep undecodable text byte-for-byte
            Err(_) => CrateNode::Unknown {
                tag,
                body: body.to_vec(),
            },
        };

        Ok(match tag {
            TAG_TRACK => CrateNode::Track(decode_nested(body, depth + 1)?),
            TAG_COLUMN_LIST => CrateNode::ColumnList(decode_nested(body, depth + 1)?),
            TAG_SORT_COLUMN => CrateNode::SortColumn(decode_nested(body, depth + 1)?),
            TAG_FILE_PATH => text(CrateNode::FilePath),
            TAG_COLUMN_NAME => text(CrateNode::ColumnName),
            TAG_COLUMN_WIDTH => text(CrateNode::ColumnWidth),
            TAG_VERSION => text(CrateNode::Version),
            TAG_SORT_DIRECTION => match body {
                [0] => CrateNode::SortDirection(false),
                [1] => CrateNode::SortDirection(true),
                _ => CrateNode::Unknown {
                    tag,
                    body: body.to_vec(),
                },
            },
            _ => CrateNode::Unknown {
                tag,
                body: body.to_vec(),
            },
        })
    }

    fn body(&self) -> Vec<u8> {
        match self {
            CrateNode::Version(s)
            | CrateNode::ColumnName(s)
            | CrateNode::ColumnWidth(s)
            | CrateNode::FilePath(s) => encode_utf16be(s),
            CrateNode::SortDirection(descending) => vec![u8::from(*descending)],
            CrateNode::SortColumn(children)
            | CrateNode::ColumnList(children)
            | CrateNode::Track(children) => encode_nodes(children),
            CrateNode::Unknown { body, .. } => body.clone(),
        }
    }

    /// Children first, then `tag + length(body)` in front
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let body = self.body();
        out.extend_from_slice(&self.tag());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    }
}

/// Decode records until the buffer is exhausted
pub fn decode_nodes(bytes: &[u8]) -> Result<Vec<CrateNode>> {
    decode_nested(bytes, 0)
}

fn decode_nested(bytes: &[u8], depth: usize) -> Result<Vec<CrateNode>> {
    if depth > MAX_DEPTH {
        return Err(Error::MalformedHeader(format!(
            "crate records nested deeper than {} levels",
            MAX_DEPTH
        )));
    }

    let mut cursor = ByteCursor::new(bytes);
    let mut nodes = Vec::new();

    while !cursor.is_empty() {
        let tag = cursor.read_array::<4>()?;
        let length = cursor.read_u32be()?;
        let body = cursor.read_fixed(length as usize)?;
        nodes.push(CrateNode::decode(tag, body, depth)?);
    }

    Ok(nodes)
}

pub fn encode_nodes(nodes: &[CrateNode]) -> Vec<u8> {
    let mut out = Vec::new();
    for node in nodes {
        node.encode_into(&mut out);
    }
    out
}

/// A whole crate file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crate {
    pub nodes: Vec<CrateNode>,
}

impl Crate {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            nodes: decode_nodes(bytes)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_nodes(&self.nodes)
    }

    /// A new crate laid out the way Serato DJ creates one
    pub fn with_tracks<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut nodes = vec![
            CrateNode::Version(CRATE_VERSION.to_string()),
            CrateNode::SortColumn(vec![
                CrateNode::ColumnName(DEFAULT_COLUMNS[0].to_string()),
                CrateNode::SortDirection(false),
            ]),
        ];
        nodes.extend(DEFAULT_COLUMNS.iter().map(|name| {
            CrateNode::ColumnList(vec![
                CrateNode::ColumnName(name.to_string()),
                CrateNode::ColumnWidth("0".to_string()),
            ])
        }));

        let mut crate_file = Self { nodes };
        for path in paths {
            crate_file.add_track(path);
        }
        crate_file
    }

    pub fn version(&self) -> Option<&str> {
        self.nodes.iter().find_map(|node| match node {
            CrateNode::Version(v) => Some(v.as_str()),
            _ => None,
        })
    }

    /// File paths of every track entry, in crate order
    pub fn track_paths(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| matches!(node, CrateNode::Track(_)))
            .filter_map(|track| {
                track.children().iter().find_map(|child| match child {
                    CrateNode::FilePath(path) => Some(path.clone()),
                    _ => None,
                })
            })
            .collect()
    }

    /// Append a track unless the crate already lists it. Returns true if added.
    pub fn add_track(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.track_paths().contains(&path) {
            return false;
        }
        self.nodes
            .push(CrateNode::Track(vec![CrateNode::FilePath(path)]));
        true
    }

    /// Drop every track entry pointing at `path`. Returns true if any was removed.
    pub fn remove_track(&mut self, path: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| {
            !(matches!(node, CrateNode::Track(_))
                && node
                    .children()
                    .iter()
                    .any(|child| matches!(child, CrateNode::FilePath(p) if p == path)))
        });
        self.nodes.len() != before
    }

    pub fn to_playlist(&self, name: impl Into<String>) -> CratePlaylist {
        CratePlaylist {
            name: name.into(),
            track_paths: self.track_paths(),
        }
    }
}
