//! Gadget candidates and the ordered set a scan produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A window `[end_offset - length, end_offset]` of a byte stream whose last
/// byte is an anchor and whose decoding ends in exactly one terminal
/// instruction.
///
/// Ordering is by `end_offset`, then `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GadgetCandidate {
    /// Stream index of the anchor byte
    pub end_offset: usize,
    /// Number of bytes before the anchor included in the window
    pub length: usize,
}

impl GadgetCandidate {
    pub fn new(end_offset: usize, length: usize) -> Self {
        Self { end_offset, length }
    }

    /// Stream index of the first window byte.
    pub fn start_offset(&self) -> usize {
        self.end_offset - self.length
    }

    /// Borrow the window from `stream`; `None` if it does not fit.
    pub fn window<'a>(&self, stream: &'a [u8]) -> Option<&'a [u8]> {
        let start = self.end_offset.checked_sub(self.length)?;
        stream.get(start..=self.end_offset)
    }
}

/// Candidates of one stream in ascending `(end_offset, length)` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetSet {
    candidates: Vec<GadgetCandidate>,
}

impl GadgetSet {
    /// Build a set, sorting into canonical order.
    pub fn from_unsorted(mut candidates: Vec<GadgetCandidate>) -> Self {
        candidates.sort_unstable();
        candidates.dedup();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GadgetCandidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[GadgetCandidate] {
        &self.candidates
    }
}

impl<'a> IntoIterator for &'a GadgetSet {
    type Item = &'a GadgetCandidate;
    type IntoIter = std::slice::Iter<'a, GadgetCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

/// Dump view of a candidate placed at its absolute address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetRecord {
    /// Address of the first window byte: `section.start + end_offset - length`
    pub address: u64,
    /// Bytes before the anchor
    pub length: usize,
    /// Window content, anchor included
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl GadgetRecord {
    /// Place `candidate` at `section_start`; `None` if the window is outside `stream`.
    pub fn new(section_start: u64, candidate: &GadgetCandidate, stream: &[u8]) -> Option<Self> {
        let bytes = candidate.window(stream)?.to_vec();
        Some(Self {
            address: section_start.wrapping_add(candidate.start_offset() as u64),
            length: candidate.length,
            bytes,
        })
    }
}

impl fmt::Display for GadgetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} + {:3}:  ", self.address, self.length)?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
