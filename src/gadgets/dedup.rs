//! Content and position deduplication of gadget candidates.

use crate::core::{GadgetCandidate, GadgetSet};
use crate::hashing::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Hex fingerprint of a candidate's window bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn of(window: &[u8], algorithm: DigestAlgorithm) -> Self {
        Self(algorithm.hex_digest(window))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Counts describing one gadget set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupSummary {
    pub total: usize,
    pub unique_contents: usize,
    pub unique_positions: usize,
}

/// Distinct window contents, digested with MD5.
pub fn unique_contents(stream: &[u8], gadgets: &GadgetSet) -> BTreeSet<ContentDigest> {
    unique_contents_with(stream, gadgets, DigestAlgorithm::Md5)
}

/// Distinct window contents under the chosen digest.
///
/// Candidates whose window does not fit in `stream` are ignored.
pub fn unique_contents_with(
    stream: &[u8],
    gadgets: &GadgetSet,
    algorithm: DigestAlgorithm,
) -> BTreeSet<ContentDigest> {
    gadgets
        .iter()
        .filter_map(|c| c.window(stream))
        .map(|w| ContentDigest::of(w, algorithm))
        .collect()
}

/// Distinct anchor offsets that produced at least one gadget.
pub fn unique_positions(gadgets: &GadgetSet) -> BTreeSet<usize> {
    gadgets.iter().map(|c| c.end_offset).collect()
}

/// First candidate of each distinct window content, in set order.
pub fn first_occurrences(stream: &[u8], gadgets: &GadgetSet) -> Vec<GadgetCandidate> {
    let mut seen: HashSet<&[u8]> = HashSet::new();
    gadgets
        .iter()
        .filter(|c| c.window(stream).is_some_and(|w| seen.insert(w)))
        .copied()
        .collect()
}

/// Total, content-unique and position-unique counts in one call.
pub fn summarize(stream: &[u8], gadgets: &GadgetSet, algorithm: DigestAlgorithm) -> DedupSummary {
    DedupSummary {
        total: gadgets.len(),
        unique_contents: unique_contents_with(stream, gadgets, algorithm).len(),
        unique_positions: unique_positions(gadgets).len(),
    }
}
