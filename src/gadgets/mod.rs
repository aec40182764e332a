//! Gadget search and deduplication over raw byte streams.
//!
//! [`scan`] validates anchor-terminated windows through an injected
//! [`crate::disasm::InstructionDecoder`]; [`dedup`] reduces the result to
//! distinct contents and distinct anchor positions.

pub mod dedup;
pub mod scan;

pub use dedup::{
    first_occurrences, summarize, unique_contents, unique_contents_with, unique_positions,
    ContentDigest, DedupSummary,
};
pub use scan::{scan, scan_with, CancelToken, ScanControl, ScanOutcome, ScanStats};
