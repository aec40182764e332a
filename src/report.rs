//! Per-section and per-binary scan results.
//!
//! Reports are plain serde values; `--json` prints them with `serde_json`,
//! the default output is the line format written by [`BinaryReport::write_text`].

use crate::core::{GadgetRecord, Section};
use crate::disasm::Architecture;
use crate::gadgets::{DedupSummary, ScanStats};
use crate::hashing::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// What happened to one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionStatus {
    Scanned,
    /// Declared size zero; nothing to scan
    Empty,
    /// Extracted stream length differs from the declared size
    SizeMismatch { expected: u64, found: u64 },
    ExtractionFailed { reason: String },
    Cancelled,
}

impl SectionStatus {
    pub fn is_scanned(&self) -> bool {
        matches!(self, SectionStatus::Scanned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    pub section: Section,
    pub status: SectionStatus,
    pub summary: DedupSummary,
    pub stats: ScanStats,
    /// Dumped gadgets in set order; empty when dumping is disabled
    pub gadgets: Vec<GadgetRecord>,
}

impl SectionReport {
    /// Report for a section that was not scanned.
    pub fn skipped(section: Section, status: SectionStatus) -> Self {
        Self {
            section,
            status,
            summary: DedupSummary::default(),
            stats: ScanStats::default(),
            gadgets: Vec::new(),
        }
    }
}

/// Sums over every scanned section of a binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub sections_scanned: usize,
    pub sections_skipped: usize,
    pub candidates: usize,
    pub unique_contents: usize,
    pub unique_positions: usize,
}

impl Totals {
    pub fn from_sections(sections: &[SectionReport]) -> Self {
        sections.iter().fold(Self::default(), |mut t, s| {
            if s.status.is_scanned() {
                t.sections_scanned += 1;
                t.candidates += s.summary.total;
                t.unique_contents += s.summary.unique_contents;
                t.unique_positions += s.summary.unique_positions;
            } else {
                t.sections_skipped += 1;
            }
            t
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryReport {
    pub path: String,
    pub arch: Architecture,
    pub decoder: String,
    pub digest: DigestAlgorithm,
    pub sections: Vec<SectionReport>,
    pub totals: Totals,
}

impl BinaryReport {
    pub fn new(
        path: String,
        arch: Architecture,
        decoder: String,
        digest: DigestAlgorithm,
        sections: Vec<SectionReport>,
    ) -> Self {
        let totals = Totals::from_sections(&sections);
        Self {
            path,
            arch,
            decoder,
            digest,
            sections,
            totals,
        }
    }

    pub fn has_size_mismatch(&self) -> bool {
        self.sections
            .iter()
            .any(|s| matches!(s.status, SectionStatus::SizeMismatch { .. }))
    }

    /// Human-readable dump: one block per section, then the overall summary.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for report in &self.sections {
            writeln!(out, "{}", report.section)?;
            for gadget in &report.gadgets {
                writeln!(out, "{}", gadget)?;
            }
            match &report.status {
                SectionStatus::Scanned => writeln!(
                    out,
                    "  {} gadgets, {} unique, {} positions ({} anchors)",
                    report.summary.total,
                    report.summary.unique_contents,
                    report.summary.unique_positions,
                    report.stats.anchors
                )?,
                SectionStatus::Empty => writeln!(out, "  skipped: empty section")?,
                SectionStatus::SizeMismatch { expected, found } => writeln!(
                    out,
                    "  skipped: size mismatch, declared {} bytes, extracted {} bytes",
                    expected, found
                )?,
                SectionStatus::ExtractionFailed { reason } => {
                    writeln!(out, "  skipped: {}", reason)?
                }
                SectionStatus::Cancelled => writeln!(out, "  cancelled")?,
            }
        }
        let t = &self.totals;
        writeln!(
            out,
            "Total: {} gadgets, {} unique, {} positions in {} sections ({} skipped)",
            t.candidates, t.unique_contents, t.unique_positions, t.sections_scanned, t.sections_skipped
        )
    }

    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_text(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
