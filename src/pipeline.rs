//! Whole-binary orchestration: list sections, extract, scan, deduplicate.
//!
//! Sections are independent and run on a bounded rayon pool; the report
//! keeps provider order. Extraction problems (including a stream whose
//! length differs from the declared size) skip only the affected section.

use crate::binary::tools::{ObjdumpExtractor, ReadelfProvider};
use crate::binary::{detect_architecture, ByteExtractor, ObjectLoader, SectionProvider};
use crate::config::{GadgetConfig, PipelineConfig, RopCheckConfig, SectionSource};
use crate::core::{GadgetRecord, Section};
use crate::disasm::{registry, Architecture, InstructionDecoder};
use crate::error::{Result, RopCheckError};
use crate::gadgets::{first_occurrences, scan_with, summarize, CancelToken, ScanControl};
use crate::process::ToolRunner;
use crate::report::{BinaryReport, SectionReport, SectionStatus};
use crate::{log_error, span_trace};
use crate::timeout::DEFAULT_TOOL_TIMEOUT_MS;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct GadgetPipeline {
    provider: Box<dyn SectionProvider>,
    extractor: Box<dyn ByteExtractor>,
    decoder: Box<dyn InstructionDecoder>,
    arch: Architecture,
    gadgets: GadgetConfig,
    config: PipelineConfig,
    cancel: CancelToken,
    pool: ThreadPool,
}

impl GadgetPipeline {
    /// Assemble a pipeline from explicit collaborators.
    ///
    /// Fails with [`RopCheckError::Config`] when the gadget configuration is
    /// unusable, before any binary is touched.
    pub fn new(
        provider: Box<dyn SectionProvider>,
        extractor: Box<dyn ByteExtractor>,
        decoder: Box<dyn InstructionDecoder>,
        arch: Architecture,
        config: &RopCheckConfig,
    ) -> Result<Self> {
        config.gadgets.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.pipeline.jobs)
            .thread_name(|i| format!("ropcheck-scan-{}", i))
            .build()
            .map_err(|e| RopCheckError::Internal(format!("thread pool: {}", e)))?;
        Ok(Self {
            provider,
            extractor,
            decoder,
            arch,
            gadgets: config.gadgets.clone(),
            config: config.pipeline.clone(),
            cancel: CancelToken::new(),
            pool,
        })
    }

    /// Build the collaborators `config` describes for the binary at `path`.
    ///
    /// The architecture comes from the decoder override or, failing that,
    /// from the binary's header.
    pub fn from_config(path: &Path, config: &RopCheckConfig) -> Result<Self> {
        config.gadgets.validate()?;
        let arch = match config.decoder.arch {
            Some(arch) => arch,
            None => detect_architecture(path)?,
        };
        let decoder = registry::from_config(arch, &config.decoder)?;

        let (provider, extractor): (Box<dyn SectionProvider>, Box<dyn ByteExtractor>) =
            match config.pipeline.source {
                SectionSource::Object => (
                    Box::new(ObjectLoader::default()),
                    Box::new(ObjectLoader::default()),
                ),
                SectionSource::Tools => {
                    let runner = Arc::new(ToolRunner::new(1)?);
                    (
                        Box::new(ReadelfProvider::new(runner.clone(), DEFAULT_TOOL_TIMEOUT_MS)),
                        Box::new(ObjdumpExtractor::new(runner, DEFAULT_TOOL_TIMEOUT_MS)),
                    )
                }
            };
        Self::new(provider, extractor, decoder, arch, config)
    }

    pub fn arch(&self) -> Architecture {
        self.arch
    }

    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    /// Token that stops every in-flight and future section scan.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Scan every executable section of `path`.
    ///
    /// A provider failure fails the whole binary; everything after that is
    /// recorded per section in the report.
    pub fn run(&self, path: &Path) -> Result<BinaryReport> {
        let span = span_trace!("scan_binary", path = %path.display());
        let _guard = span.enter();

        let sections = self.provider.list_sections(path)?;
        info!(
            sections = sections.len(),
            arch = %self.arch,
            decoder = self.decoder.name(),
            "Scanning binary"
        );

        let reports = self.pool.install(|| {
            sections
                .into_par_iter()
                .map(|section| self.scan_section(path, section))
                .collect::<Result<Vec<_>>>()
        })?;

        let report = BinaryReport::new(
            path.display().to_string(),
            self.arch,
            self.decoder.name().to_string(),
            self.config.digest,
            reports,
        );
        info!(
            candidates = report.totals.candidates,
            unique_contents = report.totals.unique_contents,
            unique_positions = report.totals.unique_positions,
            skipped = report.totals.sections_skipped,
            "Binary scan finished"
        );
        Ok(report)
    }

    fn scan_section(&self, path: &Path, section: Section) -> Result<SectionReport> {
        let span = span_trace!("scan_section", section = %section.name);
        let _guard = span.enter();

        if !section.is_scannable() {
            debug!(section = %section.name, "Skipping empty section");
            return Ok(SectionReport::skipped(section, SectionStatus::Empty));
        }

        let stream = match self.extractor.extract_bytes(path, &section) {
            Ok(stream) => stream,
            Err(e) if e.is_extraction() => {
                warn!(section = %section.name, error = %e, "Extraction failed, skipping section");
                let reason = e.to_string();
                return Ok(SectionReport::skipped(section, SectionStatus::ExtractionFailed { reason }));
            }
            Err(e) => return Err(log_error!(e)),
        };

        let found = stream.len() as u64;
        if found != section.size {
            let err = RopCheckError::SizeMismatch {
                section: section.name.clone(),
                expected: section.size,
                found,
            };
            warn!(error = %err, "Skipping section");
            let expected = section.size;
            return Ok(SectionReport::skipped(
                section,
                SectionStatus::SizeMismatch { expected, found },
            ));
        }

        let control = ScanControl {
            cancel: self.cancel.clone(),
            budget: self.config.section_budget_ms.map(Duration::from_millis),
            parallel: self.config.parallel_anchors,
        };
        let outcome = match scan_with(&stream, &self.gadgets, &self.decoder, &control) {
            Ok(outcome) => outcome,
            Err(RopCheckError::Cancelled { anchors }) => {
                warn!(section = %section.name, anchors, "Section scan cancelled");
                return Ok(SectionReport::skipped(section, SectionStatus::Cancelled));
            }
            Err(e) => return Err(log_error!(e)),
        };

        let summary = summarize(&stream, &outcome.gadgets, self.config.digest);
        let gadgets = if !self.config.dump {
            Vec::new()
        } else {
            let chosen = if self.config.unique_only {
                first_occurrences(&stream, &outcome.gadgets)
            } else {
                outcome.gadgets.as_slice().to_vec()
            };
            chosen
                .iter()
                .filter_map(|c| GadgetRecord::new(section.start, c, &stream))
                .collect()
        };

        info!(
            section = %section.name,
            candidates = summary.total,
            unique_contents = summary.unique_contents,
            unique_positions = summary.unique_positions,
            "Section scanned"
        );
        Ok(SectionReport {
            section,
            status: SectionStatus::Scanned,
            summary,
            stats: outcome.stats,
            gadgets,
        })
    }
}

/// Scan the binary at `path` with the collaborators `config` selects.
pub fn scan_binary(path: &Path, config: &RopCheckConfig) -> Result<BinaryReport> {
    GadgetPipeline::from_config(path, config)?.run(path)
}
