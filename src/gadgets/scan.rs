//! Anchor-driven gadget search.
//!
//! Every occurrence of the anchor byte is a potential gadget end. For each
//! anchor the scanner decodes every window that ends there, from one byte of
//! lookback up to `max_window - 1`, and keeps the windows whose decoding
//! contains the terminal mnemonic exactly at its last position and nowhere
//! before it.

use crate::config::GadgetConfig;
use crate::core::{GadgetCandidate, GadgetSet};
use crate::disasm::{DecodeError, InstructionDecoder};
use crate::error::{Result, RopCheckError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Anchors below this count are checked sequentially even when parallel.
const PAR_THRESHOLD: usize = 64;

/// Shared cancellation flag, checked once per anchor.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Execution controls for one scan. None of them affect which candidates
/// are reported, only whether the scan completes.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    pub cancel: CancelToken,
    /// Wall-clock budget; exceeding it stops the scan like a cancellation.
    pub budget: Option<Duration>,
    /// Check anchors on the rayon pool.
    pub parallel: bool,
}

impl ScanControl {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Self::default()
        }
    }

    fn should_stop(&self, started: Instant) -> bool {
        self.cancel.is_cancelled() || self.budget.is_some_and(|b| started.elapsed() >= b)
    }
}

/// Counters gathered during one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub anchors: usize,
    pub decode_calls: usize,
    pub decode_failures: usize,
    pub decode_timeouts: usize,
}

/// Result of [`scan_with`].
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub gadgets: GadgetSet,
    pub stats: ScanStats,
}

#[derive(Default)]
struct Counters {
    decode_calls: AtomicUsize,
    decode_failures: AtomicUsize,
    decode_timeouts: AtomicUsize,
}

/// True iff the first `terminal` in `mnemonics` is also the last instruction.
/// Mnemonics compare ASCII case-insensitively.
pub fn is_terminated_sequence(mnemonics: &[String], terminal: &str) -> bool {
    match mnemonics.iter().position(|m| m.eq_ignore_ascii_case(terminal)) {
        Some(first) => first + 1 == mnemonics.len(),
        None => false,
    }
}

/// Stream indices holding the anchor byte, ascending.
pub fn find_anchors(stream: &[u8], anchor: u8) -> Vec<usize> {
    memchr::memchr_iter(anchor, stream).collect()
}

/// Scan `stream` with default execution controls (sequential, no budget).
pub fn scan<D>(stream: &[u8], config: &GadgetConfig, decoder: &D) -> Result<GadgetSet>
where
    D: InstructionDecoder + ?Sized,
{
    scan_with(stream, config, decoder, &ScanControl::sequential()).map(|o| o.gadgets)
}

/// Scan `stream` for gadgets ending at `config.anchor_byte`.
///
/// Fails with [`RopCheckError::Config`] before touching the stream when the
/// configuration is unusable, and with [`RopCheckError::Cancelled`] when the
/// control's token fires or its budget runs out. Decoder failures only
/// exclude the affected window.
pub fn scan_with<D>(
    stream: &[u8],
    config: &GadgetConfig,
    decoder: &D,
    control: &ScanControl,
) -> Result<ScanOutcome>
where
    D: InstructionDecoder + ?Sized,
{
    config.validate()?;

    let started = Instant::now();
    let anchors = find_anchors(stream, config.anchor_byte);
    debug!(
        anchors = anchors.len(),
        stream_len = stream.len(),
        anchor = config.anchor_byte,
        decoder = decoder.name(),
        "Scanning byte stream"
    );

    let counters = Counters::default();
    let per_anchor = |(index, &end): (usize, &usize)| -> Result<Vec<GadgetCandidate>> {
        if control.should_stop(started) {
            return Err(RopCheckError::Cancelled { anchors: index });
        }
        Ok(candidates_at(stream, end, config, decoder, &counters))
    };

    let groups: Vec<Vec<GadgetCandidate>> = if control.parallel && anchors.len() >= PAR_THRESHOLD {
        anchors.par_iter().enumerate().map(per_anchor).collect::<Result<_>>()?
    } else {
        anchors.iter().enumerate().map(per_anchor).collect::<Result<_>>()?
    };

    let gadgets = GadgetSet::from_unsorted(groups.into_iter().flatten().collect());
    let stats = ScanStats {
        anchors: anchors.len(),
        decode_calls: counters.decode_calls.into_inner(),
        decode_failures: counters.decode_failures.into_inner(),
        decode_timeouts: counters.decode_timeouts.into_inner(),
    };
    debug!(
        candidates = gadgets.len(),
        ?stats,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Scan finished"
    );
    Ok(ScanOutcome { gadgets, stats })
}

fn candidates_at<D>(
    stream: &[u8],
    end: usize,
    config: &GadgetConfig,
    decoder: &D,
    counters: &Counters,
) -> Vec<GadgetCandidate>
where
    D: InstructionDecoder + ?Sized,
{
    // cannot look back past the start of the stream
    let window_limit = config.max_window.min(end + 1);
    (1..window_limit)
        .filter(|&length| {
            let window = &stream[end - length..=end];
            counters.decode_calls.fetch_add(1, Ordering::Relaxed);
            match decoder.decode(window) {
                Ok(mnemonics) => is_terminated_sequence(&mnemonics, &config.terminal_mnemonic),
                Err(err) => {
                    counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                    if matches!(err, DecodeError::Timeout { .. }) {
                        counters.decode_timeouts.fetch_add(1, Ordering::Relaxed);
                    }
                    trace!(end, length, error = %err, "Window rejected by decoder");
                    false
                }
            }
        })
        .map(|length| GadgetCandidate::new(end, length))
        .collect()
}
