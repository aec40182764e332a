//! Common test utilities and helpers.
//!
//! Stub decoders that make scanner behavior independent of any real
//! disassembler, plus on-disk ELF fixtures written with `object::write`.

pub mod test_utils;

use ropcheck::disasm::{DecodeError, DecodeResult, InstructionDecoder};
use std::collections::HashMap;

/// Decoder answering from a fixed window -> mnemonics table.
///
/// Windows missing from the table fail with `Malformed`.
#[derive(Default)]
pub struct TableDecoder {
    table: HashMap<Vec<u8>, Vec<String>>,
}

impl TableDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, window: &[u8], mnemonics: &[&str]) -> Self {
        self.table.insert(
            window.to_vec(),
            mnemonics.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    /// Decoder reproducing the worked example over `01 02 c3 03 c3`.
    pub fn worked_example() -> Self {
        Self::new()
            .with(&[0x02, 0xc3], &["add", "ret"])
            .with(&[0x01, 0x02, 0xc3], &["add", "ret"])
            .with(&[0x03, 0xc3], &["add", "ret"])
            .with(&[0xc3, 0x03, 0xc3], &["ret", "add", "ret"])
            .with(&[0x02, 0xc3, 0x03, 0xc3], &["add", "ret", "add", "ret"])
            .with(&[0x01, 0x02, 0xc3, 0x03, 0xc3], &["add", "ret", "add", "ret"])
    }
}

impl InstructionDecoder for TableDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        self.table
            .get(window)
            .cloned()
            .ok_or(DecodeError::Malformed { offset: 0 })
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// Decoder that treats every byte as one instruction: the anchor decodes
/// to `ret`, anything else to `nop`.
pub struct BytewiseDecoder {
    pub anchor: u8,
}

impl InstructionDecoder for BytewiseDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        Ok(window
            .iter()
            .map(|&b| if b == self.anchor { "ret" } else { "nop" }.to_string())
            .collect())
    }

    fn name(&self) -> &str {
        "bytewise"
    }
}

/// Decoder that fails every window.
pub struct FailingDecoder;

impl InstructionDecoder for FailingDecoder {
    fn decode(&self, _window: &[u8]) -> DecodeResult<Vec<String>> {
        Err(DecodeError::Backend("always fails".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Bytewise decoder that times out on windows longer than `max_len` bytes.
pub struct SlowDecoder {
    pub anchor: u8,
    pub max_len: usize,
}

impl InstructionDecoder for SlowDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        if window.len() > self.max_len {
            return Err(DecodeError::Timeout { millis: 50 });
        }
        BytewiseDecoder { anchor: self.anchor }.decode(window)
    }

    fn name(&self) -> &str {
        "slow"
    }
}
