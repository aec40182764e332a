//! Decoder that shells out to a command-line disassembler.
//!
//! The window is written to the tool's stdin as space separated hex bytes
//! (`"5f c3"`), and each non-empty output line is one instruction whose
//! first token is the mnemonic. The default command is
//! `udcli -x -32 -noff -nohex` for x86 and `udcli -x -64 -noff -nohex` for
//! x86-64; udcli decodes nothing else unless custom arguments are given.

use crate::config::ExternalToolConfig;
use crate::disasm::{Architecture, DecodeError, DecodeResult, InstructionDecoder};
use crate::error::{Result, RopCheckError};
use crate::process::ToolRunner;
use crate::timeout::TimeoutConfig;
use std::sync::Arc;

pub struct ExternalDecoder {
    program: String,
    args: Vec<String>,
    timeout_ms: u64,
    runner: Arc<ToolRunner>,
}

impl ExternalDecoder {
    pub fn new(program: String, args: Vec<String>, timeout_ms: u64, runner: Arc<ToolRunner>) -> Self {
        Self {
            program,
            args,
            timeout_ms,
            runner,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// udcli arguments decoding `arch` in hex input mode.
pub fn udcli_args(arch: Architecture) -> DecodeResult<Vec<String>> {
    if !arch.is_x86() {
        return Err(DecodeError::UnsupportedArchitecture(arch));
    }
    let mode = format!("-{}", arch.address_bits());
    Ok(vec![
        "-x".to_string(),
        mode,
        "-noff".to_string(),
        "-nohex".to_string(),
    ])
}

/// Render a window the way udcli's `-x` mode expects it.
pub fn hex_input(window: &[u8]) -> String {
    let mut out = window
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

/// Extract one lower-cased mnemonic per non-empty output line.
pub fn parse_mnemonics(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|m| m.to_ascii_lowercase())
        .collect()
}

impl InstructionDecoder for ExternalDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        let input = hex_input(window);
        let stdout = self
            .runner
            .run(
                &self.program,
                &self.args,
                Some(input.as_bytes()),
                TimeoutConfig::decode(self.timeout_ms),
            )
            .map_err(|e| match e {
                RopCheckError::Timeout { millis } => DecodeError::Timeout { millis },
                other => DecodeError::Backend(other.to_string()),
            })?;
        let text = String::from_utf8_lossy(&stdout);
        let mnemonics = parse_mnemonics(&text);
        // udcli reports undecodable bytes as an "invalid" instruction; the
        // byte offset is unknown here, so report the instruction index
        if let Some(offset) = mnemonics.iter().position(|m| m == "invalid") {
            return Err(DecodeError::Malformed { offset });
        }
        Ok(mnemonics)
    }

    fn name(&self) -> &str {
        "external"
    }
}

/// Build an external decoder for `arch` with its own runner.
///
/// Explicit `config.args` are used as given; otherwise the udcli mode is
/// derived from `arch`, which must be x86 or x86-64.
pub fn from_config(
    config: &ExternalToolConfig,
    arch: Architecture,
    timeout_ms: u64,
) -> Result<ExternalDecoder> {
    let args = match &config.args {
        Some(args) => args.clone(),
        None => udcli_args(arch)?,
    };
    let runner = Arc::new(ToolRunner::new(2)?);
    Ok(ExternalDecoder::new(config.program.clone(), args, timeout_ms, runner))
}
