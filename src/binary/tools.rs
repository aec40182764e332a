//! Section provider and extractor driving binutils.
//!
//! `readelf -S -W` lists sections, `objdump -s` hex-dumps one of them. Both
//! outputs are parsed from text, so the parsers are plain values that can be
//! tested on captured output without the tools installed.

use crate::binary::{ByteExtractor, SectionProvider};
use crate::core::{ByteStream, Section};
use crate::error::{Result, RopCheckError};
use crate::process::{find_in_path, ToolRunner};
use crate::timeout::TimeoutConfig;
use bytes::Bytes;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Tools the external-tool route depends on.
pub const PREREQUISITES: [&str; 3] = ["readelf", "objdump", "udcli"];

/// Names from `tools` that cannot be found on `PATH`.
pub fn missing_tools<'a>(tools: &[&'a str]) -> Vec<&'a str> {
    tools
        .iter()
        .copied()
        .filter(|tool| {
            let found = find_in_path(tool);
            if found.is_none() {
                warn!(tool, "Tool not found on PATH");
            }
            found.is_none()
        })
        .collect()
}

/// Missing entries of [`PREREQUISITES`]; empty when all are installed.
pub fn check_prerequisites() -> Vec<&'static str> {
    missing_tools(&PREREQUISITES)
}

/// Parser for the section table printed by `readelf -S -W`.
///
/// ```text
///   [Nr] Name   Type      Address          Off    Size   ES Flg Lk Inf Al
///   [14] .text  PROGBITS  0000000000001060 001060 000185 00  AX  0   0 16
/// ```
pub struct ReadelfParser {
    row: Regex,
}

impl Default for ReadelfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadelfParser {
    pub fn new() -> Self {
        let row = Regex::new(
            r"^\s*\[\s*\d+\]\s+(\S+)\s+\S+\s+([0-9a-fA-F]+)\s+[0-9a-fA-F]+\s+([0-9a-fA-F]+)\s+[0-9a-fA-F]{2}\s+([A-Za-z]*)\s+\d+\s+\d+\s+\d+\s*$",
        )
        .expect("valid readelf row regex");
        Self { row }
    }

    /// Executable sections (flags containing `X`), in table order.
    pub fn parse(&self, output: &str) -> Vec<Section> {
        output
            .lines()
            .filter_map(|line| self.row.captures(line))
            .filter(|caps| caps[4].contains('X'))
            .filter_map(|caps| {
                let start = u64::from_str_radix(&caps[2], 16).ok()?;
                let size = u64::from_str_radix(&caps[3], 16).ok()?;
                Some(Section::new(&caps[1], start, size))
            })
            .collect()
    }
}

/// Parser for the hex dump printed by `objdump -s`.
///
/// Data rows are ` ADDR HHHHHHHH HHHHHHHH HHHHHHHH HHHHHHHH  ascii`; the hex
/// area is a fixed 36 columns, so the ascii column never leaks into bytes.
pub struct ObjdumpParser {
    row: Regex,
}

const HEX_AREA: usize = 36;

impl Default for ObjdumpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjdumpParser {
    pub fn new() -> Self {
        let row = Regex::new(r"^ ([0-9a-fA-F]+) (.*)$").expect("valid objdump row regex");
        Self { row }
    }

    /// Concatenated bytes of every data row.
    pub fn parse(&self, output: &str) -> Result<Vec<u8>> {
        let mut stream = Vec::new();
        for line in output.lines() {
            let Some(caps) = self.row.captures(line) else {
                trace!(line, "Dropping non-data line");
                continue;
            };
            let rest = &caps[2];
            let area = rest.get(..HEX_AREA).unwrap_or(rest);
            for group in area.split_whitespace() {
                let bytes = hex::decode(group).map_err(|e| {
                    RopCheckError::Serialization(format!("bad objdump row '{}': {}", line, e))
                })?;
                stream.extend_from_slice(&bytes);
            }
        }
        Ok(stream)
    }
}

/// [`SectionProvider`] running `readelf -S -W`.
pub struct ReadelfProvider {
    runner: Arc<ToolRunner>,
    parser: ReadelfParser,
    timeout_ms: u64,
}

impl ReadelfProvider {
    pub fn new(runner: Arc<ToolRunner>, timeout_ms: u64) -> Self {
        Self {
            runner,
            parser: ReadelfParser::new(),
            timeout_ms,
        }
    }
}

impl SectionProvider for ReadelfProvider {
    fn list_sections(&self, path: &Path) -> Result<Vec<Section>> {
        let args = vec!["-S".to_string(), "-W".to_string(), path.display().to_string()];
        let stdout = self
            .runner
            .run(
                "readelf",
                &args,
                None,
                TimeoutConfig::new(self.timeout_ms, "readelf"),
            )
            .map_err(|e| RopCheckError::BinaryRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let sections = self.parser.parse(&String::from_utf8_lossy(&stdout));
        debug!(path = %path.display(), count = sections.len(), "readelf listed sections");
        Ok(sections)
    }
}

/// [`ByteExtractor`] running `objdump -s` on one section's address range.
pub struct ObjdumpExtractor {
    runner: Arc<ToolRunner>,
    parser: ObjdumpParser,
    timeout_ms: u64,
}

impl ObjdumpExtractor {
    pub fn new(runner: Arc<ToolRunner>, timeout_ms: u64) -> Self {
        Self {
            runner,
            parser: ObjdumpParser::new(),
            timeout_ms,
        }
    }

    fn args(path: &Path, section: &Section) -> Vec<String> {
        vec![
            "-s".to_string(),
            "-j".to_string(),
            section.name.clone(),
            format!("--start-address=0x{:x}", section.start),
            format!("--stop-address=0x{:x}", section.start.saturating_add(section.size)),
            path.display().to_string(),
        ]
    }
}

impl ByteExtractor for ObjdumpExtractor {
    fn extract_bytes(&self, path: &Path, section: &Section) -> Result<ByteStream> {
        let extraction = |reason: String| RopCheckError::Extraction {
            section: section.name.clone(),
            reason,
        };
        let stdout = self
            .runner
            .run(
                "objdump",
                &Self::args(path, section),
                None,
                TimeoutConfig::new(self.timeout_ms, "objdump"),
            )
            .map_err(|e| extraction(e.to_string()))?;
        let bytes = self
            .parser
            .parse(&String::from_utf8_lossy(&stdout))
            .map_err(|e| extraction(e.to_string()))?;
        trace!(section = %section.name, len = bytes.len(), "objdump extracted bytes");
        Ok(Bytes::from(bytes))
    }
}
