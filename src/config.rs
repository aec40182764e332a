//! Configuration for gadget scanning.
//!
//! Provides one nested configuration with sensible defaults. Every value is
//! immutable for the duration of a scan; nothing here is global state. The
//! whole tree can be loaded from JSON, with missing fields taking defaults.

use crate::disasm::cached::DEFAULT_CACHE_CAPACITY;
use crate::disasm::Architecture;
use crate::error::{Result, RopCheckError};
use crate::hashing::DigestAlgorithm;
use crate::timeout::DEFAULT_DECODE_TIMEOUT_MS;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Smallest usable window: the anchor plus at least one preceding byte.
pub const MIN_WINDOW: usize = 2;

/// Master configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RopCheckConfig {
    /// Scanner parameters.
    pub gadgets: GadgetConfig,
    /// Decoder backend selection.
    pub decoder: DecoderConfig,
    /// Per-binary orchestration.
    pub pipeline: PipelineConfig,
}

impl RopCheckConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.gadgets.validate()?;
        Ok(cfg)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

/// Parameters of one scan invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GadgetConfig {
    /// Opcode byte marking a potential gadget end (default: 0xC3, `ret`).
    pub anchor_byte: u8,
    /// Mnemonic a valid gadget must end with (default: "ret"). Stored lowercase.
    #[serde(deserialize_with = "lowercase_mnemonic")]
    pub terminal_mnemonic: String,
    /// Window limit in bytes, anchor included (default: 20).
    pub max_window: usize,
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            anchor_byte: 0xC3,
            terminal_mnemonic: "ret".to_string(),
            max_window: 20,
        }
    }
}

/// Decoders emit lowercase mnemonics; terminals are matched in that form.
pub fn normalize_mnemonic(mnemonic: &str) -> String {
    mnemonic.trim().to_ascii_lowercase()
}

fn lowercase_mnemonic<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|m| normalize_mnemonic(&m))
}

impl GadgetConfig {
    /// Config with the given window size and default anchor/terminal.
    pub fn with_window(max_window: usize) -> Self {
        Self {
            max_window,
            ..Self::default()
        }
    }

    /// Reject configurations a scan cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_window < MIN_WINDOW {
            return Err(RopCheckError::Config(format!(
                "max_window must be at least {}, got {}",
                MIN_WINDOW, self.max_window
            )));
        }
        if self.terminal_mnemonic.trim().is_empty() {
            return Err(RopCheckError::Config(
                "terminal_mnemonic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which decoder implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBackend {
    /// iced-x86 for x86 code, capstone for everything else
    #[default]
    Auto,
    Iced,
    Capstone,
    External,
}

impl FromStr for DecoderBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DecoderBackend::Auto),
            "iced" => Ok(DecoderBackend::Iced),
            "capstone" => Ok(DecoderBackend::Capstone),
            "external" => Ok(DecoderBackend::External),
            other => Err(format!("unknown decoder backend '{}'", other)),
        }
    }
}

/// Command line of an external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalToolConfig {
    pub program: String,
    /// Arguments passed verbatim; `None` derives udcli's mode from the architecture.
    pub args: Option<Vec<String>>,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            program: "udcli".to_string(),
            args: None,
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Backend selection.
    pub backend: DecoderBackend,
    /// Architecture override; detected from the binary when `None`.
    pub arch: Option<Architecture>,
    /// Per-window timeout for the external backend (milliseconds).
    pub timeout_ms: u64,
    /// Memoized windows; 0 disables the cache.
    pub cache_capacity: usize,
    /// External disassembler command.
    pub external: ExternalToolConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            backend: DecoderBackend::Auto,
            arch: None,
            timeout_ms: DEFAULT_DECODE_TIMEOUT_MS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            external: ExternalToolConfig::default(),
        }
    }
}

/// Where section lists and bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionSource {
    /// Parse the binary in-process with the `object` crate
    #[default]
    Object,
    /// Run `readelf -S -W` and `objdump -s`
    Tools,
}

impl FromStr for SectionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "object" => Ok(SectionSource::Object),
            "tools" | "objdump" => Ok(SectionSource::Tools),
            other => Err(format!("unknown section source '{}'", other)),
        }
    }
}

/// Orchestration of a whole-binary scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Include one record per gadget in section reports (default: true).
    pub dump: bool,
    /// Dump only the first occurrence of each distinct gadget content.
    pub unique_only: bool,
    /// Worker threads for section and anchor parallelism; 0 uses all cores.
    pub jobs: usize,
    /// Check anchors of one section concurrently.
    pub parallel_anchors: bool,
    /// Digest used for content deduplication.
    pub digest: DigestAlgorithm,
    /// Optional wall-clock budget per section scan (milliseconds).
    pub section_budget_ms: Option<u64>,
    /// Section provider/extractor implementation.
    pub source: SectionSource,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dump: true,
            unique_only: false,
            jobs: 0,
            parallel_anchors: true,
            digest: DigestAlgorithm::Md5,
            section_budget_ms: None,
            source: SectionSource::Object,
        }
    }
}
