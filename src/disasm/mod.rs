//! Instruction decoders used to validate gadget windows.
//!
//! Backends:
//! - iced-x86 for x86/x64 (default)
//! - capstone for ARM/AArch64, MIPS, PPC, RISC-V (and as an x86 alternative)
//! - an external process (udcli by default), each call bounded by a timeout
//!
//! [`cached::CachingDecoder`] memoizes any backend for recurring windows.

pub mod cached;
pub mod capstone;
pub mod external;
pub mod iced;
pub mod registry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors a decoder may report for one byte window.
///
/// None of these abort a scan; the offending window is simply not a gadget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Bytes at `offset` do not form a valid instruction
    #[error("malformed instruction at window offset {offset}")]
    Malformed { offset: usize },
    /// The window ends in the middle of an instruction starting at `offset`
    #[error("truncated instruction at window offset {offset}")]
    Truncated { offset: usize },
    /// External decoder did not answer in time
    #[error("decoder timed out after {millis}ms")]
    Timeout { millis: u64 },
    /// Backend failure (process error, capstone handle error, ...)
    #[error("decoder backend error: {0}")]
    Backend(String),
    /// The selected backend cannot decode this architecture
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(Architecture),
}

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Decodes a byte window into its ordered, lower-cased instruction mnemonics.
///
/// Operands are dropped. Implementations must be safe to call concurrently
/// and must not carry state from one call into the next.
pub trait InstructionDecoder: Send + Sync {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>>;

    /// Short backend name for logs and reports
    fn name(&self) -> &str;
}

impl<D: InstructionDecoder + ?Sized> InstructionDecoder for &D {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        (**self).decode(window)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<D: InstructionDecoder + ?Sized> InstructionDecoder for Box<D> {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        (**self).decode(window)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<D: InstructionDecoder + ?Sized> InstructionDecoder for Arc<D> {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        (**self).decode(window)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Byte order of the decoded code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Architecture of the code being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// x86 (32-bit)
    X86,
    /// x86-64 (64-bit)
    X86_64,
    /// ARM (32-bit)
    ARM,
    /// ARM64/AArch64 (64-bit)
    ARM64,
    /// MIPS (32-bit)
    MIPS,
    /// MIPS64 (64-bit)
    MIPS64,
    /// PowerPC (32-bit)
    PPC,
    /// PowerPC64 (64-bit)
    PPC64,
    /// RISC-V (32-bit)
    RISCV,
    /// RISC-V (64-bit)
    RISCV64,
    /// Unknown/unsupported architecture
    Unknown,
}

impl Architecture {
    /// Get the address size in bits for this architecture
    pub fn address_bits(&self) -> u32 {
        match self {
            Architecture::X86
            | Architecture::ARM
            | Architecture::MIPS
            | Architecture::PPC
            | Architecture::RISCV => 32,
            Architecture::X86_64
            | Architecture::ARM64
            | Architecture::MIPS64
            | Architecture::PPC64
            | Architecture::RISCV64
            | Architecture::Unknown => 64,
        }
    }

    /// True for the x86 family handled by iced-x86
    pub fn is_x86(&self) -> bool {
        matches!(self, Architecture::X86 | Architecture::X86_64)
    }

    /// Usual byte order for code on this architecture
    pub fn default_endianness(&self) -> Endianness {
        match self {
            Architecture::PPC | Architecture::PPC64 => Endianness::Big,
            _ => Endianness::Little,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86 => write!(f, "x86"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::ARM => write!(f, "arm"),
            Architecture::ARM64 => write!(f, "arm64"),
            Architecture::MIPS => write!(f, "mips"),
            Architecture::MIPS64 => write!(f, "mips64"),
            Architecture::PPC => write!(f, "ppc"),
            Architecture::PPC64 => write!(f, "ppc64"),
            Architecture::RISCV => write!(f, "riscv"),
            Architecture::RISCV64 => write!(f, "riscv64"),
            Architecture::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "i686" => Ok(Architecture::X86),
            "x86_64" | "x86-64" | "amd64" | "x64" => Ok(Architecture::X86_64),
            "arm" => Ok(Architecture::ARM),
            "arm64" | "aarch64" => Ok(Architecture::ARM64),
            "mips" => Ok(Architecture::MIPS),
            "mips64" => Ok(Architecture::MIPS64),
            "ppc" | "powerpc" => Ok(Architecture::PPC),
            "ppc64" | "powerpc64" => Ok(Architecture::PPC64),
            "riscv" | "riscv32" => Ok(Architecture::RISCV),
            "riscv64" => Ok(Architecture::RISCV64),
            other => Err(format!("unknown architecture '{}'", other)),
        }
    }
}

impl From<object::Architecture> for Architecture {
    fn from(a: object::Architecture) -> Self {
        match a {
            object::Architecture::I386 => Architecture::X86,
            object::Architecture::X86_64 => Architecture::X86_64,
            object::Architecture::Arm => Architecture::ARM,
            object::Architecture::Aarch64 => Architecture::ARM64,
            object::Architecture::Mips => Architecture::MIPS,
            object::Architecture::Mips64 => Architecture::MIPS64,
            object::Architecture::PowerPc => Architecture::PPC,
            object::Architecture::PowerPc64 => Architecture::PPC64,
            object::Architecture::Riscv32 => Architecture::RISCV,
            object::Architecture::Riscv64 => Architecture::RISCV64,
            _ => Architecture::Unknown,
        }
    }
}
