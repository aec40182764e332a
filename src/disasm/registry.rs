use crate::config::{DecoderBackend, DecoderConfig};
use crate::disasm::cached::CachingDecoder;
use crate::disasm::capstone::CapstoneDecoder;
use crate::disasm::external;
use crate::disasm::iced::IcedDecoder;
use crate::disasm::{Architecture, DecodeError, Endianness, InstructionDecoder};
use crate::error::Result;
use tracing::debug;

/// Select the natural in-process decoder for the given architecture.
pub fn for_arch(arch: Architecture, endianness: Endianness) -> Option<Box<dyn InstructionDecoder>> {
    if arch.is_x86() {
        IcedDecoder::new(arch)
            .ok()
            .map(|d| Box::new(d) as Box<dyn InstructionDecoder>)
    } else {
        CapstoneDecoder::new(arch, endianness)
            .ok()
            .map(|d| Box::new(d) as Box<dyn InstructionDecoder>)
    }
}

/// Explicit in-process backend selector. Errors if the backend cannot handle the arch.
pub fn for_arch_with(
    arch: Architecture,
    endianness: Endianness,
    prefer: DecoderBackend,
) -> Result<Box<dyn InstructionDecoder>> {
    match prefer {
        DecoderBackend::Iced => Ok(Box::new(IcedDecoder::new(arch)?)),
        DecoderBackend::Capstone => Ok(Box::new(CapstoneDecoder::new(arch, endianness)?)),
        DecoderBackend::Auto => {
            for_arch(arch, endianness).ok_or_else(|| DecodeError::UnsupportedArchitecture(arch).into())
        }
        DecoderBackend::External => Ok(Box::new(external::from_config(
            &crate::config::ExternalToolConfig::default(),
            arch,
            crate::timeout::DEFAULT_DECODE_TIMEOUT_MS,
        )?)),
    }
}

/// Build the decoder described by `config`, wrapped in a cache when enabled.
pub fn from_config(arch: Architecture, config: &DecoderConfig) -> Result<Box<dyn InstructionDecoder>> {
    let arch = config.arch.unwrap_or(arch);
    let endianness = arch.default_endianness();
    let base: Box<dyn InstructionDecoder> = match config.backend {
        DecoderBackend::External => {
            let d = external::from_config(&config.external, arch, config.timeout_ms)?;
            debug!(program = %config.external.program, args = ?d.args(), "External decoder command");
            Box::new(d)
        }
        other => for_arch_with(arch, endianness, other)?,
    };
    debug!(%arch, backend = base.name(), cache = config.cache_capacity, "Selected decoder");
    if config.cache_capacity == 0 {
        Ok(base)
    } else {
        Ok(Box::new(CachingDecoder::new(base, config.cache_capacity)))
    }
}
