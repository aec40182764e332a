use crate::disasm::{Architecture, DecodeError, DecodeResult, Endianness, InstructionDecoder};
use capstone::{Arch, Capstone, Endian, Mode, NO_EXTRA_MODE};

/// Capstone-backed decoder.
///
/// A capstone handle is not shareable across threads, so a fresh handle is
/// opened per window. Only the arch/mode selection is stored.
pub struct CapstoneDecoder {
    arch: Architecture,
    cs_arch: Arch,
    mode: Mode,
    endian: Option<Endian>,
}

fn cs_endian(end: Endianness) -> Option<Endian> {
    Some(if matches!(end, Endianness::Big) {
        Endian::Big
    } else {
        Endian::Little
    })
}

fn cs_arch_mode(arch: Architecture, end: Endianness) -> Option<(Arch, Mode, Option<Endian>)> {
    match arch {
        Architecture::X86 => Some((Arch::X86, Mode::Mode32, None)),
        Architecture::X86_64 => Some((Arch::X86, Mode::Mode64, None)),
        Architecture::ARM => Some((Arch::ARM, Mode::Arm, cs_endian(end))),
        Architecture::ARM64 => Some((Arch::ARM64, Mode::Arm, cs_endian(end))),
        Architecture::MIPS => Some((Arch::MIPS, Mode::Mips32, cs_endian(end))),
        Architecture::MIPS64 => Some((Arch::MIPS, Mode::Mips64, cs_endian(end))),
        Architecture::PPC => Some((Arch::PPC, Mode::Mode32, cs_endian(end))),
        Architecture::PPC64 => Some((Arch::PPC, Mode::Mode64, cs_endian(end))),
        Architecture::RISCV => Some((Arch::RISCV, Mode::RiscV32, None)),
        Architecture::RISCV64 => Some((Arch::RISCV, Mode::RiscV64, None)),
        Architecture::Unknown => None,
    }
}

impl CapstoneDecoder {
    pub fn new(arch: Architecture, endianness: Endianness) -> DecodeResult<Self> {
        let (cs_arch, mode, endian) = cs_arch_mode(arch, endianness)
            .ok_or(DecodeError::UnsupportedArchitecture(arch))?;
        let decoder = Self {
            arch,
            cs_arch,
            mode,
            endian,
        };
        // Fail at construction rather than on every window
        decoder.open()?;
        Ok(decoder)
    }

    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    fn open(&self) -> DecodeResult<Capstone> {
        Capstone::new_raw(self.cs_arch, self.mode, NO_EXTRA_MODE, self.endian)
            .map_err(|e| DecodeError::Backend(e.to_string()))
    }
}

impl InstructionDecoder for CapstoneDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        let cs = self.open()?;
        let insns = cs
            .disasm_all(window, 0)
            .map_err(|e| DecodeError::Backend(e.to_string()))?;

        // disasm_all stops silently at the first undecodable byte
        let consumed: usize = insns.iter().map(|i| i.bytes().len()).sum();
        if consumed != window.len() {
            return Err(DecodeError::Malformed { offset: consumed });
        }
        Ok(insns
            .iter()
            .map(|i| i.mnemonic().unwrap_or("").to_ascii_lowercase())
            .collect())
    }

    fn name(&self) -> &str {
        "capstone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_x86_64_pop_ret() {
        let d = CapstoneDecoder::new(Architecture::X86_64, Endianness::Little).unwrap();
        assert_eq!(d.decode(&[0x5f, 0xc3]).unwrap(), vec!["pop", "ret"]);
    }

    #[test]
    fn decodes_arm64_ret() {
        // mov x0, #1; ret
        let d = CapstoneDecoder::new(Architecture::ARM64, Endianness::Little).unwrap();
        let m = d
            .decode(&[0x20, 0x00, 0x80, 0xd2, 0xc0, 0x03, 0x5f, 0xd6])
            .unwrap();
        assert_eq!(m.last().map(String::as_str), Some("ret"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn partial_decode_is_malformed() {
        // mov eax, imm32 cut short
        let d = CapstoneDecoder::new(Architecture::X86, Endianness::Little).unwrap();
        assert!(matches!(
            d.decode(&[0xb8, 0x01, 0xc3]),
            Err(DecodeError::Malformed { offset: 0 })
        ));
    }

    #[test]
    fn unknown_architecture_rejected() {
        assert!(matches!(
            CapstoneDecoder::new(Architecture::Unknown, Endianness::Little),
            Err(DecodeError::UnsupportedArchitecture(Architecture::Unknown))
        ));
    }
}
