use crate::disasm::{Architecture, DecodeError, DecodeResult, InstructionDecoder};
use iced_x86::{Decoder, DecoderError, DecoderOptions, Instruction};

/// In-process x86/x64 decoder on iced-x86.
pub struct IcedDecoder {
    bits: u32,
}

impl IcedDecoder {
    pub fn new(arch: Architecture) -> DecodeResult<Self> {
        let bits = match arch {
            Architecture::X86 => 32,
            Architecture::X86_64 => 64,
            other => return Err(DecodeError::UnsupportedArchitecture(other)),
        };
        Ok(Self { bits })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl InstructionDecoder for IcedDecoder {
    fn decode(&self, window: &[u8]) -> DecodeResult<Vec<String>> {
        let mut decoder = Decoder::with_ip(self.bits, window, 0, DecoderOptions::NONE);
        let mut instr = Instruction::default();
        let mut mnemonics = Vec::new();

        while decoder.can_decode() {
            let offset = decoder.position();
            decoder.decode_out(&mut instr);
            if instr.is_invalid() {
                return Err(match decoder.last_error() {
                    DecoderError::NoMoreBytes => DecodeError::Truncated { offset },
                    _ => DecodeError::Malformed { offset },
                });
            }
            // Mnemonic's Debug form is the bare name ("Ret", "Pop", ...)
            mnemonics.push(format!("{:?}", instr.mnemonic()).to_ascii_lowercase());
        }
        Ok(mnemonics)
    }

    fn name(&self) -> &str {
        "iced-x86"
    }
}
