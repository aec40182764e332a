//! In-process section provider and extractor on the `object` crate.
//!
//! Handles ELF, PE/COFF and Mach-O. A section counts as executable when
//! `object` classifies it as text or its format-specific flags carry the
//! execute bit.

use crate::binary::{ByteExtractor, SectionProvider};
use crate::core::{ByteStream, Section};
use crate::disasm::Architecture;
use crate::error::{Result, RopCheckError};
use crate::io::{IOLimits, SafeReader};
use object::{Object, ObjectSection, SectionFlags, SectionKind};
use std::path::Path;
use tracing::{debug, trace};

const SHF_EXECINSTR: u64 = 0x4;
const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;

/// Reads binaries through a bounded memory map and parses them with `object`.
#[derive(Debug, Clone, Default)]
pub struct ObjectLoader {
    limits: IOLimits,
}

impl ObjectLoader {
    pub fn new(limits: IOLimits) -> Self {
        Self { limits }
    }

    fn open(&self, path: &Path) -> Result<SafeReader> {
        SafeReader::open(path, self.limits.clone()).map_err(|e| binary_read(path, e))
    }
}

fn binary_read(path: &Path, reason: impl ToString) -> RopCheckError {
    RopCheckError::BinaryRead {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn is_executable(section: &object::Section<'_, '_>) -> bool {
    if section.kind() == SectionKind::Text {
        return true;
    }
    match section.flags() {
        SectionFlags::Elf { sh_flags } => sh_flags & SHF_EXECINSTR != 0,
        SectionFlags::Coff { characteristics } => characteristics & IMAGE_SCN_MEM_EXECUTE != 0,
        _ => false,
    }
}

impl SectionProvider for ObjectLoader {
    fn list_sections(&self, path: &Path) -> Result<Vec<Section>> {
        let mut reader = self.open(path)?;
        let image = reader.image().map_err(|e| binary_read(path, e))?;
        let file = object::File::parse(image).map_err(|e| binary_read(path, e))?;

        let sections: Vec<Section> = file
            .sections()
            .filter(is_executable)
            .map(|s| {
                let name = s.name().unwrap_or("<unnamed>").to_string();
                trace!(section = %name, address = s.address(), size = s.size(), "Executable section");
                Section::new(name, s.address(), s.size())
            })
            .collect();

        debug!(
            path = %path.display(),
            format = ?file.format(),
            arch = ?file.architecture(),
            count = sections.len(),
            "Listed executable sections"
        );
        Ok(sections)
    }
}

impl ByteExtractor for ObjectLoader {
    fn extract_bytes(&self, path: &Path, section: &Section) -> Result<ByteStream> {
        let extraction = |reason: String| RopCheckError::Extraction {
            section: section.name.clone(),
            reason,
        };
        let mut reader = self.open(path)?;

        // Section names are not unique (e.g. several .text in object files),
        // so match on address and size as well.
        let file_range = {
            let image = reader.image().map_err(|e| binary_read(path, e))?;
            let file = object::File::parse(image).map_err(|e| binary_read(path, e))?;
            let found = file
                .sections()
                .find(|s| {
                    s.name().ok() == Some(section.name.as_str())
                        && s.address() == section.start
                        && s.size() == section.size
                })
                .ok_or_else(|| extraction("section not present in binary".to_string()))?;
            found
                .file_range()
                .ok_or_else(|| extraction("section has no file data".to_string()))?
        };

        let (offset, size) = file_range;
        let bytes = reader
            .read_at(offset, size)
            .map_err(|e| extraction(e.to_string()))?;
        trace!(section = %section.name, offset, len = bytes.len(), "Extracted section bytes");
        Ok(bytes)
    }
}

/// Architecture of the binary at `path`.
pub fn detect_architecture(path: &Path) -> Result<Architecture> {
    let mut reader = SafeReader::open(path, IOLimits::default()).map_err(|e| binary_read(path, e))?;
    let image = reader.image().map_err(|e| binary_read(path, e))?;
    let file = object::File::parse(image).map_err(|e| binary_read(path, e))?;
    Ok(Architecture::from(file.architecture()))
}
