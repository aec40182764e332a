//! Shared helpers for writing binaries to temporary files.

use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};
use std::io::Write;
use tempfile::NamedTempFile;

/// Creates a temporary file with the given content.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Relocatable x86-64 ELF with one section per `(name, kind, bytes)`.
pub fn elf_with_sections(sections: &[(&str, SectionKind, &[u8])]) -> NamedTempFile {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    for (name, kind, bytes) in sections {
        let id = obj.add_section(Vec::new(), name.as_bytes().to_vec(), *kind);
        obj.append_section_data(id, bytes, 1);
    }
    let image = obj.write().expect("write ELF image");
    create_temp_file(&image)
}

/// ELF whose only executable section is `.text` holding `text`.
pub fn elf_with_text(text: &[u8]) -> NamedTempFile {
    elf_with_sections(&[
        (".text", SectionKind::Text, text),
        (".rodata", SectionKind::ReadOnlyData, &[0xc3, 0xc3, 0xc3, 0xc3]),
    ])
}
