use crate::common::test_utils::{create_temp_file, elf_with_sections, elf_with_text};
use crate::common::TableDecoder;
use object::SectionKind;
use ropcheck::binary::{ByteExtractor, ObjectLoader, SectionProvider};
use ropcheck::config::RopCheckConfig;
use ropcheck::core::{ByteStream, Section};
use ropcheck::disasm::Architecture;
use ropcheck::error::{Result, RopCheckError};
use ropcheck::pipeline::{scan_binary, GadgetPipeline};
use ropcheck::report::SectionStatus;
use std::path::Path;

// xor rax, rax; ret; pop rdi; ret
const TEXT: [u8; 6] = [0x48, 0x31, 0xc0, 0xc3, 0x5f, 0xc3];

/// Extractor that loses the last byte of every section.
struct Truncating(ObjectLoader);

impl ByteExtractor for Truncating {
    fn extract_bytes(&self, path: &Path, section: &Section) -> Result<ByteStream> {
        let bytes = self.0.extract_bytes(path, section)?;
        Ok(bytes.slice(..bytes.len().saturating_sub(1)))
    }
}

fn pairs(report: &ropcheck::report::SectionReport, start: u64) -> Vec<(u64, usize)> {
    report
        .gadgets
        .iter()
        .map(|g| (g.address - start + g.length as u64, g.length))
        .collect()
}

#[test]
fn iced_scan_of_written_elf() {
    let file = elf_with_text(&TEXT);
    let report = scan_binary(file.path(), &RopCheckConfig::default()).unwrap();

    assert_eq!(report.arch, Architecture::X86_64);
    assert_eq!(report.sections.len(), 1);
    let text = &report.sections[0];
    assert_eq!(text.section.name, ".text");
    assert!(text.status.is_scanned());

    let found = pairs(text, text.section.start);
    for expected in [(3, 2), (3, 3), (5, 1)] {
        assert!(found.contains(&expected), "missing {:?} in {:?}", expected, found);
    }
    // ret; pop rdi; ret has an earlier ret
    assert!(!found.contains(&(5, 2)));
    assert_eq!(report.totals.candidates, text.summary.total);
    assert!(!report.has_size_mismatch());
}

#[test]
fn every_executable_section_is_scanned() {
    let file = elf_with_sections(&[
        (".init", SectionKind::Text, &[0x5f, 0xc3]),
        (".data", SectionKind::Data, &[0x5f, 0xc3]),
        (".text", SectionKind::Text, &[0x90, 0x5f, 0xc3]),
    ]);
    let report = scan_binary(file.path(), &RopCheckConfig::default()).unwrap();
    let names: Vec<&str> = report.sections.iter().map(|s| s.section.name.as_str()).collect();
    assert_eq!(names, vec![".init", ".text"]);
    // "5f c3" occurs in both sections; counts are per-section sums
    assert_eq!(
        report.totals.unique_contents,
        report.sections.iter().map(|s| s.summary.unique_contents).sum::<usize>()
    );
}

#[test]
fn truncated_extraction_is_reported_and_skipped() {
    let file = elf_with_text(&TEXT);
    let config = RopCheckConfig::default();
    let pipeline = GadgetPipeline::new(
        Box::new(ObjectLoader::default()),
        Box::new(Truncating(ObjectLoader::default())),
        Box::new(TableDecoder::new().with(&[0x5f, 0xc3], &["pop", "ret"])),
        Architecture::X86_64,
        &config,
    )
    .unwrap();
    let report = pipeline.run(file.path()).unwrap();
    assert_eq!(
        report.sections[0].status,
        SectionStatus::SizeMismatch {
            expected: 6,
            found: 5
        }
    );
    assert!(report.has_size_mismatch());
    assert_eq!(report.totals.candidates, 0);
}

#[test]
fn unique_dump_lists_each_content_once() {
    let text = [0x5f, 0xc3, 0x5f, 0xc3, 0x5f, 0xc3];
    let file = elf_with_text(&text);
    let mut config = RopCheckConfig::default();
    config.pipeline.unique_only = true;
    let pipeline = GadgetPipeline::new(
        Box::new(ObjectLoader::default()),
        Box::new(ObjectLoader::default()),
        Box::new(TableDecoder::new().with(&[0x5f, 0xc3], &["pop", "ret"])),
        Architecture::X86_64,
        &config,
    )
    .unwrap();
    let report = pipeline.run(file.path()).unwrap();
    let section = &report.sections[0];
    assert_eq!(section.summary.total, 3);
    assert_eq!(section.gadgets.len(), 1);
    assert_eq!(section.gadgets[0].bytes, vec![0x5f, 0xc3]);
}

#[test]
fn unreadable_binary_fails_the_run() {
    let file = create_temp_file(b"#!/bin/sh\necho not an executable\n");
    let provider = ObjectLoader::default();
    assert!(matches!(
        provider.list_sections(file.path()),
        Err(RopCheckError::BinaryRead { .. })
    ));
    assert!(scan_binary(file.path(), &RopCheckConfig::default()).is_err());
}

#[test]
fn json_report_round_trips_counts() {
    let file = elf_with_text(&TEXT);
    let report = scan_binary(file.path(), &RopCheckConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["arch"], "x86_64");
    assert_eq!(
        json["totals"]["candidates"].as_u64(),
        Some(report.totals.candidates as u64)
    );
    assert_eq!(json["sections"][0]["status"]["kind"], "scanned");
}
