use crate::common::{BytewiseDecoder, TableDecoder};
use ropcheck::config::GadgetConfig;
use ropcheck::gadgets::{
    first_occurrences, scan, summarize, unique_contents, unique_contents_with, unique_positions,
};
use ropcheck::hashing::DigestAlgorithm;

#[test]
fn worked_example_counts() {
    let stream = [0x01, 0x02, 0xc3, 0x03, 0xc3];
    let set = scan(&stream, &GadgetConfig::default(), &TableDecoder::worked_example()).unwrap();
    assert_eq!(unique_contents(&stream, &set).len(), 3);
    assert_eq!(unique_positions(&set).into_iter().collect::<Vec<_>>(), vec![2, 4]);
}

#[test]
fn repeated_gadget_counts_once() {
    // "5f c3" three times, separated by nops
    let stream = [0x5f, 0xc3, 0x90, 0x5f, 0xc3, 0x90, 0x5f, 0xc3];
    let decoder = TableDecoder::new().with(&[0x5f, 0xc3], &["pop", "ret"]);
    let set = scan(&stream, &GadgetConfig::default(), &decoder).unwrap();
    assert_eq!(set.len(), 3);
    let summary = summarize(&stream, &set, DigestAlgorithm::Md5);
    assert_eq!(summary.unique_contents, 1);
    assert_eq!(summary.unique_positions, 3);
    assert_eq!(first_occurrences(&stream, &set).len(), 1);
}

#[test]
fn unique_counts_never_exceed_total() {
    let stream: Vec<u8> = (0u8..=255).chain(0u8..=255).collect();
    let set = scan(&stream, &GadgetConfig::default(), &BytewiseDecoder { anchor: 0xc3 }).unwrap();
    for algo in [DigestAlgorithm::Md5, DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
        let s = summarize(&stream, &set, algo);
        assert!(s.unique_contents <= s.total);
        assert!(s.unique_positions <= s.total);
        assert_eq!(unique_contents_with(&stream, &set, algo).len(), s.unique_contents);
    }
}
