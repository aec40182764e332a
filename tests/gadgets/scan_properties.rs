use crate::common::{BytewiseDecoder, FailingDecoder, SlowDecoder, TableDecoder};
use ropcheck::config::GadgetConfig;
use ropcheck::core::GadgetSet;
use ropcheck::error::RopCheckError;
use ropcheck::gadgets::{scan, scan_with, ScanControl};

const EXAMPLE: [u8; 5] = [0x01, 0x02, 0xc3, 0x03, 0xc3];

fn pairs(set: &GadgetSet) -> Vec<(usize, usize)> {
    set.iter().map(|c| (c.end_offset, c.length)).collect()
}

/// Pseudo-random bytes with a high density of 0xc3.
fn noisy_stream(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if state % 5 == 0 {
                0xc3
            } else {
                (state >> 8) as u8
            }
        })
        .collect()
}

#[test]
fn worked_example_with_default_window() {
    let set = scan(&EXAMPLE, &GadgetConfig::default(), &TableDecoder::worked_example()).unwrap();
    assert_eq!(pairs(&set), vec![(2, 1), (2, 2), (4, 1)]);
}

#[test]
fn candidates_respect_stream_and_window_bounds() {
    let stream = noisy_stream(2048);
    for max_window in [2, 3, 7, 20] {
        let cfg = GadgetConfig::with_window(max_window);
        let set = scan(&stream, &cfg, &BytewiseDecoder { anchor: 0xc3 }).unwrap();
        for c in &set {
            assert_eq!(stream[c.end_offset], 0xc3);
            assert!(c.length >= 1);
            assert!(c.length < max_window.min(c.end_offset + 1));
            assert!(c.window(&stream).is_some());
        }
    }
}

#[test]
fn window_of_two_only_yields_single_byte_lookback() {
    let stream = noisy_stream(512);
    let set = scan(&stream, &GadgetConfig::with_window(2), &BytewiseDecoder { anchor: 0xc3 }).unwrap();
    assert!(!set.is_empty());
    assert!(set.iter().all(|c| c.length == 1));
}

#[test]
fn output_is_canonically_ordered() {
    let stream = noisy_stream(4096);
    let set = scan(&stream, &GadgetConfig::default(), &BytewiseDecoder { anchor: 0xc3 }).unwrap();
    assert!(set
        .as_slice()
        .windows(2)
        .all(|w| (w[0].end_offset, w[0].length) < (w[1].end_offset, w[1].length)));
}

#[test]
fn rescans_are_identical() {
    let stream = noisy_stream(1024);
    let cfg = GadgetConfig::default();
    let decoder = BytewiseDecoder { anchor: 0xc3 };
    let a = scan_with(&stream, &cfg, &decoder, &ScanControl::parallel()).unwrap();
    let b = scan_with(&stream, &cfg, &decoder, &ScanControl::sequential()).unwrap();
    assert_eq!(a.gadgets, b.gadgets);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn earlier_anchor_inside_window_disqualifies() {
    // bytewise decoding: a window is valid iff its only c3 is the last byte
    let stream = [0x90, 0xc3, 0x90, 0x90, 0xc3];
    let set = scan(&stream, &GadgetConfig::default(), &BytewiseDecoder { anchor: 0xc3 }).unwrap();
    assert_eq!(pairs(&set), vec![(1, 1), (4, 1), (4, 2)]);
}

#[test]
fn failing_decoder_yields_empty_set() {
    let out = scan_with(
        &EXAMPLE,
        &GadgetConfig::default(),
        &FailingDecoder,
        &ScanControl::sequential(),
    )
    .unwrap();
    assert!(out.gadgets.is_empty());
    assert_eq!(out.stats.decode_failures, out.stats.decode_calls);
}

#[test]
fn timed_out_windows_are_skipped_and_counted() {
    // two-byte windows decode, three-byte windows time out
    let decoder = SlowDecoder { anchor: 0xc3, max_len: 2 };
    let out = scan_with(
        &EXAMPLE,
        &GadgetConfig::with_window(3),
        &decoder,
        &ScanControl::sequential(),
    )
    .unwrap();
    assert_eq!(pairs(&out.gadgets), vec![(2, 1), (4, 1)]);
    assert_eq!(out.stats.decode_calls, 4);
    assert_eq!(out.stats.decode_failures, 2);
    assert_eq!(out.stats.decode_timeouts, 2);
}

#[test]
fn stream_without_anchor_is_empty() {
    let set = scan(&[0x90; 64], &GadgetConfig::default(), &TableDecoder::new()).unwrap();
    assert!(set.is_empty());
}

#[test]
fn invalid_window_rejected_before_scanning() {
    let err = scan(&EXAMPLE, &GadgetConfig::with_window(1), &FailingDecoder).unwrap_err();
    assert!(matches!(err, RopCheckError::Config(_)));
}
