//! Integration tests for the pattern matcher and adaptive idle threshold.

use std::time::Duration;

use tcpio_core::idle::IdleSamples;
use tcpio_core::pattern::{contains, normalize_expect_hex};

#[test]
fn contains_finds_short_and_long_patterns() {
    let haystack = b"STX\x02PRINTER-READY\x03ETX";
    assert!(contains(haystack, b"\x03"));
    assert!(contains(haystack, b"PRINTER-READY"));
    assert!(!contains(haystack, b"NOT-PRESENT"));
}

#[test]
fn idle_threshold_adapts_to_observed_gaps() {
    let mut samples = IdleSamples::new();
    assert_eq!(samples.threshold(), Duration::from_millis(50));

    for _ in 0..5 {
        samples.push(Duration::from_millis(40));
    }
    let threshold = samples.threshold();
    assert!(threshold >= Duration::from_millis(50));
    assert!(threshold <= Duration::from_millis(200));
}

#[test]
fn normalize_expect_hex_accepts_0x_prefix_and_whitespace() {
    assert_eq!(normalize_expect_hex("0x0D0A").unwrap(), vec![0x0D, 0x0A]);
    assert_eq!(normalize_expect_hex("0d 0a").unwrap(), vec![0x0D, 0x0A]);
    assert!(normalize_expect_hex("").is_err());
    assert!(normalize_expect_hex("0").is_err());
}
