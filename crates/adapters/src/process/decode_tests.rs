// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ascii_passes_straight_through() {
    let mut carry = Utf8Carry::default();
    assert_eq!(carry.push(b"hello\n"), "hello\n");
    assert_eq!(carry.finish(), "");
}

#[test]
fn split_multibyte_character_is_reassembled() {
    let bytes = "héllo ✓".as_bytes();
    // Split inside the three-byte check mark
    let split = bytes.len() - 1;
    let mut carry = Utf8Carry::default();
    let first = carry.push(&bytes[..split]);
    let second = carry.push(&bytes[split..]);
    assert_eq!(first, "héllo ");
    assert_eq!(second, "✓");
}

#[test]
fn byte_at_a_time_decodes_emoji() {
    let mut carry = Utf8Carry::default();
    let mut out = String::new();
    for byte in "🦀 ok".as_bytes() {
        out.push_str(&carry.push(&[*byte]));
    }
    out.push_str(&carry.finish());
    assert_eq!(out, "🦀 ok");
}

#[test]
fn invalid_bytes_are_replaced() {
    let mut carry = Utf8Carry::default();
    assert_eq!(carry.push(b"a\xFFb"), "a\u{FFFD}b");
}

#[test]
fn truncated_tail_is_flushed_lossily() {
    let mut carry = Utf8Carry::default();
    assert_eq!(carry.push(&[b'x', 0xE2, 0x9C]), "x");
    assert_eq!(carry.finish(), "\u{FFFD}");
}

#[yare::parameterized(
    empty        = { &[],                    0 },
    ascii        = { b"abc",                 0 },
    complete_two = { &[0xC3, 0xA9],          0 },
    lead_of_two  = { &[b'a', 0xC3],          1 },
    two_of_three = { &[0xE2, 0x9C],          2 },
    three_of_four = { &[0xF0, 0x9F, 0xA6],   3 },
    complete_four = { &[0xF0, 0x9F, 0xA6, 0x80], 0 },
)]
fn tail_detection(bytes: &[u8], expected: usize) {
    assert_eq!(incomplete_tail_len(bytes), expected);
}
