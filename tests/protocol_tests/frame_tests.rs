//! Frame Codec Tests
//!
//! Tests verify:
//! - Big-endian layout of fixed-width integers
//! - Length-prefixed fields and the `-1` absent-key sentinel
//! - Framing errors for negative, oversized and truncated lengths
//! - Stream entry frames and the terminator

use std::io::Cursor;

use emberkv::protocol::{FrameReader, FrameWriter, ABSENT_KEY};
use emberkv::EmberError;

// =============================================================================
// Helper Functions
// =============================================================================

fn reader(bytes: Vec<u8>) -> FrameReader<Cursor<Vec<u8>>> {
    FrameReader::new(Cursor::new(bytes))
}

fn small_reader(bytes: Vec<u8>, max_len: usize) -> FrameReader<Cursor<Vec<u8>>> {
    FrameReader::with_max_len(Cursor::new(bytes), max_len)
}

fn written(f: impl FnOnce(&mut FrameWriter<Vec<u8>>)) -> Vec<u8> {
    let mut writer = FrameWriter::new(Vec::new());
    f(&mut writer);
    writer.into_inner()
}

fn assert_framing<T: std::fmt::Debug>(result: emberkv::Result<T>) {
    match result {
        Err(EmberError::Framing(_)) => {}
        other => panic!("Expected framing error, got {:?}", other),
    }
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_integers_are_big_endian() {
    let bytes = written(|w| {
        w.write_u16(0x0102).unwrap();
        w.write_i32(0x0A0B0C0D).unwrap();
        w.write_bool(true).unwrap();
    });

    assert_eq!(bytes, vec![0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D, 0x01]);
}

#[test]
fn test_int_prefixed_layout() {
    let bytes = written(|w| w.write_int_prefixed(b"abc").unwrap());
    assert_eq!(bytes, vec![0, 0, 0, 3, b'a', b'b', b'c']);
}

#[test]
fn test_utf_uses_short_length() {
    let bytes = written(|w| w.write_utf("store").unwrap());
    assert_eq!(bytes, vec![0, 5, b's', b't', b'o', b'r', b'e']);
}

#[test]
fn test_stream_end_is_minus_one() {
    let bytes = written(|w| w.write_stream_end().unwrap());
    assert_eq!(bytes, ABSENT_KEY.to_be_bytes().to_vec());
    assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF]);
}

// =============================================================================
// Reading Tests
// =============================================================================

#[test]
fn test_read_back_mixed_fields() {
    let bytes = written(|w| {
        w.write_u8(7).unwrap();
        w.write_utf("users").unwrap();
        w.write_int_prefixed(b"key").unwrap();
        w.write_short_prefixed(b"ver").unwrap();
        w.write_int_list(&[4, 9, 11]).unwrap();
    });

    let mut r = reader(bytes);
    assert_eq!(r.read_u8().unwrap(), 7);
    assert_eq!(r.read_utf("store name").unwrap(), "users");
    assert_eq!(r.read_int_prefixed("key").unwrap(), b"key");
    assert_eq!(r.read_short_prefixed("version").unwrap(), b"ver");
    assert_eq!(r.read_int_list("partitions").unwrap(), vec![4, 9, 11]);
}

#[test]
fn test_empty_byte_array_is_present() {
    let bytes = written(|w| w.write_int_prefixed(b"").unwrap());
    assert_eq!(reader(bytes).read_nullable("key").unwrap(), Some(Vec::new()));
}

#[test]
fn test_nullable_sentinel_is_absent() {
    let bytes = (-1i32).to_be_bytes().to_vec();
    assert_eq!(reader(bytes).read_nullable("key").unwrap(), None);
}

#[test]
fn test_sentinel_rejected_where_key_required() {
    let bytes = (-1i32).to_be_bytes().to_vec();
    assert_framing(reader(bytes).read_int_prefixed("key"));
}

#[test]
fn test_negative_length_rejected() {
    let bytes = (-5i32).to_be_bytes().to_vec();
    assert_framing(reader(bytes).read_nullable("key"));
}

#[test]
fn test_length_over_limit_rejected() {
    let mut bytes = 100i32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 100]);
    assert_framing(small_reader(bytes, 64).read_int_prefixed("value"));
}

#[test]
fn test_short_read_is_framing_error() {
    // Declares 10 bytes, delivers 3
    let mut bytes = 10i32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"abc");
    assert_framing(reader(bytes).read_int_prefixed("value"));
}

#[test]
fn test_truncated_integer_is_framing_error() {
    assert_framing(reader(vec![0x00, 0x01]).read_i32());
}

#[test]
fn test_invalid_utf8_rejected() {
    let bytes = vec![0x00, 0x02, 0xC3, 0x28];
    assert_framing(reader(bytes).read_utf("store name"));
}

#[test]
fn test_negative_list_count_rejected() {
    let bytes = (-2i32).to_be_bytes().to_vec();
    assert_framing(reader(bytes).read_int_list("partitions"));
}

#[test]
fn test_list_count_over_limit_rejected() {
    // 1000 ids would need 4000 bytes
    let bytes = 1000i32.to_be_bytes().to_vec();
    assert_framing(small_reader(bytes, 256).read_int_list("partitions"));
}

#[test]
fn test_request_start_distinguishes_eof() {
    let mut r = reader(vec![0x02]);
    assert_eq!(r.read_request_start().unwrap(), Some(0x02));
    assert_eq!(r.read_request_start().unwrap(), None);
}

// =============================================================================
// Stream Entry Tests
// =============================================================================

#[test]
fn test_stream_entries_until_terminator() {
    let bytes = written(|w| {
        w.write_stream_entry(b"k1", b"v1").unwrap();
        w.write_stream_entry(b"k2", b"").unwrap();
        w.write_stream_end().unwrap();
        w.write_u8(0xAB).unwrap(); // belongs to whatever comes next
    });

    let mut r = reader(bytes);
    assert_eq!(r.read_stream_entry().unwrap(), Some((b"k1".to_vec(), b"v1".to_vec())));
    assert_eq!(r.read_stream_entry().unwrap(), Some((b"k2".to_vec(), Vec::new())));
    assert_eq!(r.read_stream_entry().unwrap(), None);
    assert_eq!(r.read_u8().unwrap(), 0xAB);
}

#[test]
fn test_stream_entry_with_absent_value_rejected() {
    let bytes = written(|w| {
        w.write_int_prefixed(b"key").unwrap();
        w.write_i32(-1).unwrap();
    });
    assert_framing(reader(bytes).read_stream_entry());
}

// =============================================================================
// Writing Limits
// =============================================================================

#[test]
fn test_short_prefixed_too_long_rejected() {
    let mut writer = FrameWriter::new(Vec::new());
    let too_long = vec![0u8; u16::MAX as usize + 1];
    assert_framing(writer.write_short_prefixed(&too_long));
    assert!(writer.into_inner().is_empty());
}

#[test]
fn test_truncated_utf_fits_short_length() {
    let long_message = "x".repeat(70_000);
    let bytes = written(|w| w.write_utf_truncated(&long_message).unwrap());

    let decoded = reader(bytes).read_utf("message").unwrap();
    assert_eq!(decoded.len(), u16::MAX as usize);
}
