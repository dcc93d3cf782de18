//! Request Dispatch Tests
//!
//! Tests verify:
//! - Unknown stores are answered in-band and the connection survives
//! - Unknown op codes and framing violations are fatal
//! - Exactly one flush per request, on every path
//! - Requests are answered in order

use std::io::{self, Cursor, Write};
use std::sync::Arc;

use emberkv::handler::DispatchState;
use emberkv::protocol::client::{
    read_delete_response, read_get_response, read_put_response, write_delete_request,
    write_get_partitions_request, write_get_request, write_header, write_put_partitions_request,
    write_put_request,
};
use emberkv::protocol::{FrameReader, FrameWriter, OpCode};
use emberkv::store::{InMemoryStore, Partitioner, StoreRegistry};
use emberkv::versioning::{ClockEntry, VectorClock, Versioned};
use emberkv::{EmberError, RequestHandler, RequestOutcome, Result};

// =============================================================================
// Helper Functions
// =============================================================================

fn registry() -> Arc<StoreRegistry> {
    let store = Arc::new(InMemoryStore::new("users", Partitioner::new(8).unwrap()));
    Arc::new(
        StoreRegistry::builder()
            .register_streamable(store)
            .build()
            .unwrap(),
    )
}

fn encode(f: impl FnOnce(&mut FrameWriter<Vec<u8>>) -> Result<()>) -> Vec<u8> {
    let mut writer = FrameWriter::new(Vec::new());
    f(&mut writer).unwrap();
    writer.into_inner()
}

fn versioned(value: &[u8], version: u64) -> Versioned<Vec<u8>> {
    let clock = VectorClock::from_entries(vec![ClockEntry::new(1, version)], 5).unwrap();
    Versioned::new(value.to_vec(), clock)
}

/// Vec-backed writer that counts flushes
#[derive(Default)]
struct CountingWriter {
    bytes: Vec<u8>,
    flushes: usize,
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

// =============================================================================
// Store Routing Tests
// =============================================================================

#[test]
fn test_unknown_store_keeps_connection_open() {
    let input = encode(|w| {
        write_get_request(w, "nope", b"abc")?;
        write_get_request(w, "users", b"k")
    });

    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());
    assert_eq!(handler.handle_request().unwrap(), RequestOutcome::Completed);
    assert_eq!(handler.handle_request().unwrap(), RequestOutcome::Completed);
    assert_eq!(handler.handle_request().unwrap(), RequestOutcome::Closed);

    let mut reader = FrameReader::new(Cursor::new(handler.into_parts().1));
    assert_eq!(reader.read_u16().unwrap(), 5);
    assert_eq!(reader.read_utf("message").unwrap(), "No store named 'nope'.");
    assert!(read_get_response(&mut reader).unwrap().is_empty());
}

#[test]
fn test_unknown_store_payload_skipped_for_every_op() {
    let value = versioned(b"v", 1);
    let input = encode(|w| {
        write_put_request(w, "nope", b"k", &value)?;
        write_delete_request(w, "nope", b"k", value.version())?;
        write_get_partitions_request(w, "nope", &[0, 1, 2])?;
        write_put_partitions_request(w, "nope", vec![(b"a".to_vec(), value.to_blob())])?;
        write_put_request(w, "users", b"k", &value)?;
        write_get_request(w, "users", b"k")
    });

    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());
    while handler.handle_request().unwrap() == RequestOutcome::Completed {}

    let mut reader = FrameReader::new(Cursor::new(handler.into_parts().1));
    for _ in 0..4 {
        assert!(matches!(
            read_put_response(&mut reader),
            Err(EmberError::StoreNotFound(_))
        ));
    }
    read_put_response(&mut reader).unwrap();
    assert_eq!(read_get_response(&mut reader).unwrap(), vec![value]);

    let cursor = reader.get_ref();
    assert_eq!(cursor.position() as usize, cursor.get_ref().len());
}

#[test]
fn test_unknown_op_code_is_fatal() {
    let input = vec![0x7F, 0x00, 0x05, b'u', b's', b'e', b'r', b's'];
    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());

    assert!(matches!(
        handler.handle_request(),
        Err(EmberError::UnknownOpCode(0x7F))
    ));
    assert!(handler.writer().is_empty());
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_one_flush_per_request() {
    let input = encode(|w| {
        write_put_request(w, "users", b"k", &versioned(b"v", 2))?;
        write_header(w, OpCode::Get, "missing")?;
        write_put_request(w, "users", b"k", &versioned(b"old", 1))?;
        write_delete_request(w, "users", b"k", versioned(b"", 2).version())
    });

    let mut handler = RequestHandler::new(registry(), Cursor::new(input), CountingWriter::default());
    for expected in 1..=4 {
        assert_eq!(handler.handle_request().unwrap(), RequestOutcome::Completed);
        assert_eq!(handler.writer().flushes, expected);
    }
}

#[test]
fn test_fatal_request_still_flushes_once() {
    let input = vec![0x09];
    let mut handler = RequestHandler::new(registry(), Cursor::new(input), CountingWriter::default());

    assert!(handler.handle_request().is_err());
    assert_eq!(handler.writer().flushes, 1);
}

#[test]
fn test_clean_eof_does_not_flush() {
    let mut handler =
        RequestHandler::new(registry(), Cursor::new(Vec::new()), CountingWriter::default());

    assert_eq!(handler.handle_request().unwrap(), RequestOutcome::Closed);
    assert_eq!(handler.writer().flushes, 0);
    assert!(handler.writer().bytes.is_empty());
}

#[test]
fn test_state_after_request() {
    let input = encode(|w| write_get_request(w, "users", b"k"));
    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());

    assert_eq!(handler.state(), DispatchState::AwaitingHeader);
    handler.handle_request().unwrap();
    assert_eq!(handler.state(), DispatchState::ResponseWritten);
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_truncated_header_is_fatal() {
    let input = vec![0x01, 0x00, 0x05, b'u', b's'];
    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());

    assert!(matches!(handler.handle_request(), Err(EmberError::Framing(_))));
}

#[test]
fn test_oversized_key_is_fatal() {
    let input = encode(|w| write_get_request(w, "users", &[0xAB; 1000]));
    let mut handler =
        RequestHandler::with_max_frame_size(registry(), Cursor::new(input), Vec::new(), 64);

    assert!(matches!(handler.handle_request(), Err(EmberError::Framing(_))));
    assert!(handler.writer().is_empty());
}

#[test]
fn test_negative_key_length_is_fatal() {
    let input = encode(|w| {
        write_header(w, OpCode::Delete, "users")?;
        w.write_i32(-5)
    });
    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());

    assert!(matches!(handler.handle_request(), Err(EmberError::Framing(_))));
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_responses_in_request_order() {
    let input = encode(|w| {
        write_get_request(w, "users", b"k")?;
        write_put_request(w, "users", b"k", &versioned(b"first", 1))?;
        write_get_request(w, "users", b"k")?;
        write_put_request(w, "users", b"k", &versioned(b"second", 2))?;
        write_get_request(w, "users", b"k")?;
        write_delete_request(w, "users", b"k", versioned(b"", 2).version())?;
        write_get_request(w, "users", b"k")
    });

    let mut handler = RequestHandler::new(registry(), Cursor::new(input), Vec::new());
    while handler.handle_request().unwrap() == RequestOutcome::Completed {}

    let mut reader = FrameReader::new(Cursor::new(handler.into_parts().1));
    assert!(read_get_response(&mut reader).unwrap().is_empty());
    read_put_response(&mut reader).unwrap();
    assert_eq!(read_get_response(&mut reader).unwrap()[0].value(), b"first");
    read_put_response(&mut reader).unwrap();
    assert_eq!(read_get_response(&mut reader).unwrap()[0].value(), b"second");
    assert!(read_delete_response(&mut reader).unwrap());
    assert!(read_get_response(&mut reader).unwrap().is_empty());
}
