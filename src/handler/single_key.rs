//! GET, PUT and DELETE
//!
//! Each handler makes one store call and writes one response. Store failures
//! become error frames; only stream-level problems are returned as errors.

use std::io::{Read, Write};

use crate::error::{EmberError, Result};
use crate::store::Store;
use crate::versioning::{VectorClock, Versioned};

use super::RequestHandler;

impl<R: Read, W: Write> RequestHandler<R, W> {
    /// Success: `count:i32`, then `count × (blobLen:i32, clock || value)`
    pub(super) fn handle_get(&mut self, store: &dyn Store, key: &[u8]) -> Result<()> {
        let results = match store.get(key) {
            Ok(results) => results,
            Err(e) => return self.write_error(&e),
        };

        let count = i32::try_from(results.len())
            .map_err(|_| EmberError::Framing(format!("{} versions in one response", results.len())))?;

        self.write_success()?;
        self.writer.write_i32(count)?;
        for versioned in &results {
            self.writer.write_int_prefixed(&versioned.to_blob())?;
        }
        Ok(())
    }

    /// Payload: `blobLen:i32, clock || value`. Success writes only the code.
    pub(super) fn handle_put(&mut self, store: &dyn Store, key: &[u8]) -> Result<()> {
        // The whole blob is consumed first, so a bad clock leaves the stream aligned
        let blob = self.reader.read_int_prefixed("put payload")?;
        let versioned = match Versioned::from_blob(&blob) {
            Ok(versioned) => versioned,
            Err(e) => return self.write_error(&e),
        };

        match store.put(key, versioned) {
            Ok(()) => self.write_success(),
            Err(e) => self.write_error(&e),
        }
    }

    /// Payload: `versionLen:u16, clock`. Success: code, then `succeeded:u8`.
    pub(super) fn handle_delete(&mut self, store: &dyn Store, key: &[u8]) -> Result<()> {
        let version_bytes = self.reader.read_short_prefixed("version")?;
        let version = match decode_exact_clock(&version_bytes) {
            Ok(version) => version,
            Err(e) => return self.write_error(&e),
        };

        match store.delete(key, &version) {
            Ok(succeeded) => {
                self.write_success()?;
                self.writer.write_bool(succeeded)
            }
            Err(e) => self.write_error(&e),
        }
    }
}

/// The version field holds a clock and nothing else
fn decode_exact_clock(bytes: &[u8]) -> Result<VectorClock> {
    let (clock, consumed) = VectorClock::from_bytes(bytes)?;
    if consumed != bytes.len() {
        return Err(EmberError::MalformedVersion(format!(
            "{} trailing bytes after version",
            bytes.len() - consumed
        )));
    }
    Ok(clock)
}
