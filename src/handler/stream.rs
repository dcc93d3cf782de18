//! Partition streaming
//!
//! Bulk transfer of every entry in a set of partitions, used when partition
//! ownership moves between nodes.
//!
//! ### Entry Frames
//! ```text
//! ┌────────────┬───────┬──────────────┬─────────┐
//! │ KeyLen (4) │  Key  │ ValueLen (4) │  Value  │   ... repeated
//! └────────────┴───────┴──────────────┴─────────┘
//! ┌────────────┐
//! │    -1      │   end of stream
//! └────────────┘
//! ```

use std::io::{Read, Write};

use crate::error::{EmberError, Result};
use crate::protocol::OpCode;
use crate::store::RegisteredStore;

use super::RequestHandler;

impl<R: Read, W: Write> RequestHandler<R, W> {
    /// Request: `count:i32, count × partition:i32`.
    /// Success: code, entry frames, terminator.
    pub(super) fn handle_get_partitions(&mut self, entry: &RegisteredStore) -> Result<()> {
        let Some(streamable) = entry.streamable() else {
            let error = EmberError::capability_unsupported(entry.name());
            return self.reject(OpCode::GetPartitionsStream, &error);
        };

        let partitions = self.reader.read_int_list("partition list")?;
        let entries = match streamable.entries_for(&partitions) {
            Ok(entries) => entries,
            Err(e) => return self.write_error(&e),
        };

        self.write_success()?;

        // Once the success code is out, a failure can no longer be reported
        // in-band; returning the error closes the connection and drops the
        // iterator.
        let mut sent = 0usize;
        for item in entries {
            let (key, value) = item.inspect_err(|e| {
                tracing::warn!(
                    store = %entry.name(),
                    sent,
                    "Partition iterator failed mid-stream: {}",
                    e
                );
            })?;
            self.writer.write_stream_entry(&key, &value)?;
            sent += 1;
        }
        self.writer.write_stream_end()?;

        tracing::debug!(store = %entry.name(), partitions = ?partitions, sent, "Streamed partitions");
        Ok(())
    }

    /// Request: entry frames up to the terminator. Success: code only.
    ///
    /// Entries are ingested as they arrive. On a store failure the rest of the
    /// stream is read and discarded, then the error is reported; entries
    /// already ingested stay.
    pub(super) fn handle_put_partitions(&mut self, entry: &RegisteredStore) -> Result<()> {
        let Some(streamable) = entry.streamable() else {
            let error = EmberError::capability_unsupported(entry.name());
            return self.reject(OpCode::PutPartitionsStream, &error);
        };

        let mut ingested = 0usize;
        while let Some((key, value)) = self.reader.read_stream_entry()? {
            if let Err(e) = streamable.ingest(&key, &value) {
                let skipped = self.skip_stream()?;
                tracing::warn!(
                    store = %entry.name(),
                    ingested,
                    skipped,
                    "Partition ingest stopped: {}",
                    e
                );
                return self.write_error(&e);
            }
            ingested += 1;
        }

        tracing::debug!(store = %entry.name(), ingested, "Ingested partition stream");
        self.write_success()
    }
}
