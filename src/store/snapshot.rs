//! Store snapshots
//!
//! Point-in-time dump of an [`InMemoryStore`] so a node can restart with
//! its data.
//!
//! ## File Format
//! ```text
//! ┌───────────┬─────────┬──────────┬──────────────────────────┐
//! │ Magic (4) │ CRC (4) │ Len (8)  │ bincode(key → versions)  │
//! └───────────┴─────────┴──────────┴──────────────────────────┘
//! ```
//! The CRC covers the payload. The file is written next to its final path
//! and renamed into place.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{EmberError, Result};

use super::memory::VersionMap;
use super::{InMemoryStore, Partitioner, Store};

const MAGIC: &[u8; 4] = b"EMBS";
const HEADER_SIZE: usize = 16;

impl InMemoryStore {
    /// Write every key and version to `path`
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let payload = {
            let data = self.data.read();
            bincode::serialize(&*data)
                .map_err(|e| EmberError::Snapshot(format!("Failed to encode snapshot: {}", e)))?
        };
        let crc = crc32fast::hash(&payload);

        let tmp_path = path.with_extension("snapshot.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            writer.write_all(MAGIC)?;
            writer.write_all(&crc.to_le_bytes())?;
            writer.write_all(&(payload.len() as u64).to_le_bytes())?;
            writer.write_all(&payload)?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| EmberError::Snapshot(format!("Failed to flush snapshot: {}", e)))?
                .sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        tracing::info!(
            store = %self.name(),
            keys = self.key_count(),
            bytes = payload.len(),
            "Saved snapshot to {}",
            path.display()
        );
        Ok(())
    }

    /// Rebuild a store from a file written by [`InMemoryStore::save_snapshot`]
    pub fn load_snapshot(
        name: impl Into<String>,
        partitioner: Partitioner,
        path: &Path,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_SIZE || &bytes[0..4] != MAGIC {
            return Err(EmberError::Snapshot(format!(
                "{} is not a snapshot file",
                path.display()
            )));
        }

        let expected_crc = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[8..16]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != len {
            return Err(EmberError::Snapshot(format!(
                "truncated snapshot: expected {} payload bytes, found {}",
                len,
                payload.len()
            )));
        }

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(EmberError::Snapshot(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        let data: VersionMap = bincode::deserialize(payload)
            .map_err(|e| EmberError::Snapshot(format!("Failed to decode snapshot: {}", e)))?;

        Ok(Self::with_data(name, partitioner, data))
    }
}
