//! Client side of the wire protocol
//!
//! Request writers and response readers for every op code, plus a blocking
//! [`StoreClient`] over TCP. Error responses are turned back into typed
//! errors with [`ErrorCodeMapper::error_for`].

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{EmberError, Result};
use crate::versioning::{VectorClock, Versioned};

use super::{ErrorCodeMapper, FrameReader, FrameWriter, OpCode, SUCCESS};

// =============================================================================
// Request Encoding
// =============================================================================

/// `opCode:u8, storeNameLen:u16, storeName`
pub fn write_header<W: Write>(w: &mut FrameWriter<W>, op: OpCode, store: &str) -> Result<()> {
    w.write_u8(op.as_u8())?;
    w.write_utf(store)
}

pub fn write_get_request<W: Write>(w: &mut FrameWriter<W>, store: &str, key: &[u8]) -> Result<()> {
    write_header(w, OpCode::Get, store)?;
    w.write_int_prefixed(key)
}

pub fn write_put_request<W: Write>(
    w: &mut FrameWriter<W>,
    store: &str,
    key: &[u8],
    value: &Versioned<Vec<u8>>,
) -> Result<()> {
    write_header(w, OpCode::Put, store)?;
    w.write_int_prefixed(key)?;
    w.write_int_prefixed(&value.to_blob())
}

pub fn write_delete_request<W: Write>(
    w: &mut FrameWriter<W>,
    store: &str,
    key: &[u8],
    version: &VectorClock,
) -> Result<()> {
    write_header(w, OpCode::Delete, store)?;
    w.write_int_prefixed(key)?;
    w.write_short_prefixed(&version.to_bytes())
}

pub fn write_get_partitions_request<W: Write>(
    w: &mut FrameWriter<W>,
    store: &str,
    partitions: &[i32],
) -> Result<()> {
    write_header(w, OpCode::GetPartitionsStream, store)?;
    w.write_int_list(partitions)
}

/// Header, every entry, then the end-of-stream marker
pub fn write_put_partitions_request<W, I>(
    w: &mut FrameWriter<W>,
    store: &str,
    entries: I,
) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
{
    write_header(w, OpCode::PutPartitionsStream, store)?;
    for (key, value) in entries {
        w.write_stream_entry(&key, &value)?;
    }
    w.write_stream_end()
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Read the 2-byte response code; a non-zero code is returned as the error
/// it stands for, carrying the server's message
pub fn read_status<R: Read>(r: &mut FrameReader<R>) -> Result<()> {
    let code = r.read_u16()?;
    if code == SUCCESS {
        return Ok(());
    }
    let message = r.read_utf("error message")?;
    Err(ErrorCodeMapper::new().error_for(code, message))
}

pub fn read_get_response<R: Read>(r: &mut FrameReader<R>) -> Result<Vec<Versioned<Vec<u8>>>> {
    read_status(r)?;
    let count = r.read_i32()?;
    if count < 0 {
        return Err(EmberError::Framing(format!("negative result count {}", count)));
    }

    let mut results = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        let blob = r.read_int_prefixed("versioned value")?;
        results.push(Versioned::from_blob(&blob)?);
    }
    Ok(results)
}

pub fn read_put_response<R: Read>(r: &mut FrameReader<R>) -> Result<()> {
    read_status(r)
}

pub fn read_delete_response<R: Read>(r: &mut FrameReader<R>) -> Result<bool> {
    read_status(r)?;
    r.read_bool()
}

/// Read the status and every streamed entry up to the terminator
pub fn read_get_partitions_response<R: Read>(
    r: &mut FrameReader<R>,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    read_status(r)?;
    let mut entries = Vec::new();
    while let Some(entry) = r.read_stream_entry()? {
        entries.push(entry);
    }
    Ok(entries)
}

pub fn read_put_partitions_response<R: Read>(r: &mut FrameReader<R>) -> Result<()> {
    read_status(r)
}

// =============================================================================
// Blocking TCP Client
// =============================================================================

/// A blocking connection to a storage node
pub struct StoreClient {
    reader: FrameReader<BufReader<TcpStream>>,
    writer: FrameWriter<BufWriter<TcpStream>>,
}

impl StoreClient {
    /// Connect to a node
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: FrameReader::new(BufReader::new(read_stream)),
            writer: FrameWriter::new(BufWriter::new(stream)),
        })
    }

    /// All live versions of `key`
    pub fn get(&mut self, store: &str, key: &[u8]) -> Result<Vec<Versioned<Vec<u8>>>> {
        write_get_request(&mut self.writer, store, key)?;
        self.writer.flush()?;
        read_get_response(&mut self.reader)
    }

    pub fn put(&mut self, store: &str, key: &[u8], value: &Versioned<Vec<u8>>) -> Result<()> {
        write_put_request(&mut self.writer, store, key, value)?;
        self.writer.flush()?;
        read_put_response(&mut self.reader)
    }

    /// Returns whether a matching version existed
    pub fn delete(&mut self, store: &str, key: &[u8], version: &VectorClock) -> Result<bool> {
        write_delete_request(&mut self.writer, store, key, version)?;
        self.writer.flush()?;
        read_delete_response(&mut self.reader)
    }

    /// Fetch every entry in `partitions`
    pub fn fetch_partitions(
        &mut self,
        store: &str,
        partitions: &[i32],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        write_get_partitions_request(&mut self.writer, store, partitions)?;
        self.writer.flush()?;
        read_get_partitions_response(&mut self.reader)
    }

    /// Push entries fetched from another node
    pub fn push_partitions<I>(&mut self, store: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        write_put_partitions_request(&mut self.writer, store, entries)?;
        self.writer.flush()?;
        read_put_partitions_response(&mut self.reader)
    }
}
