//! Perfetto trace file reader utilities.
//!
//! This module provides streaming iteration over the raw `TracePacket`
//! payloads of a Perfetto protobuf trace file (.pb, .pftrace or .gz).
//! Decoding the payloads is left to the caller so that a corrupt packet can
//! be told apart from a truncated or unreadable file.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// `Trace.packet` is field 1.
const TRACE_PACKET_FIELD: u64 = 1;

/// First two bytes of a gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Iterator that streams encoded TracePackets from a trace file.
///
/// Lengths come from the file, so payloads are read through `take` and
/// the buffer only grows as bytes actually arrive.
pub struct PacketBytesIterator<R: BufRead> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> PacketBytesIterator<R> {
    /// Create a new PacketBytesIterator from a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    /// Read the next field tag, or `None` at a clean end of file.
    fn read_tag(&mut self) -> Result<Option<u64>> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        read_varint(&mut self.reader).map(Some)
    }

    fn read_packet(&mut self) -> Result<Vec<u8>> {
        let len = read_varint(&mut self.reader)?;
        self.buffer.clear();
        let read = (&mut self.reader)
            .take(len)
            .read_to_end(&mut self.buffer)?;
        if read as u64 != len {
            bail!("Truncated trace packet: expected {len} bytes, got {read}");
        }
        Ok(self.buffer.clone())
    }

    /// Skip a non-packet field of the given wire type.
    fn skip_field(&mut self, wire_type: u8) -> Result<()> {
        let len = match wire_type {
            0 => {
                read_varint(&mut self.reader)?;
                return Ok(());
            }
            1 => 8,
            2 => read_varint(&mut self.reader)?,
            5 => 4,
            _ => bail!("Unknown wire type: {wire_type}"),
        };
        let skipped = std::io::copy(&mut (&mut self.reader).take(len), &mut std::io::sink())?;
        if skipped != len {
            bail!("Truncated field: expected {len} bytes, got {skipped}");
        }
        Ok(())
    }

    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        while let Some(tag) = self.read_tag()? {
            let wire_type = (tag & 0x07) as u8;
            let field_number = tag >> 3;

            // Field 1 (packet), wire type 2 (length-delimited)
            if field_number == TRACE_PACKET_FIELD && wire_type == 2 {
                return self.read_packet().map(Some);
            }
            self.skip_field(wire_type)?;
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for PacketBytesIterator<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

/// Read a base-128 varint. Fails on end of input or more than ten bytes.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let mut byte = [0u8; 1];
        reader
            .read_exact(&mut byte)
            .context("Unexpected end of trace inside a varint")?;
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    bail!("Varint too large")
}

/// Open a Perfetto trace file, decompressing it if it starts with the
/// gzip magic.
pub fn open_trace_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(256 * 1024, file);

    let gzipped = reader
        .fill_buf()
        .with_context(|| format!("Failed to read {}", path.display()))?
        .starts_with(&GZIP_MAGIC);
    if gzipped {
        tracing::debug!("Reading gzip-compressed trace {}", path.display());
        Ok(Box::new(BufReader::with_capacity(
            256 * 1024,
            GzDecoder::new(reader),
        )))
    } else {
        Ok(Box::new(reader))
    }
}
