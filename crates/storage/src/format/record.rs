//! Datafile record format.
//!
//! ```text
//! +--------+---------+-----------+-------+-----+-------+
//! | crc32  | key_len | value_len | flags | key | value |
//! | u32 LE | u32 LE  | u32 LE    | u8    |     |       |
//! +--------+---------+-----------+-------+-----+-------+
//! ```
//!
//! The CRC covers every byte after the CRC field. Flag bit 0 marks a
//! tombstone; tombstones carry an empty value.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read};
use thiserror::Error;

/// Size of the fixed record header.
pub const RECORD_HEADER_SIZE: usize = 13;

const FLAG_TOMBSTONE: u8 = 0b0000_0001;

/// Framing errors while decoding a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The input ended inside a record.
    #[error("incomplete record")]
    Incomplete,

    /// Stored and computed checksums differ.
    #[error("checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// CRC stored in the header
        expected: u32,
        /// CRC computed over the payload
        actual: u32,
    },

    /// Reserved flag bits are set.
    #[error("unknown flags {0:#x}")]
    UnknownFlags(u8),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A single put or tombstone as stored in a datafile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Key bytes
    pub key: Vec<u8>,
    /// Value bytes (empty for tombstones)
    pub value: Vec<u8>,
    /// Whether this record deletes `key`
    pub tombstone: bool,
}

impl Record {
    /// Creates a PUT record.
    pub fn put(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            value: value.to_vec(),
            tombstone: false,
        }
    }

    /// Creates a DELETE record.
    pub fn tombstone(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            value: Vec::new(),
            tombstone: true,
        }
    }

    /// Bytes this record occupies on disk.
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Encodes the record with its checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&[0u8; 4]);
        // Writes into a Vec cannot fail.
        let _ = buf.write_u32::<LittleEndian>(self.key.len() as u32);
        let _ = buf.write_u32::<LittleEndian>(self.value.len() as u32);
        let flags = if self.tombstone { FLAG_TOMBSTONE } else { 0 };
        buf.push(flags);
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32fast::hash(&buf[4..]);
        LittleEndian::write_u32(&mut buf[..4], crc);
        buf
    }

    /// Decodes one record from the front of `data`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), RecordError> {
        if data.len() < RECORD_HEADER_SIZE {
            return Err(RecordError::Incomplete);
        }
        let stored_crc = LittleEndian::read_u32(&data[0..4]);
        let key_len = LittleEndian::read_u32(&data[4..8]) as usize;
        let value_len = LittleEndian::read_u32(&data[8..12]) as usize;
        let flags = data[12];

        let total = RECORD_HEADER_SIZE + key_len + value_len;
        if data.len() < total {
            return Err(RecordError::Incomplete);
        }

        let actual = crc32fast::hash(&data[4..total]);
        if actual != stored_crc {
            return Err(RecordError::ChecksumMismatch {
                expected: stored_crc,
                actual,
            });
        }
        if flags & !FLAG_TOMBSTONE != 0 {
            return Err(RecordError::UnknownFlags(flags));
        }

        let key_end = RECORD_HEADER_SIZE + key_len;
        let record = Record {
            key: data[RECORD_HEADER_SIZE..key_end].to_vec(),
            value: data[key_end..total].to_vec(),
            tombstone: flags & FLAG_TOMBSTONE != 0,
        };
        Ok((record, total))
    }

    /// Reads the next record from a sequential reader.
    ///
    /// `remaining` is the number of unread bytes left in the source and is
    /// used to reject absurd lengths from a torn header before allocating.
    /// Returns `Ok(None)` on a clean end of input.
    pub fn read_from<R: Read>(
        reader: &mut R,
        remaining: u64,
    ) -> Result<Option<(Self, usize)>, RecordError> {
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < RECORD_HEADER_SIZE as u64 {
            return Err(RecordError::Incomplete);
        }

        let mut header = [0u8; RECORD_HEADER_SIZE];
        read_exact_or_incomplete(reader, &mut header)?;
        let mut cursor = &header[4..12];
        let key_len = cursor.read_u32::<LittleEndian>()? as u64;
        let value_len = cursor.read_u32::<LittleEndian>()? as u64;

        let body_len = key_len + value_len;
        if RECORD_HEADER_SIZE as u64 + body_len > remaining {
            return Err(RecordError::Incomplete);
        }

        let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + body_len as usize);
        buf.extend_from_slice(&header);
        buf.resize(RECORD_HEADER_SIZE + body_len as usize, 0);
        read_exact_or_incomplete(reader, &mut buf[RECORD_HEADER_SIZE..])?;

        Self::decode(&buf).map(Some)
    }
}

fn read_exact_or_incomplete<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), RecordError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => RecordError::Incomplete,
        _ => RecordError::Io(e),
    })
}
