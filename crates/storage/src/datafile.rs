//! Datafile handles.
//!
//! A datafile is an append-only sequence of [`Record`]s named `{id:09}.data`.
//! Exactly one datafile is active (receives appends); the rest are sealed
//! and only read.

use crate::error::{Result, StorageError};
use crate::format::Record;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const DATAFILE_EXTENSION: &str = "data";

/// Location of a record inside a datafile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPointer {
    /// Datafile holding the record
    pub file_id: u32,
    /// Byte offset of the record header
    pub offset: u64,
    /// Encoded record length
    pub len: u32,
}

/// Path of datafile `id` inside `dir`.
pub fn datafile_path(dir: &Path, id: u32) -> PathBuf {
    dir.join(format!("{:09}.{}", id, DATAFILE_EXTENSION))
}

/// List datafile ids in `dir`, ascending.
///
/// Files that don't follow the naming scheme are ignored.
pub fn list_datafiles(dir: &Path) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DATAFILE_EXTENSION) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u32>().ok())
        {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Shared read handle for a datafile.
#[derive(Debug)]
pub struct DataFileReader {
    id: u32,
    file: Mutex<File>,
}

impl DataFileReader {
    /// Open datafile `id` for reading.
    pub fn open(dir: &Path, id: u32) -> Result<Self> {
        let file = File::open(datafile_path(dir, id))?;
        Ok(Self {
            id,
            file: Mutex::new(file),
        })
    }

    /// Read the bytes of the record at `ptr` without checking them.
    pub fn read_raw(&self, ptr: &EntryPointer) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; ptr.len as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(ptr.offset))?;
            file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    /// Read the live record for `key` at `ptr`.
    pub fn read_record(&self, key: &[u8], ptr: &EntryPointer) -> Result<Record> {
        let raw = self.read_raw(ptr)?;
        let (record, _) = Record::decode(&raw).map_err(|e| self.corruption(ptr, e.to_string()))?;
        if record.key != key {
            return Err(self.corruption(ptr, "key mismatch".to_string()));
        }
        if record.tombstone {
            return Err(self.corruption(ptr, "pointer to tombstone".to_string()));
        }
        Ok(record)
    }

    fn corruption(&self, ptr: &EntryPointer, reason: String) -> StorageError {
        StorageError::Corruption {
            file_id: self.id,
            offset: ptr.offset,
            reason,
        }
    }
}

/// The datafile currently receiving appends.
#[derive(Debug)]
pub struct ActiveFile {
    id: u32,
    writer: File,
    size: u64,
}

impl ActiveFile {
    /// Create a new, empty datafile.
    pub fn create(dir: &Path, id: u32) -> Result<Self> {
        let writer = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(datafile_path(dir, id))?;
        Ok(Self {
            id,
            writer,
            size: 0,
        })
    }

    /// Reopen an existing datafile whose valid contents end at `size`.
    pub fn reopen(dir: &Path, id: u32, size: u64) -> Result<Self> {
        let writer = OpenOptions::new().append(true).open(datafile_path(dir, id))?;
        Ok(Self { id, writer, size })
    }

    /// Datafile id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether appending `len` more bytes would cross `max_size`.
    ///
    /// An empty file always accepts the record so oversized records can't
    /// cause endless rotation.
    pub fn would_exceed(&self, len: usize, max_size: u64) -> bool {
        self.size > 0 && self.size + len as u64 > max_size
    }

    /// Append encoded record bytes, returning the pointer to them.
    pub fn append(&mut self, bytes: &[u8]) -> Result<EntryPointer> {
        let offset = self.size;
        self.writer.write_all(bytes)?;
        self.size += bytes.len() as u64;
        Ok(EntryPointer {
            file_id: self.id,
            offset,
            len: bytes.len() as u32,
        })
    }

    /// fsync the datafile.
    pub fn sync(&self) -> Result<()> {
        self.writer.sync_all()?;
        Ok(())
    }
}
