//! Log-structured engine.
//!
//! Bitcask-style storage: every write is appended to the active datafile and
//! an in-memory key directory maps each live key to the position of its
//! latest record. Reads cost one seek. Superseded records and tombstones
//! stay on disk until [`LogEngine::merge`] rewrites the live set.
//!
//! # Recovery
//!
//! Opening replays every datafile in id order. A torn record at the tail of
//! the newest datafile (crash mid-append) is truncated away; damage anywhere
//! else fails the open.
//!
//! # Merge
//!
//! Merge copies live records into fresh datafiles with higher ids, then
//! deletes the old files. Each record is checksummed before it is copied;
//! if anything fails the new files are removed and the old set is kept. A crash between the two steps leaves both sets on
//! disk; replay order makes the copies win, so the recovered state is the
//! same.

use crate::config::EngineConfig;
use crate::datafile::{datafile_path, list_datafiles, ActiveFile, DataFileReader, EntryPointer};
use crate::engine::{EngineStats, KeyValueEngine, ScanOutcome, Visit};
use crate::error::{Result, StorageError};
use crate::format::{Record, RecordError};
use crate::scan::{prefix_chunk, run_chunked};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of a merge copy, swapped into [`State`] once complete.
#[derive(Debug, Default)]
struct Merged {
    keydir: BTreeMap<Vec<u8>, EntryPointer>,
    readers: BTreeMap<u32, Arc<DataFileReader>>,
    sealed_bytes: u64,
}

/// Mutable engine state, guarded by a single lock.
#[derive(Debug)]
struct State {
    keydir: BTreeMap<Vec<u8>, EntryPointer>,
    active: ActiveFile,
    readers: BTreeMap<u32, Arc<DataFileReader>>,
    /// Bytes in sealed (non-active) datafiles
    sealed_bytes: u64,
    /// Bytes held by superseded records and tombstones
    reclaimable_bytes: u64,
    /// Appends since the last fsync
    unsynced: usize,
}

/// Summary of what recovery found on open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryInfo {
    /// Datafiles replayed
    pub datafiles: usize,
    /// Records replayed (puts and tombstones)
    pub records: usize,
    /// Bytes cut from a torn tail, if any
    pub truncated_bytes: u64,
}

/// Append-only log-structured key-value engine.
///
/// # Thread Safety
///
/// All operations take `&self`. Reads share a read lock on the key
/// directory only long enough to copy a pointer; writes serialize on the
/// write lock.
///
/// # Example
///
/// ```ignore
/// use caskds_storage::{EngineConfig, KeyValueEngine, LogEngine};
///
/// let engine = LogEngine::open("./data", EngineConfig::default())?;
/// engine.put(b"/user/1", b"alice")?;
/// assert_eq!(engine.get(b"/user/1")?, b"alice");
/// engine.sync()?;
/// ```
#[derive(Debug)]
pub struct LogEngine {
    dir: PathBuf,
    config: EngineConfig,
    state: RwLock<State>,
    recovery: RecoveryInfo,
}

impl LogEngine {
    /// Open (or create) an engine rooted at `dir`, replaying existing datafiles.
    pub fn open(dir: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let ids = list_datafiles(&dir)?;
        info!("Opening log engine at {} ({} datafiles)", dir.display(), ids.len());

        let mut keydir = BTreeMap::new();
        let mut readers = BTreeMap::new();
        let mut recovery = RecoveryInfo::default();
        let mut reclaimable_bytes = 0u64;
        let mut sizes = BTreeMap::new();

        for (i, &id) in ids.iter().enumerate() {
            let is_last = i + 1 == ids.len();
            let replay = replay_datafile(&dir, id, &mut keydir, &mut reclaimable_bytes)?;
            recovery.datafiles += 1;
            recovery.records += replay.records;

            if let Some(reason) = replay.torn {
                if !is_last {
                    return Err(StorageError::Corruption {
                        file_id: id,
                        offset: replay.valid_len,
                        reason,
                    });
                }
                let cut = replay.file_len - replay.valid_len;
                warn!(
                    "Truncating {} torn bytes at offset {} of datafile {}: {}",
                    cut, replay.valid_len, id, reason
                );
                OpenOptions::new()
                    .write(true)
                    .open(datafile_path(&dir, id))?
                    .set_len(replay.valid_len)?;
                recovery.truncated_bytes = cut;
            }

            sizes.insert(id, replay.valid_len);
            readers.insert(id, Arc::new(DataFileReader::open(&dir, id)?));
        }

        let active = match ids.last() {
            Some(&id) if sizes[&id] < config.max_datafile_size => {
                ActiveFile::reopen(&dir, id, sizes[&id])?
            }
            Some(&id) => {
                let active = ActiveFile::create(&dir, id + 1)?;
                readers.insert(active.id(), Arc::new(DataFileReader::open(&dir, active.id())?));
                active
            }
            None => {
                let active = ActiveFile::create(&dir, 0)?;
                readers.insert(0, Arc::new(DataFileReader::open(&dir, 0)?));
                active
            }
        };
        let sealed_bytes = sizes
            .iter()
            .filter(|(id, _)| **id != active.id())
            .map(|(_, len)| *len)
            .sum::<u64>();

        info!(
            "Log engine ready: {} keys, {} records replayed, active datafile {}",
            keydir.len(),
            recovery.records,
            active.id()
        );

        Ok(Self {
            dir,
            config,
            state: RwLock::new(State {
                keydir,
                active,
                readers,
                sealed_bytes,
                reclaimable_bytes,
                unsynced: 0,
            }),
            recovery,
        })
    }

    /// Directory holding the datafiles.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// What recovery found when this engine was opened.
    pub fn recovery_info(&self) -> &RecoveryInfo {
        &self.recovery
    }

    /// Append `record` to the active datafile, rotating first if needed.
    fn append(&self, state: &mut State, record: &Record) -> Result<EntryPointer> {
        let bytes = record.encode();
        if state.active.would_exceed(bytes.len(), self.config.max_datafile_size) {
            self.rotate(state)?;
        }
        let ptr = state.active.append(&bytes)?;

        state.unsynced += 1;
        if self.config.durability.should_sync(state.unsynced) {
            state.active.sync()?;
            state.unsynced = 0;
        }
        Ok(ptr)
    }

    fn rotate(&self, state: &mut State) -> Result<()> {
        state.active.sync()?;
        let next = ActiveFile::create(&self.dir, self.next_file_id(state)?)?;
        debug!(
            "Rotating datafile {} ({} bytes) -> {}",
            state.active.id(),
            state.active.size(),
            next.id()
        );
        state
            .readers
            .insert(next.id(), Arc::new(DataFileReader::open(&self.dir, next.id())?));
        state.sealed_bytes += state.active.size();
        state.active = next;
        state.unsynced = 0;
        Ok(())
    }

    /// First id above every datafile in use or already present on disk.
    fn next_file_id(&self, state: &State) -> Result<u32> {
        let on_disk = list_datafiles(&self.dir)?.last().copied();
        let in_use = state.readers.keys().next_back().copied();
        let highest = on_disk.max(in_use).unwrap_or(0);
        Ok(highest.max(state.active.id()) + 1)
    }

    /// Copy every live record into fresh datafiles, recording each file
    /// created in `created` so a failed merge can remove them.
    fn copy_live(&self, state: &State, created: &mut Vec<u32>) -> Result<(Merged, ActiveFile)> {
        let mut out = ActiveFile::create(&self.dir, self.next_file_id(state)?)?;
        created.push(out.id());
        let mut merged = Merged::default();

        for (key, ptr) in &state.keydir {
            let raw = Self::reader_for(state, ptr)?.read_record(key, ptr)?.encode();
            if out.would_exceed(raw.len(), self.config.max_datafile_size) {
                out.sync()?;
                merged
                    .readers
                    .insert(out.id(), Arc::new(DataFileReader::open(&self.dir, out.id())?));
                merged.sealed_bytes += out.size();
                out = ActiveFile::create(&self.dir, self.next_file_id(state)?)?;
                created.push(out.id());
            }
            merged.keydir.insert(key.clone(), out.append(&raw)?);
        }
        out.sync()?;
        merged
            .readers
            .insert(out.id(), Arc::new(DataFileReader::open(&self.dir, out.id())?));
        Ok((merged, out))
    }

    fn reader_for(state: &State, ptr: &EntryPointer) -> Result<Arc<DataFileReader>> {
        state
            .readers
            .get(&ptr.file_id)
            .cloned()
            .ok_or_else(|| StorageError::Corruption {
                file_id: ptr.file_id,
                offset: ptr.offset,
                reason: "datafile missing".to_string(),
            })
    }
}

impl KeyValueEngine for LogEngine {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let (ptr, reader) = {
            let state = self.state.read();
            let ptr = *state.keydir.get(key).ok_or(StorageError::KeyNotFound)?;
            (ptr, Self::reader_for(&state, &ptr)?)
        };
        Ok(reader.read_record(key, &ptr)?.value)
    }

    fn has(&self, key: &[u8]) -> bool {
        self.state.read().keydir.contains_key(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.config.check_entry(key, Some(value))?;
        let record = Record::put(key, value);

        let mut state = self.state.write();
        let ptr = self.append(&mut state, &record)?;
        if let Some(old) = state.keydir.insert(key.to_vec(), ptr) {
            state.reclaimable_bytes += old.len as u64;
        }
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.config.check_key(key)?;

        let mut state = self.state.write();
        if !state.keydir.contains_key(key) {
            return Ok(());
        }
        let tombstone = self.append(&mut state, &Record::tombstone(key))?;
        if let Some(old) = state.keydir.remove(key) {
            state.reclaimable_bytes += old.len as u64 + tombstone.len as u64;
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8], visit: &mut dyn FnMut(&[u8]) -> Visit) -> ScanOutcome {
        let chunk = self.config.scan_chunk_size;
        run_chunked(
            |after| prefix_chunk(&self.state.read().keydir, prefix, after, chunk),
            visit,
        )
    }

    fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        state.active.sync()?;
        state.unsynced = 0;
        Ok(())
    }

    fn merge(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.reclaimable_bytes == 0 {
            debug!("Skipping merge: nothing to reclaim");
            return Ok(());
        }

        let old_ids: Vec<u32> = state.readers.keys().copied().collect();
        let before = state.sealed_bytes + state.active.size();
        info!(
            "Merging {} datafiles ({} bytes, {} reclaimable)",
            old_ids.len(),
            before,
            state.reclaimable_bytes
        );

        let mut created = Vec::new();
        let (merged, out) = match self.copy_live(&state, &mut created) {
            Ok(copied) => copied,
            Err(e) => {
                warn!("Merge failed, removing {} partial datafiles: {}", created.len(), e);
                for id in created {
                    if let Err(rm) = fs::remove_file(datafile_path(&self.dir, id)) {
                        warn!("Failed to remove partial datafile {}: {}", id, rm);
                    }
                }
                return Err(e);
            }
        };
        state.keydir = merged.keydir;
        state.readers = merged.readers;
        state.active = out;
        state.sealed_bytes = merged.sealed_bytes;
        state.reclaimable_bytes = 0;
        state.unsynced = 0;

        for id in old_ids {
            if let Err(e) = fs::remove_file(datafile_path(&self.dir, id)) {
                warn!("Failed to remove merged datafile {}: {}", id, e);
            }
        }

        info!(
            "Merge complete: {} -> {} bytes",
            before,
            state.sealed_bytes + state.active.size()
        );
        Ok(())
    }

    fn max_key_size(&self) -> usize {
        self.config.max_key_size
    }

    fn stats(&self) -> EngineStats {
        let state = self.state.read();
        EngineStats {
            keys: state.keydir.len(),
            datafiles: state.readers.len(),
            total_bytes: state.sealed_bytes + state.active.size(),
            reclaimable_bytes: state.reclaimable_bytes,
        }
    }
}

/// Result of replaying a single datafile.
struct Replay {
    records: usize,
    file_len: u64,
    valid_len: u64,
    torn: Option<String>,
}

fn replay_datafile(
    dir: &Path,
    id: u32,
    keydir: &mut BTreeMap<Vec<u8>, EntryPointer>,
    reclaimable: &mut u64,
) -> Result<Replay> {
    let file = fs::File::open(datafile_path(dir, id))?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut offset = 0u64;
    let mut records = 0usize;

    let torn = loop {
        match Record::read_from(&mut reader, file_len - offset) {
            Ok(None) => break None,
            Ok(Some((record, used))) => {
                let ptr = EntryPointer {
                    file_id: id,
                    offset,
                    len: used as u32,
                };
                if record.tombstone {
                    if let Some(old) = keydir.remove(&record.key) {
                        *reclaimable += old.len as u64;
                    }
                    *reclaimable += used as u64;
                } else if let Some(old) = keydir.insert(record.key, ptr) {
                    *reclaimable += old.len as u64;
                }
                offset += used as u64;
                records += 1;
            }
            Err(RecordError::Io(e)) => return Err(e.into()),
            Err(e) => break Some(e.to_string()),
        }
    };

    debug!("Replayed datafile {}: {} records, {} valid bytes", id, records, offset);
    Ok(Replay {
        records,
        file_len,
        valid_len: offset,
        torn,
    })
}
