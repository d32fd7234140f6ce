//! Log-structured persistent store engine.
//!
//! A `LogStore` owns one directory:
//!
//! ```text
//! <dir>/
//! ├─ LOCK        # Advisory lock for single-writer access
//! └─ data.log    # Append-only commit log
//! ```
//!
//! ## Frame Format
//!
//! Every write (single put, single delete, or a whole batch) is appended as
//! one frame, so a batch is replayed entirely or not at all:
//!
//! ```text
//! | len (4) | op_count (4) | ops... | crc32 (4) |
//! op: | kind (1) | key_len (4) | value_len (4) | key | value |
//! ```
//!
//! ## Recovery Policy
//!
//! - A truncated final frame (crash mid-append) is cut off and the store
//!   opens with every complete frame before it.
//! - A CRC mismatch, an unknown op kind or an inconsistent length is fatal:
//!   the store refuses to open with [`StorageError::Corrupted`].

use crate::error::{StorageError, StorageResult};
use crate::memtable::{MemTable, SharedTable, TableCursor};
use crate::store::{BatchOp, KvCursor, KvStore, ReadOptions, ScanRange};
use async_trait::async_trait;
use bytes::Bytes;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "data.log";
const LOG_TEMP: &str = "data.log.tmp";

/// len (4) + op_count (4)
const FRAME_HEADER: usize = 8;
const FRAME_CRC: usize = 4;
/// kind (1) + key_len (4) + value_len (4)
const OP_HEADER: usize = 9;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Stale frames tolerated before a reopen triggers compaction.
const COMPACT_MIN_STALE: u64 = 1024;

/// Options for opening a [`LogStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    /// Create the directory if it does not exist.
    pub create_if_missing: bool,
    /// `fsync` the log after every write.
    pub sync_on_write: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: false,
        }
    }
}

/// A persistent ordered store backed by an append-only log.
///
/// All live entries are indexed in memory; the log is only read on open.
/// Data survives process restarts. File I/O runs on the tokio blocking pool.
///
/// # Thread Safety
///
/// Writers are serialized by an internal mutex. Readers and cursors only
/// touch the in-memory index.
#[derive(Debug, Clone)]
pub struct LogStore {
    inner: Arc<LogInner>,
}

#[derive(Debug)]
struct LogInner {
    dir: PathBuf,
    table: SharedTable,
    writer: Mutex<Option<LogWriter>>,
    lock: Mutex<Option<File>>,
    stale: AtomicU64,
    sync_on_write: bool,
    #[cfg(test)]
    tear_next_write: Mutex<Option<usize>>,
}

/// The append handle and the length of the log it has acknowledged.
#[derive(Debug)]
struct LogWriter {
    file: File,
    len: u64,
}

impl LogStore {
    /// Opens or creates a log store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another handle holds the lock (returns `Locked`)
    /// - The log is corrupted (returns `Corrupted`)
    /// - I/O errors occur
    pub async fn open(dir: &Path, options: LogOptions) -> StorageResult<Self> {
        let dir = dir.to_path_buf();
        let inner = blocking(move || LogInner::open(dir, options)).await?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.dir
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.table.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of log operations shadowed by later writes.
    #[must_use]
    pub fn stale_ops(&self) -> u64 {
        self.inner.stale.load(Ordering::Relaxed)
    }

    /// Rewrites the log so that it holds exactly one put per live key.
    ///
    /// Uses write-then-rename for crash safety:
    /// 1. Write live entries to a temporary file
    /// 2. Sync the temporary file
    /// 3. Rename it over the log
    /// 4. Fsync the directory
    ///
    /// # Errors
    ///
    /// `Closed` after [`KvStore::close`], or an I/O error. The old log stays
    /// in place if the rename has not happened yet.
    pub async fn compact(&self) -> StorageResult<()> {
        let inner = Arc::clone(&self.inner);
        blocking(move || inner.compact()).await
    }

    async fn commit(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        blocking(move || inner.commit(ops)).await
    }

    /// Makes the next append write only `bytes` bytes of its frame and fail.
    #[cfg(test)]
    fn tear_next_write(&self, bytes: usize) {
        *self.inner.tear_next_write.lock() = Some(bytes);
    }
}

impl LogInner {
    fn open(dir: PathBuf, options: LogOptions) -> StorageResult<Self> {
        if !dir.exists() {
            if !options.create_if_missing {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("store directory does not exist: {}", dir.display()),
                )));
            }
            fs::create_dir_all(&dir)?;
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(dir.display().to_string()));
        }

        let log_path = dir.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&log_path)?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let table = MemTable::shared();
        let replay = {
            let mut guard = table.write();
            replay_log(&data, &mut guard)?
        };
        if replay.valid_len < data.len() {
            tracing::warn!(
                path = %log_path.display(),
                discarded = data.len() - replay.valid_len,
                "truncated frame at end of log; discarding"
            );
            file.set_len(replay.valid_len as u64)?;
            file.sync_all()?;
        }

        let live = table.read().len() as u64;
        let stale = replay.ops.saturating_sub(live);
        tracing::debug!(path = %dir.display(), live, stale, "opened log store");

        let inner = Self {
            dir,
            table,
            writer: Mutex::new(Some(LogWriter {
                file,
                len: replay.valid_len as u64,
            })),
            lock: Mutex::new(Some(lock_file)),
            stale: AtomicU64::new(stale),
            sync_on_write: options.sync_on_write,
            #[cfg(test)]
            tear_next_write: Mutex::new(None),
        };

        if stale >= COMPACT_MIN_STALE && stale > live {
            inner.compact()?;
        }
        Ok(inner)
    }

    fn compact(&self) -> StorageResult<()> {
        let mut writer = self.writer.lock();
        if writer.is_none() {
            return Err(StorageError::Closed);
        }

        let temp_path = self.dir.join(LOG_TEMP);
        let (live, len) = {
            let table = self.table.read();
            let mut temp = File::create(&temp_path)?;
            let mut len = 0u64;
            for (key, value) in table.iter() {
                let frame = encode_frame(&[BatchOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                }]);
                temp.write_all(&frame)?;
                len += frame.len() as u64;
            }
            temp.sync_all()?;
            (table.len(), len)
        };

        let log_path = self.dir.join(LOG_FILE);
        fs::rename(&temp_path, &log_path)?;
        sync_directory(&self.dir)?;

        let file = OpenOptions::new().append(true).open(&log_path)?;
        *writer = Some(LogWriter { file, len });
        let reclaimed = self.stale.swap(0, Ordering::Relaxed);
        tracing::info!(path = %self.dir.display(), live, reclaimed, "compacted log store");
        Ok(())
    }

    /// Appends one frame and applies its ops to the index.
    ///
    /// A failed append is rolled back to the last acknowledged length so
    /// that no torn frame sits in front of later writes. If the rollback
    /// fails too, the writer is dropped and further writes fail with
    /// `Closed`.
    fn commit(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        let frame = encode_frame(&ops);

        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(StorageError::Closed)?;
        if let Err(err) = self.append(&mut writer.file, &frame) {
            if let Err(rollback) = writer.file.set_len(writer.len) {
                tracing::error!(
                    path = %self.dir.display(),
                    error = %rollback,
                    "failed to roll back torn append; refusing further writes"
                );
                *guard = None;
            } else {
                tracing::warn!(
                    path = %self.dir.display(),
                    error = %err,
                    "append failed; rolled back"
                );
            }
            return Err(err.into());
        }
        writer.len += frame.len() as u64;

        let mut table = self.table.write();
        for op in ops {
            let shadows = table.get(op.key()).is_some();
            if shadows || matches!(op, BatchOp::Delete { .. }) {
                self.stale.fetch_add(1, Ordering::Relaxed);
            }
            table.apply(op);
        }
        Ok(())
    }

    fn append(&self, file: &mut File, frame: &[u8]) -> std::io::Result<()> {
        #[cfg(test)]
        if let Some(torn) = self.tear_next_write.lock().take() {
            file.write_all(&frame[..torn.min(frame.len())])?;
            return Err(std::io::Error::other("torn write"));
        }
        file.write_all(frame)?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.file.flush()?;
            writer.file.sync_all()?;
        }
        self.table.write().close();
        if let Some(lock) = self.lock.lock().take() {
            // Dropping the handle releases the lock as well; unlocking first
            // makes the release immediate on every platform.
            let _ = lock.unlock();
        }
        tracing::debug!(path = %self.dir.display(), "closed log store");
        Ok(())
    }
}

#[async_trait]
impl KvStore for LogStore {
    async fn get(&self, key: &str, _options: ReadOptions) -> StorageResult<Option<Bytes>> {
        let table = self.inner.table.read();
        table.ensure_open()?;
        Ok(table.get(key))
    }

    async fn put(&self, key: String, value: Bytes) -> StorageResult<()> {
        self.commit(vec![BatchOp::Put { key, value }]).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.commit(vec![BatchOp::delete(key)]).await
    }

    async fn batch(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        self.commit(ops).await
    }

    async fn scan(
        &self,
        range: ScanRange,
        _options: ReadOptions,
    ) -> StorageResult<Box<dyn KvCursor + 'static>> {
        self.inner.table.read().ensure_open()?;
        Ok(Box::new(TableCursor::new(self.inner.table.clone(), range)))
    }

    async fn close(&self) -> StorageResult<()> {
        let inner = Arc::clone(&self.inner);
        blocking(move || inner.close()).await
    }
}

/// Runs blocking file work off the async worker threads.
async fn blocking<T, F>(work: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| StorageError::Io(std::io::Error::other(err)))?
}

struct Replay {
    valid_len: usize,
    ops: u64,
}

fn replay_log(data: &[u8], table: &mut MemTable) -> StorageResult<Replay> {
    let mut offset = 0;
    let mut ops = 0u64;
    while offset < data.len() {
        let remaining = &data[offset..];
        if remaining.len() < FRAME_HEADER + FRAME_CRC {
            break;
        }
        let frame_len = read_u32(remaining, 0) as usize;
        if frame_len < FRAME_HEADER + FRAME_CRC {
            return Err(StorageError::corrupted(format!(
                "frame at offset {offset} declares impossible length {frame_len}"
            )));
        }
        if remaining.len() < frame_len {
            break;
        }
        let frame = &remaining[..frame_len];
        for op in decode_frame(frame, offset)? {
            table.apply(op);
            ops += 1;
        }
        offset += frame_len;
    }
    Ok(Replay {
        valid_len: offset,
        ops,
    })
}

fn encode_frame(ops: &[BatchOp]) -> Vec<u8> {
    let body: usize = ops
        .iter()
        .map(|op| match op {
            BatchOp::Put { key, value } => OP_HEADER + key.len() + value.len(),
            BatchOp::Delete { key } => OP_HEADER + key.len(),
        })
        .sum();
    let frame_len = FRAME_HEADER + body + FRAME_CRC;
    let mut buf = Vec::with_capacity(frame_len);

    buf.extend_from_slice(&(frame_len as u32).to_le_bytes());
    buf.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    for op in ops {
        let (kind, key, value): (u8, &str, &[u8]) = match op {
            BatchOp::Put { key, value } => (OP_PUT, key, value),
            BatchOp::Delete { key } => (OP_DELETE, key, &[]),
        };
        buf.push(kind);
        buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(value);
    }

    // CRC32 over everything before it
    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf
}

fn decode_frame(frame: &[u8], offset: usize) -> StorageResult<Vec<BatchOp>> {
    let crc_at = frame.len() - FRAME_CRC;
    let stored = read_u32(frame, crc_at);
    let computed = crc32fast::hash(&frame[..crc_at]);
    if stored != computed {
        return Err(StorageError::corrupted(format!(
            "checksum mismatch at offset {offset}: expected {stored:08x}, got {computed:08x}"
        )));
    }

    let count = read_u32(frame, 4) as usize;
    let mut ops = Vec::with_capacity(count);
    let mut pos = FRAME_HEADER;
    for _ in 0..count {
        if pos + OP_HEADER > crc_at {
            return Err(StorageError::corrupted(format!(
                "op header overruns frame at offset {offset}"
            )));
        }
        let kind = frame[pos];
        let key_len = read_u32(frame, pos + 1) as usize;
        let value_len = read_u32(frame, pos + 5) as usize;
        pos += OP_HEADER;
        if pos + key_len + value_len > crc_at {
            return Err(StorageError::corrupted(format!(
                "op body overruns frame at offset {offset}"
            )));
        }
        let key = std::str::from_utf8(&frame[pos..pos + key_len])
            .map_err(|_| StorageError::corrupted(format!("non UTF-8 key at offset {offset}")))?
            .to_string();
        pos += key_len;
        let value = Bytes::copy_from_slice(&frame[pos..pos + value_len]);
        pos += value_len;

        ops.push(match kind {
            OP_PUT => BatchOp::Put { key, value },
            OP_DELETE => BatchOp::Delete { key },
            other => {
                return Err(StorageError::corrupted(format!(
                    "unknown op kind {other} at offset {offset}"
                )))
            }
        });
    }
    if pos != crc_at {
        return Err(StorageError::corrupted(format!(
            "trailing bytes in frame at offset {offset}"
        )));
    }
    Ok(ops)
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be fsynced.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn keys(store: &LogStore) -> Vec<String> {
        let mut cursor = store
            .scan(ScanRange::all(), ReadOptions::default())
            .await
            .unwrap();
        let mut keys = Vec::new();
        while let Some(entry) = cursor.next().await.unwrap() {
            keys.push(entry.key);
        }
        keys
    }

    #[tokio::test]
    async fn log_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("direct");

        {
            let store = LogStore::open(&path, LogOptions::default()).await.unwrap();
            store.put("obj1".into(), Bytes::from("1.a")).await.unwrap();
            store.put("obj1/x".into(), Bytes::from("2.b")).await.unwrap();
            store.put("obj1".into(), Bytes::from("3.c")).await.unwrap();
            store.close().await.unwrap();
        }

        let store = LogStore::open(&path, LogOptions::default()).await.unwrap();
        assert_eq!(keys(&store).await, vec!["obj1", "obj1/x"]);
        let value = store.get("obj1", ReadOptions::default()).await.unwrap();
        assert_eq!(value, Some(Bytes::from("3.c")));
        assert_eq!(store.stale_ops(), 1);
    }

    #[tokio::test]
    async fn log_replays_deletes_and_batches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reduced");

        {
            let store = LogStore::open(&path, LogOptions::default()).await.unwrap();
            store
                .batch(vec![BatchOp::put("a", "1.x"), BatchOp::put("b", "1.y")])
                .await
                .unwrap();
            store.delete("a").await.unwrap();
            store.close().await.unwrap();
        }

        let store = LogStore::open(&path, LogOptions::default()).await.unwrap();
        assert_eq!(keys(&store).await, vec!["b"]);
    }

    #[tokio::test]
    async fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();

        let second = LogStore::open(dir.path(), LogOptions::default()).await;
        assert!(matches!(second, Err(StorageError::Locked(_))));
    }

    #[tokio::test]
    async fn lock_released_on_close() {
        let dir = tempdir().unwrap();
        let first = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        first.close().await.unwrap();

        assert!(LogStore::open(dir.path(), LogOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_dir_without_create_fails() {
        let dir = tempdir().unwrap();
        let options = LogOptions {
            create_if_missing: false,
            ..LogOptions::default()
        };
        assert!(LogStore::open(&dir.path().join("absent"), options)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn truncated_tail_is_discarded() {
        let dir = tempdir().unwrap();
        {
            let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
            store.put("kept".into(), Bytes::from("1.a")).await.unwrap();
            store.close().await.unwrap();
        }

        // Simulate a crash halfway through appending a second frame.
        let partial = encode_frame(&[BatchOp::put("lost", "2.b")]);
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(LOG_FILE))
            .unwrap();
        file.write_all(&partial[..partial.len() / 2]).unwrap();
        drop(file);

        let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        assert_eq!(keys(&store).await, vec!["kept"]);
    }

    #[tokio::test]
    async fn checksum_mismatch_is_fatal() {
        let dir = tempdir().unwrap();
        {
            let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
            store.put("key".into(), Bytes::from("1.a")).await.unwrap();
            store.close().await.unwrap();
        }

        let log_path = dir.path().join(LOG_FILE);
        let mut data = fs::read(&log_path).unwrap();
        data[FRAME_HEADER + OP_HEADER] ^= 0xFF;
        fs::write(&log_path, data).unwrap();

        let result = LogStore::open(dir.path(), LogOptions::default()).await;
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[tokio::test]
    async fn compact_keeps_live_entries_only() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        for stamp in 0..10 {
            store
                .put("k".into(), Bytes::from(format!("{stamp}.v")))
                .await
                .unwrap();
        }
        store.put("other".into(), Bytes::from("1.o")).await.unwrap();
        assert_eq!(store.stale_ops(), 9);

        let before = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();
        store.compact().await.unwrap();
        let after = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();
        assert!(after < before);
        assert_eq!(store.stale_ops(), 0);

        // Writes after compaction land in the new log.
        store.put("late".into(), Bytes::from("2.l")).await.unwrap();
        store.close().await.unwrap();

        let reopened = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        assert_eq!(keys(&reopened).await, vec!["k", "late", "other"]);
        let value = reopened.get("k", ReadOptions::default()).await.unwrap();
        assert_eq!(value, Some(Bytes::from("9.v")));
    }

    #[tokio::test]
    async fn failed_append_does_not_hide_later_writes() {
        let dir = tempdir().unwrap();
        {
            let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
            store.put("a".into(), Bytes::from("1.a")).await.unwrap();

            store.tear_next_write(9);
            assert!(store.put("torn".into(), Bytes::from("2.t")).await.is_err());
            assert!(store.get("torn", ReadOptions::default()).await.unwrap().is_none());

            store.put("b".into(), Bytes::from("3.b")).await.unwrap();
            store.close().await.unwrap();
        }

        let expected = encode_frame(&[BatchOp::put("a", "1.a")]).len()
            + encode_frame(&[BatchOp::put("b", "3.b")]).len();
        let len = fs::metadata(dir.path().join(LOG_FILE)).unwrap().len();
        assert_eq!(len as usize, expected);

        let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        assert_eq!(keys(&store).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn writes_from_spawned_tasks() {
        let dir = tempdir().unwrap();
        let store = LogStore::open(dir.path(), LogOptions::default()).await.unwrap();
        let handle = tokio::spawn({
            let store = store.clone();
            async move { store.put("k".into(), Bytes::from("1.v")).await }
        });
        handle.await.unwrap().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn frame_roundtrip() {
        let ops = vec![BatchOp::put("a/b", "12.[1,2]"), BatchOp::delete("_ns")];
        let frame = encode_frame(&ops);
        assert_eq!(read_u32(&frame, 0) as usize, frame.len());
        assert_eq!(decode_frame(&frame, 0).unwrap(), ops);
    }
}
