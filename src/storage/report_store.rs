//! Binary report store
//!
//! Persists per-pin telemetry as flat files of 16-byte records under a
//! per-user directory. There is no catalog: the key tuple maps to a file
//! path through [`generate_filename`](super::filename::generate_filename)
//! and that mapping is the whole index.
//!
//! # Directory structure
//!
//! ```text
//! data_dir/
//!   {user}/
//!     history_{dash}_{device}_{p}{pin}_{granularity}.bin
//! ```
//!
//! # Concurrency
//!
//! Appends, truncation and deletion for the same file are serialized through
//! a per-path lock map, so a reader can never observe a partially written
//! record. Reads take no lock: they snapshot the file size first and decode
//! only complete records, accepting that records appended after the snapshot
//! are missed (queries are not linearizable with concurrent ingestion).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::codec::{self, RECORD_SIZE};
use crate::error::StorageError;
use crate::types::{Point, ReportKey};

use super::filename::generate_filename;

/// Flat-file store for binary pin reports
pub struct ReportStore {
    /// Root of the per-user report tree
    data_dir: PathBuf,

    /// Per-file write serialization
    write_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ReportStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            write_locks: DashMap::new(),
        })
    }

    /// Root of the report tree
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one user's report files
    ///
    /// Rejects user names that would escape the data directory.
    pub fn user_dir(&self, user: &str) -> Result<PathBuf, StorageError> {
        if user.is_empty()
            || user.contains('/')
            || user.contains('\\')
            || user.contains("..")
            || user.contains('\0')
        {
            return Err(StorageError::InvalidUser(user.to_string()));
        }
        Ok(self.data_dir.join(user))
    }

    /// Full path of the file a key maps to
    pub fn report_path(&self, key: &ReportKey) -> Result<PathBuf, StorageError> {
        let name = generate_filename(
            key.dash_id,
            key.device_id,
            key.pin_type,
            key.pin,
            key.granularity,
        );
        Ok(self.user_dir(&key.user)?.join(name))
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append one record to the key's file, creating directories lazily
    pub fn append(&self, key: &ReportKey, value: f64, timestamp: i64) -> Result<(), StorageError> {
        let path = self.report_path(key)?;
        let lock = self.path_lock(&path);
        let _guard = lock.lock();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&codec::encode_record(value, timestamp))?;
        file.flush()?;
        Ok(())
    }

    /// Read up to `page_size` records starting at page `page_index`
    ///
    /// Pages run front-to-back through the file (oldest-first). A missing
    /// file or an offset at or past end-of-file yields an empty vector; a
    /// page that starts inside the file but extends past it yields a short
    /// page. Trailing bytes that do not form a complete record are ignored.
    pub fn read_page(
        &self,
        key: &ReportKey,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<Point>, StorageError> {
        let path = self.report_path(key)?;
        self.read_page_at(&path, page_index, page_size)
    }

    /// [`ReportStore::read_page`] addressed by path, for callers that walk
    /// the directory tree directly
    pub fn read_page_at(
        &self,
        path: &Path,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<Point>, StorageError> {
        if page_size == 0 {
            return Ok(Vec::new());
        }
        let len = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let offset = (page_index as u64)
            .saturating_mul(page_size as u64)
            .saturating_mul(RECORD_SIZE as u64);
        if offset >= len {
            return Ok(Vec::new());
        }

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; page_size * RECORD_SIZE];
        let read = read_up_to(&mut file, &mut buf)?;
        Ok(codec::decode_all(&buf[..read]))
    }

    /// Read every complete record in the file at `path`, oldest-first
    ///
    /// Missing file yields an empty vector.
    pub fn read_all_at(&self, path: &Path) -> Result<Vec<Point>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(codec::decode_all(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Size in bytes of the key's file, 0 if it does not exist
    pub fn file_size(&self, key: &ReportKey) -> Result<u64, StorageError> {
        let path = self.report_path(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the key's file exists
    pub fn exists(&self, key: &ReportKey) -> Result<bool, StorageError> {
        Ok(self.report_path(key)?.exists())
    }

    /// Delete the key's file; idempotent, absent file is not an error
    pub fn delete(&self, key: &ReportKey) -> Result<(), StorageError> {
        let path = self.report_path(key)?;
        self.delete_at(&path)
    }

    /// [`ReportStore::delete`] addressed by path, for the orphan collector
    pub fn delete_at(&self, path: &Path) -> Result<(), StorageError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock();
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Keep only the newest `max_points` records of the file at `path`
    ///
    /// Returns `true` when the file was rewritten. A file at or under the
    /// cap is untouched. The rewrite happens under the same per-path lock as
    /// `append`, via a temp file renamed into place so readers never see a
    /// half-written file. Trailing partial bytes are dropped by the rewrite.
    pub fn truncate_to_newest(&self, path: &Path, max_points: usize) -> Result<bool, StorageError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock();

        let len = match fs::metadata(path) {
            Ok(meta) => meta.len() as usize,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let complete = len / RECORD_SIZE;
        if complete <= max_points && len == complete * RECORD_SIZE {
            return Ok(false);
        }

        let keep = complete.min(max_points);
        let tail_offset = ((complete - keep) * RECORD_SIZE) as u64;

        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(tail_offset))?;
        let mut tail = vec![0u8; keep * RECORD_SIZE];
        file.read_exact(&mut tail)?;
        drop(file);

        let tmp = path.with_extension("bin.tmp");
        {
            let mut out = File::create(&tmp)?;
            out.write_all(&tail)?;
            out.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(true)
    }
}

/// Read until the buffer is full or end-of-file
fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize, StorageError> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
