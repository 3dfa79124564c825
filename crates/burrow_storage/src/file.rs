//! Single-file storage backend.

use crate::backend::{check_range, check_shrink, StorageBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A store held in one file on disk.
///
/// `flush` pushes written bytes to the OS and `sync` waits for
/// `File::sync_data`. Only `&mut` methods grow or shrink the file, so the
/// cached length needs no lock of its own; the file handle is behind a
/// mutex because reads seek.
///
/// [`FileBackend::open_exclusive`] additionally takes an advisory lock that
/// lives as long as the backend. Any second exclusive open of the same
/// file fails with [`StorageError::Locked`].
///
/// ```no_run
/// use burrow_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut log = FileBackend::open_exclusive(Path::new("users.burrow")).unwrap();
/// log.append(b"record").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
    locked: bool,
}

impl FileBackend {
    /// Opens `path`, creating an empty file if there is none. No lock is
    /// taken.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len,
            locked: false,
        })
    }

    /// Opens `path` like [`FileBackend::open`] and locks it exclusively.
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another handle holds the lock.
    pub fn open_exclusive(path: &Path) -> StorageResult<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let mut backend = Self::open(path)?;
        backend
            .file
            .get_mut()
            .try_lock_exclusive()
            .map_err(|_| StorageError::Locked(path.to_path_buf()))?;
        backend.locked = true;
        Ok(backend)
    }

    /// The file this backend writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle owns the exclusive lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        check_range(offset, len, self.len)?;
        let mut out = vec![0u8; len];
        if len > 0 {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut out)?;
        }
        Ok(out)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let start = self.len;
        if !data.is_empty() {
            let file = self.file.get_mut();
            file.seek(SeekFrom::End(0))?;
            file.write_all(data)?;
            self.len += data.len() as u64;
        }
        Ok(start)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(self.file.get_mut().flush()?)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(self.file.get_mut().sync_data()?)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        check_shrink(new_size, self.len)?;
        let file = self.file.get_mut();
        file.set_len(new_size)?;
        file.sync_all()?;
        self.len = new_size;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if self.locked {
            // The OS drops the lock with the descriptor anyway.
            let _ = FileExt::unlock(&*self.file.get_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn scratch() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.burrow");
        (dir, path)
    }

    #[test]
    fn open_creates_empty_file() {
        let (_dir, path) = scratch();
        let log = FileBackend::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(log.size().unwrap(), 0);
        assert!(!log.is_locked());
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn appends_are_contiguous() {
        let (_dir, path) = scratch();
        let mut log = FileBackend::open(&path).unwrap();

        assert_eq!(log.append(b"begin").unwrap(), 0);
        assert_eq!(log.append(b"").unwrap(), 5);
        assert_eq!(log.append(b"commit").unwrap(), 5);
        assert_eq!(log.read_at(5, 6).unwrap(), b"commit");
        assert!(matches!(
            log.read_at(8, 4),
            Err(StorageError::ReadPastEnd { size: 11, .. })
        ));
    }

    #[test]
    fn reopen_sees_synced_bytes() {
        let (_dir, path) = scratch();
        {
            let mut log = FileBackend::open_exclusive(&path).unwrap();
            log.append(b"durable").unwrap();
            log.sync().unwrap();
        }

        let mut log = FileBackend::open(&path).unwrap();
        assert_eq!(log.read_all().unwrap(), b"durable");
        assert_eq!(log.append(b"+").unwrap(), 7);
    }

    #[test]
    fn exclusive_open_refuses_second_handle() {
        let (_dir, path) = scratch();
        let holder = FileBackend::open_exclusive(&path).unwrap();
        assert!(holder.is_locked());

        let err = FileBackend::open_exclusive(&path).unwrap_err();
        assert!(matches!(err, StorageError::Locked(ref p) if p == &path));

        drop(holder);
        assert!(FileBackend::open_exclusive(&path).is_ok());
    }

    #[test]
    fn exclusive_open_makes_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("log.burrow");

        let log = FileBackend::open_exclusive(&path).unwrap();
        assert_eq!(log.path(), path);
        assert!(path.is_file());
    }

    #[test]
    fn truncate_rewinds_append_position() {
        let (_dir, path) = scratch();
        let mut log = FileBackend::open(&path).unwrap();
        log.append(b"kept").unwrap();
        let torn = log.append(b"torn-write").unwrap();

        log.truncate(torn).unwrap();
        assert_eq!(log.append(b"!").unwrap(), torn);
        assert_eq!(log.read_all().unwrap(), b"kept!");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 5);
    }

    #[test]
    fn truncate_cannot_grow() {
        let (_dir, path) = scratch();
        let mut log = FileBackend::open(&path).unwrap();
        log.append(b"abc").unwrap();

        assert!(matches!(
            log.truncate(4),
            Err(StorageError::TruncateBeyondEnd { requested: 4, size: 3 })
        ));
    }
}
