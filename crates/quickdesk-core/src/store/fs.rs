use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::BlobStore;
use crate::error::StoreError;

const LOCK_FILE: &str = "store.lock";
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_LOCK_BACKOFF: Duration = Duration::from_millis(50);

/// One `<key>.json` file per blob inside a data directory.
///
/// Writes land in a temp file that is renamed over the target while an
/// exclusive advisory lock on `store.lock` is held; reads take the shared
/// side of the same lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

/// Which side of the directory lock an operation needs.
#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

/// The directory lock, released on drop.
#[derive(Debug)]
struct DirLock(File);

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self {
            dir,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    #[must_use]
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Take the directory lock, retrying with backoff until `lock_timeout`.
    fn lock(&self, access: Access) -> Result<DirLock, StoreError> {
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err(&path))?;

        let contended = fs2::lock_contended_error();
        let started = Instant::now();
        let mut backoff = Duration::from_millis(1);
        loop {
            let attempt = match access {
                Access::Read => FileExt::try_lock_shared(&file),
                Access::Write => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(DirLock(file)),
                Err(err) if err.raw_os_error() == contended.raw_os_error() => {}
                Err(err) => return Err(io_err(&path)(err)),
            }

            let waited = started.elapsed();
            if waited >= self.lock_timeout {
                tracing::warn!(dir = %self.dir.display(), ?waited, "store lock timed out");
                return Err(StoreError::LockTimeout {
                    dir: self.dir.clone(),
                    waited,
                });
            }
            thread::sleep(backoff.min(self.lock_timeout - waited));
            backoff = (backoff * 2).min(MAX_LOCK_BACKOFF);
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl BlobStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.blob_path(key);
        let _lock = self.lock(Access::Read)?;
        match fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(&path)(err)),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        let path = self.blob_path(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        let _lock = self.lock(Access::Write)?;

        let mut file = fs::File::create(&tmp).map_err(io_err(&tmp))?;
        file.write_all(blob.as_bytes()).map_err(io_err(&tmp))?;
        file.sync_all().map_err(io_err(&tmp))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(io_err(&path))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.blob_path(key);
        let _lock = self.lock(Access::Write)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&path)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn save_then_load_reads_back_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        store.save("quickdesk_users", "[]").expect("save");

        assert_eq!(
            store.load("quickdesk_users").expect("load").as_deref(),
            Some("[]")
        );
        assert!(store.blob_path("quickdesk_users").is_file());
    }

    #[test]
    fn missing_blob_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        assert!(store.load("quickdesk_tickets").expect("load").is_none());
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        store.save("k", "first").expect("save");
        store.save("k", "second").expect("save");

        assert_eq!(store.load("k").expect("load").as_deref(), Some("second"));
        assert!(!dir.path().join(".k.json.tmp").exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        store.save(crate::store::SESSION_KEY, "{}").expect("save");
        store.remove(crate::store::SESSION_KEY).expect("remove");
        store.remove(crate::store::SESSION_KEY).expect("remove again");
        assert!(store.load(crate::store::SESSION_KEY).expect("load").is_none());
    }

    #[test]
    fn writer_blocks_other_stores_on_the_same_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let holder = FileStore::open(dir.path()).expect("open");
        let mut writer = FileStore::open(dir.path())
            .expect("open")
            .with_lock_timeout(Duration::from_millis(20));
        let reader = writer.clone();

        let held = holder.lock(Access::Write).expect("hold lock");
        let err = writer.save("k", "v").expect_err("lock is held");
        assert_eq!(err.error_code(), ErrorCode::LockContention);
        assert!(matches!(err, StoreError::LockTimeout { ref dir, .. } if dir == holder.dir()));
        assert!(reader.load("k").is_err());

        drop(held);
        writer.save("k", "v").expect("lock released");
        assert_eq!(reader.load("k").expect("load").as_deref(), Some("v"));
    }

    #[test]
    fn readers_share_the_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path())
            .expect("open")
            .with_lock_timeout(Duration::from_millis(20));
        store.save("k", "v").expect("save");

        let _shared = store.lock(Access::Read).expect("shared lock");
        assert_eq!(store.load("k").expect("load").as_deref(), Some("v"));
        assert!(store.save("k", "w").is_err());
    }

    #[test]
    fn stores_in_different_dirs_do_not_contend() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        let held = FileStore::open(first.path()).expect("open");
        let mut other = FileStore::open(second.path())
            .expect("open")
            .with_lock_timeout(Duration::from_millis(20));

        let _lock = held.lock(Access::Write).expect("hold lock");
        other.save("k", "v").expect("separate lock file");
    }
}
