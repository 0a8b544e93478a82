//! JSON file persistence shared by the rule store and the review log.
//!
//! The file on disk is the only copy of the data. Readers load it fresh;
//! writers go through [`update`], which holds a sibling lockfile across
//! the whole load, change and save so separate processes cannot
//! overwrite each other.

use std::fs::{self, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::errors::StoreError;

/// Load `T` from `path`, or `T::default()` if the file does not exist yet.
pub fn load_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::Corrupt {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write `value` to a temp file next to `path`, then rename it into place.
pub fn save_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let write_err = |e: std::io::Error| StoreError::Write {
        path: path.display().to_string(),
        source: e,
    };

    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir).map_err(write_err)?;

    let temp_file = NamedTempFile::new_in(parent_dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(write_err)?;
    }

    temp_file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Load `path`, let `f` change the value, then save it, all under the file lock.
///
/// Nothing is written when `f` fails.
pub fn update<T, R, E>(path: &Path, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
where
    T: Serialize + DeserializeOwned + Default,
    E: From<StoreError>,
{
    let _lock = FileLock::acquire(path)?;
    let mut value: T = load_or_default(path)?;
    let out = f(&mut value)?;
    save_atomic(path, &value)?;
    Ok(out)
}

/// Exclusive writer lock on a store file, held as `<file>.lock` next to it.
/// Released on drop.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    const RETRY_EVERY: Duration = Duration::from_millis(5);
    const GIVE_UP_AFTER: Duration = Duration::from_secs(10);
    /// A lock this old was left behind by a writer that died.
    const STALE_AFTER: Duration = Duration::from_secs(60);

    pub fn acquire(target: &Path) -> Result<Self, StoreError> {
        let path = lock_path(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "Removing stale store lock");
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    if started.elapsed() >= Self::GIVE_UP_AFTER {
                        return Err(StoreError::Locked {
                            path: target.display().to_string(),
                        });
                    }
                    thread::sleep(Self::RETRY_EVERY);
                }
                Err(e) => {
                    return Err(StoreError::Write {
                        path: path.display().to_string(),
                        source: e,
                    })
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn is_stale(lock: &Path) -> bool {
    fs::metadata(lock)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > FileLock::STALE_AFTER)
}

/// Lock a store mutex, mapping poisoning to a store error.
pub fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Poisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Vec<String> = load_or_default(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("map.json");
        let mut map = BTreeMap::new();
        map.insert("كرة".to_string(), 3u64);
        save_atomic(&path, &map).unwrap();

        let loaded: BTreeMap<String, u64> = load_or_default(&path).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn update_writes_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");

        for _ in 0..3 {
            update(&path, |v: &mut Vec<u32>| {
                v.push(1);
                Ok::<_, StoreError>(())
            })
            .unwrap();
        }

        let loaded: Vec<u32> = load_or_default(&path).unwrap();
        assert_eq!(loaded, vec![1, 1, 1]);
        assert!(!lock_path(&path).exists());
    }

    #[test]
    fn failed_update_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        save_atomic(&path, &vec![7u32]).unwrap();

        let result = update(&path, |v: &mut Vec<u32>| {
            v.clear();
            Err::<(), _>(StoreError::NotFound("x".into()))
        });
        assert!(result.is_err());
        assert_eq!(load_or_default::<Vec<u32>>(&path).unwrap(), vec![7]);
        assert!(!lock_path(&path).exists());
    }

    #[test]
    fn update_refuses_to_overwrite_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let result = update(&path, |v: &mut Vec<u32>| {
            v.push(1);
            Ok::<_, StoreError>(())
        });
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn lock_is_exclusive_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.json");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        update(&path, |n: &mut u64| {
                            *n += 1;
                            Ok::<_, StoreError>(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(load_or_default::<u64>(&path).unwrap(), 40);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_or_default::<Vec<String>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
