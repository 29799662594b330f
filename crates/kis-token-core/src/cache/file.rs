use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use super::store::{validate_key, Envelope, TokenStore};
use crate::error::StoreError;

/// Extension for entry files in the cache directory
const ENTRY_EXTENSION: &str = "json";

/// Extension for in-flight writes
const TEMP_EXTENSION: &str = "tmp";

/// Temp files older than this are left over from a failed write
const STALE_TEMP_AGE: Duration = Duration::from_secs(600);

/// Directory-backed store holding one JSON envelope file per key.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader in another process sees the old record or the new one.
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!(".{}.{:016x}.{}", key, rand::random::<u64>(), TEMP_EXTENSION))
    }

    fn read_envelope(path: &Path) -> Result<Option<Envelope>, StoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn remove(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_temp(&self, key: &str, contents: &str) -> Result<PathBuf, StoreError> {
        let tmp = self.temp_path(key);
        if let Err(e) = fs::write(&tmp, contents) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(tmp)
    }

    fn is_stale_temp(path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= STALE_TEMP_AGE)
    }

    /// Delete every expired or unreadable entry and abandoned temp file,
    /// returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let stale = match path.extension().and_then(|e| e.to_str()) {
                Some(ENTRY_EXTENSION) => match Self::read_envelope(&path) {
                    Ok(Some(envelope)) => envelope.is_expired(),
                    Ok(None) => false,
                    Err(StoreError::Serialization(_)) => true,
                    Err(e) => return Err(e),
                },
                Some(TEMP_EXTENSION) => Self::is_stale_temp(&path),
                _ => false,
            };
            if stale {
                Self::remove(&path)?;
                removed += 1;
            }
        }
        debug!(removed, dir = %self.cache_dir.display(), "Purged expired cache entries");
        Ok(removed)
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        let path = self.entry_path(key);
        match Self::read_envelope(&path) {
            Ok(Some(envelope)) if envelope.is_expired() => {
                Self::remove(&path)?;
                Ok(None)
            }
            Ok(Some(envelope)) => Ok(Some(envelope.record)),
            Ok(None) => Ok(None),
            Err(StoreError::Serialization(e)) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable cache file");
                Self::remove(&path)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, record: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        validate_key(key)?;
        let contents = serde_json::to_string(&Envelope::new(record, ttl))?;
        let tmp = self.write_temp(key, &contents)?;
        if let Err(e) = fs::rename(&tmp, self.entry_path(key)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        Self::remove(&self.entry_path(key))
    }
}
