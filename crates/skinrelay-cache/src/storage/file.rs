//! One JSON file per player.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::{StorageBackend, StorageRecord};
use crate::error::{SkinError, SkinResult};

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> SkinResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SkinError::Storage {
            message: format!("failed to create {}: {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, uuid: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", uuid))
    }

    fn read(&self, path: &Path) -> SkinResult<Option<StorageRecord>> {
        match self.read_raw(path)? {
            Some(content) => parse_record(path, &content).map(Some),
            None => Ok(None),
        }
    }

    fn read_raw(&self, path: &Path) -> SkinResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SkinError::Storage {
                message: format!("failed to read {}: {}", path.display(), e),
            }),
        }
    }

    fn record_files(&self) -> SkinResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SkinError::Storage {
            message: format!("failed to list {}: {}", self.dir.display(), e),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SkinError::Storage {
                message: format!("failed to list {}: {}", self.dir.display(), e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn write_atomic(&self, record: &StorageRecord) -> SkinResult<()> {
        let path = self.record_path(record.uuid);
        let temp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(record).map_err(|e| SkinError::Storage {
            message: format!("failed to encode skin record: {}", e),
        })?;

        fs::write(&temp_path, content).map_err(|e| SkinError::Storage {
            message: format!("failed to write temp file: {}", e),
        })?;

        fs::rename(&temp_path, &path).map_err(|e| SkinError::Storage {
            message: format!("failed to rename temp file: {}", e),
        })?;

        debug!(path = %path.display(), "wrote skin record");
        Ok(())
    }
}

fn parse_record(path: &Path, content: &str) -> SkinResult<StorageRecord> {
    serde_json::from_str(content).map_err(|e| SkinError::Storage {
        message: format!("corrupt skin record {}: {}", path.display(), e),
    })
}

impl StorageBackend for FileStorage {
    fn load(&self, uuid: Uuid) -> SkinResult<Option<StorageRecord>> {
        self.read(&self.record_path(uuid))
    }

    fn store(&self, record: &StorageRecord) -> SkinResult<()> {
        self.write_atomic(record)
    }

    fn store_refresh(&self, record: &StorageRecord) -> SkinResult<bool> {
        let path = self.record_path(record.uuid);
        // corrupt records are replaced; read failures are not
        let current = match self.read_raw(&path)? {
            Some(content) => match parse_record(&path, &content) {
                Ok(current) => Some(current),
                Err(e) => {
                    warn!(error = %e, "replacing corrupt skin record");
                    None
                }
            },
            None => None,
        };
        match current {
            Some(current) if current.intent != record.intent => Ok(false),
            _ => self.write_atomic(record).map(|_| true),
        }
    }

    fn delete(&self, uuid: Uuid) -> SkinResult<bool> {
        match fs::remove_file(self.record_path(uuid)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SkinError::Storage {
                message: format!("failed to remove skin record {}: {}", uuid, e),
            }),
        }
    }

    fn list(&self) -> SkinResult<Vec<StorageRecord>> {
        let mut records = Vec::new();
        for path in self.record_files()? {
            match self.read(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping unreadable skin record"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.uuid.cmp(&b.uuid)));
        Ok(records)
    }

    fn clear(&self) -> SkinResult<usize> {
        let mut removed = 0;
        for path in self.record_files()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SkinError::Storage {
                        message: format!("failed to remove {}: {}", path.display(), e),
                    })
                }
            }
        }
        Ok(removed)
    }
}
