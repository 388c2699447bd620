use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const STORE_FORMAT_VERSION: u32 = 1;

/// Where liked-recipe records live between runs.
///
/// Records are handled as raw JSON values so that one malformed record
/// never prevents the others from loading.
#[async_trait]
pub trait RecordMedium: Send + Sync {
    /// All stored records. A medium that does not exist yet is empty.
    async fn load(&self) -> Result<Vec<Value>, StoreError>;

    /// Replace the stored records. Readers never observe a partial write.
    async fn persist(&self, records: &[Value]) -> Result<(), StoreError>;

    /// Discard whatever is stored and start over empty
    async fn recreate(&self) -> Result<(), StoreError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    records: Vec<Value>,
}

/// JSON document on disk, replaced atomically on every write
#[derive(Debug, Clone)]
pub struct JsonFileMedium {
    path: PathBuf,
}

impl JsonFileMedium {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_failed(&self, e: impl std::fmt::Display) -> StoreError {
        StoreError::WriteFailed {
            path: self.describe(),
            details: e.to_string(),
        }
    }
}

#[async_trait]
impl RecordMedium for JsonFileMedium {
    async fn load(&self) -> Result<Vec<Value>, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Unreadable {
                    path: self.describe(),
                    details: e.to_string(),
                })
            }
        };

        let document: StoreDocument =
            serde_json::from_slice(&contents).map_err(|e| StoreError::Corrupt {
                path: self.describe(),
                details: e.to_string(),
            })?;

        if document.version != STORE_FORMAT_VERSION {
            return Err(StoreError::Corrupt {
                path: self.describe(),
                details: format!("unsupported format version {}", document.version),
            });
        }

        Ok(document.records)
    }

    async fn persist(&self, records: &[Value]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_failed(e))?;
        }

        let document = StoreDocument {
            version: STORE_FORMAT_VERSION,
            records: records.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| self.write_failed(e))?;

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_failed(e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| self.write_failed(e))?;
        file.sync_all().await.map_err(|e| self.write_failed(e))?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.write_failed(e))?;

        debug!("Persisted {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    async fn recreate(&self) -> Result<(), StoreError> {
        for path in [self.path.clone(), self.temp_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!("Removed store file {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.write_failed(e)),
            }
        }

        self.persist(&[]).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Volatile medium with failure injection, for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryMedium {
    records: Mutex<Vec<Value>>,
    corrupt: AtomicBool,
    failing_writes: AtomicUsize,
    failing_recreates: AtomicUsize,
    recreations: AtomicUsize,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Medium preloaded with raw records
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make `load` report corruption until the medium is recreated
    pub fn corrupted() -> Self {
        let medium = Self::default();
        medium.corrupt.store(true, Ordering::SeqCst);
        medium
    }

    /// Fail the next `n` calls to `persist`
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `recreate`, leaving the records in place
    pub fn fail_next_recreates(&self, n: usize) {
        self.failing_recreates.store(n, Ordering::SeqCst);
    }

    pub fn recreations(&self) -> usize {
        self.recreations.load(Ordering::SeqCst)
    }

    pub fn raw_records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl RecordMedium for MemoryMedium {
    async fn load(&self) -> Result<Vec<Value>, StoreError> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt {
                path: self.describe(),
                details: "injected corruption".to_string(),
            });
        }
        Ok(self.records.lock().clone())
    }

    async fn persist(&self, records: &[Value]) -> Result<(), StoreError> {
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::WriteFailed {
                path: self.describe(),
                details: "injected write failure".to_string(),
            });
        }

        *self.records.lock() = records.to_vec();
        Ok(())
    }

    async fn recreate(&self) -> Result<(), StoreError> {
        let failed = self
            .failing_recreates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::WriteFailed {
                path: self.describe(),
                details: "injected recreate failure".to_string(),
            });
        }

        self.recreations.fetch_add(1, Ordering::SeqCst);
        self.corrupt.store(false, Ordering::SeqCst);
        self.records.lock().clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
