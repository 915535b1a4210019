use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{Finding, FindingFilter};

/// On-disk document holding the batch of one capture session.
#[derive(Debug, Serialize, Deserialize)]
struct SessionBatch {
    session_id: Uuid,
    saved_at: DateTime<Utc>,
    findings: Vec<Finding>,
}

/// Filesystem-backed storage: one JSON document per capture session under
/// `<base>/findings/<session id>.json`.
pub struct FileStorage {
    findings_dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        let findings_dir = base_path.join("findings");

        fs::create_dir_all(&findings_dir).map_err(|e| {
            error!("Failed to create findings dir {}: {}", findings_dir.display(), e);
            StorageError::WriteFailed
        })?;
        info!("FileStorage initialized at {}", base_path.display());

        Ok(Self { findings_dir })
    }

    fn batch_path(&self, session_id: Uuid) -> PathBuf {
        self.findings_dir.join(format!("{}.json", session_id))
    }

    fn write_batch(&self, path: &Path, batch: &SessionBatch) -> Result<(), StorageError> {
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp).map_err(|e| {
            error!("Failed to create {}: {}", tmp.display(), e);
            StorageError::WriteFailed
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, batch).map_err(|e| {
            error!("Failed to serialize batch {}: {}", batch.session_id, e);
            StorageError::WriteFailed
        })?;
        writer.flush().map_err(|e| {
            error!("Failed to write {}: {}", tmp.display(), e);
            StorageError::WriteFailed
        })?;
        // rename so readers never see a half-written batch
        fs::rename(&tmp, path).map_err(|e| {
            error!("Failed to move {} into place: {}", path.display(), e);
            StorageError::WriteFailed
        })
    }

    fn read_batch(&self, path: &Path) -> Result<SessionBatch, StorageError> {
        let file = File::open(path).map_err(|e| {
            error!("Failed to open {}: {}", path.display(), e);
            StorageError::ReadFailed
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            error!("Invalid batch document {}: {}", path.display(), e);
            StorageError::ReadFailed
        })
    }

    fn batch_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = fs::read_dir(&self.findings_dir).map_err(|e| {
            error!("Failed to read findings dir {}: {}", self.findings_dir.display(), e);
            StorageError::ReadFailed
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                error!("Dir entry error: {}", e);
                StorageError::ReadFailed
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl Storage for FileStorage {
    fn save_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<(), StorageError> {
        if findings.is_empty() {
            debug!("[{}] Empty batch, nothing to save", session_id);
            return Ok(());
        }
        let path = self.batch_path(session_id);
        let batch = SessionBatch {
            session_id,
            saved_at: Utc::now(),
            findings: findings.to_vec(),
        };
        self.write_batch(&path, &batch)?;
        info!(
            "[{}] Saved {} finding(s) to {}",
            session_id,
            findings.len(),
            path.display()
        );
        Ok(())
    }

    fn get_findings(&self, filter: Option<FindingFilter>) -> Result<Vec<Finding>, StorageError> {
        let filter = filter.unwrap_or_default();
        let mut findings = Vec::new();
        for path in self.batch_files()? {
            let batch = self.read_batch(&path)?;
            findings.extend(batch.findings.into_iter().filter(|f| filter.matches(f)));
        }
        findings.sort_by_key(|f| f.captured_at_epoch_millis);
        debug!("Loaded {} finding(s) after filter", findings.len());
        Ok(findings)
    }

    fn cleanup_old_findings(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = older_than.timestamp_millis();
        let mut removed = 0usize;
        for path in self.batch_files()? {
            let mut batch = self.read_batch(&path)?;
            let before = batch.findings.len();
            batch.findings.retain(|f| f.captured_at_epoch_millis >= cutoff);
            let dropped = before - batch.findings.len();
            if dropped == 0 {
                continue;
            }
            removed += dropped;
            if batch.findings.is_empty() {
                fs::remove_file(&path).map_err(|e| {
                    error!("Failed to remove {}: {}", path.display(), e);
                    StorageError::WriteFailed
                })?;
            } else {
                self.write_batch(&path, &batch)?;
            }
        }
        info!(
            "Removed {} old finding(s) (cutoff: {})",
            removed,
            older_than.to_rfc3339()
        );
        Ok(removed)
    }
}
