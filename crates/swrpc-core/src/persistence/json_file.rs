//! Audit trail as a pretty-printed JSON array on disk.

use super::{PersistError, ResolvedEvent, ResolvedSink};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::warn;

pub const AUDIT_FILE_NAME: &str = "audit_report.json";

/// Appends resolved events to `<data_dir>/audit_report.json`.
///
/// The file is rewritten through a temporary file and renamed into place, so readers never
/// see a half-written array. A missing, empty or unparsable file starts a fresh array.
pub struct JsonFileSink {
    dir: PathBuf,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let dir = data_dir.into();
        let path = dir.join(AUDIT_FILE_NAME);
        Self { dir, path, write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_existing(&self) -> Result<Vec<Value>, PersistError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "audit file is not a JSON array, starting a new one");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ResolvedSink for JsonFileSink {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn persist(&self, batch: &[ResolvedEvent]) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut records = self.load_existing().await?;
        for event in batch {
            records.push(serde_json::to_value(event)?);
        }

        let encoded = serde_json::to_vec_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}
