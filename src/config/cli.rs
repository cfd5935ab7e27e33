use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::model::{JobRecord, JobUpdate};
use crate::domain::ports::{JobStore, Storage};
use crate::utils::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        match fs::read(self.resolve(path)) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::InputNotFound {
                    location: path.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

/// File-backed job store for local runs: one `{reference_id}.json` per job.
/// Inserts are conditional on the file being absent; updates rewrite only the
/// supplied fields.
#[derive(Debug, Clone)]
pub struct LocalJobStore {
    base_path: String,
}

impl LocalJobStore {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn record_path(&self, reference_id: &str) -> PathBuf {
        Path::new(&self.base_path).join(format!("{reference_id}.json"))
    }

    fn read_record(&self, reference_id: &str) -> Result<Option<JobRecord>> {
        match fs::read(self.record_path(reference_id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_record(&self, record: &JobRecord) -> Result<()> {
        let path = self.record_path(&record.reference_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(record)?)?;
        Ok(())
    }
}

impl JobStore for LocalJobStore {
    async fn insert_new(&self, record: &JobRecord) -> Result<()> {
        if self.record_path(&record.reference_id).exists() {
            return Err(PipelineError::DuplicateJob {
                reference_id: record.reference_id.clone(),
            });
        }
        self.write_record(record)
    }

    async fn get(&self, reference_id: &str) -> Result<Option<JobRecord>> {
        self.read_record(reference_id)
    }

    async fn update_fields(&self, reference_id: &str, update: JobUpdate) -> Result<()> {
        let mut record =
            self.read_record(reference_id)?
                .ok_or_else(|| PipelineError::JobNotFound {
                    reference_id: reference_id.to_string(),
                })?;

        record.status = update.status;
        record.updated_at = update.updated_at;
        if let Some(location) = update.output_location {
            record.output_location = Some(location);
        }
        if let Some(message) = update.error_message {
            record.error_message = Some(message);
        }

        self.write_record(&record)
    }
}
