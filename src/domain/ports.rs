use crate::domain::model::{FlatTable, JobRecord, JobRequest, JobUpdate};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Byte-level access to the blob store holding raw input and flattened output.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Key-value store backing the job tracker, keyed by `reference_id`.
/// Inserts are conditional on the key being absent, updates are field-scoped
/// and conditional on the record existing; there is no full-record overwrite.
pub trait JobStore: Send + Sync {
    fn insert_new(
        &self,
        record: &JobRecord,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn get(
        &self,
        reference_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<JobRecord>>> + Send;
    fn update_fields(
        &self,
        reference_id: &str,
        update: JobUpdate,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, request: &JobRequest) -> Result<Value>;
    async fn transform(&self, record: Value) -> Result<FlatTable>;
    async fn load(&self, request: &JobRequest, table: FlatTable) -> Result<String>;
}
