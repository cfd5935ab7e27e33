use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::core::flatten;
use crate::domain::model::{FlatTable, JobRequest};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{PipelineError, Result};

/// Runs the flattening stages against an injected blob store: read and parse
/// the raw record, flatten it, render CSV and persist it under a timestamped
/// output key.
pub struct FlattenPipeline<S: Storage> {
    storage: S,
}

impl<S: Storage> FlattenPipeline<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage> Pipeline for FlattenPipeline<S> {
    async fn extract(&self, request: &JobRequest) -> Result<Value> {
        tracing::debug!(location = %request.input_location, "reading raw input");
        let bytes = self.storage.read_file(&request.input_location).await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            PipelineError::malformed(format!(
                "input at '{}' is not valid JSON: {err}",
                request.input_location
            ))
        })
    }

    async fn transform(&self, record: Value) -> Result<FlatTable> {
        let table = flatten::flatten(&record)?;
        tracing::debug!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            "record flattened"
        );
        Ok(table)
    }

    async fn load(&self, request: &JobRequest, table: FlatTable) -> Result<String> {
        let csv = table.to_csv()?;
        let location = output_location(request);
        self.storage.write_file(&location, csv.as_bytes()).await?;
        tracing::debug!(location = %location, bytes = csv.len(), "flattened output written");
        Ok(location)
    }
}

/// `{prefix}/{email}/{reference_id}_output_{timestamp}.csv`. Jobs without an
/// owner land under `anonymous`.
fn output_location(request: &JobRequest) -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let owner = request.owner_email.as_deref().unwrap_or("anonymous");
    normalize_location(&format!(
        "{}/{}/{}_output_{}.csv",
        request.output_prefix, owner, request.reference_id, timestamp
    ))
}

/// Collapses duplicate slashes and trims the ends so the result is storable
/// as a key without further cleanup.
pub fn normalize_location(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('/').to_string()
}
