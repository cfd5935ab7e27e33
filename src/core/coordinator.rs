use std::fmt;

use crate::core::tracker::JobTracker;
use crate::domain::model::{JobRequest, JobStatus, TransitionFields};
use crate::domain::ports::{JobStore, Pipeline};
use crate::utils::error::{PipelineError, Result};
use crate::utils::retry::{retry_transient, RetryConfig};

/// Progress of one job through the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Started,
    Flattening,
    WritingOutput,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Started => "started",
            Phase::Flattening => "flattening",
            Phase::WritingOutput => "writing_output",
        };
        f.write_str(name)
    }
}

/// Drives one job to a terminal state: extract, flatten, persist, then report
/// the outcome to the job tracker. This is the only place where errors become
/// persisted, caller-visible job state.
pub struct JobCoordinator<P: Pipeline, J: JobStore> {
    pipeline: P,
    tracker: JobTracker<J>,
    retry: RetryConfig,
}

impl<P, J> JobCoordinator<P, J>
where
    P: Pipeline,
    J: JobStore,
{
    pub fn new(pipeline: P, tracker: JobTracker<J>) -> Self {
        Self {
            pipeline,
            tracker,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the job and returns the output location. The job record must
    /// already exist (the trigger source creates it); a re-delivered job that
    /// already succeeded returns its recorded output without re-running.
    pub async fn run(&self, request: &JobRequest) -> Result<String> {
        let record = self.tracker.get(&request.reference_id).await?;
        match record.status {
            JobStatus::Succeeded => {
                tracing::info!(
                    reference_id = %request.reference_id,
                    "job already succeeded, skipping re-delivery"
                );
                return Ok(record.output_location.unwrap_or_default());
            }
            JobStatus::Created => {
                retry_transient(&self.retry, "mark job running", || {
                    self.tracker.transition(
                        &request.reference_id,
                        JobStatus::Running,
                        TransitionFields::default(),
                    )
                })
                .await?;
            }
            // Terminal failures stay failed; attempting to restart one is an
            // ordering bug on the caller's side.
            JobStatus::Failed => {
                return Err(PipelineError::InvalidTransition {
                    reference_id: request.reference_id.clone(),
                    from: JobStatus::Failed,
                    to: JobStatus::Running,
                });
            }
            JobStatus::Running => {}
        }

        match self.execute(request).await {
            Ok(location) => {
                retry_transient(&self.retry, "record job success", || {
                    self.tracker.transition(
                        &request.reference_id,
                        JobStatus::Succeeded,
                        TransitionFields::with_output_location(location.clone()),
                    )
                })
                .await?;
                tracing::info!(reference_id = %request.reference_id, location = %location, "job succeeded");
                Ok(location)
            }
            Err(err) => {
                tracing::error!(reference_id = %request.reference_id, error = %err, "job failed");
                let fields = TransitionFields::with_error_message(err.to_string());
                if let Err(update_err) = retry_transient(&self.retry, "record job failure", || {
                    self.tracker.transition(
                        &request.reference_id,
                        JobStatus::Failed,
                        fields.clone(),
                    )
                })
                .await
                {
                    tracing::error!(
                        reference_id = %request.reference_id,
                        error = %update_err,
                        "could not record the failure on the job record"
                    );
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, request: &JobRequest) -> Result<String> {
        let mut phase = Phase::Started;
        tracing::info!(reference_id = %request.reference_id, phase = %phase, "job accepted");

        phase = Phase::Flattening;
        let raw = retry_transient(&self.retry, "read input", || {
            self.pipeline.extract(request)
        })
        .await?;
        // Flattening is deterministic; a retry would only reproduce the error.
        let table = self.pipeline.transform(raw).await?;
        tracing::info!(
            reference_id = %request.reference_id,
            phase = %phase,
            rows = table.rows.len(),
            "record flattened"
        );

        phase = Phase::WritingOutput;
        let location = retry_transient(&self.retry, "write output", || {
            self.pipeline.load(request, table.clone())
        })
        .await?;
        tracing::info!(
            reference_id = %request.reference_id,
            phase = %phase,
            location = %location,
            "output written"
        );

        Ok(location)
    }
}
