use chrono::Utc;

use crate::domain::model::{JobRecord, JobStatus, JobUpdate, TransitionFields};
use crate::domain::ports::JobStore;
use crate::utils::error::{PipelineError, Result};

/// Owns the write path to job records. Everything else may read through
/// [`JobTracker::get`], never mutate.
pub struct JobTracker<J: JobStore> {
    store: J,
}

impl<J: JobStore> JobTracker<J> {
    pub fn new(store: J) -> Self {
        Self { store }
    }

    /// Registers a new job. The insert is conditional on the reference id
    /// being unused; a taken id is a `DuplicateJob` error.
    pub async fn create(&self, record: JobRecord) -> Result<JobRecord> {
        self.store.insert_new(&record).await?;
        tracing::info!(reference_id = %record.reference_id, "job record created");
        Ok(record)
    }

    /// Moves a job to `new_status`, writing only the supplied fields plus
    /// `status` and `updated_at`. Re-delivering a transition the record
    /// already reflects is a no-op, since the event source may deliver the
    /// same completion twice.
    pub async fn transition(
        &self,
        reference_id: &str,
        new_status: JobStatus,
        fields: TransitionFields,
    ) -> Result<()> {
        let current = self
            .store
            .get(reference_id)
            .await?
            .ok_or_else(|| PipelineError::JobNotFound {
                reference_id: reference_id.to_string(),
            })?;

        if current.status == new_status && fields_applied(&current, &fields) {
            tracing::debug!(reference_id, status = %new_status, "transition already applied, skipping");
            return Ok(());
        }

        if !current.status.can_transition_to(new_status) {
            return Err(PipelineError::InvalidTransition {
                reference_id: reference_id.to_string(),
                from: current.status,
                to: new_status,
            });
        }

        let update = JobUpdate {
            status: new_status,
            updated_at: Utc::now(),
            output_location: fields.output_location,
            error_message: fields.error_message,
        };
        self.store.update_fields(reference_id, update).await?;
        tracing::info!(reference_id, status = %new_status, "job transitioned");
        Ok(())
    }

    pub async fn get(&self, reference_id: &str) -> Result<JobRecord> {
        self.store
            .get(reference_id)
            .await?
            .ok_or_else(|| PipelineError::JobNotFound {
                reference_id: reference_id.to_string(),
            })
    }
}

/// True when every field the caller supplied already matches the stored value.
fn fields_applied(record: &JobRecord, fields: &TransitionFields) -> bool {
    let output_applied = fields
        .output_location
        .as_deref()
        .map_or(true, |location| record.output_location.as_deref() == Some(location));
    let error_applied = fields
        .error_message
        .as_deref()
        .map_or(true, |message| record.error_message.as_deref() == Some(message));
    output_applied && error_applied
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct InMemoryJobStore {
        records: Arc<Mutex<HashMap<String, JobRecord>>>,
    }

    impl JobStore for InMemoryJobStore {
        async fn insert_new(&self, record: &JobRecord) -> Result<()> {
            let mut records = self.records.lock().await;
            if records.contains_key(&record.reference_id) {
                return Err(PipelineError::DuplicateJob {
                    reference_id: record.reference_id.clone(),
                });
            }
            records.insert(record.reference_id.clone(), record.clone());
            Ok(())
        }

        async fn get(&self, reference_id: &str) -> Result<Option<JobRecord>> {
            let records = self.records.lock().await;
            Ok(records.get(reference_id).cloned())
        }

        async fn update_fields(&self, reference_id: &str, update: JobUpdate) -> Result<()> {
            let mut records = self.records.lock().await;
            let record =
                records
                    .get_mut(reference_id)
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
            Ok(())
        }
    }

    fn sample_record(reference_id: &str) -> JobRecord {
        JobRecord::new(
            reference_id.to_string(),
            Some("uploads/input.json".to_string()),
            Some("ada@example.com".to_string()),
            Some("input.json".to_string()),
        )
    }

    #[tokio::test]
    async fn create_then_duplicate_fails() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000001")).await.unwrap();

        let err = tracker.create(sample_record("REF000001")).await.unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateJob { .. }));
    }

    #[tokio::test]
    async fn full_lifecycle_created_running_succeeded() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000002")).await.unwrap();

        tracker
            .transition("REF000002", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap();
        tracker
            .transition(
                "REF000002",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap();

        let record = tracker.get("REF000002").await.unwrap();
        assert_eq!(record.status, JobStatus::Succeeded);
        assert_eq!(record.output_location.as_deref(), Some("out/flat.csv"));
    }

    #[tokio::test]
    async fn out_of_order_transition_is_rejected_and_leaves_the_record_unchanged() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000003")).await.unwrap();
        tracker
            .transition("REF000003", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap();
        tracker
            .transition(
                "REF000003",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap();
        let before = tracker.get("REF000003").await.unwrap();

        let err = tracker
            .transition("REF000003", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: JobStatus::Succeeded,
                to: JobStatus::Running,
                ..
            }
        ));
        assert_eq!(tracker.get("REF000003").await.unwrap(), before);
    }

    #[tokio::test]
    async fn created_cannot_jump_straight_to_succeeded() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000004")).await.unwrap();

        let err = tracker
            .transition(
                "REF000004",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(
            tracker.get("REF000004").await.unwrap().status,
            JobStatus::Created
        );
    }

    #[tokio::test]
    async fn created_may_fail_directly() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000005")).await.unwrap();

        tracker
            .transition(
                "REF000005",
                JobStatus::Failed,
                TransitionFields::with_error_message("input missing"),
            )
            .await
            .unwrap();
        let record = tracker.get("REF000005").await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("input missing"));
    }

    #[tokio::test]
    async fn redelivered_terminal_transition_is_a_noop() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000006")).await.unwrap();
        tracker
            .transition("REF000006", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap();
        tracker
            .transition(
                "REF000006",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap();
        let first = tracker.get("REF000006").await.unwrap();

        tracker
            .transition(
                "REF000006",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap();
        // Identical to a single call, updated_at included.
        assert_eq!(tracker.get("REF000006").await.unwrap(), first);
    }

    #[tokio::test]
    async fn terminal_redelivery_with_different_fields_is_rejected() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000007")).await.unwrap();
        tracker
            .transition("REF000007", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap();
        tracker
            .transition(
                "REF000007",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/first.csv"),
            )
            .await
            .unwrap();

        let err = tracker
            .transition(
                "REF000007",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/other.csv"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn partial_update_never_erases_unsupplied_fields() {
        let tracker = JobTracker::new(InMemoryJobStore::default());
        tracker.create(sample_record("REF000008")).await.unwrap();

        // Status-only transition must not clear anything.
        tracker
            .transition("REF000008", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap();
        let record = tracker.get("REF000008").await.unwrap();
        assert_eq!(record.input_location.as_deref(), Some("uploads/input.json"));
        assert_eq!(record.owner_email.as_deref(), Some("ada@example.com"));

        tracker
            .transition(
                "REF000008",
                JobStatus::Succeeded,
                TransitionFields::with_output_location("out/flat.csv"),
            )
            .await
            .unwrap();
        let record = tracker.get("REF000008").await.unwrap();
        assert_eq!(record.output_location.as_deref(), Some("out/flat.csv"));
        assert!(record.error_message.is_none());
        assert_eq!(record.input_location.as_deref(), Some("uploads/input.json"));
    }

    #[tokio::test]
    async fn missing_jobs_are_reported() {
        let tracker = JobTracker::new(InMemoryJobStore::default());

        let err = tracker.get("REF999999").await.unwrap_err();
        assert!(matches!(err, PipelineError::JobNotFound { .. }));

        let err = tracker
            .transition("REF999999", JobStatus::Running, TransitionFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::JobNotFound { .. }));
    }
}
