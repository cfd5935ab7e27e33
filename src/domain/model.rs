use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::{PipelineError, Result};

/// A terminal cell value in a flattened table.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// Fixed textual encoding for tabular cells: strings as-is, numbers in
    /// canonical decimal form, booleans as `true`/`false`, null as an empty
    /// field.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

/// A rectangular batch of flat rows. Column paths appear in first-seen order
/// and every row has one cell per column; absent cells are `Scalar::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl FlatTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Scalar> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Renders the table as CSV: a header of column paths followed by one
    /// line per row.
    pub fn to_csv(&self) -> Result<String> {
        if self.columns.is_empty() {
            return Ok(String::new());
        }

        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer.write_record(&self.columns)?;
            for row in &self.rows {
                writer.write_record(row.iter().map(Scalar::render))?;
            }
            writer.flush()?;
        }

        String::from_utf8(buf).map_err(|err| PipelineError::Config {
            message: format!("CSV output was not valid UTF-8: {err}"),
        })
    }
}

/// Lifecycle state of a processing job. Terminal states are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Created, Running) | (Running, Succeeded) | (Running, Failed) | (Created, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "CREATED",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREATED" => Ok(JobStatus::Created),
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCEEDED" => Ok(JobStatus::Succeeded),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(PipelineError::Config {
                message: format!("unknown job status '{other}'"),
            }),
        }
    }
}

/// Persistent record of one processing job, keyed by `reference_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub reference_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub input_location: Option<String>,
    pub output_location: Option<String>,
    pub error_message: Option<String>,
    pub owner_email: Option<String>,
    pub file_name: Option<String>,
}

impl JobRecord {
    pub fn new(
        reference_id: String,
        input_location: Option<String>,
        owner_email: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            reference_id,
            status: JobStatus::Created,
            created_at: now,
            updated_at: now,
            input_location,
            output_location: None,
            error_message: None,
            owner_email,
            file_name,
        }
    }
}

/// What the trigger source hands to the coordinator.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub reference_id: String,
    pub input_location: String,
    pub output_prefix: String,
    pub owner_email: Option<String>,
    pub file_name: Option<String>,
}

/// Optional fields a status transition may carry. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionFields {
    pub output_location: Option<String>,
    pub error_message: Option<String>,
}

impl TransitionFields {
    pub fn with_output_location(location: impl Into<String>) -> Self {
        Self {
            output_location: Some(location.into()),
            error_message: None,
        }
    }

    pub fn with_error_message(message: impl Into<String>) -> Self {
        Self {
            output_location: None,
            error_message: Some(message.into()),
        }
    }
}

/// Field-scoped update applied by the job store: `status` and `updated_at`
/// always, the optional fields only when supplied.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
    pub output_location: Option<String>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_sinks() {
        for terminal in [JobStatus::Succeeded, JobStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in [
                JobStatus::Created,
                JobStatus::Running,
                JobStatus::Succeeded,
                JobStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn legal_transitions_only() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Created.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Succeeded));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Created.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Created));
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            JobStatus::Created,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&JobStatus::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");
    }

    #[test]
    fn scalar_rendering_matches_the_table_encoding() {
        assert_eq!(Scalar::Null.render(), "");
        assert_eq!(Scalar::Bool(true).render(), "true");
        assert_eq!(Scalar::Number(7.into()).render(), "7");
        assert_eq!(
            Scalar::Number(serde_json::Number::from_f64(2.5).unwrap()).render(),
            "2.5"
        );
        assert_eq!(Scalar::String("a,b".to_string()).render(), "a,b");
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let table = FlatTable {
            columns: vec!["name".to_string(), "note".to_string()],
            rows: vec![vec![
                Scalar::String("Ada".to_string()),
                Scalar::String("first, best".to_string()),
            ]],
        };
        let csv = table.to_csv().unwrap();
        assert_eq!(csv, "name,note\nAda,\"first, best\"\n");
    }

    #[test]
    fn csv_renders_nulls_as_empty_fields() {
        let table = FlatTable {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![Scalar::Number(1.into()), Scalar::Null]],
        };
        assert_eq!(table.to_csv().unwrap(), "a,b\n1,\n");
    }

    #[test]
    fn empty_table_renders_to_nothing() {
        let table = FlatTable {
            columns: vec![],
            rows: vec![],
        };
        assert_eq!(table.to_csv().unwrap(), "");
    }

    #[test]
    fn new_records_start_created() {
        let record = JobRecord::new(
            "REF123456".to_string(),
            Some("uploads/a.json".to_string()),
            Some("ada@example.com".to_string()),
            Some("a.json".to_string()),
        );
        assert_eq!(record.status, JobStatus::Created);
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.output_location.is_none());
        assert!(record.error_message.is_none());
    }
}
