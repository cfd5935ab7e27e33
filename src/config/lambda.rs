use std::collections::HashMap;
use std::env;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};

use crate::domain::model::{JobRecord, JobUpdate};
use crate::domain::ports::{JobStore, Storage};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_non_empty, Validate};

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub s3_bucket: String,
    pub s3_region: String,
    pub output_prefix: String,
    pub jobs_table: String,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            s3_bucket: env::var("S3_BUCKET").map_err(|_| PipelineError::Config {
                message: "S3_BUCKET environment variable is required".to_string(),
            })?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            output_prefix: env::var("OUTPUT_PREFIX").unwrap_or_else(|_| "flattened".to_string()),
            jobs_table: env::var("JOBS_TABLE").unwrap_or_else(|_| "processing-jobs".to_string()),
        })
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_bucket_name("s3_bucket", &self.s3_bucket)?;
        validate_region("s3_region", &self.s3_region)?;
        validate_non_empty("output_prefix", &self.output_prefix)?;
        validate_non_empty("jobs_table", &self.jobs_table)?;
        Ok(())
    }
}

fn validate_bucket_name(field: &str, bucket: &str) -> Result<()> {
    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(PipelineError::InvalidConfigValue {
            field: field.to_string(),
            reason: "S3 bucket names must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(PipelineError::InvalidConfigValue {
            field: field.to_string(),
            reason: "S3 bucket names may only contain lowercase letters, digits, hyphens, and dots"
                .to_string(),
        });
    }

    if bucket.starts_with('-') || bucket.ends_with('-') {
        return Err(PipelineError::InvalidConfigValue {
            field: field.to_string(),
            reason: "S3 bucket names cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

fn validate_region(field: &str, region: &str) -> Result<()> {
    validate_non_empty(field, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(PipelineError::InvalidConfigValue {
            field: field.to_string(),
            reason: "AWS regions may only contain lowercase letters, digits, and hyphens"
                .to_string(),
        });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

impl Storage for S3Storage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    PipelineError::InputNotFound {
                        location: path.to_string(),
                    }
                } else {
                    PipelineError::transient(format!("S3 get_object failed for '{path}': {service}"))
                }
            })?;

        let data = resp.body.collect().await.map_err(|err| {
            PipelineError::transient(format!("failed to stream S3 object '{path}': {err}"))
        })?;

        Ok(data.into_bytes().to_vec())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(data.to_vec().into())
            .send()
            .await
            .map_err(|err| {
                PipelineError::transient(format!(
                    "S3 put_object failed for '{path}': {}",
                    err.into_service_error()
                ))
            })?;

        Ok(())
    }
}

/// Job records live in a DynamoDB table keyed by `reference_id`. Every write
/// is a conditional, field-scoped expression, so a redundant delivery cannot
/// clobber fields written by another completion path.
#[derive(Debug, Clone)]
pub struct DynamoJobStore {
    client: DynamoClient,
    table: String,
}

impl DynamoJobStore {
    pub fn new(client: DynamoClient, table: String) -> Self {
        Self { client, table }
    }
}

impl JobStore for DynamoJobStore {
    async fn insert_new(&self, record: &JobRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(record_to_item(record)))
            .condition_expression("attribute_not_exists(reference_id)")
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_conditional_check_failed_exception() {
                    PipelineError::DuplicateJob {
                        reference_id: record.reference_id.clone(),
                    }
                } else {
                    PipelineError::transient(format!("DynamoDB put_item failed: {service}"))
                }
            })?;

        Ok(())
    }

    async fn get(&self, reference_id: &str) -> Result<Option<JobRecord>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("reference_id", AttributeValue::S(reference_id.to_string()))
            .send()
            .await
            .map_err(|err| {
                PipelineError::transient(format!(
                    "DynamoDB get_item failed: {}",
                    err.into_service_error()
                ))
            })?;

        resp.item.map(record_from_item).transpose()
    }

    async fn update_fields(&self, reference_id: &str, update: JobUpdate) -> Result<()> {
        // The SET expression covers exactly the supplied fields. `status` is a
        // DynamoDB reserved word, hence the job_status attribute name.
        let mut expression = String::from("SET job_status = :status, updated_at = :updated_at");
        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("reference_id", AttributeValue::S(reference_id.to_string()))
            .condition_expression("attribute_exists(reference_id)")
            .expression_attribute_values(":status", AttributeValue::S(update.status.to_string()))
            .expression_attribute_values(
                ":updated_at",
                AttributeValue::S(update.updated_at.to_rfc3339()),
            );

        if let Some(location) = update.output_location {
            expression.push_str(", output_location = :output_location");
            builder =
                builder.expression_attribute_values(":output_location", AttributeValue::S(location));
        }
        if let Some(message) = update.error_message {
            expression.push_str(", error_message = :error_message");
            builder =
                builder.expression_attribute_values(":error_message", AttributeValue::S(message));
        }

        builder
            .update_expression(expression)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_conditional_check_failed_exception() {
                    PipelineError::JobNotFound {
                        reference_id: reference_id.to_string(),
                    }
                } else {
                    PipelineError::transient(format!("DynamoDB update_item failed: {service}"))
                }
            })?;

        Ok(())
    }
}

fn record_to_item(record: &JobRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "reference_id".to_string(),
        AttributeValue::S(record.reference_id.clone()),
    );
    item.insert(
        "job_status".to_string(),
        AttributeValue::S(record.status.to_string()),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(record.updated_at.to_rfc3339()),
    );

    for (name, value) in [
        ("input_location", &record.input_location),
        ("output_location", &record.output_location),
        ("error_message", &record.error_message),
        ("owner_email", &record.owner_email),
        ("file_name", &record.file_name),
    ] {
        if let Some(value) = value {
            item.insert(name.to_string(), AttributeValue::S(value.clone()));
        }
    }

    item
}

fn record_from_item(item: HashMap<String, AttributeValue>) -> Result<JobRecord> {
    Ok(JobRecord {
        reference_id: required_string(&item, "reference_id")?,
        status: required_string(&item, "job_status")?.parse()?,
        created_at: parse_timestamp(&required_string(&item, "created_at")?)?,
        updated_at: parse_timestamp(&required_string(&item, "updated_at")?)?,
        input_location: optional_string(&item, "input_location"),
        output_location: optional_string(&item, "output_location"),
        error_message: optional_string(&item, "error_message"),
        owner_email: optional_string(&item, "owner_email"),
        file_name: optional_string(&item, "file_name"),
    })
}

fn required_string(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String> {
    item.get(name)
        .and_then(|attr| attr.as_s().ok())
        .cloned()
        .ok_or_else(|| PipelineError::Config {
            message: format!("job item is missing string attribute '{name}'"),
        })
}

fn optional_string(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|attr| attr.as_s().ok()).cloned()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| PipelineError::Config {
            message: format!("invalid timestamp '{raw}': {err}"),
        })
}
