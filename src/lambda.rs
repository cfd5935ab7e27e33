use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

use flat_etl::core::trigger;
use flat_etl::domain::model::{JobRecord, JobRequest};
use flat_etl::utils::logger;
use flat_etl::utils::validation::Validate;
use flat_etl::{DynamoJobStore, FlattenPipeline, JobCoordinator, JobTracker, LambdaConfig, S3Storage};

/// The key of the uploaded object; its final path segment follows the
/// `{email}_{filename}` convention. A redelivered event may carry the
/// reference id of the job it already started.
#[derive(Deserialize)]
pub struct Request {
    pub object_key: String,
    pub reference_id: Option<String>,
}

#[derive(Serialize)]
pub struct Response {
    pub message: String,
    pub reference_id: String,
    pub output_location: String,
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    tracing::info!("Starting flatten Lambda function");

    let config = LambdaConfig::from_env().map_err(boxed)?;
    config.validate().map_err(boxed)?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .region(Region::new(config.s3_region.clone()))
        .build();
    let s3_client = S3Client::from_conf(s3_config);
    let dynamo_client = DynamoClient::new(&aws_config);

    let (owner_email, file_name) =
        trigger::parse_object_key(&event.payload.object_key).map_err(boxed)?;
    let redelivered = event.payload.reference_id.is_some();
    let reference_id = event
        .payload
        .reference_id
        .clone()
        .unwrap_or_else(trigger::generate_reference_id);

    let tracker = JobTracker::new(DynamoJobStore::new(dynamo_client, config.jobs_table.clone()));
    if !redelivered {
        tracker
            .create(JobRecord::new(
                reference_id.clone(),
                Some(event.payload.object_key.clone()),
                Some(owner_email.clone()),
                Some(file_name.clone()),
            ))
            .await
            .map_err(boxed)?;
    }

    let request = JobRequest {
        reference_id: reference_id.clone(),
        input_location: event.payload.object_key.clone(),
        output_prefix: config.output_prefix.clone(),
        owner_email: Some(owner_email),
        file_name: Some(file_name),
    };

    let storage = S3Storage::new(s3_client, config.s3_bucket.clone());
    let coordinator = JobCoordinator::new(FlattenPipeline::new(storage), tracker);
    let output_location = coordinator.run(&request).await.map_err(boxed)?;

    tracing::info!("Flatten Lambda function completed successfully");
    Ok(Response {
        message: "File flattened and job recorded".to_string(),
        reference_id,
        output_location,
    })
}

fn boxed(err: flat_etl::PipelineError) -> Error {
    Box::new(err)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
