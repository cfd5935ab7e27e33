use anyhow::Context;
use clap::Parser;
use flat_etl::core::trigger;
use flat_etl::domain::model::{JobRecord, JobRequest};
use flat_etl::utils::{logger, validation::Validate};
use flat_etl::{CliConfig, FlattenPipeline, JobCoordinator, JobTracker, LocalJobStore, LocalStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting flat-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    let reference_id = config
        .reference_id
        .clone()
        .unwrap_or_else(trigger::generate_reference_id);
    let file_name = std::path::Path::new(&config.input)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    let storage = LocalStorage::new(".".to_string());
    let tracker = JobTracker::new(LocalJobStore::new(config.jobs_path.clone()));

    // The CLI doubles as the trigger source: the job record exists before the
    // coordinator starts work.
    tracker
        .create(JobRecord::new(
            reference_id.clone(),
            Some(config.input.clone()),
            config.email.clone(),
            file_name.clone(),
        ))
        .await
        .context("could not register the job")?;

    let request = JobRequest {
        reference_id: reference_id.clone(),
        input_location: config.input.clone(),
        output_prefix: config.output_path.clone(),
        owner_email: config.email.clone(),
        file_name,
    };

    let coordinator = JobCoordinator::new(FlattenPipeline::new(storage), tracker);

    match coordinator.run(&request).await {
        Ok(output_location) => {
            println!("✅ Job {reference_id} succeeded");
            println!("📁 Output saved to: {output_location}");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Job {reference_id} failed: {e}");
            std::process::exit(1);
        }
    }
}
