pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{
    cli::{LocalJobStore, LocalStorage},
    CliConfig,
};

#[cfg(feature = "lambda")]
pub use config::lambda::{DynamoJobStore, LambdaConfig, S3Storage};

pub use crate::core::{
    coordinator::JobCoordinator, flatten::flatten, pipeline::FlattenPipeline, tracker::JobTracker,
};
pub use utils::error::{PipelineError, Result};
