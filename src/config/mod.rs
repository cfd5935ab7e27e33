#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{
    validate_email, validate_location, validate_reference_id, Validate,
};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "flat-etl")]
#[command(about = "Flatten nested JSON records into CSV tables")]
pub struct CliConfig {
    /// JSON file to flatten
    #[arg(long)]
    pub input: String,

    /// Directory the flattened CSV is written under
    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Directory holding one record per job
    #[arg(long, default_value = "./jobs")]
    pub jobs_path: String,

    /// Reference id for the job; generated when omitted
    #[arg(long)]
    pub reference_id: Option<String>,

    /// Owner email recorded on the job
    #[arg(long)]
    pub email: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_location("input", &self.input)?;
        validate_location("output_path", &self.output_path)?;
        validate_location("jobs_path", &self.jobs_path)?;

        if let Some(reference_id) = &self.reference_id {
            validate_reference_id("reference_id", reference_id)?;
        }
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }

        Ok(())
    }
}
