pub mod coordinator;
pub mod flatten;
pub mod pipeline;
pub mod tracker;
pub mod trigger;

pub use crate::domain::model::{FlatTable, JobRecord, JobRequest, JobStatus, Scalar};
pub use crate::domain::ports::{JobStore, Pipeline, Storage};
pub use crate::utils::error::Result;
