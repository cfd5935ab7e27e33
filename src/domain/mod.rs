pub mod model;
pub mod ports;

pub use model::{FlatTable, JobRecord, JobRequest, JobStatus, Scalar};
pub use ports::{JobStore, Pipeline, Storage};
