pub mod etl;
pub mod pipeline;
pub mod scheduler;
pub mod task_store;

pub use crate::domain::model::{GradedRecord, Record, RunSummary};
pub use crate::domain::ports::{ConfigProvider, EmailTransport, Pipeline, Storage};
pub use crate::utils::error::Result;
