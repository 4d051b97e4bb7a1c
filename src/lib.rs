pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::email::{build_transport, notification_from_config, LogTransport};
pub use crate::config::{cli::LocalStorage, toml_config::DagConfig};
pub use crate::core::{
    etl::{EtlEngine, RunKind, RunState, RunTracker},
    pipeline::GradingPipeline,
    scheduler::{DailySchedule, Scheduler},
};
pub use crate::domain::model::{
    Grade, GradedRecord, Notification, Record, RunOutcome, RunSummary, TaskId,
};
pub use crate::utils::error::{EtlError, Result};
