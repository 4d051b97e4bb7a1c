use crate::domain::model::TaskId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No output published by task '{task}'")]
    MissingTaskOutput { task: TaskId },

    #[error("Task '{task}' already published its output")]
    DuplicateTaskOutput { task: TaskId },

    #[error("Notification delivery failed: {message}")]
    NotificationError { message: String },

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: TaskId,
        #[source]
        source: Box<EtlError>,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Orchestration,
    Notification,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn task_failed(task: TaskId, source: EtlError) -> Self {
        EtlError::TaskFailed {
            task,
            source: Box::new(source),
        }
    }

    /// 取出最內層的錯誤 (去除 TaskFailed 包裝)
    pub fn root_cause(&self) -> &EtlError {
        match self {
            EtlError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root_cause() {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::MissingTaskOutput { .. } | EtlError::DuplicateTaskOutput { .. } => {
                ErrorCategory::Orchestration
            }
            EtlError::NotificationError { .. } => ErrorCategory::Notification,
            EtlError::IoError(_) => ErrorCategory::System,
            EtlError::TaskFailed { .. } => ErrorCategory::Orchestration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Notification => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Orchestration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the email relay endpoint is reachable and retry",
            ErrorCategory::Data => "Fix the malformed rows in the source table and rerun",
            ErrorCategory::Configuration => "Review the TOML configuration file and CLI flags",
            ErrorCategory::Orchestration => "This is a bug in the task graph, please report it",
            ErrorCategory::Notification => "Check the email transport settings and retry",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::TaskFailed { task, source } => {
                format!("Task '{}' failed: {}", task, source.user_friendly_message())
            }
            EtlError::ProcessingError { message } => format!("Bad input data: {}", message),
            EtlError::NotificationError { message } => {
                format!("Could not send the report email: {}", message)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failed_reports_root_category() {
        let err = EtlError::task_failed(
            TaskId::SendEmail,
            EtlError::NotificationError {
                message: "relay returned 503".to_string(),
            },
        );

        assert_eq!(err.category(), ErrorCategory::Notification);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("send_email"));
        assert!(err.user_friendly_message().contains("relay returned 503"));
    }

    #[test]
    fn test_processing_error_is_high_severity() {
        let err = EtlError::ProcessingError {
            message: "row 2: score 'abc' is not an integer".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
