use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DAG_ID: &str = "etl_taskflow_pipeline";
pub const DEFAULT_RECIPIENT: &str = "team@example.com";
pub const DEFAULT_SUBJECT: &str = "ETL Pipeline Report";
pub const DEFAULT_HTML_CONTENT: &str = "<h3>ETL Pipeline Completed Successfully</h3>";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    pub dag: DagSection,
    pub source: SourceConfig,
    pub load: LoadConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DagSection {
    pub dag_id: String,
    pub start_date: NaiveDate,
    pub schedule: String,
    pub catchup: bool,
    pub tags: Vec<String>,
}

impl Default for DagSection {
    fn default() -> Self {
        Self {
            dag_id: DEFAULT_DAG_ID.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            schedule: "@daily".to_string(),
            catchup: false,
            tags: vec!["etl".to_string(), "taskflow".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// 內建的三筆固定資料
    #[default]
    Builtin,
    /// 從 Storage 讀取 `name,score` CSV
    Csv { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub export_csv: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            export_csv: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Log,
    Http,
    Outbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub to: String,
    pub subject: String,
    pub html_content: String,
    pub transport: TransportKind,
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            to: DEFAULT_RECIPIENT.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            html_content: DEFAULT_HTML_CONTENT.to_string(),
            transport: TransportKind::Log,
            endpoint: None,
            timeout_seconds: 10,
        }
    }
}

impl DagConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RELAY_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("dag.dag_id", &self.dag.dag_id)?;

        if self.dag.schedule != "@daily" {
            return Err(EtlError::InvalidConfigValueError {
                field: "dag.schedule".to_string(),
                value: self.dag.schedule.clone(),
                reason: "Only '@daily' is supported".to_string(),
            });
        }

        if let SourceConfig::Csv { path } = &self.source {
            validation::validate_path("source.path", path)?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;

        validation::validate_email_address("email.to", &self.email.to)?;
        validation::validate_non_empty_string("email.subject", &self.email.subject)?;

        if self.email.transport == TransportKind::Http {
            let endpoint =
                validation::validate_required_field("email.endpoint", &self.email.endpoint)?;
            validation::validate_url("email.endpoint", endpoint)?;
        }

        Ok(())
    }
}

impl ConfigProvider for DagConfig {
    fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn export_csv(&self) -> bool {
        self.load.export_csv
    }
}

impl Validate for DagConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
