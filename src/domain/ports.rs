use crate::config::toml_config::SourceConfig;
use crate::domain::model::{DeliveryReceipt, GradedRecord, Notification, Record, RunSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &SourceConfig;
    fn output_path(&self) -> &str;
    fn export_csv(&self) -> bool;
}

/// extract → transform → load 三個資料階段
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<Vec<GradedRecord>>;
    async fn load(&self, data: &[GradedRecord], run_id: &str) -> Result<RunSummary>;
}

/// 寄送通知的外部通道
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, notification: &Notification, run_id: &str) -> Result<DeliveryReceipt>;
}
