use crate::config::toml_config::{EmailConfig, TransportKind};
use crate::domain::model::{DeliveryReceipt, Notification};
use crate::domain::ports::{EmailTransport, Storage};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// 只寫入日誌，不實際寄送
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notification: &Notification, run_id: &str) -> Result<DeliveryReceipt> {
        tracing::info!(
            "📧 [{}] To: {} | Subject: {} | Body: {}",
            run_id,
            notification.to,
            notification.subject,
            notification.html_content
        );
        Ok(DeliveryReceipt {
            transport: self.name().to_string(),
            to: notification.to.clone(),
            reference: None,
        })
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    to: &'a str,
    subject: &'a str,
    html_content: &'a str,
    run_id: &'a str,
}

/// POST 到郵件轉送服務
pub struct HttpRelayTransport {
    client: Client,
    endpoint: String,
}

impl HttpRelayTransport {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl EmailTransport for HttpRelayTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, notification: &Notification, run_id: &str) -> Result<DeliveryReceipt> {
        tracing::debug!("Posting notification to relay: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RelayRequest {
                to: &notification.to,
                subject: &notification.subject,
                html_content: &notification.html_content,
                run_id,
            })
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Relay response status: {}", status);
        if !status.is_success() {
            return Err(EtlError::NotificationError {
                message: format!("relay {} returned {}", self.endpoint, status),
            });
        }

        // 轉送服務若回傳 {"id": "..."} 就記下來
        let reference = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("id").and_then(|id| id.as_str()).map(str::to_string));

        Ok(DeliveryReceipt {
            transport: self.name().to_string(),
            to: notification.to.clone(),
            reference,
        })
    }
}

/// 把通知以 JSON 寫進 outbox 目錄，由其他程序寄出
pub struct OutboxTransport<S: Storage> {
    storage: S,
}

impl<S: Storage> OutboxTransport<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn outbox_path(run_id: &str) -> String {
        format!("outbox/{}.json", run_id.replace(':', "-"))
    }
}

#[async_trait]
impl<S: Storage> EmailTransport for OutboxTransport<S> {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn send(&self, notification: &Notification, run_id: &str) -> Result<DeliveryReceipt> {
        let path = Self::outbox_path(run_id);
        let body = serde_json::to_vec_pretty(notification)?;
        self.storage.write_file(&path, &body).await?;

        Ok(DeliveryReceipt {
            transport: self.name().to_string(),
            to: notification.to.clone(),
            reference: Some(path),
        })
    }
}

pub fn notification_from_config(config: &EmailConfig) -> Notification {
    Notification {
        to: config.to.clone(),
        subject: config.subject.clone(),
        html_content: config.html_content.clone(),
    }
}

pub fn build_transport<S>(config: &EmailConfig, storage: S) -> Result<Box<dyn EmailTransport>>
where
    S: Storage + 'static,
{
    let transport: Box<dyn EmailTransport> = match config.transport {
        TransportKind::Log => Box::new(LogTransport),
        TransportKind::Http => {
            let endpoint = validate_required_field("email.endpoint", &config.endpoint)?;
            Box::new(HttpRelayTransport::new(
                endpoint.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
        TransportKind::Outbox => Box::new(OutboxTransport::new(storage)),
    };
    tracing::debug!("Using {} email transport", transport.name());
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn notification() -> Notification {
        notification_from_config(&EmailConfig::default())
    }

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let receipt = LogTransport.send(&notification(), "run").await.unwrap();
        assert_eq!(receipt.transport, "log");
        assert_eq!(receipt.to, "team@example.com");
    }

    #[tokio::test]
    async fn test_http_relay_posts_notification() {
        let server = MockServer::start();
        let relay_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/send")
                .json_body(serde_json::json!({
                    "to": "team@example.com",
                    "subject": "ETL Pipeline Report",
                    "html_content": "<h3>ETL Pipeline Completed Successfully</h3>",
                    "run_id": "scheduled__2024-01-02"
                }));
            then.status(202)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": "msg-42"}));
        });

        let transport =
            HttpRelayTransport::new(server.url("/send"), Duration::from_secs(5)).unwrap();
        let receipt = transport
            .send(&notification(), "scheduled__2024-01-02")
            .await
            .unwrap();

        relay_mock.assert();
        assert_eq!(receipt.reference.as_deref(), Some("msg-42"));
    }

    #[tokio::test]
    async fn test_http_relay_error_status() {
        let server = MockServer::start();
        let relay_mock = server.mock(|when, then| {
            when.method(POST).path("/send");
            then.status(503);
        });

        let transport =
            HttpRelayTransport::new(server.url("/send"), Duration::from_secs(5)).unwrap();
        let result = transport.send(&notification(), "run").await;

        relay_mock.assert();
        assert!(matches!(result, Err(EtlError::NotificationError { .. })));
    }

    #[tokio::test]
    async fn test_outbox_writes_json() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
        let transport = OutboxTransport::new(storage);

        let receipt = transport
            .send(&notification(), "scheduled__2024-01-02T00:00:00+00:00")
            .await
            .unwrap();

        let expected = "outbox/scheduled__2024-01-02T00-00-00+00-00.json";
        assert_eq!(receipt.reference.as_deref(), Some(expected));

        let written = std::fs::read(temp_dir.path().join(expected)).unwrap();
        let parsed: Notification = serde_json::from_slice(&written).unwrap();
        assert_eq!(parsed, notification());
    }

    #[test]
    fn test_build_http_transport_without_endpoint() {
        let config = EmailConfig {
            transport: TransportKind::Http,
            ..EmailConfig::default()
        };
        let result = build_transport(&config, LocalStorage::new("./output".to_string()));
        assert!(matches!(result, Err(EtlError::MissingConfigError { .. })));
    }
}
