//! HTTP delivery of webhook payloads.

use super::models::WebhookPayload;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// A failed delivery attempt. All variants are transient and retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Webhook request timed out")]
    Timeout,
    #[error("Webhook endpoint responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), DeliveryError>;
}

/// Client for the configured webhook endpoint.
pub struct HttpWebhookSender {
    client: reqwest::Client,
    url: String,
}

impl HttpWebhookSender {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status < 300 {
            Ok(())
        } else {
            Err(DeliveryError::Status(status))
        }
    }
}
