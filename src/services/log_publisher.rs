//! Best-effort publishing of request/response copies to a log topic.
//!
//! Publishing never blocks and never fails the caller: delivery happens
//! on a spawned task and any error is only logged locally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Sink for audit messages.
pub trait LogPublisher: Send + Sync {
    /// Hand `payload` off for delivery to `topic`. Must not block.
    fn publish(&self, topic: &str, payload: Value);
}

/// Posts each message to `{sink}/topics/{topic}`.
///
/// # Timeout
///
/// 5 seconds per delivery (prevents piling up tasks on a hung sink)
#[derive(Clone)]
pub struct HttpLogPublisher {
    http: reqwest::Client,
    sink: Url,
}

impl HttpLogPublisher {
    pub fn new(sink_url: &str) -> anyhow::Result<Self> {
        let mut sink = Url::parse(sink_url)?;
        if !sink.path().ends_with('/') {
            let path = format!("{}/", sink.path());
            sink.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self { http, sink })
    }

    fn topic_url(&self, topic: &str) -> Result<Url, url::ParseError> {
        self.sink.join(&format!("topics/{topic}"))
    }
}

impl LogPublisher for HttpLogPublisher {
    fn publish(&self, topic: &str, payload: Value) {
        let url = match self.topic_url(topic) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Invalid log topic URL");
                return;
            }
        };

        let http = self.http.clone();
        tokio::spawn(async move {
            match http.post(url.clone()).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(
                        url = %url,
                        status = resp.status().as_u16(),
                        "Log sink rejected message"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to publish log message");
                }
            }
        });
    }
}

/// Writes messages to the local `tracing` output. Used when no sink is configured.
#[derive(Clone, Default)]
pub struct TracingLogPublisher;

impl LogPublisher for TracingLogPublisher {
    fn publish(&self, topic: &str, payload: Value) {
        tracing::debug!(target: "audit", topic, payload = %payload, "Audit message");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageType {
    Request,
    Response,
}

/// What gets published for every request and response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEnvelope {
    pub message: Value,
    pub message_type: MessageType,
    pub date_time: DateTime<Utc>,
}

/// Publisher bound to the configured topic, shared by the audit middleware.
#[derive(Clone)]
pub struct AuditLog {
    publisher: Arc<dyn LogPublisher>,
    topic: String,
}

impl AuditLog {
    pub fn new(publisher: Arc<dyn LogPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    /// Publish one request or response body.
    ///
    /// JSON bodies are embedded as JSON, anything else as a string.
    pub fn record(&self, message_type: MessageType, body: &[u8]) {
        let message = serde_json::from_slice::<Value>(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));

        let envelope = AuditEnvelope {
            message,
            message_type,
            date_time: Utc::now(),
        };

        match serde_json::to_value(&envelope) {
            Ok(payload) => self.publisher.publish(&self.topic, payload),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize audit message"),
        }
    }
}
