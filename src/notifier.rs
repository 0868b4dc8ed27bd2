//! Slack webhook delivery for todo digests.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MESSAGE_TITLE: &str = "📋 Todo Summary";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Slack webhook URL is not configured")]
    NotConfigured,
    #[error("failed to send message to Slack: {0}")]
    RequestFailed(String),
    #[error("Slack webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A destination for finished digests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &str) -> Result<(), NotifyError>;
}

/// Posts Block Kit messages to a Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    /// `None` (or a blank URL) yields a notifier that always reports
    /// [`NotifyError::NotConfigured`].
    pub fn new(webhook_url: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, summary: &str) -> Result<(), NotifyError> {
        let url = self.webhook_url.as_deref().ok_or(NotifyError::NotConfigured)?;
        let message = build_message(summary, &Local::now());

        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => format!("<unreadable body: {}>", err.without_url()),
            };
            tracing::warn!(status = status.as_u16(), "slack webhook rejected message");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("summary delivered to slack");
        Ok(())
    }
}

/// Header, verbatim summary and a generation timestamp as Slack blocks.
pub fn build_message<Tz>(summary: &str, generated_at: &DateTime<Tz>) -> Value
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    json!({
        "blocks": [
            {
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": MESSAGE_TITLE,
                    "emoji": true
                }
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": summary
                }
            },
            {
                "type": "context",
                "elements": [
                    {
                        "type": "mrkdwn",
                        "text": format!("Generated at {}", locale_timestamp(generated_at))
                    }
                ]
            }
        ]
    })
}

/// US-style timestamp, e.g. `5/30/2024, 3:04:05 PM`.
fn locale_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn message_has_header_body_and_context() {
        let at = Utc.with_ymd_and_hms(2024, 5, 30, 15, 4, 5).unwrap();
        let message = build_message("*Two* things pending", &at);
        let blocks = message["blocks"].as_array().unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[0]["text"]["text"], "📋 Todo Summary");
        assert_eq!(blocks[1]["type"], "section");
        assert_eq!(blocks[1]["text"]["type"], "mrkdwn");
        assert_eq!(blocks[1]["text"]["text"], "*Two* things pending");
        assert_eq!(blocks[2]["type"], "context");
        assert_eq!(
            blocks[2]["elements"][0]["text"],
            "Generated at 5/30/2024, 3:04:05 PM"
        );
    }

    #[test]
    fn timestamp_uses_the_given_zone() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2025, 1, 2, 0, 30, 0).unwrap();
        assert_eq!(locale_timestamp(&at), "1/2/2025, 12:30:00 AM");
    }

    #[tokio::test]
    async fn unconfigured_notifier_fails_before_any_request() {
        let notifier = SlackNotifier::new(Some("   ".into())).unwrap();
        assert!(!notifier.is_configured());
        assert!(matches!(
            notifier.notify("hello").await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn rejection_with_truncated_body_keeps_the_read_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nshort",
                )
                .await
                .unwrap();
        });

        let notifier = SlackNotifier::new(Some(format!("http://{addr}/hook"))).unwrap();
        match notifier.notify("hello").await {
            Err(NotifyError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.starts_with("<unreadable body:"), "{body}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_request_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let notifier =
            SlackNotifier::new(Some(format!("http://127.0.0.1:{port}/hook"))).unwrap();
        assert!(matches!(
            notifier.notify("hello").await,
            Err(NotifyError::RequestFailed(_))
        ));
    }
}
