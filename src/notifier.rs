use crate::config::AppConfig;
use crate::models::AlertEvent;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl Notification {
    pub fn theft_alert(event: &AlertEvent, from: &str, to: &str) -> Self {
        let subject = format!("Fuel theft alert: vehicle {}", event.vehicle_id);
        let html = format!(
            "<h2>Possible fuel theft</h2>\
             <p>{}</p>\
             <ul>\
             <li><strong>Vehicle:</strong> {}</li>\
             <li><strong>Driver:</strong> {}</li>\
             <li><strong>Organization:</strong> {}</li>\
             <li><strong>Detected at:</strong> {}</li>\
             </ul>",
            html_escape(&event.message),
            html_escape(&event.vehicle_id),
            html_escape(&event.driver_id),
            html_escape(event.org_id.as_deref().unwrap_or("n/a")),
            event.timestamp.to_rfc3339(),
        );
        let text = html_unescape(&strip_tags(&html));
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject,
            html,
            text,
        }
    }
}

// Sensor and request payloads are untrusted; every field goes through here.
fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn html_unescape(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Plain-text fallback for clients that do not render HTML.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends mail through an HTTP relay (SES/SendGrid style JSON API).
pub struct HttpMailRelay {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpMailRelay {
    pub fn new(config: &AppConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: config.mail_relay_url.clone(),
            api_key: config.mail_api_key.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpMailRelay {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(notification);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
