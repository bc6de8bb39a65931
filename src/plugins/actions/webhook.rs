//! Webhook action
//!
//! `POST`s a JSON record to a URL per event. Every URL is optional, an event
//! without one is skipped. Non-2xx responses are errors, so a failing
//! `url_init` keeps the monitor from starting.
//!
//! ```yaml
//! actions:
//!   - type: webhook
//!     params:
//!       url_init: https://alerts.example.com/init
//!       url_fail: https://alerts.example.com/fail
//!       url_recover: https://alerts.example.com/recover
//!       timeout: 10
//!       headers:
//!         X-Api-Key: secret
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::plugins::{Action, parse_options};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    url_init: Option<String>,
    url_fail: Option<String>,
    url_recover: Option<String>,
    #[serde(default = "default_timeout")]
    timeout: u64,
    #[serde(default)]
    headers: HashMap<String, String>,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Init,
    Fail,
    Recover,
}

/// Body of every webhook request
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub monitor: String,
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub message: String,
    pub timestamp: String,
}

impl Payload {
    fn new(monitor: &str, event: Event, message: String) -> Self {
        Self {
            monitor: monitor.to_string(),
            event,
            value: None,
            duration_secs: None,
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub struct WebhookAction {
    url_init: Option<Url>,
    url_fail: Option<Url>,
    url_recover: Option<Url>,
    client: Client,
}

fn display_url(url: &Option<Url>) -> &str {
    url.as_ref().map(Url::as_str).unwrap_or("-")
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "action:webhook:{}:{}:{}",
            display_url(&self.url_init),
            display_url(&self.url_fail),
            display_url(&self.url_recover)
        )
    }
}

impl WebhookAction {
    #[instrument(skip(self, payload), fields(event = ?payload.event))]
    async fn send(&self, url: &Url, payload: &Payload) -> Result<()> {
        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .with_context(|| format!("action:webhook: request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("action:webhook: {url} responded with {status}");
        }

        debug!("sent webhook to {url}");
        Ok(())
    }
}

#[async_trait]
impl Action for WebhookAction {
    async fn init(&self, monitor: &str) -> Result<()> {
        let Some(url) = &self.url_init else {
            return Ok(());
        };

        let payload = Payload::new(
            monitor,
            Event::Init,
            format!("monitor `{monitor}` started"),
        );
        self.send(url, &payload).await
    }

    async fn fail(&self, monitor: &str, value: f64) -> Result<()> {
        let Some(url) = &self.url_fail else {
            return Ok(());
        };

        let mut payload = Payload::new(
            monitor,
            Event::Fail,
            format!("🔴 **Monitor failing**: `{monitor}` reported {value}"),
        );
        payload.value = Some(value);
        self.send(url, &payload).await
    }

    async fn recover(&self, monitor: &str, duration: Duration) -> Result<()> {
        let Some(url) = &self.url_recover else {
            return Ok(());
        };

        let mut payload = Payload::new(
            monitor,
            Event::Recover,
            format!(
                "✅ **Monitor recovered**: `{monitor}` is back to normal after {:.0}s",
                duration.as_secs_f64()
            ),
        );
        payload.duration_secs = Some(duration.as_secs_f64());
        self.send(url, &payload).await
    }
}

fn parse_url(key: &str, url: Option<String>) -> Result<Option<Url>> {
    url.map(|url| {
        Url::parse(&url).with_context(|| format!("action:webhook: invalid {key}: {url}"))
    })
    .transpose()
}

fn header_map(headers: HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("action:webhook: invalid header name {name}"))?;
        let header_value = HeaderValue::from_str(&value)
            .with_context(|| format!("action:webhook: invalid value for header {name}"))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

pub fn construct(params: &Value) -> Result<Box<dyn Action>> {
    let options: Options = parse_options("action:webhook", params)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(options.timeout))
        .default_headers(header_map(options.headers)?)
        .build()
        .context("failed to build HTTP client")?;

    Ok(Box::new(WebhookAction {
        url_init: parse_url("url_init", options.url_init)?,
        url_fail: parse_url("url_fail", options.url_fail)?,
        url_recover: parse_url("url_recover", options.url_recover)?,
        client,
    }))
}
