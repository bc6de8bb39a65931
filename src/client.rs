//! HTTP client for the control plane, used by the CLI

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::api::types::{ErrorResponse, MonitorInfo, MonitorsResponse, RegisterResponse};
use crate::config::MonitorDefinition;
use crate::monitor::MonitorId;

pub struct ControlClient {
    base_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl ControlClient {
    /// `base_url` without trailing slash, e.g. `http://127.0.0.1:3838`
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            token,
            http_client,
        })
    }

    fn build_authenticated_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1{}", self.base_url, path);
        let mut request = self.http_client.request(method, url);

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!("server error ({status}): {message}")
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .context("failed to decode server response")
    }

    pub async fn list(&self) -> Result<Vec<MonitorInfo>> {
        let response: MonitorsResponse = self
            .json(self.build_authenticated_request(Method::GET, "/monitors"))
            .await?;
        Ok(response.monitors)
    }

    pub async fn register(&self, def: &MonitorDefinition) -> Result<RegisterResponse> {
        let request = self
            .build_authenticated_request(Method::POST, "/monitors")
            .json(def);
        self.json(request).await
    }

    pub async fn show(&self, id: MonitorId) -> Result<MonitorInfo> {
        self.json(self.build_authenticated_request(Method::GET, &format!("/monitors/{id}")))
            .await
    }

    pub async fn start(&self, id: MonitorId) -> Result<MonitorInfo> {
        self.json(self.build_authenticated_request(Method::POST, &format!("/monitors/{id}/start")))
            .await
    }

    pub async fn stop(&self, id: MonitorId) -> Result<MonitorInfo> {
        self.json(self.build_authenticated_request(Method::POST, &format!("/monitors/{id}/stop")))
            .await
    }

    pub async fn unregister(&self, id: MonitorId) -> Result<()> {
        self.send(self.build_authenticated_request(Method::DELETE, &format!("/monitors/{id}")))
            .await?;
        Ok(())
    }
}

/// Fixed-width table of monitors, as printed by `vigil list`
pub fn format_table(monitors: &[MonitorInfo]) -> String {
    let mut table = format!(
        "{:<8}  {:<20}  {:<9}  {:<7}  {:<25}\n",
        "ID", "Name", "Times", "Status", "FailedAt"
    );

    for monitor in monitors {
        let failed_at = monitor
            .failed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        table.push_str(&format!(
            "{:<8}  {:<20}  {:<9}  {:<7}  {:<25}\n",
            monitor.id, monitor.name, monitor.times, monitor.status.as_str(), failed_at
        ));
    }
    table
}
