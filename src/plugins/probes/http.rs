//! HTTP probe
//!
//! Checks an HTTP(S) endpoint once per cycle.
//!
//! The value is `0` if the server responds with an expected status (any 2xx
//! unless `expected_status` is given) and the body matches `body_pattern`
//! (if set). Connection errors, timeouts and unexpected responses yield
//! `failure_value` (default `1`).
//!
//! With `parse: true` the trimmed response body is read as a floating point
//! number and used as the value instead.
//!
//! Basic authentication can be embedded in the url as `user:password@`.
//!
//! | Name              | Type        | Default | Description                      |
//! |-------------------|-------------|---------|----------------------------------|
//! | `url`             | string      |         | endpoint to check                |
//! | `method`          | string      | `get`   | `get`, `post` or `head`          |
//! | `expected_status` | [int]       | 2xx     | accepted status codes            |
//! | `body_pattern`    | regex       |         | body must match                  |
//! | `parse`           | bool        | false   | use the body as the value        |
//! | `failure_value`   | float       | 1.0     | value reported on failure        |

use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::plugins::{Probe, ProbeContext, parse_options};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    url: String,
    #[serde(default)]
    method: HttpMethod,
    expected_status: Option<Vec<u16>>,
    body_pattern: Option<String>,
    #[serde(default)]
    parse: bool,
    #[serde(default = "default_failure_value")]
    failure_value: f64,
}

fn default_failure_value() -> f64 {
    1.0
}

pub struct HttpProbe {
    url: reqwest::Url,
    method: HttpMethod,
    expected_status: Option<Vec<u16>>,
    body_pattern: Option<Regex>,
    parse: bool,
    failure_value: f64,

    /// HTTP client (reused across probes)
    client: reqwest::Client,
}

impl fmt::Display for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe:http:{}", self.url)
    }
}

impl HttpProbe {
    /// Execute the HTTP request
    ///
    /// Returns (status_code, body) on success
    async fn execute_request(&self, ctx: &ProbeContext) -> Result<(u16, String)> {
        let method = match self.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let response = self
            .client
            .request(method, self.url.clone())
            .timeout(ctx.remaining())
            .send()
            .await
            .context("HTTP request failed")?;

        let status_code = response.status().as_u16();

        // Get body (skip for HEAD requests)
        let body = if matches!(self.method, HttpMethod::Head) {
            String::new()
        } else {
            response
                .text()
                .await
                .context("failed to read response body")?
        };

        Ok((status_code, body))
    }

    /// Maps a response to the probe value
    fn evaluate_response(&self, status_code: u16, body: &str) -> f64 {
        let status_ok = if let Some(ref expected) = self.expected_status {
            expected.contains(&status_code)
        } else {
            (200..300).contains(&status_code)
        };

        if !status_ok {
            debug!("unexpected status code {status_code} from {}", self.url);
            return self.failure_value;
        }

        if let Some(ref pattern) = self.body_pattern
            && !pattern.is_match(body)
        {
            debug!("body of {} does not match {}", self.url, pattern);
            return self.failure_value;
        }

        if self.parse {
            return match body.trim().parse::<f64>() {
                Ok(value) => value,
                Err(e) => {
                    debug!("body of {} is not a number: {e}", self.url);
                    self.failure_value
                }
            };
        }

        0.0
    }
}

#[async_trait]
impl Probe for HttpProbe {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn probe(&self, ctx: &ProbeContext) -> f64 {
        let check = async {
            match self.execute_request(ctx).await {
                Ok((status_code, body)) => self.evaluate_response(status_code, &body),
                Err(e) => {
                    debug!("{e:#}");
                    self.failure_value
                }
            }
        };

        let value = ctx.run(check, self.failure_value).await;
        trace!("value {value}");
        value
    }
}

pub fn construct(params: &Value) -> anyhow::Result<Box<dyn Probe>> {
    let options: Options = parse_options("probe:http", params)?;

    let url = reqwest::Url::parse(&options.url)
        .with_context(|| format!("invalid url: {}", options.url))?;

    let body_pattern = options
        .body_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid body_pattern")?;

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    Ok(Box::new(HttpProbe {
        url,
        method: options.method,
        expected_status: options.expected_status,
        body_pattern,
        parse: options.parse,
        failure_value: options.failure_value,
        client,
    }))
}
