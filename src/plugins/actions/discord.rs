use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::plugins::{Action, parse_options};

const RED: u32 = 15158332;
const GREEN: u32 = 3066993;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Options {
    url: String,
    user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Posts failure and recovery embeds to a Discord webhook
pub struct DiscordAction {
    url: Url,
    user_id: Option<String>,
    client: Client,
}

impl fmt::Display for DiscordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the webhook url carries its token, only show the host
        write!(f, "action:discord:{}", self.url.host_str().unwrap_or("-"))
    }
}

impl DiscordAction {
    fn build_fail_embed(monitor: &str, value: f64) -> Embed {
        Embed {
            title: Some("🔴 Monitor Failing".to_string()),
            description: Some(format!("Monitor **{monitor}** left its healthy range!")),
            color: Some(RED),
            fields: vec![EmbedField {
                name: "📊 Value".to_string(),
                value: format!("{value}"),
                inline: true,
            }],
            footer: Some(EmbedFooter {
                text: format!("Monitor: {monitor}"),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    fn build_recover_embed(monitor: &str, duration: Duration) -> Embed {
        Embed {
            title: Some("✅ Monitor Recovered".to_string()),
            description: Some(format!("Monitor **{monitor}** is back to normal")),
            color: Some(GREEN),
            fields: vec![EmbedField {
                name: "⏱️ Failure Duration".to_string(),
                value: format!("{:.0}s", duration.as_secs_f64()),
                inline: true,
            }],
            footer: Some(EmbedFooter {
                text: format!("Monitor: {monitor}"),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    fn message(&self, emoji: &str, monitor: &str, embed: Embed) -> Message {
        let mut message_builder = MessageBuilder::new().add_embed(embed);
        if let Some(user_id) = &self.user_id {
            message_builder = message_builder.content(format!("{emoji} `{monitor}` <@{user_id}>"));
        }
        message_builder.build()
    }

    #[instrument(skip_all)]
    async fn send_message(&self, message: &Message) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(message)
            .send()
            .await
            .context("action:discord: request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("action:discord: message failed with status {status}: {error_text}");
        }

        debug!("sent Discord message");
        Ok(())
    }
}

#[async_trait]
impl Action for DiscordAction {
    async fn init(&self, _monitor: &str) -> Result<()> {
        Ok(())
    }

    async fn fail(&self, monitor: &str, value: f64) -> Result<()> {
        let message = self.message("🔴", monitor, Self::build_fail_embed(monitor, value));
        self.send_message(&message).await
    }

    async fn recover(&self, monitor: &str, duration: Duration) -> Result<()> {
        let message = self.message("✅", monitor, Self::build_recover_embed(monitor, duration));
        self.send_message(&message).await
    }
}

pub fn construct(params: &Value) -> Result<Box<dyn Action>> {
    let options: Options = parse_options("action:discord", params)?;

    let url = Url::parse(&options.url).context("action:discord: invalid url")?;
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    Ok(Box::new(DiscordAction {
        url,
        user_id: options.user_id,
        client,
    }))
}
