//! Telegram Bot API long-polling transport.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skyprice_agents::{AgentReply, ReplySink, ValuationAgent};
use skyprice_core::InboundMessage;
use skyprice_extraction::PropertyExtractor;
use skyprice_pricing::PricePredictor;
use skyprice_storage::LanguageStore;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";
const RETRY_DELAY: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(6);
/// Headroom on top of the long-poll window before a request is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub base_url: String,
    pub poll_timeout_seconds: u64,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_TELEGRAM_BASE_URL.to_string(),
            poll_timeout_seconds: 20,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Total timeout for Bot API requests; always outlasts the long poll.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds) + POLL_GRACE
    }

    /// A client of its own, so the long poll is not cut short by the
    /// timeout the extraction and pricing calls use.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(self.request_timeout())
            .build()
            .context("failed to build telegram http client")
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

impl Update {
    /// Text messages only; the sender id identifies the user, the chat id is
    /// where replies go.
    pub fn inbound(&self) -> Option<(i64, InboundMessage)> {
        let message = self.message.as_ref()?;
        let text = message.text.clone()?;
        let user_id = message
            .from
            .as_ref()
            .map(|sender| sender.id)
            .unwrap_or(message.chat.id);
        Some((
            message.chat.id,
            InboundMessage {
                user_id: user_id.to_string(),
                text,
            },
        ))
    }
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramClient {
    http_client: Client,
    base_url: Url,
    token: String,
    poll_timeout_seconds: u64,
}

impl TelegramClient {
    pub fn new(http_client: Client, config: &TelegramConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid telegram base url `{}`", config.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("telegram base url `{}` cannot be a base", config.base_url);
        }
        Ok(Self {
            http_client,
            base_url,
            token: config.token.clone(),
            poll_timeout_seconds: config.poll_timeout_seconds,
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("telegram base url cannot be a base"))?
            .pop_if_empty()
            .push(&format!("bot{}", self.token))
            .push(method);
        Ok(url)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let response = self
            .http_client
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?;

        let status = response.status();
        let payload: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("telegram {method} returned an unreadable body"))?;

        if !status.is_success() || !payload.ok {
            bail!(
                "telegram {method} failed ({status}): {}",
                payload.description.unwrap_or_default()
            );
        }
        payload
            .result
            .ok_or_else(|| anyhow!("telegram {method} returned no result"))
    }

    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: self.poll_timeout_seconds,
                allowed_updates: ["message"],
            },
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(())
    }
}

struct ChatSink {
    client: TelegramClient,
    chat_id: i64,
}

impl ReplySink for ChatSink {
    async fn deliver(&self, text: &str) {
        if let Err(error) = self.client.send_message(self.chat_id, text).await {
            warn!(chat_id = self.chat_id, error = %error, "failed to send telegram reply");
        }
    }
}

/// Fetches one batch of updates and hands each text message to its own task.
/// Returns the offset for the next poll.
pub async fn poll_once<S, E, P>(
    client: &TelegramClient,
    agent: &ValuationAgent<S, E, P>,
    offset: Option<i64>,
) -> Result<(Option<i64>, Vec<JoinHandle<AgentReply>>)>
where
    S: LanguageStore + 'static,
    E: PropertyExtractor + 'static,
    P: PricePredictor + 'static,
{
    let updates = client.get_updates(offset).await?;
    let mut next_offset = offset;
    let mut handles = Vec::with_capacity(updates.len());

    for update in updates {
        next_offset = Some(next_offset.map_or(update.update_id + 1, |current| {
            current.max(update.update_id + 1)
        }));

        let Some((chat_id, inbound)) = update.inbound() else {
            continue;
        };

        let agent = agent.clone();
        let sink = ChatSink {
            client: client.clone(),
            chat_id,
        };
        handles.push(tokio::spawn(async move {
            agent.handle_inbound_with(inbound, &sink).await
        }));
    }

    Ok((next_offset, handles))
}

pub async fn run_poller<S, E, P>(
    client: TelegramClient,
    agent: Arc<ValuationAgent<S, E, P>>,
) -> Result<()>
where
    S: LanguageStore + 'static,
    E: PropertyExtractor + 'static,
    P: PricePredictor + 'static,
{
    info!("telegram poller started");
    let mut offset = None;
    loop {
        match poll_once(&client, &*agent, offset).await {
            Ok((next_offset, _handles)) => offset = next_offset,
            Err(error) => {
                warn!(error = %error, "telegram poll failed");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
