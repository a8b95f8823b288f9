use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::status::ModelsResponse;

/// Shown in the transcript when the backend answered but could not
/// produce a reply.
pub const APPLICATION_FALLBACK: &str =
    "I'm sorry, I encountered an error processing your request. Please try again.";

/// Shown in the transcript when the backend could not be reached at all.
pub const NETWORK_FALLBACK: &str =
    "I'm sorry, I couldn't connect to the server. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Backend reported failure: {0}")]
    Application(String),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Backend reported success without a reply")]
    MissingResponse,
}

impl ChatError {
    /// The canned transcript line for this failure. Only transport-level
    /// failures get the connectivity wording.
    pub fn user_facing_fallback(&self) -> &'static str {
        match self {
            ChatError::Network(_) => NETWORK_FALLBACK,
            ChatError::Application(_) | ChatError::MissingResponse => APPLICATION_FALLBACK,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Backend access for replies and model status. Object-safe so the
/// coordinator and tests can swap implementations.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends one user message and returns the raw reply text.
    async fn send(&self, message: &str) -> Result<String, ChatError>;

    /// Fetches the backend's model configuration.
    async fn poll_status(&self) -> Result<ModelsResponse, ChatError>;
}

pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatTransport {
    /// No client timeout: a slow backend keeps the pending reply open
    /// rather than fabricating a network failure.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, message: &str) -> Result<String, ChatError> {
        let url = format!("{}/api/v1/chat", self.base_url);
        debug!(target: "chat", %url, "sending chat message");
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;
        // The backend encodes failure in the body, not the HTTP status,
        // so the status code is deliberately not consulted here.
        let body: ChatResponse = response.json().await?;
        if !body.success {
            return Err(ChatError::Application(
                body.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        body.response.ok_or(ChatError::MissingResponse)
    }

    async fn poll_status(&self) -> Result<ModelsResponse, ChatError> {
        let url = format!("{}/api/v1/models", self.base_url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
