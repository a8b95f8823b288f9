use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use banter_telemetry::SessionMetrics;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::transport::{ChatError, ChatTransport};

/// How often the backend's model configuration is re-checked.
pub const STATUS_POLL_PERIOD: Duration = Duration::from_secs(30);

pub const NOT_CONFIGURED_LABEL: &str = "API Not Configured";
pub const OFFLINE_LABEL: &str = "API Offline";

/// Wire shape of GET /api/v1/models. Every field defaults so a backend
/// that omits one reads as unconfigured instead of failing the poll.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub using_openai: bool,
    #[serde(default)]
    pub openai_api_configured: bool,
    #[serde(default)]
    pub openai_model: String,
}

/// What the status line shows about the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub backend_configured: bool,
    pub provider_label: String,
}

impl StatusSnapshot {
    pub fn offline() -> Self {
        Self {
            backend_configured: false,
            provider_label: OFFLINE_LABEL.to_string(),
        }
    }
}

/// Maps the models payload to a status line. Both flags must be set
/// before the provider is reported as active.
pub fn map_models_response(models: &ModelsResponse) -> StatusSnapshot {
    if models.using_openai && models.openai_api_configured {
        StatusSnapshot {
            backend_configured: true,
            provider_label: format!("Using OpenAI: {}", models.openai_model),
        }
    } else {
        StatusSnapshot {
            backend_configured: false,
            provider_label: NOT_CONFIGURED_LABEL.to_string(),
        }
    }
}

/// Periodic backend status check. Publishes every result over a watch
/// channel and exits once the last receiver is gone.
pub struct StatusPoller {
    transport: Arc<dyn ChatTransport>,
    updates: watch::Sender<StatusSnapshot>,
    metrics: SessionMetrics,
}

impl StatusPoller {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        updates: watch::Sender<StatusSnapshot>,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            transport,
            updates,
            metrics,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(STATUS_POLL_PERIOD);
        loop {
            ticker.tick().await;
            self.metrics.status_polls.fetch_add(1, Ordering::Relaxed);
            let snapshot = match self.transport.poll_status().await {
                Ok(models) => {
                    debug!(target: "chat", model = %models.openai_model, "model status poll succeeded");
                    map_models_response(&models)
                }
                Err(e) => {
                    warn!(target: "chat", "model status poll failed: {}", e);
                    self.metrics
                        .status_poll_failures
                        .fetch_add(1, Ordering::Relaxed);
                    StatusSnapshot::offline()
                }
            };
            if self.updates.send(snapshot).is_err() {
                debug!(target: "chat", "status receiver dropped, stopping poller");
                break;
            }
        }
    }
}
