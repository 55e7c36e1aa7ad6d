//! Handing admitted events to the host's workflow pipeline.
//!
//! ```text
//! receiver handler
//!   └─ dispatcher.dispatch(trigger, envelope).await
//!        ├─ HttpWorkflowDispatcher ──► POST workflow_url, answered before the handler replies
//!        ├─ ChannelDispatcher      ──► mpsc owned by an embedding host
//!        └─ LogDispatcher          ──► tracing only
//! ```
//!
//! Nothing is buffered between the sender and the workflow. If the workflow endpoint fails, is
//! unreachable or is saturated, `dispatch` returns an error and the receiver answers 503, so the
//! webhook sender keeps the event and redelivers it later.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::DispatchConfig;
use crate::webhooks::events::TriggerEvent;

/// Header carrying the trigger name on forwarded envelopes
pub const TRIGGER_HEADER: &str = "x-clerkflow-trigger";

/// Why an envelope was not handed off. Every variant means the event was not delivered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Workflow queue is full")]
    QueueFull,

    #[error("Too many workflow deliveries in flight")]
    Saturated,

    #[error("Workflow dispatcher is shut down")]
    Closed,

    #[error("Workflow endpoint answered HTTP {status}")]
    Rejected { status: u16 },

    #[error("Workflow endpoint unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    fn as_label(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Saturated => "saturated",
            Self::Closed => "closed",
            Self::Rejected { .. } => "rejected",
            Self::Unreachable(_) => "unreachable",
            Self::Serialize(_) => "serialize",
        }
    }
}

impl<T> From<mpsc::error::TrySendError<T>> for DispatchError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => Self::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}

/// Where admitted webhook events go.
///
/// `Ok(())` means the consumer has taken responsibility for the envelope; the receiver only then
/// tells the webhook sender the event was processed.
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    async fn dispatch(&self, trigger: &str, envelope: TriggerEvent) -> Result<(), DispatchError>;
}

// --- HTTP dispatcher ---

/// POSTs each envelope to the configured workflow URL and reports the workflow's answer.
///
/// At most `max_concurrent_sends` deliveries run at once; extra ones fail fast with
/// [`DispatchError::Saturated`] instead of queueing behind a slow workflow.
pub struct HttpWorkflowDispatcher {
    client: reqwest::Client,
    workflow_url: Url,
    in_flight: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl HttpWorkflowDispatcher {
    pub fn new(workflow_url: Url, config: &DispatchConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            workflow_url,
            in_flight: Arc::new(Semaphore::new(config.max_concurrent_sends)),
            shutdown,
        })
    }

    async fn deliver(&self, trigger: &str, envelope: &TriggerEvent) -> Result<(), DispatchError> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::Closed);
        }
        let _permit = self.in_flight.try_acquire().map_err(|_| DispatchError::Saturated)?;
        let body = serde_json::to_string(envelope)?;

        tokio::select! {
            sent = self.post(trigger, body) => sent,
            _ = self.shutdown.cancelled() => Err(DispatchError::Closed),
        }
    }

    async fn post(&self, trigger: &str, body: String) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(self.workflow_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TRIGGER_HEADER, trigger)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected { status: status.as_u16() });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowDispatcher for HttpWorkflowDispatcher {
    #[instrument(skip_all, fields(trigger = %trigger, webhook_id = ?envelope.webhook_id))]
    async fn dispatch(&self, trigger: &str, envelope: TriggerEvent) -> Result<(), DispatchError> {
        let result = self.deliver(trigger, &envelope).await;

        match &result {
            Ok(()) => {
                counter!("clerkflow_workflow_dispatch_total", "outcome" => "delivered").increment(1);
                debug!("Envelope delivered to workflow");
            }
            Err(e) => {
                counter!("clerkflow_workflow_dispatch_total", "outcome" => e.as_label()).increment(1);
                warn!("Envelope not delivered to workflow: {}", e);
            }
        }
        result
    }
}

// --- In-process dispatchers ---

/// Hands `(trigger, envelope)` pairs to a channel owned by an embedding host.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<(String, TriggerEvent)>,
}

impl ChannelDispatcher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(String, TriggerEvent)>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WorkflowDispatcher for ChannelDispatcher {
    async fn dispatch(&self, trigger: &str, envelope: TriggerEvent) -> Result<(), DispatchError> {
        self.tx.try_send((trigger.to_string(), envelope))?;
        Ok(())
    }
}

/// Used when no workflow URL is configured: admitted events are only logged.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl WorkflowDispatcher for LogDispatcher {
    async fn dispatch(&self, trigger: &str, envelope: TriggerEvent) -> Result<(), DispatchError> {
        info!(
            trigger,
            webhook_id = ?envelope.webhook_id,
            event_type = ?envelope.event_type,
            "Webhook event admitted (no workflow_url configured)"
        );
        Ok(())
    }
}
