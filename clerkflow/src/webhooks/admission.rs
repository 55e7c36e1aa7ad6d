//! Admission of inbound Clerk webhook notifications.
//!
//! Every delivery runs through the same linear gate:
//!
//! ```text
//! evaluate()
//!   ├─ skip_verification? ──────────────────────────┐
//!   ├─ svix-id / svix-timestamp / svix-signature     │   → Reject(MissingHeaders)
//!   ├─ |now - timestamp| <= tolerance                │   → Reject(TimestampOutOfTolerance)
//!   ├─ any v1 signature matches                      │   → Reject(InvalidSignature)
//!   ├─ event type selected (always checked) ◄────────┘   → Acknowledge
//!   └─ Accept(TriggerEvent)
//! ```
//!
//! Nothing is remembered between deliveries: duplicates with valid signatures are admitted
//! again, and deduplication is left to whatever consumes the envelope.

use std::borrow::Cow;
use std::collections::HashSet;

use axum::http::{HeaderMap, StatusCode};
use bon::Builder;
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use crate::webhooks::events::{TriggerEvent, event_type_of};
use crate::webhooks::signing;

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

/// Default allowed clock skew between the sender and us
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// A single inbound delivery, as extracted from the HTTP request.
#[derive(Debug, Clone, Default)]
pub struct InboundNotification {
    pub message_id: Option<String>,
    pub timestamp: Option<String>,
    pub signature_header: Option<String>,
    /// Exact bytes received on the wire. When present these are what gets verified.
    pub raw_body: Option<Bytes>,
    /// Parsed JSON body
    pub body: Value,
}

impl InboundNotification {
    /// Pull the SVIX headers out of a request. Header lookup is case-insensitive.
    pub fn from_request_parts(headers: &HeaderMap, raw_body: Bytes, body: Value) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

        Self {
            message_id: header(SVIX_ID_HEADER),
            timestamp: header(SVIX_TIMESTAMP_HEADER),
            signature_header: header(SVIX_SIGNATURE_HEADER),
            raw_body: Some(raw_body),
            body,
        }
    }

    /// The bytes the sender signed: the wire bytes when we have them, otherwise the body
    /// re-serialized in its original key order.
    fn signed_payload(&self) -> Option<Cow<'_, [u8]>> {
        match &self.raw_body {
            Some(raw) => Some(Cow::Borrowed(raw.as_ref())),
            None => serde_json::to_vec(&self.body).ok().map(Cow::Owned),
        }
    }
}

/// Per-trigger verification settings.
#[derive(Debug, Clone, Builder)]
pub struct VerificationConfig {
    /// Signing secret, usually `whsec_` prefixed
    #[builder(into)]
    pub secret: String,
    /// Allowed skew in seconds; `0` means [`DEFAULT_TOLERANCE_SECS`]
    #[builder(default = DEFAULT_TOLERANCE_SECS)]
    pub tolerance_seconds: u64,
    /// Accept unsigned deliveries. Never use this in production.
    #[builder(default)]
    pub skip_verification: bool,
    /// Event types to pass on; empty admits everything
    #[builder(default)]
    pub selected_event_types: HashSet<String>,
}

impl VerificationConfig {
    pub fn effective_tolerance(&self) -> u64 {
        if self.tolerance_seconds == 0 {
            DEFAULT_TOLERANCE_SECS
        } else {
            self.tolerance_seconds
        }
    }

    fn is_selected(&self, event_type: Option<&str>) -> bool {
        if self.selected_event_types.is_empty() {
            return true;
        }
        event_type.is_some_and(|t| self.selected_event_types.contains(t))
    }
}

/// Why a delivery was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("Missing SVIX headers")]
    MissingHeaders,

    #[error("Webhook timestamp is outside tolerance")]
    TimestampOutOfTolerance,

    #[error("Invalid signature")]
    InvalidSignature,
}

impl RejectReason {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Short label used for metrics
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::MissingHeaders => "missing_headers",
            Self::TimestampOutOfTolerance => "timestamp_out_of_tolerance",
            Self::InvalidSignature => "invalid_signature",
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionResult {
    /// Verified and selected: start the workflow with this envelope
    Accept(TriggerEvent),
    /// Verified but the event type is not selected: answer 200 so the sender stops retrying
    Acknowledge,
    /// Failed verification: answer 400
    Reject(RejectReason),
}

/// Evaluate one notification against a trigger's configuration at time `now` (Unix seconds).
pub fn evaluate(notification: &InboundNotification, config: &VerificationConfig, now: i64) -> AdmissionResult {
    if config.skip_verification {
        warn!("Signature verification is disabled for this trigger, admitting unverified webhook");
    } else if let Err(reason) = verify(notification, config, now) {
        debug!(message_id = ?notification.message_id, reason = %reason, "Webhook rejected");
        return AdmissionResult::Reject(reason);
    }

    let event_type = event_type_of(&notification.body);
    if !config.is_selected(event_type) {
        debug!(event_type = ?event_type, "Event type not selected, acknowledging without processing");
        return AdmissionResult::Acknowledge;
    }

    AdmissionResult::Accept(TriggerEvent::from_body(
        &notification.body,
        notification.message_id.as_deref(),
        notification.timestamp.as_deref(),
    ))
}

/// [`evaluate`] against the current wall clock.
pub fn evaluate_now(notification: &InboundNotification, config: &VerificationConfig) -> AdmissionResult {
    evaluate(notification, config, chrono::Utc::now().timestamp())
}

fn verify(notification: &InboundNotification, config: &VerificationConfig, now: i64) -> Result<(), RejectReason> {
    let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);

    let (Some(message_id), Some(timestamp), Some(signature_header)) = (
        non_empty(&notification.message_id),
        non_empty(&notification.timestamp),
        non_empty(&notification.signature_header),
    ) else {
        return Err(RejectReason::MissingHeaders);
    };

    let sent_at: i64 = timestamp.parse().map_err(|_| RejectReason::TimestampOutOfTolerance)?;
    if now.abs_diff(sent_at) > config.effective_tolerance() {
        return Err(RejectReason::TimestampOutOfTolerance);
    }

    let payload = notification.signed_payload().ok_or(RejectReason::InvalidSignature)?;
    if !signing::verify_signature(&message_id, &timestamp, &payload, &signature_header, &config.secret) {
        return Err(RejectReason::InvalidSignature);
    }

    Ok(())
}
