//! Receiver for SVIX-signed Clerk webhook deliveries.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use metrics::counter;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::{
    AppState,
    api::models::webhooks::WebhookReceipt,
    errors::{Error, Result},
    webhooks::{AdmissionResult, InboundNotification, admission::evaluate_now},
};

/// Verify a delivery for `trigger` and hand it to the dispatcher.
///
/// - 404: no such trigger
/// - 400: body is not a JSON object, or admission rejected the delivery
/// - 200 `processed: false`: verified, but the event type is not selected
/// - 200 `processed: true`: the dispatcher took responsibility for the envelope
/// - 503: the dispatcher could not deliver it; Clerk will redeliver
#[instrument(skip_all, fields(trigger = %trigger))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(trigger): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let config = state.triggers.get(&trigger).ok_or_else(|| Error::NotFound {
        resource: "Trigger".to_string(),
        id: trigger.clone(),
    })?;

    let parsed = match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            return Err(Error::BadRequest {
                message: "Invalid JSON body".to_string(),
            });
        }
    };

    let notification = InboundNotification::from_request_parts(&headers, body, parsed);

    match evaluate_now(&notification, config) {
        AdmissionResult::Reject(reason) => {
            counter!("clerkflow_webhook_admissions_total", "trigger" => trigger.clone(), "outcome" => reason.as_label())
                .increment(1);
            warn!(webhook_id = ?notification.message_id, reason = %reason, "Rejected webhook delivery");
            Ok((reason.status_code(), Json(json!({ "error": reason.to_string() }))).into_response())
        }
        AdmissionResult::Acknowledge => {
            counter!("clerkflow_webhook_admissions_total", "trigger" => trigger.clone(), "outcome" => "acknowledged")
                .increment(1);
            Ok(Json(WebhookReceipt::acknowledged()).into_response())
        }
        AdmissionResult::Accept(envelope) => {
            let webhook_id = envelope.webhook_id.clone();
            let event_type = envelope.event_type.clone();

            if let Err(e) = state.dispatcher.dispatch(&trigger, envelope).await {
                counter!("clerkflow_webhook_admissions_total", "trigger" => trigger.clone(), "outcome" => "dispatch_failed")
                    .increment(1);
                warn!(webhook_id = ?webhook_id, "Could not dispatch admitted webhook: {}", e);
                return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": e.to_string() }))).into_response());
            }

            counter!("clerkflow_webhook_admissions_total", "trigger" => trigger.clone(), "outcome" => "accepted").increment(1);
            info!(webhook_id = ?webhook_id, event_type = ?event_type, "Webhook event dispatched");
            Ok(Json(WebhookReceipt::processed()).into_response())
        }
    }
}
