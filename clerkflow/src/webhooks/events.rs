//! Clerk webhook event types and the envelope handed to workflows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event types Clerk can deliver to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClerkEventType {
    #[serde(rename = "email.created")]
    EmailCreated,
    #[serde(rename = "organization.created")]
    OrganizationCreated,
    #[serde(rename = "organization.deleted")]
    OrganizationDeleted,
    #[serde(rename = "organization.updated")]
    OrganizationUpdated,
    #[serde(rename = "organizationInvitation.accepted")]
    OrganizationInvitationAccepted,
    #[serde(rename = "organizationInvitation.created")]
    OrganizationInvitationCreated,
    #[serde(rename = "organizationInvitation.revoked")]
    OrganizationInvitationRevoked,
    #[serde(rename = "organizationMembership.created")]
    OrganizationMembershipCreated,
    #[serde(rename = "organizationMembership.deleted")]
    OrganizationMembershipDeleted,
    #[serde(rename = "organizationMembership.updated")]
    OrganizationMembershipUpdated,
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.ended")]
    SessionEnded,
    #[serde(rename = "session.removed")]
    SessionRemoved,
    #[serde(rename = "session.revoked")]
    SessionRevoked,
    #[serde(rename = "sms.created")]
    SmsCreated,
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.deleted")]
    UserDeleted,
    #[serde(rename = "user.updated")]
    UserUpdated,
}

impl ClerkEventType {
    pub const ALL: [ClerkEventType; 18] = [
        Self::EmailCreated,
        Self::OrganizationCreated,
        Self::OrganizationDeleted,
        Self::OrganizationUpdated,
        Self::OrganizationInvitationAccepted,
        Self::OrganizationInvitationCreated,
        Self::OrganizationInvitationRevoked,
        Self::OrganizationMembershipCreated,
        Self::OrganizationMembershipDeleted,
        Self::OrganizationMembershipUpdated,
        Self::SessionCreated,
        Self::SessionEnded,
        Self::SessionRemoved,
        Self::SessionRevoked,
        Self::SmsCreated,
        Self::UserCreated,
        Self::UserDeleted,
        Self::UserUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailCreated => "email.created",
            Self::OrganizationCreated => "organization.created",
            Self::OrganizationDeleted => "organization.deleted",
            Self::OrganizationUpdated => "organization.updated",
            Self::OrganizationInvitationAccepted => "organizationInvitation.accepted",
            Self::OrganizationInvitationCreated => "organizationInvitation.created",
            Self::OrganizationInvitationRevoked => "organizationInvitation.revoked",
            Self::OrganizationMembershipCreated => "organizationMembership.created",
            Self::OrganizationMembershipDeleted => "organizationMembership.deleted",
            Self::OrganizationMembershipUpdated => "organizationMembership.updated",
            Self::SessionCreated => "session.created",
            Self::SessionEnded => "session.ended",
            Self::SessionRemoved => "session.removed",
            Self::SessionRevoked => "session.revoked",
            Self::SmsCreated => "sms.created",
            Self::UserCreated => "user.created",
            Self::UserDeleted => "user.deleted",
            Self::UserUpdated => "user.updated",
        }
    }
}

impl std::fmt::Display for ClerkEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClerkEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("Unknown event type: {}", s))
    }
}

/// Normalized event record handed to the workflow dispatcher after admission.
///
/// `timestamp` and `webhook_id` echo the `svix-timestamp` and `svix-id` headers; both are
/// `None` only when verification was skipped and the sender omitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Event type (e.g., "user.created")
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// Event-specific payload, passed through untouched
    pub data: Value,
    /// Object kind from the body, usually "event"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    /// The complete parsed body
    pub raw: Value,
}

impl TriggerEvent {
    /// Build the envelope from a parsed webhook body and its SVIX headers.
    pub fn from_body(body: &Value, message_id: Option<&str>, timestamp: Option<&str>) -> Self {
        Self {
            event_type: event_type_of(body).map(str::to_string),
            data: body.get("data").cloned().unwrap_or(Value::Null),
            object: body.get("object").cloned(),
            timestamp: timestamp.map(str::to_string),
            webhook_id: message_id.map(str::to_string),
            raw: body.clone(),
        }
    }
}

/// The `type` field of a webhook body, if it is a string.
pub fn event_type_of(body: &Value) -> Option<&str> {
    body.get("type").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!("user.created".parse::<ClerkEventType>().unwrap(), ClerkEventType::UserCreated);
        assert_eq!(
            "organizationInvitation.accepted".parse::<ClerkEventType>().unwrap(),
            ClerkEventType::OrganizationInvitationAccepted
        );
        assert!("user.exploded".parse::<ClerkEventType>().is_err());
    }

    #[test]
    fn test_event_type_display_matches_serde() {
        for event in ClerkEventType::ALL {
            let serialized = serde_json::to_value(event).unwrap();
            assert_eq!(serialized, json!(event.to_string()));
        }
    }

    #[test]
    fn test_envelope_serialization() {
        let body = json!({
            "type": "user.created",
            "object": "event",
            "data": {"id": "user_123"}
        });

        let event = TriggerEvent::from_body(&body, Some("msg_1"), Some("1700000000"));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "user.created",
                "data": {"id": "user_123"},
                "object": "event",
                "timestamp": "1700000000",
                "webhookId": "msg_1",
                "raw": body,
            })
        );
    }

    #[test]
    fn test_envelope_without_headers_or_object() {
        let body = json!({"type": "session.ended", "data": {"id": "sess_1"}});

        let event = TriggerEvent::from_body(&body, None, None);
        assert_eq!(event.event_type.as_deref(), Some("session.ended"));
        assert_eq!(event.object, None);
        assert_eq!(event.webhook_id, None);
        assert_eq!(event.timestamp, None);

        // Absent fields are left out of the forwarded envelope rather than sent as null
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "session.ended",
                "data": {"id": "sess_1"},
                "raw": {"type": "session.ended", "data": {"id": "sess_1"}}
            })
        );
        assert_eq!(serde_json::from_value::<TriggerEvent>(wire).unwrap(), event);
    }
}
