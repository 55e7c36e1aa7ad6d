//! Response bodies for the webhook receiver.

use serde::{Deserialize, Serialize};

/// Body of a 200 answer to Clerk. `processed` is false when the event type is not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
    pub processed: bool,
}

impl WebhookReceipt {
    pub fn processed() -> Self {
        Self {
            received: true,
            processed: true,
        }
    }

    pub fn acknowledged() -> Self {
        Self {
            received: true,
            processed: false,
        }
    }
}
