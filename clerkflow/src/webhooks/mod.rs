//! Inbound Clerk webhooks.
//!
//! - [`signing`]: HMAC-SHA256 signatures per the SVIX / Standard Webhooks scheme
//! - [`events`]: Clerk event types and the envelope handed to workflows
//! - [`admission`]: header, timestamp, signature and event-type gates for one delivery
//! - [`dispatcher`]: where admitted envelopes go

pub mod admission;
pub mod dispatcher;
pub mod events;
pub mod signing;

pub use admission::{AdmissionResult, InboundNotification, RejectReason, VerificationConfig, evaluate};
pub use dispatcher::{ChannelDispatcher, DispatchError, HttpWorkflowDispatcher, LogDispatcher, WorkflowDispatcher};
pub use events::{ClerkEventType, TriggerEvent};
pub use signing::{generate_secret, sign_payload, verify_signature};
