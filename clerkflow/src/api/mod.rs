//! HTTP surface of the service.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # Routes
//!
//! - `POST /webhooks/{trigger}`: SVIX-signed Clerk webhook deliveries
//! - `POST /operations/{resource}/{operation}`: Clerk Backend API operations over a batch of items
//! - `GET /healthz`, and `GET /internal/metrics` when metrics are enabled

pub mod handlers;
pub mod models;
