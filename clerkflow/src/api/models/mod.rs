//! API request and response data models.

pub mod operations;
pub mod webhooks;
