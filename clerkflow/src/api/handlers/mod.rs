//! HTTP request handlers.
//!
//! - [`trigger`]: webhook admission and dispatch
//! - [`operations`]: Clerk operation execution

pub mod operations;
pub mod trigger;
