//! Clerk Backend API operations.
//!
//! - [`params`]: camelCase workflow parameters → snake_case request bodies and queries
//! - [`table`]: the `(Resource, Operation)` → endpoint lookup table
//! - [`client`]: authenticated HTTP access with offset pagination
//! - [`operations`]: executing an operation over a batch of items

pub mod client;
pub mod operations;
pub mod params;
pub mod table;

pub use client::ClerkClient;
pub use operations::OperationExecutor;
pub use table::OperationTable;
