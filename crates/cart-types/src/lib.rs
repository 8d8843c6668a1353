//! Common types for the CosmicCart order lifecycle.
//!
//! This crate defines the data types shared by the policy, the order
//! service, the dashboard controller and the HTTP API, so every component
//! agrees on statuses, orders and wire formats.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Event types published when orders change.
pub mod events;
/// User-facing notification types.
pub mod notification;
/// Order and order status types.
pub mod order;
/// Registry trait for named, config-selected implementations.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Transition request/result types and dropdown options.
pub mod transition;
/// Configuration validation types for implementation-specific tables.
pub mod validation;

pub use api::*;
pub use events::*;
pub use notification::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use transition::*;
pub use validation::*;
