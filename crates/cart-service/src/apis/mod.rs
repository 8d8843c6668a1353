//! API handlers for the order HTTP server.

pub mod order;
