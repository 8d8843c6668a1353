//! Order status policy and the storage-backed order lifecycle.

pub mod order;
pub mod policy;

pub use order::{OrderStateError, OrderStateMachine, PlacedOrder};
pub use policy::OrderStatusPolicy;
