//! Event types for order lifecycle notifications.
//!
//! The order service publishes these on its event bus so that other parts of
//! the system (logging, dashboards, delivery assignment) can react to changes
//! without being called directly.

use crate::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CartEvent {
	/// Events from the order service.
	Order(OrderEvent),
}

/// Events related to order lifecycle changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order was placed.
	Created { order: Order },
	/// An order moved to a new status.
	StatusChanged {
		order_id: u64,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A status change was refused by the transition policy.
	TransitionRejected {
		order_id: u64,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// An order was removed by its restaurant.
	Deleted { order_id: u64, restaurant_id: u64 },
}
