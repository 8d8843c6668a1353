//! Order types for the CosmicCart platform.
//!
//! This module defines the order record kept by the order service, the
//! payload used to place a new order, and the closed set of statuses an
//! order moves through on its way from the kitchen to the customer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status of an order in the delivery lifecycle.
///
/// The declaration order is the canonical display order used by the status
/// editor and must not be rearranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order has been placed and awaits the restaurant.
	Pending,
	/// Restaurant has accepted the order.
	Accepted,
	/// Restaurant cannot fulfil the order.
	Declined,
	/// Order is being prepared.
	InCooking,
	/// Order has left the kitchen.
	OutForDelivery,
	/// Order was delivered.
	Completed,
	/// Order was cancelled.
	Cancelled,
}

impl OrderStatus {
	/// Every status, in canonical display order.
	pub const ALL: [OrderStatus; 7] = [
		OrderStatus::Pending,
		OrderStatus::Accepted,
		OrderStatus::Declined,
		OrderStatus::InCooking,
		OrderStatus::OutForDelivery,
		OrderStatus::Completed,
		OrderStatus::Cancelled,
	];

	/// The happy path an order follows from placement to delivery.
	pub const PIPELINE: [OrderStatus; 5] = [
		OrderStatus::Pending,
		OrderStatus::Accepted,
		OrderStatus::InCooking,
		OrderStatus::OutForDelivery,
		OrderStatus::Completed,
	];

	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "PENDING",
			OrderStatus::Accepted => "ACCEPTED",
			OrderStatus::Declined => "DECLINED",
			OrderStatus::InCooking => "IN_COOKING",
			OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
			OrderStatus::Completed => "COMPLETED",
			OrderStatus::Cancelled => "CANCELLED",
		}
	}

	/// Human-readable label shown in the status editor.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::Accepted => "Accepted",
			OrderStatus::Declined => "Declined",
			OrderStatus::InCooking => "In Cooking",
			OrderStatus::OutForDelivery => "Out for Delivery",
			OrderStatus::Completed => "Completed",
			OrderStatus::Cancelled => "Cancelled",
		}
	}

	pub fn emoji(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "⏳",
			OrderStatus::Accepted => "✅",
			OrderStatus::Declined => "❌",
			OrderStatus::InCooking => "👨‍🍳",
			OrderStatus::OutForDelivery => "🚚",
			OrderStatus::Completed => "🎉",
			OrderStatus::Cancelled => "🚫",
		}
	}

	/// Returns true for statuses with no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Returns true if an order in this status may be removed by its restaurant.
	pub fn is_deletable(&self) -> bool {
		matches!(
			self,
			OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Declined
		)
	}

	/// Position of the status on the happy path, if it lies on it.
	pub fn pipeline_position(&self) -> Option<usize> {
		Self::PIPELINE.iter().position(|s| s == self)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a string does not name an order status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
	type Err = ParseStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == normalized)
			.ok_or_else(|| ParseStatusError(s.to_string()))
	}
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	/// Menu item this line refers to.
	pub menu_item_id: u64,
	/// Item name at the time the order was placed.
	pub item_name: String,
	pub quantity: u32,
	/// Unit price.
	pub price: Decimal,
}

impl OrderItem {
	/// Price multiplied by quantity.
	pub fn subtotal(&self) -> Decimal {
		self.price * Decimal::from(self.quantity)
	}
}

/// Sums the subtotals of the given lines.
pub fn order_total(items: &[OrderItem]) -> Decimal {
	items.iter().map(OrderItem::subtotal).sum()
}

/// An order as stored by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	#[serde(rename = "orderId")]
	pub id: u64,
	/// Customer who placed the order.
	pub user_id: u64,
	/// Restaurant that fulfils the order.
	pub restaurant_id: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	/// Current status of the order.
	pub status: OrderStatus,
	pub items: Vec<OrderItem>,
	/// Sum of the item subtotals, fixed when the order is placed.
	pub total_amount: Decimal,
	pub delivery_address: String,
	/// Unix timestamp (seconds) when the order was placed.
	pub created_at: u64,
	/// Unix timestamp (seconds) of the last status change.
	pub updated_at: u64,
	/// Unix timestamp (seconds) when the order reached `COMPLETED`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivered_at: Option<u64>,
}

/// Payload for placing a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
	pub user_id: u64,
	pub restaurant_id: u64,
	#[serde(default)]
	pub customer_name: Option<String>,
	pub items: Vec<OrderItem>,
	pub delivery_address: String,
}
