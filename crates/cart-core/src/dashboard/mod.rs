//! Restaurant dashboard status editor.
//!
//! Holds the restaurant's cached orders and mediates every status change:
//! the transition policy is checked first so obviously illegal choices never
//! reach the order service, and the service's verdict is then applied to the
//! cache. The cached status only ever reflects what the service confirmed.

use crate::notify::NotificationPresenter;
use crate::state::OrderStatusPolicy;
use crate::store::{OrderStore, StoreError};
use cart_types::{
	ErrorCode, Notification, NotificationKind, Order, OrderStatus, StatusOption,
	TransitionRequest, UpdateOrderStatusRequest,
};
use std::collections::HashSet;
use std::sync::Arc;

const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 4000;

/// Result of [`StatusEditor::request_status_change`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChangeOutcome {
	/// The order is not in the loaded list.
	UnknownOrder,
	/// The requested status is the current one; nothing was sent.
	Unchanged,
	/// The policy refused the change before contacting the service.
	RejectedLocally { message: String },
	/// The service accepted the change.
	Updated(Order),
	/// The service refused the change as an invalid transition.
	RejectedByBackend { message: String },
	/// The update failed for another reason.
	Failed { message: String },
}

/// Result of [`StatusEditor::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
	UnknownOrder,
	/// Only final or declined orders can be removed.
	NotDeletable { status: OrderStatus },
	Deleted,
	Failed { message: String },
}

/// Status editor for one restaurant's dashboard.
pub struct StatusEditor<S: OrderStore> {
	store: S,
	notifier: Arc<dyn NotificationPresenter>,
	policy: OrderStatusPolicy,
	restaurant_id: Option<u64>,
	orders: Vec<Order>,
	/// Orders whose last status change was refused.
	invalid_attempts: HashSet<u64>,
	notification_duration_ms: u64,
}

impl<S: OrderStore> StatusEditor<S> {
	pub fn new(store: S, notifier: Arc<dyn NotificationPresenter>) -> Self {
		Self {
			store,
			notifier,
			policy: OrderStatusPolicy::new(),
			restaurant_id: None,
			orders: Vec::new(),
			invalid_attempts: HashSet::new(),
			notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
		}
	}

	pub fn with_notification_duration(mut self, duration_ms: u64) -> Self {
		self.notification_duration_ms = duration_ms;
		self
	}

	/// Replaces the cache with the restaurant's current orders.
	pub async fn load(&mut self, restaurant_id: u64) -> Result<&[Order], StoreError> {
		match self.store.list_restaurant_orders(restaurant_id).await {
			Ok(orders) => {
				tracing::debug!(restaurant_id, count = orders.len(), "Loaded orders");
				self.restaurant_id = Some(restaurant_id);
				self.orders = orders;
				self.invalid_attempts
					.retain(|id| self.orders.iter().any(|o| o.id == *id));
				Ok(&self.orders)
			},
			Err(e) => {
				tracing::warn!(restaurant_id, error = %e, "Failed to load orders");
				self.notify(
					NotificationKind::Error,
					"Loading failed",
					"Could not load orders. Please refresh the page.",
				);
				Err(e)
			},
		}
	}

	/// Fetches one order into the cache, replacing any stale copy.
	pub async fn refresh_order(&mut self, order_id: u64) -> Result<&Order, StoreError> {
		let order = self.store.fetch_order(order_id).await?;
		let index = match self.orders.iter().position(|o| o.id == order_id) {
			Some(index) => {
				self.orders[index] = order;
				index
			},
			None => {
				self.orders.push(order);
				self.orders.len() - 1
			},
		};
		Ok(&self.orders[index])
	}

	pub fn orders(&self) -> &[Order] {
		&self.orders
	}

	pub fn order(&self, order_id: u64) -> Option<&Order> {
		self.orders.iter().find(|o| o.id == order_id)
	}

	/// Dropdown entries for an order; `None` if the order is not loaded.
	pub fn options_for(&self, order_id: u64) -> Option<Vec<StatusOption>> {
		self.order(order_id)
			.map(|order| self.policy.list_selectable_next_statuses(order.status))
	}

	pub fn has_invalid_attempt(&self, order_id: u64) -> bool {
		self.invalid_attempts.contains(&order_id)
	}

	/// Flow explanation for the order's current status.
	pub fn flow_info(&self, order_id: u64) -> Option<String> {
		self.order(order_id)
			.map(|order| self.policy.status_info(order.status))
	}

	/// Applies a status choice made in the dashboard.
	///
	/// Failed requests are never retried; the user has to choose again.
	pub async fn request_status_change(
		&mut self,
		order_id: u64,
		new_status: OrderStatus,
	) -> StatusChangeOutcome {
		let Some(order) = self.order(order_id) else {
			self.notify(
				NotificationKind::Error,
				"Order not found",
				format!("Order #{} is not in the current list. Please refresh.", order_id),
			);
			return StatusChangeOutcome::UnknownOrder;
		};
		let current = order.status;
		let restaurant_id = self.restaurant_id.unwrap_or(order.restaurant_id);

		let request = TransitionRequest::new(current, new_status);
		if request.is_noop() {
			return StatusChangeOutcome::Unchanged;
		}

		let verdict = self.policy.validate(request);
		if !verdict.allowed {
			tracing::debug!(order_id, from = %current, to = %new_status, "Blocked invalid status change");
			self.invalid_attempts.insert(order_id);
			self.notify(
				NotificationKind::Warning,
				"Invalid status change",
				verdict.reason_if_rejected.clone(),
			);
			return StatusChangeOutcome::RejectedLocally {
				message: verdict.reason_if_rejected,
			};
		}

		let result = self
			.store
			.update_order_status(UpdateOrderStatusRequest {
				order_id,
				status: new_status,
				restaurant_id,
			})
			.await;

		match result {
			Ok(updated) => {
				self.invalid_attempts.remove(&order_id);
				self.notify(
					NotificationKind::Success,
					"Status updated",
					format!(
						"Order #{} is now {} {}",
						order_id,
						updated.status.emoji(),
						updated.status.label()
					),
				);
				if let Some(slot) = self.orders.iter_mut().find(|o| o.id == order_id) {
					*slot = updated.clone();
				}
				StatusChangeOutcome::Updated(updated)
			},
			Err(err) if err.code() == Some(ErrorCode::InvalidStatusTransition) => {
				tracing::warn!(order_id, from = %current, to = %new_status, "Order service rejected status change");
				self.invalid_attempts.insert(order_id);
				let message = match err.service_message() {
					Some(message) => message.to_string(),
					None => format!(
						"Order flow: {}",
						self.policy.explain_rejection(current, new_status)
					),
				};
				self.notify(
					NotificationKind::Error,
					"Invalid status transition",
					message.clone(),
				);
				// Another actor may have moved the order; show what the service holds.
				if let Err(e) = self.refresh_order(order_id).await {
					tracing::warn!(order_id, error = %e, "Could not refresh order after rejection");
				}
				StatusChangeOutcome::RejectedByBackend { message }
			},
			Err(err) => {
				tracing::warn!(order_id, error = %err, "Status update failed");
				let (title, message) = failure_message(order_id, &err);
				self.notify(NotificationKind::Error, title, message.clone());
				StatusChangeOutcome::Failed { message }
			},
		}
	}

	/// Deletes a final or declined order.
	pub async fn delete(&mut self, order_id: u64) -> DeleteOutcome {
		let Some(order) = self.order(order_id) else {
			return DeleteOutcome::UnknownOrder;
		};
		let status = order.status;
		let restaurant_id = self.restaurant_id.unwrap_or(order.restaurant_id);

		if !status.is_deletable() {
			self.notify(
				NotificationKind::Error,
				"Cannot delete order",
				"Only completed, cancelled or declined orders can be deleted.",
			);
			return DeleteOutcome::NotDeletable { status };
		}

		match self.store.delete_order(restaurant_id, order_id).await {
			Ok(()) => {
				self.orders.retain(|o| o.id != order_id);
				self.invalid_attempts.remove(&order_id);
				self.notify(
					NotificationKind::Success,
					"Order deleted",
					format!("Order #{} has been removed.", order_id),
				);
				DeleteOutcome::Deleted
			},
			Err(err) => {
				let message = err
					.service_message()
					.map(str::to_string)
					.unwrap_or_else(|| format!("Could not delete order #{}.", order_id));
				self.notify(NotificationKind::Error, "Delete failed", message.clone());
				DeleteOutcome::Failed { message }
			},
		}
	}

	fn notify(&self, kind: NotificationKind, title: &str, message: impl Into<String>) {
		self.notifier.present(Notification::new(
			kind,
			title,
			message,
			self.notification_duration_ms,
		));
	}
}

fn failure_message(order_id: u64, err: &StoreError) -> (&'static str, String) {
	let fallback = |text: String| {
		err.service_message()
			.map(str::to_string)
			.unwrap_or(text)
	};
	match err.code() {
		Some(ErrorCode::OrderNotFound) => (
			"Order not found",
			fallback(format!(
				"Order #{} no longer exists. Please refresh the list.",
				order_id
			)),
		),
		Some(ErrorCode::NotAuthorized) => (
			"Not authorized",
			fallback("You can only update orders of your own restaurant.".to_string()),
		),
		Some(_) => (
			"Update failed",
			fallback(format!(
				"Could not update order #{}. Please try again.",
				order_id
			)),
		),
		None => (
			"Update failed",
			format!("Could not update order #{}: {}", order_id, err),
		),
	}
}
