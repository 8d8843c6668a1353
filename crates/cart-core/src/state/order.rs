//! Order lifecycle service.
//!
//! Authoritative side of the status flow: it owns the stored orders, checks
//! ownership, re-validates every requested transition against the policy and
//! only then persists the change. All mutations are serialised behind one
//! async lock so that two concurrent updates of the same order are applied
//! one after the other, the second being validated against the first's result.
//!
//! Storage has no transactions, so writes are ordered so that an interrupted
//! mutation leaves at most a dangling id in a restaurant or customer index.
//! Listing skips such ids.

use super::policy::OrderStatusPolicy;
use crate::event_bus::EventBus;
use cart_storage::{StorageError, StorageService};
use cart_types::{
	order_total, CartEvent, ErrorCode, NewOrder, Order, OrderEvent, OrderStatus, StorageKey,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

const ORDER_SEQUENCE: &str = "orders";

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(u64),
	#[error("Restaurant {restaurant_id} is not authorized to modify order {order_id}")]
	NotAuthorized { order_id: u64, restaurant_id: u64 },
	#[error("Order {order_id} cannot be deleted while {status}; only COMPLETED, CANCELLED or DECLINED orders can be removed")]
	NotDeletable { order_id: u64, status: OrderStatus },
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
}

impl OrderStateError {
	/// Machine-readable code reported to API clients.
	pub fn error_code(&self) -> ErrorCode {
		match self {
			OrderStateError::Storage(_) => ErrorCode::InternalError,
			OrderStateError::InvalidTransition { .. } => ErrorCode::InvalidStatusTransition,
			OrderStateError::OrderNotFound(_) => ErrorCode::OrderNotFound,
			OrderStateError::NotAuthorized { .. } => ErrorCode::NotAuthorized,
			OrderStateError::NotDeletable { .. } => ErrorCode::OrderNotDeletable,
			OrderStateError::InvalidOrder(_) => ErrorCode::InvalidRequest,
		}
	}
}

impl From<StorageError> for OrderStateError {
	fn from(err: StorageError) -> Self {
		OrderStateError::Storage(err.to_string())
	}
}

/// Result of [`OrderStateMachine::place_order`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedOrder {
	/// A new order was created.
	Created(Order),
	/// The idempotency key was already used; this is the order it created.
	Existing(Order),
}

impl PlacedOrder {
	pub fn into_order(self) -> Order {
		match self {
			PlacedOrder::Created(order) | PlacedOrder::Existing(order) => order,
		}
	}
}

/// Manages stored orders and their status transitions.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	policy: OrderStatusPolicy,
	event_bus: EventBus,
	write_lock: Mutex<()>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self {
			storage,
			policy: OrderStatusPolicy::new(),
			event_bus,
			write_lock: Mutex::new(()),
		}
	}

	pub fn policy(&self) -> &OrderStatusPolicy {
		&self.policy
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Places a new order in `PENDING` with a freshly allocated id.
	pub async fn create_order(&self, new_order: NewOrder) -> Result<Order, OrderStateError> {
		self.place_order(new_order, None)
			.await
			.map(PlacedOrder::into_order)
	}

	/// Places an order, deduplicating on the client's idempotency key.
	///
	/// A key seen before returns the order it created without allocating a
	/// new id. A key whose order has since been deleted is reused.
	#[instrument(skip(self, new_order), fields(restaurant_id = new_order.restaurant_id))]
	pub async fn place_order(
		&self,
		new_order: NewOrder,
		idempotency_key: Option<&str>,
	) -> Result<PlacedOrder, OrderStateError> {
		validate_new_order(&new_order)?;
		let idempotency_key = match idempotency_key.map(str::trim) {
			Some("") => {
				return Err(OrderStateError::InvalidOrder(
					"idempotency key cannot be empty".into(),
				))
			},
			other => other,
		};

		let _guard = self.write_lock.lock().await;

		if let Some(key) = idempotency_key {
			if let Some(existing) = self.order_for_key(key).await? {
				tracing::info!(order_id = existing.id, "Duplicate placement, returning existing order");
				return Ok(PlacedOrder::Existing(existing));
			}
		}

		let id = self.next_order_id().await?;
		let now = now_secs();
		let order = Order {
			id,
			user_id: new_order.user_id,
			restaurant_id: new_order.restaurant_id,
			customer_name: new_order.customer_name,
			status: OrderStatus::Pending,
			total_amount: order_total(&new_order.items),
			items: new_order.items,
			delivery_address: new_order.delivery_address,
			created_at: now,
			updated_at: now,
			delivered_at: None,
		};

		// Indexes and key first; the order record is written last.
		self.push_to_index(StorageKey::RestaurantOrders, order.restaurant_id, id)
			.await?;
		self.push_to_index(StorageKey::UserOrders, order.user_id, id)
			.await?;
		if let Some(key) = idempotency_key {
			self.storage
				.store(StorageKey::IdempotencyKeys.as_str(), key, &id)
				.await?;
		}
		self.storage
			.store(StorageKey::Orders.as_str(), &id.to_string(), &order)
			.await?;

		tracing::info!(
			order_id = id,
			user_id = order.user_id,
			total = %order.total_amount,
			"Order placed"
		);
		self.event_bus.publish(CartEvent::Order(OrderEvent::Created {
			order: order.clone(),
		}));

		Ok(PlacedOrder::Created(order))
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: u64) -> Result<Order, OrderStateError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), &order_id.to_string())
			.await
			.map_err(|e| match e {
				StorageError::NotFound => OrderStateError::OrderNotFound(order_id),
				other => other.into(),
			})
	}

	/// Lists a restaurant's orders in placement order.
	pub async fn list_restaurant_orders(
		&self,
		restaurant_id: u64,
	) -> Result<Vec<Order>, OrderStateError> {
		self.list_indexed(StorageKey::RestaurantOrders, restaurant_id)
			.await
	}

	/// Lists a customer's orders in placement order.
	pub async fn list_user_orders(&self, user_id: u64) -> Result<Vec<Order>, OrderStateError> {
		self.list_indexed(StorageKey::UserOrders, user_id).await
	}

	/// Transitions an order to a new status on behalf of a restaurant.
	///
	/// Requesting the current status returns the order unchanged.
	#[instrument(skip(self, new_status), fields(to = %new_status))]
	pub async fn transition_order_status(
		&self,
		order_id: u64,
		new_status: OrderStatus,
		restaurant_id: u64,
	) -> Result<Order, OrderStateError> {
		let _guard = self.write_lock.lock().await;

		let mut order = self.get_order(order_id).await?;

		if order.restaurant_id != restaurant_id {
			tracing::warn!(
				owner = order.restaurant_id,
				restaurant_id,
				"Unauthorized status update attempt"
			);
			return Err(OrderStateError::NotAuthorized {
				order_id,
				restaurant_id,
			});
		}

		let from = order.status;
		if from == new_status {
			return Ok(order);
		}

		if !self.policy.is_transition_allowed(from, new_status) {
			tracing::warn!(%from, "Invalid status transition");
			self.event_bus
				.publish(CartEvent::Order(OrderEvent::TransitionRejected {
					order_id,
					from,
					to: new_status,
				}));
			return Err(OrderStateError::InvalidTransition {
				from,
				to: new_status,
			});
		}

		let now = now_secs();
		order.status = new_status;
		order.updated_at = now;
		if new_status == OrderStatus::Completed {
			order.delivered_at = Some(now);
		}

		self.storage
			.update(StorageKey::Orders.as_str(), &order_id.to_string(), &order)
			.await?;

		tracing::info!(%from, "Order status updated");
		self.event_bus.publish(CartEvent::Order(OrderEvent::StatusChanged {
			order_id,
			from,
			to: new_status,
		}));

		Ok(order)
	}

	/// Removes a final or declined order owned by `restaurant_id`.
	///
	/// The record goes first; index entries are pruned afterwards.
	pub async fn delete_order(
		&self,
		restaurant_id: u64,
		order_id: u64,
	) -> Result<(), OrderStateError> {
		let _guard = self.write_lock.lock().await;

		let order = self.get_order(order_id).await?;
		if order.restaurant_id != restaurant_id {
			return Err(OrderStateError::NotAuthorized {
				order_id,
				restaurant_id,
			});
		}
		if !order.status.is_deletable() {
			return Err(OrderStateError::NotDeletable {
				order_id,
				status: order.status,
			});
		}

		self.storage
			.remove(StorageKey::Orders.as_str(), &order_id.to_string())
			.await?;
		self.remove_from_index(StorageKey::RestaurantOrders, restaurant_id, order_id)
			.await?;
		self.remove_from_index(StorageKey::UserOrders, order.user_id, order_id)
			.await?;

		tracing::info!(order_id, restaurant_id, status = %order.status, "Order deleted");
		self.event_bus.publish(CartEvent::Order(OrderEvent::Deleted {
			order_id,
			restaurant_id,
		}));

		Ok(())
	}

	/// Allocates the next order id. Callers must hold the write lock.
	async fn next_order_id(&self) -> Result<u64, OrderStateError> {
		let last: u64 = self
			.storage
			.retrieve_optional(StorageKey::Sequences.as_str(), ORDER_SEQUENCE)
			.await?
			.unwrap_or(0);
		let next = last + 1;
		self.storage
			.store(StorageKey::Sequences.as_str(), ORDER_SEQUENCE, &next)
			.await?;
		Ok(next)
	}

	async fn order_for_key(&self, key: &str) -> Result<Option<Order>, OrderStateError> {
		let Some(order_id) = self
			.storage
			.retrieve_optional::<u64>(StorageKey::IdempotencyKeys.as_str(), key)
			.await?
		else {
			return Ok(None);
		};
		match self.get_order(order_id).await {
			Ok(order) => Ok(Some(order)),
			Err(OrderStateError::OrderNotFound(_)) => {
				tracing::warn!(order_id, "Idempotency key points at a missing order");
				Ok(None)
			},
			Err(e) => Err(e),
		}
	}

	async fn list_indexed(
		&self,
		index: StorageKey,
		owner: u64,
	) -> Result<Vec<Order>, OrderStateError> {
		let ids = self.index(index, owner).await?;
		let mut orders = Vec::with_capacity(ids.len());
		for order_id in ids {
			match self.get_order(order_id).await {
				Ok(order) => orders.push(order),
				Err(OrderStateError::OrderNotFound(_)) => {
					tracing::warn!(
						order_id,
						index = index.as_str(),
						owner,
						"Indexed order is missing from storage"
					);
				},
				Err(e) => return Err(e),
			}
		}
		Ok(orders)
	}

	async fn index(&self, index: StorageKey, owner: u64) -> Result<Vec<u64>, OrderStateError> {
		Ok(self
			.storage
			.retrieve_optional(index.as_str(), &owner.to_string())
			.await?
			.unwrap_or_default())
	}

	async fn push_to_index(
		&self,
		index: StorageKey,
		owner: u64,
		order_id: u64,
	) -> Result<(), OrderStateError> {
		let mut ids = self.index(index, owner).await?;
		ids.push(order_id);
		self.storage
			.store(index.as_str(), &owner.to_string(), &ids)
			.await?;
		Ok(())
	}

	async fn remove_from_index(
		&self,
		index: StorageKey,
		owner: u64,
		order_id: u64,
	) -> Result<(), OrderStateError> {
		let mut ids = self.index(index, owner).await?;
		ids.retain(|id| *id != order_id);
		self.storage
			.store(index.as_str(), &owner.to_string(), &ids)
			.await?;
		Ok(())
	}
}

fn validate_new_order(new_order: &NewOrder) -> Result<(), OrderStateError> {
	if new_order.items.is_empty() {
		return Err(OrderStateError::InvalidOrder(
			"an order needs at least one item".into(),
		));
	}
	if let Some(item) = new_order.items.iter().find(|item| item.quantity == 0) {
		return Err(OrderStateError::InvalidOrder(format!(
			"item '{}' has zero quantity",
			item.item_name
		)));
	}
	if new_order.items.iter().any(|item| item.price.is_sign_negative()) {
		return Err(OrderStateError::InvalidOrder(
			"item prices cannot be negative".into(),
		));
	}
	Ok(())
}

fn now_secs() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use async_trait::async_trait;
	use cart_storage::implementations::memory::{MemoryStorage, MemoryStorageSchema};
	use cart_storage::StorageInterface;
	use cart_types::{ConfigSchema, OrderItem};
	use rust_decimal::Decimal;

	pub(crate) fn new_machine() -> OrderStateMachine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		OrderStateMachine::new(storage, EventBus::default())
	}

	pub(crate) fn sample_order(restaurant_id: u64) -> NewOrder {
		NewOrder {
			user_id: 11,
			restaurant_id,
			customer_name: Some("Ada".into()),
			items: vec![
				OrderItem {
					menu_item_id: 1,
					item_name: "Galaxy Burger".into(),
					quantity: 2,
					price: Decimal::new(899, 2),
				},
				OrderItem {
					menu_item_id: 4,
					item_name: "Meteor Fries".into(),
					quantity: 1,
					price: Decimal::new(350, 2),
				},
			],
			delivery_address: "12 Orbit Lane".into(),
		}
	}

	#[tokio::test]
	async fn test_create_order_starts_pending() {
		let machine = new_machine();

		let first = machine.create_order(sample_order(7)).await.unwrap();
		let second = machine.create_order(sample_order(7)).await.unwrap();

		assert_eq!(first.id, 1);
		assert_eq!(second.id, 2);
		assert_eq!(first.status, OrderStatus::Pending);
		assert_eq!(first.total_amount, Decimal::new(2148, 2));
		assert_eq!(machine.get_order(1).await.unwrap(), first);
	}

	#[tokio::test]
	async fn test_create_order_validation() {
		let machine = new_machine();

		let mut empty = sample_order(7);
		empty.items.clear();
		assert!(matches!(
			machine.create_order(empty).await,
			Err(OrderStateError::InvalidOrder(_))
		));

		let mut zero = sample_order(7);
		zero.items[0].quantity = 0;
		let err = machine.create_order(zero).await.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::InvalidRequest);
	}

	#[tokio::test]
	async fn test_full_happy_path() {
		let machine = new_machine();
		let order = machine.create_order(sample_order(7)).await.unwrap();

		let mut events = machine.event_bus().subscribe();
		for status in [
			OrderStatus::Accepted,
			OrderStatus::InCooking,
			OrderStatus::OutForDelivery,
			OrderStatus::Completed,
		] {
			let updated = machine
				.transition_order_status(order.id, status, 7)
				.await
				.unwrap();
			assert_eq!(updated.status, status);
		}

		let completed = machine.get_order(order.id).await.unwrap();
		assert!(completed.delivered_at.is_some());

		match events.recv().await.unwrap() {
			CartEvent::Order(OrderEvent::StatusChanged { from, to, .. }) => {
				assert_eq!(from, OrderStatus::Pending);
				assert_eq!(to, OrderStatus::Accepted);
			},
			other => panic!("unexpected event {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_invalid_transition_is_rejected() {
		let machine = new_machine();
		let order = machine.create_order(sample_order(7)).await.unwrap();

		let err = machine
			.transition_order_status(order.id, OrderStatus::Completed, 7)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::InvalidTransition {
				from: OrderStatus::Pending,
				to: OrderStatus::Completed
			}
		));
		assert_eq!(err.error_code(), ErrorCode::InvalidStatusTransition);
		assert_eq!(
			machine.get_order(order.id).await.unwrap().status,
			OrderStatus::Pending
		);
	}

	#[tokio::test]
	async fn test_same_status_is_noop() {
		let machine = new_machine();
		let order = machine.create_order(sample_order(7)).await.unwrap();

		let unchanged = machine
			.transition_order_status(order.id, OrderStatus::Pending, 7)
			.await
			.unwrap();
		assert_eq!(unchanged, order);
	}

	#[tokio::test]
	async fn test_other_restaurant_cannot_update() {
		let machine = new_machine();
		let order = machine.create_order(sample_order(7)).await.unwrap();

		let err = machine
			.transition_order_status(order.id, OrderStatus::Accepted, 8)
			.await
			.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::NotAuthorized);

		let missing = machine
			.transition_order_status(99, OrderStatus::Accepted, 7)
			.await
			.unwrap_err();
		assert!(matches!(missing, OrderStateError::OrderNotFound(99)));
	}

	#[tokio::test]
	async fn test_concurrent_updates_are_serialised() {
		let machine = Arc::new(new_machine());
		let order = machine.create_order(sample_order(7)).await.unwrap();

		let accept = {
			let machine = machine.clone();
			tokio::spawn(async move {
				machine
					.transition_order_status(order.id, OrderStatus::Accepted, 7)
					.await
			})
		};
		let cancel = {
			let machine = machine.clone();
			tokio::spawn(async move {
				machine
					.transition_order_status(order.id, OrderStatus::Cancelled, 7)
					.await
			})
		};
		let accept = accept.await.unwrap();
		let cancel = cancel.await.unwrap();

		// Cancelling is legal from both PENDING and ACCEPTED, so it always wins;
		// accepting only succeeds if it ran first.
		assert!(cancel.is_ok());
		let final_order = machine.get_order(order.id).await.unwrap();
		assert_eq!(final_order.status, OrderStatus::Cancelled);
		if let Err(e) = accept {
			assert_eq!(e.error_code(), ErrorCode::InvalidStatusTransition);
		}
	}

	#[tokio::test]
	async fn test_delete_rules() {
		let machine = new_machine();
		let active = machine.create_order(sample_order(7)).await.unwrap();
		let declined = machine.create_order(sample_order(7)).await.unwrap();
		machine
			.transition_order_status(declined.id, OrderStatus::Declined, 7)
			.await
			.unwrap();

		let err = machine.delete_order(7, active.id).await.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::OrderNotDeletable);

		let err = machine.delete_order(8, declined.id).await.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::NotAuthorized);

		machine.delete_order(7, declined.id).await.unwrap();
		assert!(matches!(
			machine.get_order(declined.id).await,
			Err(OrderStateError::OrderNotFound(_))
		));

		let remaining = machine.list_restaurant_orders(7).await.unwrap();
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].id, active.id);
	}

	#[tokio::test]
	async fn test_list_orders_per_restaurant() {
		let machine = new_machine();
		machine.create_order(sample_order(7)).await.unwrap();
		machine.create_order(sample_order(3)).await.unwrap();
		machine.create_order(sample_order(7)).await.unwrap();

		let ids: Vec<_> = machine
			.list_restaurant_orders(7)
			.await
			.unwrap()
			.into_iter()
			.map(|o| o.id)
			.collect();
		assert_eq!(ids, vec![1, 3]);
		assert!(machine.list_restaurant_orders(42).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_list_orders_per_user() {
		let machine = new_machine();
		machine.create_order(sample_order(7)).await.unwrap();
		let mut other = sample_order(3);
		other.user_id = 12;
		machine.create_order(other).await.unwrap();
		let declined = machine.create_order(sample_order(3)).await.unwrap();

		let ids = |orders: Vec<Order>| orders.into_iter().map(|o| o.id).collect::<Vec<_>>();
		assert_eq!(ids(machine.list_user_orders(11).await.unwrap()), vec![1, 3]);
		assert_eq!(ids(machine.list_user_orders(12).await.unwrap()), vec![2]);

		machine
			.transition_order_status(declined.id, OrderStatus::Declined, 3)
			.await
			.unwrap();
		machine.delete_order(3, declined.id).await.unwrap();
		assert_eq!(ids(machine.list_user_orders(11).await.unwrap()), vec![1]);
	}

	#[tokio::test]
	async fn test_repeated_idempotency_key_returns_existing_order() {
		let machine = new_machine();
		let mut events = machine.event_bus().subscribe();

		let first = machine
			.place_order(sample_order(7), Some("cart-42"))
			.await
			.unwrap();
		let PlacedOrder::Created(created) = first else {
			panic!("expected a new order");
		};

		let second = machine
			.place_order(sample_order(7), Some(" cart-42 "))
			.await
			.unwrap();
		assert_eq!(second, PlacedOrder::Existing(created.clone()));

		let other = machine
			.place_order(sample_order(7), Some("cart-43"))
			.await
			.unwrap()
			.into_order();
		assert_eq!(other.id, 2);
		assert_eq!(machine.list_restaurant_orders(7).await.unwrap().len(), 2);

		assert!(matches!(
			events.recv().await.unwrap(),
			CartEvent::Order(OrderEvent::Created { order }) if order.id == 1
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			CartEvent::Order(OrderEvent::Created { order }) if order.id == 2
		));

		let err = machine
			.place_order(sample_order(7), Some("  "))
			.await
			.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::InvalidRequest);
	}

	#[tokio::test]
	async fn test_idempotency_key_of_deleted_order_is_reused() {
		let machine = new_machine();
		let first = machine
			.place_order(sample_order(7), Some("cart-9"))
			.await
			.unwrap()
			.into_order();
		machine
			.transition_order_status(first.id, OrderStatus::Cancelled, 7)
			.await
			.unwrap();
		machine.delete_order(7, first.id).await.unwrap();

		let again = machine
			.place_order(sample_order(7), Some("cart-9"))
			.await
			.unwrap();
		assert!(matches!(again, PlacedOrder::Created(ref order) if order.id == 2));
	}

	/// Memory backend whose writes fail for keys under one namespace.
	struct FailingWrites {
		inner: MemoryStorage,
		namespace: &'static str,
	}

	#[async_trait]
	impl StorageInterface for FailingWrites {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			if key.starts_with(&format!("{}:", self.namespace)) {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(MemoryStorageSchema)
		}
	}

	#[tokio::test]
	async fn test_failed_order_write_leaves_lists_readable() {
		let storage = StorageService::new(Box::new(FailingWrites {
			inner: MemoryStorage::new(),
			namespace: StorageKey::Orders.as_str(),
		}));
		let machine = OrderStateMachine::new(Arc::new(storage), EventBus::default());

		let err = machine
			.place_order(sample_order(7), Some("cart-1"))
			.await
			.unwrap_err();
		assert_eq!(err.error_code(), ErrorCode::InternalError);

		assert!(machine.list_restaurant_orders(7).await.unwrap().is_empty());
		assert!(machine.list_user_orders(11).await.unwrap().is_empty());
		assert!(matches!(
			machine.get_order(1).await,
			Err(OrderStateError::OrderNotFound(1))
		));
	}
}
