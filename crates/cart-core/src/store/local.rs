//! In-process order store backed by the order state machine.

use super::{OrderStore, StoreError};
use crate::state::{OrderStateError, OrderStateMachine};
use async_trait::async_trait;
use cart_types::{Order, UpdateOrderStatusRequest};
use std::sync::Arc;

impl From<OrderStateError> for StoreError {
	fn from(err: OrderStateError) -> Self {
		StoreError::Rejected {
			code: err.error_code(),
			message: Some(err.to_string()),
		}
	}
}

/// Calls the order service directly, without a network hop.
#[derive(Clone)]
pub struct LocalOrderStore {
	machine: Arc<OrderStateMachine>,
}

impl LocalOrderStore {
	pub fn new(machine: Arc<OrderStateMachine>) -> Self {
		Self { machine }
	}
}

#[async_trait]
impl OrderStore for LocalOrderStore {
	async fn fetch_order(&self, order_id: u64) -> Result<Order, StoreError> {
		Ok(self.machine.get_order(order_id).await?)
	}

	async fn list_restaurant_orders(&self, restaurant_id: u64) -> Result<Vec<Order>, StoreError> {
		Ok(self.machine.list_restaurant_orders(restaurant_id).await?)
	}

	async fn update_order_status(
		&self,
		request: UpdateOrderStatusRequest,
	) -> Result<Order, StoreError> {
		Ok(self
			.machine
			.transition_order_status(request.order_id, request.status, request.restaurant_id)
			.await?)
	}

	async fn delete_order(&self, restaurant_id: u64, order_id: u64) -> Result<(), StoreError> {
		Ok(self.machine.delete_order(restaurant_id, order_id).await?)
	}
}
