//! Access to the order service from the dashboard side.
//!
//! The status editor talks to orders through [`OrderStore`] so the same
//! controller can drive an in-process [`OrderStateMachine`](crate::state::OrderStateMachine)
//! or a remote service over HTTP.

use async_trait::async_trait;
use cart_types::{ErrorCode, Order, UpdateOrderStatusRequest};
use thiserror::Error;

pub mod http;
pub mod local;

pub use http::HttpOrderStore;
pub use local::LocalOrderStore;

/// Errors returned by an [`OrderStore`].
#[derive(Debug, Error)]
pub enum StoreError {
	/// The order service refused the request.
	#[error("Request rejected with {code}")]
	Rejected {
		code: ErrorCode,
		/// Message supplied by the service, if any.
		message: Option<String>,
	},
	/// The order service could not be reached.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The order service answered with a body that could not be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl StoreError {
	/// The service's error code, when the request reached it.
	pub fn code(&self) -> Option<ErrorCode> {
		match self {
			StoreError::Rejected { code, .. } => Some(*code),
			_ => None,
		}
	}

	/// The service's own explanation, when it sent one.
	pub fn service_message(&self) -> Option<&str> {
		match self {
			StoreError::Rejected { message, .. } => message.as_deref(),
			_ => None,
		}
	}
}

/// Order operations used by the status editor.
#[async_trait]
pub trait OrderStore: Send + Sync {
	async fn fetch_order(&self, order_id: u64) -> Result<Order, StoreError>;

	/// Orders of one restaurant, in placement order.
	async fn list_restaurant_orders(&self, restaurant_id: u64) -> Result<Vec<Order>, StoreError>;

	/// Submits a status change; the service re-validates it.
	async fn update_order_status(
		&self,
		request: UpdateOrderStatusRequest,
	) -> Result<Order, StoreError>;

	async fn delete_order(&self, restaurant_id: u64, order_id: u64) -> Result<(), StoreError>;
}
