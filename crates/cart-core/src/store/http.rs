//! HTTP client for a remote order service.

use super::{OrderStore, StoreError};
use async_trait::async_trait;
use cart_config::DashboardConfig;
use cart_types::{ErrorCode, ErrorResponse, Order, UpdateOrderStatusRequest};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Order store that calls the order service's `/api` endpoints.
#[derive(Clone)]
pub struct HttpOrderStore {
	client: Client,
	base_url: String,
}

impl HttpOrderStore {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
		let client = Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(timeout)
			.build()
			.map_err(|e| StoreError::Transport(e.to_string()))?;

		let base_url = base_url.into().trim_end_matches('/').to_string();
		Ok(Self { client, base_url })
	}

	pub fn from_config(config: &DashboardConfig) -> Result<Self, StoreError> {
		Self::new(
			config.backend_url.clone(),
			Duration::from_secs(config.request_timeout_seconds),
		)
	}

	fn url(&self, path: &str) -> String {
		format!("{}/api{}", self.base_url, path)
	}
}

/// Maps an error response to [`StoreError::Rejected`], preferring the
/// service's structured body over the bare status code.
async fn rejection(response: Response) -> StoreError {
	let status = response.status();
	match response.json::<ErrorResponse>().await {
		Ok(body) => StoreError::Rejected {
			code: body.error,
			message: Some(body.message),
		},
		Err(_) => {
			tracing::debug!(%status, "Error response without a structured body");
			StoreError::Rejected {
				code: code_for_status(status),
				message: None,
			}
		},
	}
}

fn code_for_status(status: StatusCode) -> ErrorCode {
	match status {
		StatusCode::NOT_FOUND => ErrorCode::OrderNotFound,
		StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => ErrorCode::NotAuthorized,
		StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::InvalidRequest,
		_ => ErrorCode::InternalError,
	}
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
	if !response.status().is_success() {
		return Err(rejection(response).await);
	}
	response
		.json::<T>()
		.await
		.map_err(|e| StoreError::InvalidResponse(e.to_string()))
}

fn transport(err: reqwest::Error) -> StoreError {
	StoreError::Transport(err.to_string())
}

#[async_trait]
impl OrderStore for HttpOrderStore {
	async fn fetch_order(&self, order_id: u64) -> Result<Order, StoreError> {
		let response = self
			.client
			.get(self.url(&format!("/orders/{}", order_id)))
			.send()
			.await
			.map_err(transport)?;
		decode(response).await
	}

	async fn list_restaurant_orders(&self, restaurant_id: u64) -> Result<Vec<Order>, StoreError> {
		let response = self
			.client
			.get(self.url(&format!("/restaurants/{}/orders", restaurant_id)))
			.send()
			.await
			.map_err(transport)?;
		decode(response).await
	}

	async fn update_order_status(
		&self,
		request: UpdateOrderStatusRequest,
	) -> Result<Order, StoreError> {
		tracing::debug!(
			order_id = request.order_id,
			status = %request.status,
			"Submitting status change"
		);
		let response = self
			.client
			.put(self.url("/orders/status"))
			.json(&request)
			.send()
			.await
			.map_err(transport)?;
		decode(response).await
	}

	async fn delete_order(&self, restaurant_id: u64, order_id: u64) -> Result<(), StoreError> {
		let response = self
			.client
			.delete(self.url(&format!(
				"/restaurants/{}/orders/{}",
				restaurant_id, order_id
			)))
			.send()
			.await
			.map_err(transport)?;
		if response.status().is_success() {
			Ok(())
		} else {
			Err(rejection(response).await)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cart_types::OrderStatus;
	use rust_decimal::Decimal;
	use wiremock::{
		matchers::{body_json, method, path},
		Mock, MockServer, ResponseTemplate,
	};

	fn order(status: OrderStatus) -> Order {
		Order {
			id: 42,
			user_id: 1,
			restaurant_id: 9,
			customer_name: None,
			status,
			items: vec![],
			total_amount: Decimal::ZERO,
			delivery_address: "1 Nebula Way".into(),
			created_at: 1_700_000_000,
			updated_at: 1_700_000_000,
			delivered_at: None,
		}
	}

	fn store(server: &MockServer) -> HttpOrderStore {
		HttpOrderStore::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
	}

	#[tokio::test]
	async fn test_update_status_success() {
		let server = MockServer::start().await;
		let request = UpdateOrderStatusRequest {
			order_id: 42,
			status: OrderStatus::Accepted,
			restaurant_id: 9,
		};
		Mock::given(method("PUT"))
			.and(path("/api/orders/status"))
			.and(body_json(serde_json::json!({
				"orderId": 42,
				"status": "ACCEPTED",
				"restaurantId": 9
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(order(OrderStatus::Accepted)))
			.mount(&server)
			.await;

		let updated = store(&server).update_order_status(request).await.unwrap();
		assert_eq!(updated.status, OrderStatus::Accepted);
	}

	#[tokio::test]
	async fn test_structured_rejection() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/api/orders/status"))
			.respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
				"error": "INVALID_STATUS_TRANSITION",
				"message": "Invalid status transition from PENDING to COMPLETED"
			})))
			.mount(&server)
			.await;

		let err = store(&server)
			.update_order_status(UpdateOrderStatusRequest {
				order_id: 42,
				status: OrderStatus::Completed,
				restaurant_id: 9,
			})
			.await
			.unwrap_err();
		assert_eq!(err.code(), Some(ErrorCode::InvalidStatusTransition));
		assert_eq!(
			err.service_message(),
			Some("Invalid status transition from PENDING to COMPLETED")
		);
	}

	#[tokio::test]
	async fn test_bare_status_rejection() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/orders/7"))
			.respond_with(ResponseTemplate::new(404))
			.mount(&server)
			.await;
		Mock::given(method("DELETE"))
			.and(path("/api/restaurants/9/orders/42"))
			.respond_with(ResponseTemplate::new(403).set_body_string("nope"))
			.mount(&server)
			.await;

		let store = store(&server);
		let err = store.fetch_order(7).await.unwrap_err();
		assert_eq!(err.code(), Some(ErrorCode::OrderNotFound));
		assert_eq!(err.service_message(), None);

		let err = store.delete_order(9, 42).await.unwrap_err();
		assert_eq!(err.code(), Some(ErrorCode::NotAuthorized));
	}

	#[tokio::test]
	async fn test_unprocessable_body_is_invalid_request() {
		let server = MockServer::start().await;
		Mock::given(method("PUT"))
			.and(path("/api/orders/status"))
			.respond_with(ResponseTemplate::new(422).set_body_string("unknown variant"))
			.mount(&server)
			.await;

		let err = store(&server)
			.update_order_status(UpdateOrderStatusRequest {
				order_id: 42,
				status: OrderStatus::Accepted,
				restaurant_id: 9,
			})
			.await
			.unwrap_err();
		assert_eq!(err.code(), Some(ErrorCode::InvalidRequest));
		assert_eq!(err.service_message(), None);
	}

	#[tokio::test]
	async fn test_list_and_delete() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/restaurants/9/orders"))
			.respond_with(
				ResponseTemplate::new(200).set_body_json(vec![order(OrderStatus::Pending)]),
			)
			.mount(&server)
			.await;
		Mock::given(method("DELETE"))
			.and(path("/api/restaurants/9/orders/42"))
			.respond_with(ResponseTemplate::new(204))
			.mount(&server)
			.await;

		let store = store(&server);
		let orders = store.list_restaurant_orders(9).await.unwrap();
		assert_eq!(orders.len(), 1);
		assert_eq!(orders[0].id, 42);
		store.delete_order(9, 42).await.unwrap();
	}

	#[tokio::test]
	async fn test_malformed_success_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/orders/42"))
			.respond_with(ResponseTemplate::new(200).set_body_string("not json"))
			.mount(&server)
			.await;

		let err = store(&server).fetch_order(42).await.unwrap_err();
		assert!(matches!(err, StoreError::InvalidResponse(_)));
	}
}
