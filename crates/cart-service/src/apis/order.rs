//! Order endpoints.
//!
//! Every status change goes through the order service, which re-validates
//! it against the transition policy, so handlers only translate between
//! HTTP and the service's results.

use crate::server::AppState;
use axum::{
	extract::{rejection::JsonRejection, Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use cart_core::{OrderStateError, PlacedOrder};
use cart_types::{
	APIError, NewOrder, NextStatusesResponse, Order, OrderFlowResponse, UpdateOrderStatusRequest,
};
use serde_json::{json, Value};

/// Header carrying the client's idempotency key on order placement.
const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Converts an order service error into an API error.
fn api_error(state: &AppState, err: OrderStateError) -> APIError {
	match err {
		OrderStateError::Storage(ref message) => {
			tracing::error!(error = %message, "Order storage failure");
			APIError::internal("Internal error while accessing orders")
		},
		OrderStateError::InvalidTransition { from, to } => {
			let guidance = state.orders.policy().explain_rejection(from, to);
			APIError::new(err.error_code(), err.to_string()).with_details(json!({
				"from": from,
				"to": to,
				"guidance": guidance,
			}))
		},
		other => APIError::new(other.error_code(), other.to_string()),
	}
}

/// Maps a body that failed to parse into the structured error format.
fn invalid_body(rejection: JsonRejection) -> APIError {
	tracing::debug!(error = %rejection, "Rejected request body");
	APIError::bad_request(rejection.body_text())
}

/// Handles GET /api/health requests.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"service": state.config.service.id,
	}))
}

/// Handles GET /api/order-flow requests.
pub async fn order_flow(State(state): State<AppState>) -> Json<OrderFlowResponse> {
	Json(OrderFlowResponse {
		guide: state.orders.policy().complete_flow_guide(),
	})
}

/// Handles POST /api/orders requests.
///
/// A repeated `Idempotency-Key` returns the order it first created with 200.
pub async fn create_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
		Some(value) => Some(
			value
				.to_str()
				.map_err(|_| APIError::bad_request("Idempotency-Key must be visible ASCII"))?,
		),
		None => None,
	};

	match state.orders.place_order(request, idempotency_key).await {
		Ok(PlacedOrder::Created(order)) => Ok((StatusCode::CREATED, Json(order))),
		Ok(PlacedOrder::Existing(order)) => Ok((StatusCode::OK, Json(order))),
		Err(e) => {
			tracing::warn!("Order creation failed: {}", e);
			Err(api_error(&state, e))
		},
	}
}

/// Handles GET /api/orders/{id} requests.
pub async fn get_order(
	Path(id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<Order>, APIError> {
	state
		.orders
		.get_order(id)
		.await
		.map(Json)
		.map_err(|e| api_error(&state, e))
}

/// Handles PUT /api/orders/status requests.
pub async fn update_order_status(
	State(state): State<AppState>,
	body: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	match state
		.orders
		.transition_order_status(request.order_id, request.status, request.restaurant_id)
		.await
	{
		Ok(order) => Ok(Json(order)),
		Err(e) => {
			tracing::warn!(order_id = request.order_id, "Status update failed: {}", e);
			Err(api_error(&state, e))
		},
	}
}

/// Handles GET /api/orders/{id}/next-statuses requests.
pub async fn next_statuses(
	Path(id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<NextStatusesResponse>, APIError> {
	let order = state
		.orders
		.get_order(id)
		.await
		.map_err(|e| api_error(&state, e))?;

	Ok(Json(NextStatusesResponse {
		order_id: order.id,
		current_status: order.status,
		options: state
			.orders
			.policy()
			.list_selectable_next_statuses(order.status),
	}))
}

/// Handles GET /api/restaurants/{restaurant_id}/orders requests.
pub async fn list_restaurant_orders(
	Path(restaurant_id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, APIError> {
	state
		.orders
		.list_restaurant_orders(restaurant_id)
		.await
		.map(Json)
		.map_err(|e| api_error(&state, e))
}

/// Handles GET /api/users/{user_id}/orders requests.
pub async fn list_user_orders(
	Path(user_id): Path<u64>,
	State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, APIError> {
	state
		.orders
		.list_user_orders(user_id)
		.await
		.map(Json)
		.map_err(|e| api_error(&state, e))
}

/// Handles DELETE /api/restaurants/{restaurant_id}/orders/{id} requests.
pub async fn delete_order(
	Path((restaurant_id, id)): Path<(u64, u64)>,
	State(state): State<AppState>,
) -> Result<StatusCode, APIError> {
	match state.orders.delete_order(restaurant_id, id).await {
		Ok(()) => Ok(StatusCode::NO_CONTENT),
		Err(e) => {
			tracing::warn!(order_id = id, "Order deletion failed: {}", e);
			Err(api_error(&state, e))
		},
	}
}
