//! API types for the CosmicCart order HTTP API.
//!
//! Errors carry a machine-readable [`ErrorCode`] so clients can branch on the
//! kind of failure instead of inspecting message text.

use crate::{OrderStatus, StatusOption};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for `PUT /api/orders/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
	pub order_id: u64,
	pub status: OrderStatus,
	/// Restaurant performing the update; must own the order.
	pub restaurant_id: u64,
}

/// Response body for `GET /api/orders/{id}/next-statuses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStatusesResponse {
	pub order_id: u64,
	pub current_status: OrderStatus,
	pub options: Vec<StatusOption>,
}

/// Response body for `GET /api/order-flow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFlowResponse {
	pub guide: String,
}

/// Machine-readable error codes returned by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// The requested status is not reachable from the current one.
	InvalidStatusTransition,
	OrderNotFound,
	/// The caller does not own the order.
	NotAuthorized,
	/// Only final or declined orders can be deleted.
	OrderNotDeletable,
	InvalidRequest,
	InternalError,
}

impl ErrorCode {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorCode::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
			ErrorCode::OrderNotFound => "ORDER_NOT_FOUND",
			ErrorCode::NotAuthorized => "NOT_AUTHORIZED",
			ErrorCode::OrderNotDeletable => "ORDER_NOT_DELETABLE",
			ErrorCode::InvalidRequest => "INVALID_REQUEST",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		}
	}

	/// HTTP status code used for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ErrorCode::InvalidStatusTransition
			| ErrorCode::OrderNotDeletable
			| ErrorCode::InvalidRequest => 400,
			ErrorCode::NotAuthorized => 403,
			ErrorCode::OrderNotFound => 404,
			ErrorCode::InternalError => 500,
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error code
	pub error: ErrorCode,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error with its HTTP status mapping.
#[derive(Debug, Clone)]
pub struct APIError {
	pub code: ErrorCode,
	pub message: String,
	pub details: Option<serde_json::Value>,
}

impl APIError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			details: None,
		}
	}

	pub fn with_details(mut self, details: serde_json::Value) -> Self {
		self.details = Some(details);
		self
	}

	pub fn bad_request(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InvalidRequest, message)
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Self::new(ErrorCode::InternalError, message)
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		self.code.status_code()
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.code,
			message: self.message.clone(),
			details: self.details.clone(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.code, self.message)
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_response_wire_format() {
		let err = APIError::new(
			ErrorCode::InvalidStatusTransition,
			"Invalid status transition from PENDING to COMPLETED",
		);
		let value = serde_json::to_value(err.to_error_response()).unwrap();
		assert_eq!(value["error"], "INVALID_STATUS_TRANSITION");
		assert!(value.get("details").is_none());
		assert_eq!(err.status_code(), 400);
	}

	#[test]
	fn test_update_request_uses_camel_case() {
		let request: UpdateOrderStatusRequest = serde_json::from_str(
			r#"{"orderId": 3, "status": "ACCEPTED", "restaurantId": 9}"#,
		)
		.unwrap();
		assert_eq!(request.order_id, 3);
		assert_eq!(request.status, OrderStatus::Accepted);
		assert_eq!(request.restaurant_id, 9);
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(ErrorCode::NotAuthorized.status_code(), 403);
		assert_eq!(ErrorCode::OrderNotFound.status_code(), 404);
		assert_eq!(ErrorCode::OrderNotDeletable.status_code(), 400);
		assert_eq!(ErrorCode::InternalError.status_code(), 500);
	}
}
