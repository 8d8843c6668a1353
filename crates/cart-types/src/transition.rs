//! Status transition request and result types.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};

/// A requested status change, built per validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
	pub current_status: OrderStatus,
	pub requested_status: OrderStatus,
}

impl TransitionRequest {
	pub fn new(current_status: OrderStatus, requested_status: OrderStatus) -> Self {
		Self {
			current_status,
			requested_status,
		}
	}

	/// Returns true if the request would leave the status unchanged.
	pub fn is_noop(&self) -> bool {
		self.current_status == self.requested_status
	}
}

/// Verdict of the transition policy.
///
/// A rejection is a value, not an error: callers decide whether to block
/// the action or only warn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResult {
	pub allowed: bool,
	/// Explanation shown to the user; empty when the transition is allowed.
	pub reason_if_rejected: String,
}

impl TransitionResult {
	pub fn allowed() -> Self {
		Self {
			allowed: true,
			reason_if_rejected: String::new(),
		}
	}

	pub fn rejected(reason: impl Into<String>) -> Self {
		Self {
			allowed: false,
			reason_if_rejected: reason.into(),
		}
	}
}

/// One entry of the status editor dropdown.
///
/// Illegal choices stay in the list with `enabled = false` so the valid
/// flow remains discoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOption {
	pub status: OrderStatus,
	pub label: String,
	pub enabled: bool,
}

impl StatusOption {
	pub fn new(status: OrderStatus, enabled: bool) -> Self {
		Self {
			status,
			label: format!("{} {}", status.emoji(), status.label()),
			enabled,
		}
	}
}
