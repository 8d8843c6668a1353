//! Notification types surfaced to dashboard users.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
	Success,
	Error,
	Warning,
	Info,
}

impl fmt::Display for NotificationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NotificationKind::Success => write!(f, "success"),
			NotificationKind::Error => write!(f, "error"),
			NotificationKind::Warning => write!(f, "warning"),
			NotificationKind::Info => write!(f, "info"),
		}
	}
}

/// A message for the notification presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
	pub kind: NotificationKind,
	pub title: String,
	pub message: String,
	/// How long the presenter should keep the message visible, in milliseconds.
	pub duration_ms: u64,
}

impl Notification {
	pub fn new(
		kind: NotificationKind,
		title: impl Into<String>,
		message: impl Into<String>,
		duration_ms: u64,
	) -> Self {
		Self {
			kind,
			title: title.into(),
			message: message.into(),
			duration_ms,
		}
	}
}
