//! Notification presenters for the status editor.

use cart_types::{Notification, NotificationKind};
use std::sync::Mutex;

/// Shows notifications to the dashboard user.
pub trait NotificationPresenter: Send + Sync {
	fn present(&self, notification: Notification);
}

/// Presenter that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationPresenter for TracingNotifier {
	fn present(&self, notification: Notification) {
		let Notification {
			kind,
			title,
			message,
			duration_ms,
		} = notification;
		match kind {
			NotificationKind::Success | NotificationKind::Info => {
				tracing::info!(%kind, duration_ms, "{}: {}", title, message)
			},
			NotificationKind::Warning => {
				tracing::warn!(%kind, duration_ms, "{}: {}", title, message)
			},
			NotificationKind::Error => {
				tracing::error!(%kind, duration_ms, "{}: {}", title, message)
			},
		}
	}
}

/// Presenter that keeps every notification, for inspection by callers.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns and clears the recorded notifications.
	pub fn take(&self) -> Vec<Notification> {
		match self.notifications.lock() {
			Ok(mut guard) => std::mem::take(&mut *guard),
			Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
		}
	}
}

impl NotificationPresenter for RecordingNotifier {
	fn present(&self, notification: Notification) {
		match self.notifications.lock() {
			Ok(mut guard) => guard.push(notification),
			Err(poisoned) => poisoned.into_inner().push(notification),
		}
	}
}
