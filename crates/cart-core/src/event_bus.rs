//! Broadcast event bus for order lifecycle events.

use cart_types::CartEvent;
use tokio::sync::broadcast;

/// Cloneable handle to a broadcast channel of [`CartEvent`]s.
///
/// Publishing never blocks; subscribers that fall behind by more than the
/// channel capacity miss the oldest events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<CartEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Having no subscribers is not an error.
	pub fn publish(&self, event: CartEvent) {
		if self.sender.send(event).is_err() {
			tracing::trace!("Event published with no subscribers");
		}
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
