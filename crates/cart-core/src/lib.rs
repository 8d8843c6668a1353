//! Core order lifecycle logic for CosmicCart.
//!
//! Contains the order status transition policy, the storage-backed order
//! service that enforces it, and the restaurant dashboard's status editor
//! which consults the policy before submitting changes to the service.

pub mod builder;
pub mod dashboard;
pub mod event_bus;
pub mod notify;
pub mod state;
pub mod store;

pub use builder::{BuilderError, OrderServiceBuilder};
pub use dashboard::{DeleteOutcome, StatusChangeOutcome, StatusEditor};
pub use event_bus::EventBus;
pub use notify::{NotificationPresenter, RecordingNotifier, TracingNotifier};
pub use state::{OrderStateError, OrderStateMachine, OrderStatusPolicy, PlacedOrder};
pub use store::{HttpOrderStore, LocalOrderStore, OrderStore, StoreError};
