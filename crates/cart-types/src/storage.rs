//! Storage namespaces used by the order service.

/// Namespace of a stored collection.
///
/// Keys are combined with an id as `<namespace>:<id>` by the storage service,
/// e.g. `orders:17` or `restaurant_orders:4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Order records keyed by order id.
	Orders,
	/// Per-restaurant lists of order ids, in placement order.
	RestaurantOrders,
	/// Per-customer lists of order ids, in placement order.
	UserOrders,
	/// Order id placed under a client-supplied idempotency key.
	IdempotencyKeys,
	/// Id counters.
	Sequences,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::RestaurantOrders => "restaurant_orders",
			StorageKey::UserOrders => "user_orders",
			StorageKey::IdempotencyKeys => "idempotency_keys",
			StorageKey::Sequences => "sequences",
		}
	}
}
