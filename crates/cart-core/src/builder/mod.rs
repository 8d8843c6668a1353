//! Builder for the order service.
//!
//! Selects the storage backend named in the configuration from a map of
//! factory functions, checks its table against the backend's own schema and
//! wires it to a fresh event bus.

use crate::event_bus::EventBus;
use crate::state::OrderStateMachine;
use cart_config::Config;
use cart_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building the order service.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builds an [`OrderStateMachine`] from configuration.
pub struct OrderServiceBuilder {
	config: Config,
}

impl OrderServiceBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the service using the given storage factories, keyed by
	/// implementation name.
	pub fn build<SF>(
		self,
		storage_factories: &HashMap<String, SF>,
	) -> Result<OrderStateMachine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let storage_config = self.config.storage.primary_config().ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' has no configuration table",
				primary
			))
		})?;

		let factory = storage_factories
			.get(primary)
			.ok_or_else(|| BuilderError::MissingComponent(format!("storage '{}'", primary)))?;

		let backend = factory(storage_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Invalid configuration for storage implementation"
				);
				BuilderError::Config(format!("Invalid storage configuration '{}': {}", primary, e))
			})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		let storage = Arc::new(StorageService::new(backend));
		Ok(OrderStateMachine::new(storage, EventBus::default()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cart_types::OrderStatus;

	fn storage_factories() -> HashMap<String, cart_storage::StorageFactory> {
		cart_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect()
	}

	fn config(primary: &str, implementations: &str) -> Config {
		format!(
			r#"
[service]
id = "cart-test"

[storage]
primary = "{}"
{}
"#,
			primary, implementations
		)
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_builds_with_memory_storage() {
		let config = config("memory", "[storage.implementations.memory]");
		let machine = OrderServiceBuilder::new(config)
			.build(&storage_factories())
			.unwrap();

		let order = machine
			.create_order(crate::state::order::tests::sample_order(1))
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Pending);
	}

	#[test]
	fn test_missing_factory() {
		let config = config("memory", "[storage.implementations.memory]");
		let result = OrderServiceBuilder::new(config).build(&HashMap::<
			String,
			cart_storage::StorageFactory,
		>::new());
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_invalid_storage_table() {
		let config = config(
			"file",
			"[storage.implementations.file]\nstorage_path = \"\"",
		);
		let result = OrderServiceBuilder::new(config).build(&storage_factories());
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[test]
	fn test_storage_table_checked_against_backend_schema() {
		let config = config("memory", "[storage.implementations]\nmemory = \"fast\"");
		let result = OrderServiceBuilder::new(config).build(&storage_factories());
		match result {
			Err(BuilderError::Config(message)) => {
				assert!(message.contains("Invalid storage configuration 'memory'"))
			},
			_ => panic!("expected a configuration error"),
		}
	}
}
