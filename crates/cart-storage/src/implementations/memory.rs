//! In-memory storage backend.
//!
//! Keeps all values in a map guarded by an async read-write lock. Nothing
//! survives a restart, which makes it the default for development and tests.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use cart_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryStorage {
	entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of keys currently held.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.read()
			.await
			.get(key)
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.entries.write().await.insert(key.to_owned(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.read().await.contains_key(key))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage; it accepts no settings.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend.
///
/// The backend takes no settings; its table is checked through
/// [`StorageInterface::config_schema`] by the service builder.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "orders:1";
		let value = b"{\"id\":1}".to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));

		// deleting again is fine
		storage.delete(key).await.unwrap();
	}

	#[tokio::test]
	async fn test_overwrite() {
		let storage = MemoryStorage::new();

		assert!(storage.is_empty().await);
		storage.set_bytes("sequences:orders", b"1".to_vec()).await.unwrap();
		storage.set_bytes("sequences:orders", b"2".to_vec()).await.unwrap();
		assert_eq!(
			storage.get_bytes("sequences:orders").await.unwrap(),
			b"2".to_vec()
		);
		assert_eq!(storage.len().await, 1);
	}

	#[test]
	fn test_schema_requires_table() {
		let storage = create_storage(&toml::Value::Integer(3)).unwrap();
		let schema = storage.config_schema();
		assert!(schema.validate(&toml::Value::Integer(3)).is_err());
		assert!(schema
			.validate(&toml::Value::Table(toml::Table::new()))
			.is_ok());
	}
}
