//! Storage module for the CosmicCart order service.
//!
//! This module provides a small key-value abstraction for persisting orders
//! and their indexes. Backends only deal in raw bytes; [`StorageService`]
//! layers JSON (de)serialization and namespaced keys on top.

use async_trait::async_trait;
use cart_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Built-in backends.
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Failures reported by storage backends and the storage service.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No value is stored under the key.
	#[error("Not found")]
	NotFound,
	/// A value could not be encoded to or decoded from JSON.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend itself failed (I/O and the like).
	#[error("Backend error: {0}")]
	Backend(String),
	/// The backend's configuration table was rejected.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Byte-level key-value operations every backend provides.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Reads the bytes under `key`, or `NotFound`.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key. Missing keys are not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Schema the backend's configuration table must satisfy.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Builds a backend from its configuration table.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Every backend compiled into this crate.
///
/// Returns (name, factory) pairs; the name is the key used under
/// `[storage.implementations]` in the configuration file.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed JSON access on top of a backend.
///
/// Values are stored as JSON under `<namespace>:<id>` keys.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Reads and decodes the value under `<namespace>:<id>`.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Deletes a value; a missing key is not an error.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Overwrites a value that must already exist.
	///
	/// Unlike [`store`](Self::store), this fails with `NotFound` when the key
	/// does not exist yet.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}
