//! Configuration module for the CosmicCart order service.
//!
//! Configuration is read from a TOML file. Values may reference environment
//! variables as `${NAME}` or `${NAME:-default}`; these are substituted before
//! parsing and the result is validated as a whole.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The file is not valid TOML or does not match the expected shape.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// The values are well formed but unusable.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message; the full error echoes the input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
	/// Order HTTP API; disabled when absent.
	pub api: Option<ApiConfig>,
	/// Settings for the dashboard client.
	#[serde(default)]
	pub dashboard: DashboardConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
}

/// Storage backends available to the service and the one in use.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Name of the backend the order service uses.
	pub primary: String,
	/// Backend name to its configuration table.
	pub implementations: HashMap<String, toml::Value>,
}

impl StorageConfig {
	/// Returns the table configured for the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Order HTTP API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	/// Interface to bind.
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Per-request timeout, in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// CORS configuration. Permissive when absent.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Origins allowed to call the API from a browser.
	pub allowed_origins: Vec<String>,
}

/// Settings used by the dashboard when talking to a remote order service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
	/// Base URL of the order service.
	#[serde(default = "default_backend_url")]
	pub backend_url: String,
	/// Timeout for each request to the order service, in seconds.
	#[serde(default = "default_request_timeout")]
	pub request_timeout_seconds: u64,
	/// How long notifications stay visible, in milliseconds.
	#[serde(default = "default_notification_duration")]
	pub notification_duration_ms: u64,
}

impl Default for DashboardConfig {
	fn default() -> Self {
		Self {
			backend_url: default_backend_url(),
			request_timeout_seconds: default_request_timeout(),
			notification_duration_ms: default_notification_duration(),
		}
	}
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	9095
}

fn default_api_timeout() -> u64 {
	30
}

fn default_backend_url() -> String {
	"http://127.0.0.1:9095".to_string()
}

fn default_request_timeout() -> u64 {
	10
}

fn default_notification_duration() -> u64 {
	4000
}

/// Substitutes `${NAME}` and `${NAME:-default}` references.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable and
/// supports defaults with `${VAR_NAME:-default_value}`. Input is limited to
/// 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name.as_str()), default_value) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Address the API server binds to, when the API is enabled.
	pub fn api_bind_address(&self) -> Option<String> {
		self.api
			.as_ref()
			.filter(|api| api.enabled)
			.map(|api| format!("{}:{}", api.host, api.port))
	}

	/// Validates the configuration.
	///
	/// Checks that the service id is set, that the primary storage
	/// implementation is configured, that an enabled API has a usable port,
	/// and that the dashboard settings are well formed.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if self.storage.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' has no entry in [storage.implementations]",
				self.storage.primary
			)));
		}

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"API timeout_seconds must be greater than 0".into(),
				));
			}
		}

		let dashboard = &self.dashboard;
		if !(dashboard.backend_url.starts_with("http://")
			|| dashboard.backend_url.starts_with("https://"))
		{
			return Err(ConfigError::Validation(format!(
				"Dashboard backend_url must be an http(s) URL, got '{}'",
				dashboard.backend_url
			)));
		}
		if dashboard.request_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Dashboard request_timeout_seconds must be greater than 0".into(),
			));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[service]
id = "cosmic-cart"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("CART_TEST_HOST", "localhost");
		std::env::set_var("CART_TEST_PORT", "9095");

		let input = "host = \"${CART_TEST_HOST}:${CART_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:9095\"");

		std::env::remove_var("CART_TEST_HOST");
		std::env::remove_var("CART_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${CART_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${CART_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("CART_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "cosmic-cart");
		assert!(config.api.is_none());
		assert!(config.api_bind_address().is_none());
		assert_eq!(config.dashboard.backend_url, "http://127.0.0.1:9095");
		assert_eq!(config.dashboard.notification_duration_ms, 4000);
	}

	#[test]
	fn test_full_config() {
		std::env::set_var("CART_TEST_API_PORT_VALUE", "8088");
		let config_str = r#"
[service]
id = "kitchen-1"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data/orders"

[api]
enabled = true
host = "0.0.0.0"
port = ${CART_TEST_API_PORT_VALUE}
[api.cors]
allowed_origins = ["http://localhost:4200"]

[dashboard]
backend_url = "https://orders.example.com"
request_timeout_seconds = 5
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.api_bind_address().as_deref(), Some("0.0.0.0:8088"));
		assert_eq!(
			config.storage.primary_config().and_then(|v| v.get("storage_path")),
			Some(&toml::Value::String("./data/orders".into()))
		);
		assert_eq!(config.dashboard.request_timeout_seconds, 5);
		std::env::remove_var("CART_TEST_API_PORT_VALUE");
	}

	#[test]
	fn test_primary_storage_must_be_configured() {
		let config_str = r#"
[service]
id = "cosmic-cart"

[storage]
primary = "file"
[storage.implementations.memory]
"#;
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
		assert!(err.to_string().contains("file"));
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let config_str = MINIMAL.replace("cosmic-cart", " ");
		assert!(matches!(
			config_str.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_bad_backend_url_rejected() {
		let config_str = format!("{}\n[dashboard]\nbackend_url = \"ftp://x\"\n", MINIMAL);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("backend_url"));
	}

	#[test]
	fn test_parse_error_is_reported() {
		assert!(matches!(
			"[service".parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, MINIMAL).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.storage.primary, "memory");

		let missing = Config::from_file(dir.path().join("missing.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
