//! Configuration for the VibeMarket purchase client.
//!
//! A single immutable [`Config`] is built at startup from a TOML file and
//! handed to every component by reference. String values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["chain.toml", "wallet.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

pub use loader::ConfigLoader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vibe_types::{networks::deserialize_transports, Address, TransportsConfig};

/// Project id used when none is configured. Wallet-connect sessions cannot be
/// established with it, but every other part of the client keeps working.
pub const PLACEHOLDER_PROJECT_ID: &str = "00000000000000000000000000000000";

/// Upper bound for `delivery.confirmation_timeout_seconds`.
pub const MAX_CONFIRMATION_TIMEOUT_SECONDS: u64 = 3600;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Non-fatal problems found while loading. Each one is logged once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
	/// `chain.wallet_connect_project_id` was missing or empty and the
	/// placeholder was substituted.
	MissingWalletConnectProjectId,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub market: MarketConfig,
	pub chain: ChainConfig,
	pub wallet: WalletConfig,
	pub delivery: DeliveryConfig,
	#[serde(default)]
	pub contracts: ContractsConfig,
	pub api: Option<ApiConfig>,
	/// Warnings raised while this configuration was loaded.
	#[serde(skip)]
	pub warnings: Vec<ConfigWarning>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
	/// Identifier used in logs and the config endpoint.
	pub id: String,
}

/// Chain connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// The chain purchases are made on.
	pub chain_id: u64,
	/// RPC endpoints keyed by chain id.
	#[serde(deserialize_with = "deserialize_transports")]
	pub transports: TransportsConfig,
	/// Whether concurrent reads may be grouped into a single round-trip.
	#[serde(default = "default_batching")]
	pub batching: bool,
	/// WalletConnect cloud project id. Empty means "use the placeholder".
	#[serde(default)]
	pub wallet_connect_project_id: String,
}

fn default_batching() -> bool {
	true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Which implementation signs and approves purchases.
	pub primary: String,
	/// Wallet implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
}

/// Delivery and confirmation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Delivery implementation names to their raw configuration tables.
	pub implementations: HashMap<String, toml::Value>,
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Ceiling on the wait for confirmations after submission.
	#[serde(default = "default_confirmation_timeout")]
	pub confirmation_timeout_seconds: u64,
	#[serde(default = "default_poll_interval")]
	pub poll_interval_seconds: u64,
	/// How long a wallet prompt may stay unanswered before the attempt fails.
	#[serde(default = "default_approval_timeout")]
	pub approval_timeout_seconds: u64,
	/// How long confirmed and failed attempts stay queryable.
	#[serde(default = "default_attempt_retention")]
	pub attempt_retention_seconds: u64,
	/// Upper bound on confirmed and failed attempts held in memory.
	#[serde(default = "default_max_finished_attempts")]
	pub max_finished_attempts: usize,
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout() -> u64 {
	120
}

fn default_poll_interval() -> u64 {
	3
}

fn default_approval_timeout() -> u64 {
	300
}

fn default_attempt_retention() -> u64 {
	3600
}

fn default_max_finished_attempts() -> usize {
	1000
}

/// Deployed contract addresses.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// The card seed contract answering `wearFromSeed` and friends.
	pub card_seed: Option<Address>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable and
/// supports defaults with `${VAR_NAME:-default_value}`. Inputs are limited to
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

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse so earlier offsets stay valid
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// The project id to hand to wallet-connect clients, never empty.
	pub fn wallet_connect_project_id(&self) -> &str {
		&self.chain.wallet_connect_project_id
	}

	/// RPC URL of the purchase chain.
	pub fn rpc_url(&self) -> Option<&str> {
		self.chain
			.transports
			.get(&self.chain.chain_id)
			.map(|t| t.rpc_url.as_str())
	}

	/// Substitutes defaults that are allowed to be missing and records a
	/// warning for each.
	fn apply_fallbacks(&mut self) {
		if self.chain.wallet_connect_project_id.trim().is_empty() {
			tracing::warn!(
				placeholder = PLACEHOLDER_PROJECT_ID,
				"No wallet-connect project id configured, wallet-connect sessions will not work"
			);
			self.chain.wallet_connect_project_id = PLACEHOLDER_PROJECT_ID.to_string();
			self.warnings
				.push(ConfigWarning::MissingWalletConnectProjectId);
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.market.id.is_empty() {
			return Err(ConfigError::Validation("Market ID cannot be empty".into()));
		}

		// Chain
		if self.chain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"chain_id must be greater than 0".into(),
			));
		}
		if !self.chain.transports.contains_key(&self.chain.chain_id) {
			return Err(ConfigError::Validation(format!(
				"No transport configured for chain {}",
				self.chain.chain_id
			)));
		}
		for (chain_id, transport) in &self.chain.transports {
			if !(transport.rpc_url.starts_with("http://")
				|| transport.rpc_url.starts_with("https://"))
			{
				return Err(ConfigError::Validation(format!(
					"Transport for chain {} must be an http(s) URL, got '{}'",
					chain_id, transport.rpc_url
				)));
			}
		}

		// Wallet
		if self.wallet.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one wallet implementation required".into(),
			));
		}
		if !self
			.wallet
			.implementations
			.contains_key(&self.wallet.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary wallet '{}' not found in implementations",
				self.wallet.primary
			)));
		}

		// Delivery
		if self.delivery.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one delivery implementation required".into(),
			));
		}
		if self.delivery.min_confirmations == 0 {
			return Err(ConfigError::Validation(
				"min_confirmations must be at least 1".into(),
			));
		}
		if self.delivery.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations cannot exceed 100".into(),
			));
		}
		if self.delivery.confirmation_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.delivery.confirmation_timeout_seconds > MAX_CONFIRMATION_TIMEOUT_SECONDS {
			return Err(ConfigError::Validation(format!(
				"confirmation_timeout_seconds cannot exceed {}",
				MAX_CONFIRMATION_TIMEOUT_SECONDS
			)));
		}
		if self.delivery.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.delivery.approval_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"approval_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.delivery.max_finished_attempts == 0 {
			return Err(ConfigError::Validation(
				"max_finished_attempts must be greater than 0".into(),
			));
		}

		if let Some(ref api) = self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string: environment variables are resolved, fallbacks
/// applied, then the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let mut config: Config = toml::from_str(&resolved)?;
		config.apply_fallbacks();
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[market]
id = "vibemarket-test"

[chain]
chain_id = 8453
wallet_connect_project_id = "abcdef0123456789abcdef0123456789"
[chain.transports.8453]
rpc_url = "http://localhost:8545"

[wallet]
primary = "local"
[wallet.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[delivery]
[delivery.implementations.evm_alloy]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("VIBE_TEST_HOST", "localhost");
		std::env::set_var("VIBE_TEST_PORT", "8545");

		let input = "url = \"http://${VIBE_TEST_HOST}:${VIBE_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("VIBE_TEST_HOST");
		std::env::remove_var("VIBE_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${VIBE_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_env_var_with_empty_default() {
		let input = "value = \"${VIBE_MISSING_VAR:-}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${VIBE_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.unwrap_err().to_string().contains("VIBE_MISSING_VAR"));
	}

	#[test]
	fn test_oversized_input_rejected() {
		let input = "x".repeat(1024 * 1024 + 1);
		assert!(matches!(
			resolve_env_vars(&input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert!(config.chain.batching);
		assert_eq!(config.delivery.min_confirmations, 1);
		assert_eq!(config.delivery.confirmation_timeout_seconds, 120);
		assert_eq!(config.delivery.poll_interval_seconds, 3);
		assert_eq!(config.delivery.approval_timeout_seconds, 300);
		assert_eq!(config.delivery.attempt_retention_seconds, 3600);
		assert_eq!(config.delivery.max_finished_attempts, 1000);
		assert!(config.contracts.card_seed.is_none());
		assert!(config.api.is_none());
		assert!(config.warnings.is_empty());
		assert_eq!(config.rpc_url(), Some("http://localhost:8545"));
	}

	#[test]
	fn test_missing_project_id_falls_back_with_warning() {
		let config_str = BASE_CONFIG.replace(
			"wallet_connect_project_id = \"abcdef0123456789abcdef0123456789\"\n",
			"",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.wallet_connect_project_id(), PLACEHOLDER_PROJECT_ID);
		assert_eq!(
			config.warnings,
			vec![ConfigWarning::MissingWalletConnectProjectId]
		);
	}

	#[test]
	fn test_empty_project_id_from_env_falls_back() {
		let config_str = BASE_CONFIG.replace(
			"\"abcdef0123456789abcdef0123456789\"",
			"\"${VIBE_UNSET_PROJECT_ID:-}\"",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.wallet_connect_project_id(), PLACEHOLDER_PROJECT_ID);
	}

	#[test]
	fn test_configured_project_id_kept() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(
			config.wallet_connect_project_id(),
			"abcdef0123456789abcdef0123456789"
		);
	}

	#[test]
	fn test_card_seed_address_parsed() {
		let config_str = format!(
			"{}\n[contracts]\ncard_seed = \"0x00000000000000000000000000000000000000c5\"\n",
			BASE_CONFIG
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.contracts.card_seed,
			Some("0x00000000000000000000000000000000000000c5".parse().unwrap())
		);
	}

	#[test]
	fn test_missing_transport_for_chain_rejected() {
		let config_str = BASE_CONFIG.replace("[chain.transports.8453]", "[chain.transports.1]");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("No transport configured for chain 8453"));
	}

	#[test]
	fn test_non_http_transport_rejected() {
		let config_str = BASE_CONFIG.replace("http://localhost:8545", "ws://localhost:8545");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("http(s) URL"));
	}

	#[test]
	fn test_unknown_primary_wallet_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"local\"", "primary = \"hardware\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Primary wallet 'hardware'"));
	}

	#[test]
	fn test_confirmation_timeout_capped() {
		let config_str = BASE_CONFIG.replace(
			"[delivery]\n",
			"[delivery]\nconfirmation_timeout_seconds = 7200\n",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("cannot exceed 3600"));
	}

	#[test]
	fn test_zero_confirmations_rejected() {
		let config_str = BASE_CONFIG.replace("[delivery]\n", "[delivery]\nmin_confirmations = 0\n");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("min_confirmations"));
	}

	#[test]
	fn test_zero_finished_attempt_cap_rejected() {
		let config_str = BASE_CONFIG.replace(
			"[delivery]\n",
			"[delivery]\nattempt_retention_seconds = 60\nmax_finished_attempts = 0\n",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("max_finished_attempts"));
	}

	#[test]
	fn test_invalid_chain_key_rejected() {
		let config_str = BASE_CONFIG.replace("[chain.transports.8453]", "[chain.transports.base]");
		assert!(matches!(
			Config::from_str(&config_str),
			Err(ConfigError::Parse(_))
		));
	}

	#[tokio::test]
	async fn test_shipped_demo_config_loads() {
		let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/demo.toml");
		let config = Config::from_file(path).await.unwrap();

		assert_eq!(config.market.id, "vibemarket-demo");
		assert_eq!(config.chain.chain_id, 8453);
		assert_eq!(config.wallet.primary, "local");
		assert!(config.delivery.implementations.contains_key("evm_alloy"));
		assert!(config.api.as_ref().is_some_and(|api| api.enabled));
	}
}
