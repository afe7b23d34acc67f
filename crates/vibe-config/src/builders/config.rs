//! Configuration builder for tests.
//!
//! Produces a [`Config`] without going through TOML, with defaults matching
//! a local development node.

use crate::{
	ApiConfig, ChainConfig, Config, ContractsConfig, DeliveryConfig, MarketConfig, WalletConfig,
	PLACEHOLDER_PROJECT_ID,
};
use std::collections::HashMap;
use vibe_types::{Address, TransportConfig};

/// Fluent builder for `Config`.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	market_id: String,
	chain_id: u64,
	rpc_url: String,
	batching: bool,
	min_confirmations: u64,
	confirmation_timeout_seconds: u64,
	poll_interval_seconds: u64,
	approval_timeout_seconds: u64,
	attempt_retention_seconds: u64,
	max_finished_attempts: usize,
	card_seed: Option<Address>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			market_id: "test-market".to_string(),
			chain_id: 31337,
			rpc_url: "http://localhost:8545".to_string(),
			batching: true,
			min_confirmations: 1,
			confirmation_timeout_seconds: 120,
			poll_interval_seconds: 3,
			approval_timeout_seconds: 300,
			attempt_retention_seconds: 3600,
			max_finished_attempts: 1000,
			card_seed: None,
			api: None,
		}
	}

	pub fn market_id(mut self, id: impl Into<String>) -> Self {
		self.market_id = id.into();
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	pub fn batching(mut self, batching: bool) -> Self {
		self.batching = batching;
		self
	}

	pub fn min_confirmations(mut self, confirmations: u64) -> Self {
		self.min_confirmations = confirmations;
		self
	}

	pub fn confirmation_timeout_seconds(mut self, seconds: u64) -> Self {
		self.confirmation_timeout_seconds = seconds;
		self
	}

	pub fn poll_interval_seconds(mut self, seconds: u64) -> Self {
		self.poll_interval_seconds = seconds;
		self
	}

	pub fn approval_timeout_seconds(mut self, seconds: u64) -> Self {
		self.approval_timeout_seconds = seconds;
		self
	}

	pub fn attempt_retention_seconds(mut self, seconds: u64) -> Self {
		self.attempt_retention_seconds = seconds;
		self
	}

	pub fn max_finished_attempts(mut self, max: usize) -> Self {
		self.max_finished_attempts = max;
		self
	}

	pub fn card_seed(mut self, address: Address) -> Self {
		self.card_seed = Some(address);
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let mut transports = HashMap::new();
		transports.insert(
			self.chain_id,
			TransportConfig {
				rpc_url: self.rpc_url,
			},
		);

		Config {
			market: MarketConfig { id: self.market_id },
			chain: ChainConfig {
				chain_id: self.chain_id,
				transports,
				batching: self.batching,
				wallet_connect_project_id: PLACEHOLDER_PROJECT_ID.to_string(),
			},
			wallet: WalletConfig {
				primary: "local".to_string(),
				implementations: HashMap::new(),
			},
			delivery: DeliveryConfig {
				implementations: HashMap::new(),
				min_confirmations: self.min_confirmations,
				confirmation_timeout_seconds: self.confirmation_timeout_seconds,
				poll_interval_seconds: self.poll_interval_seconds,
				approval_timeout_seconds: self.approval_timeout_seconds,
				attempt_retention_seconds: self.attempt_retention_seconds,
				max_finished_attempts: self.max_finished_attempts,
			},
			contracts: ContractsConfig {
				card_seed: self.card_seed,
			},
			api: self.api,
			warnings: Vec::new(),
		}
	}
}
