//! Registry of every wallet and delivery implementation compiled into the
//! binary, and engine construction from configuration.

use std::collections::HashMap;
use std::sync::OnceLock;
use vibe_config::Config;
use vibe_core::{MarketBuilder, MarketEngine, MarketFactories};
use vibe_delivery::DeliveryFactory;
use vibe_wallet::WalletFactory;

pub struct FactoryRegistry {
	pub wallet: HashMap<String, WalletFactory>,
	pub delivery: HashMap<String, DeliveryFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			wallet: HashMap::new(),
			delivery: HashMap::new(),
		}
	}

	pub fn register_wallet(&mut self, name: impl Into<String>, factory: WalletFactory) {
		self.wallet.insert(name.into(), factory);
	}

	pub fn register_delivery(&mut self, name: impl Into<String>, factory: DeliveryFactory) {
		self.delivery.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the process-wide registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in vibe_wallet::get_all_implementations() {
			tracing::debug!("Registering wallet implementation: {}", name);
			registry.register_wallet(name, factory);
		}

		for (name, factory) in vibe_delivery::get_all_implementations() {
			tracing::debug!("Registering delivery implementation: {}", name);
			registry.register_delivery(name, factory);
		}

		registry
	})
}

/// Picks the factories for the implementation names used in `config`.
/// Unknown names are an error listing what is available.
macro_rules! build_factories {
	($registry:expr, $names:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $names {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the market engine from `config` using the registered factories.
pub async fn build_market_from_config(
	config: Config,
) -> Result<MarketEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let wallet_factories = build_factories!(
		registry,
		std::iter::once(&config.wallet.primary),
		wallet,
		"wallet"
	);
	let delivery_factories = build_factories!(
		registry,
		config.delivery.implementations.keys(),
		delivery,
		"delivery"
	);

	let factories = MarketFactories {
		wallet_factories,
		delivery_factories,
	};

	Ok(MarketBuilder::new(config).build(factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registry_contains_builtin_implementations() {
		let registry = get_registry();
		assert!(registry.wallet.contains_key("local"));
		assert!(registry.delivery.contains_key("evm_alloy"));
	}

	#[tokio::test]
	async fn test_unknown_delivery_implementation_is_rejected() {
		let config: Config = r#"
[market]
id = "registry-test"

[chain]
chain_id = 31337
[chain.transports.31337]
rpc_url = "http://localhost:8545"

[wallet]
primary = "local"
[wallet.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[delivery]
[delivery.implementations.carrier_pigeon]
"#
		.parse()
		.unwrap();

		let error = build_market_from_config(config).await.err().unwrap();
		let message = error.to_string();
		assert!(message.contains("Unknown delivery implementation 'carrier_pigeon'"));
		assert!(message.contains("evm_alloy"));
	}

	#[tokio::test]
	async fn test_unknown_wallet_implementation_is_rejected() {
		let config: Config = r#"
[market]
id = "registry-test"

[chain]
chain_id = 31337
[chain.transports.31337]
rpc_url = "http://localhost:8545"

[wallet]
primary = "hardware"
[wallet.implementations.hardware]

[delivery]
[delivery.implementations.evm_alloy]
"#
		.parse()
		.unwrap();

		let error = build_market_from_config(config).await.err().unwrap();
		assert!(error
			.to_string()
			.contains("Unknown wallet implementation 'hardware'"));
	}
}
