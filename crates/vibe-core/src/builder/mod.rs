//! Builder for constructing a market engine from configuration.
//!
//! Wallet and delivery implementations are selected by the names used in the
//! configuration and created through the factories registered by the binary.

use crate::engine::{event_bus::EventBus, MarketEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vibe_config::Config;
use vibe_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use vibe_types::{format_token_amount, SecretString, TransportsConfig};
use vibe_wallet::{WalletError, WalletInterface, WalletService};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation
/// name.
pub struct MarketFactories<WF, DF> {
	pub wallet_factories: HashMap<String, WF>,
	pub delivery_factories: HashMap<String, DF>,
}

/// Assembles a [`MarketEngine`] from configuration and factories.
pub struct MarketBuilder {
	config: Config,
	event_bus: EventBus,
}

impl MarketBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			event_bus: EventBus::default(),
		}
	}

	/// Publishes engine events on `event_bus` instead of a fresh bus.
	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = event_bus;
		self
	}

	/// Creates the wallet and delivery components and wires the engine.
	///
	/// # Arguments
	///
	/// * `factories` - Wallet and delivery factories keyed by the
	///   implementation names used in the configuration
	///
	/// # Returns
	///
	/// The engine for the configured chain. The primary wallet is used, and
	/// the first delivery implementation in name order that has a factory.
	///
	/// # Errors
	///
	/// [`BuilderError::Config`] if a component fails to initialize or its
	/// configuration is missing, [`BuilderError::MissingComponent`] if no
	/// factory matches the primary wallet or any delivery implementation.
	pub async fn build<WF, DF>(
		self,
		factories: MarketFactories<WF, DF>,
	) -> Result<MarketEngine, BuilderError>
	where
		WF: Fn(&toml::Value) -> Result<Box<dyn WalletInterface>, WalletError>,
		DF: Fn(
			&toml::Value,
			&TransportsConfig,
			&SecretString,
		) -> Result<Box<dyn DeliveryInterface>, DeliveryError>,
	{
		let primary_wallet = &self.config.wallet.primary;
		let wallet_config = self
			.config
			.wallet
			.implementations
			.get(primary_wallet)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Primary wallet '{}' has no configuration",
					primary_wallet
				))
			})?;
		let wallet_factory = factories
			.wallet_factories
			.get(primary_wallet)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"No wallet implementation named '{}'",
					primary_wallet
				))
			})?;

		let wallet = match wallet_factory(wallet_config) {
			Ok(implementation) => {
				tracing::info!(component = "wallet", implementation = %primary_wallet, "Loaded");
				Arc::new(WalletService::new(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "wallet",
					implementation = %primary_wallet,
					error = %e,
					"Failed to create wallet implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create wallet implementation '{}': {}",
					primary_wallet, e
				)));
			},
		};

		let buyer = wallet
			.get_address()
			.await
			.map_err(|e| BuilderError::Config(format!("Failed to get wallet address: {}", e)))?;

		let signing_key = wallet.signing_key();
		let mut names: Vec<&String> = self.config.delivery.implementations.keys().collect();
		names.sort();

		let mut delivery_impl = None;
		for name in names {
			let Some(factory) = factories.delivery_factories.get(name) else {
				tracing::warn!(component = "delivery", implementation = %name, "Unknown implementation, skipping");
				continue;
			};
			if delivery_impl.is_some() {
				tracing::warn!(component = "delivery", implementation = %name, "Only one delivery implementation is used, skipping");
				continue;
			}
			let config = &self.config.delivery.implementations[name];
			match factory(config, &self.config.chain.transports, &signing_key) {
				Ok(implementation) => {
					tracing::info!(component = "delivery", implementation = %name, chain_id = self.config.chain.chain_id, "Loaded");
					delivery_impl = Some(implementation);
				},
				Err(e) => {
					tracing::error!(
						component = "delivery",
						implementation = %name,
						error = %e,
						"Failed to create delivery implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create delivery implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let delivery_impl = delivery_impl.ok_or_else(|| {
			BuilderError::MissingComponent("No usable delivery implementation".into())
		})?;
		let delivery = Arc::new(DeliveryService::new(
			delivery_impl,
			self.config.chain.chain_id,
			self.config.chain.batching,
		));

		// Balance is informational; an unreachable node is not fatal here
		match delivery.get_balance(buyer).await {
			Ok(balance) => tracing::info!(
				buyer = %buyer,
				balance = %format_token_amount(balance, 18),
				"Initial buyer balance"
			),
			Err(e) => tracing::warn!(error = %e, "Failed to check initial balance"),
		}

		MarketEngine::new(self.config, wallet, delivery, self.event_bus)
			.map_err(|e| BuilderError::Config(e.to_string()))
	}
}
