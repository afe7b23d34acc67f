//! Wallet module for the VibeMarket purchase client.
//!
//! A wallet owns the buyer's identity and decides whether a purchase may be
//! signed. The orchestrator asks for approval before anything is broadcast;
//! a declined or abandoned prompt surfaces as [`WalletError::Rejected`].
//! The signing key itself is handed to the delivery layer, which signs when
//! it submits.

use alloy_primitives::Address;
use async_trait::async_trait;
use thiserror::Error;
use vibe_types::{ConfigSchema, ImplementationRegistry, SecretString, Transaction};

pub mod implementations {
	pub mod local;
}
pub mod terminal;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	/// The user declined the signing prompt.
	#[error("Approval rejected: {0}")]
	Rejected(String),
	/// A key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The wallet implementation failed.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Interface every wallet implementation provides.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	/// Schema of the `[wallet.implementations.<name>]` table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address purchases are sent from.
	async fn address(&self) -> Result<Address, WalletError>;

	/// Presents a transaction to the user and resolves once they decide.
	///
	/// Returns `Ok(())` when the transaction may be signed and broadcast.
	async fn request_approval(&self, tx: &Transaction) -> Result<(), WalletError>;

	/// Key the delivery layer signs approved transactions with.
	fn signing_key(&self) -> SecretString;
}

/// Factory building a wallet from its configuration table.
pub type WalletFactory = fn(&toml::Value) -> Result<Box<dyn WalletInterface>, WalletError>;

/// Registry trait for wallet implementations.
pub trait WalletRegistry: ImplementationRegistry<Factory = WalletFactory> {}

/// All wallet implementations known to this crate, by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Thin service wrapper around the configured wallet implementation.
pub struct WalletService {
	implementation: Box<dyn WalletInterface>,
}

impl WalletService {
	pub fn new(implementation: Box<dyn WalletInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, WalletError> {
		self.implementation.address().await
	}

	pub async fn request_approval(&self, tx: &Transaction) -> Result<(), WalletError> {
		self.implementation.request_approval(tx).await
	}

	pub fn signing_key(&self) -> SecretString {
		self.implementation.signing_key()
	}
}
