//! Chain interaction boundary for the VibeMarket purchase client.
//!
//! This crate owns every RPC round-trip: read-only contract calls, transaction
//! submission, receipt lookups and balance queries. Implementations sit behind
//! [`DeliveryInterface`] so the orchestrator can be driven by a fake chain in
//! tests; [`DeliveryService`] binds an implementation to the configured chain.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;
use vibe_types::{
	ConfigSchema, ImplementationRegistry, SecretString, Transaction, TransactionHash,
	TransactionReceipt, TransportsConfig,
};

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during chain interaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The endpoint could not be reached or timed out. Reads are safe to
	/// retry; a broadcast may already have reached the node.
	#[error("Network error: {0}")]
	Network(String),
	/// Execution reverted; carries the node's revert message.
	#[error("Execution reverted: {0}")]
	Reverted(String),
	/// The node refused the request (bad nonce, insufficient funds, ...).
	#[error("Request rejected by node: {0}")]
	Rejected(String),
	/// No transport is configured for the chain.
	#[error("No provider available for chain {0}")]
	NoProviderAvailable(u64),
}

impl DeliveryError {
	/// Whether the same request may succeed if simply repeated.
	pub fn is_transient(&self) -> bool {
		matches!(self, DeliveryError::Network(_))
	}
}

/// Interface every chain delivery implementation provides.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Schema of the `[delivery.implementations.<name>]` table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Executes a read-only call (`eth_call`) and returns the raw return data.
	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError>;

	/// Executes several read-only calls.
	///
	/// Implementations that can group requests on the wire override this; the
	/// default issues the calls one after another.
	async fn call_many(&self, calls: &[Transaction]) -> Result<Vec<Bytes>, DeliveryError> {
		let mut results = Vec::with_capacity(calls.len());
		for call in calls {
			results.push(self.call(call).await?);
		}
		Ok(results)
	}

	/// Signs and broadcasts a transaction, returning its hash once the node
	/// has accepted it.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Returns the receipt, or `None` while the transaction is not yet mined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Whether the node knows the transaction at all (pending or mined).
	async fn is_known(&self, hash: &TransactionHash, chain_id: u64)
		-> Result<bool, DeliveryError>;

	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError>;

	/// Native balance of `address`, in wei.
	async fn get_balance(&self, address: Address, chain_id: u64) -> Result<U256, DeliveryError>;
}

/// Factory building a delivery implementation from its configuration table,
/// the configured transports and the wallet's signing key.
pub type DeliveryFactory = fn(
	&toml::Value,
	&TransportsConfig,
	&SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

/// Registry trait for delivery implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// All delivery implementations known to this crate, by configuration name.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Delivery bound to the configured chain.
pub struct DeliveryService {
	implementation: Box<dyn DeliveryInterface>,
	chain_id: u64,
	batching: bool,
}

impl DeliveryService {
	/// Binds `implementation` to one chain.
	///
	/// # Arguments
	///
	/// * `implementation` - Transport to the chain's RPC endpoint
	/// * `chain_id` - The only chain transactions may target
	/// * `batching` - Whether [`Self::read_many`] may group reads into one
	///   round-trip
	pub fn new(implementation: Box<dyn DeliveryInterface>, chain_id: u64, batching: bool) -> Self {
		Self {
			implementation,
			chain_id,
			batching,
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Read-only call against `to` on the configured chain.
	pub async fn read(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		self.implementation
			.call(&Transaction::call(self.chain_id, to, data))
			.await
	}

	/// Several read-only calls, grouped when batching is enabled.
	pub async fn read_many(
		&self,
		requests: Vec<(Address, Bytes)>,
	) -> Result<Vec<Bytes>, DeliveryError> {
		let calls: Vec<Transaction> = requests
			.into_iter()
			.map(|(to, data)| Transaction::call(self.chain_id, to, data))
			.collect();

		if self.batching {
			return self.implementation.call_many(&calls).await;
		}

		let mut results = Vec::with_capacity(calls.len());
		for call in &calls {
			results.push(self.implementation.call(call).await?);
		}
		Ok(results)
	}

	/// Simulates a state-changing transaction without broadcasting it.
	pub async fn simulate(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.implementation.call(tx).await
	}

	/// Broadcasts `tx` once. Never retried here.
	///
	/// # Errors
	///
	/// [`DeliveryError::NoProviderAvailable`] if `tx` targets another chain.
	/// A [`DeliveryError::Network`] from this call does not mean the node
	/// lacks the transaction.
	pub async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		if tx.chain_id != self.chain_id {
			return Err(DeliveryError::NoProviderAvailable(tx.chain_id));
		}
		self.implementation.submit(tx).await
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.implementation.get_receipt(hash, self.chain_id).await
	}

	pub async fn is_known(&self, hash: &TransactionHash) -> Result<bool, DeliveryError> {
		self.implementation.is_known(hash, self.chain_id).await
	}

	pub async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.implementation.get_block_number(self.chain_id).await
	}

	pub async fn get_balance(&self, address: Address) -> Result<U256, DeliveryError> {
		self.implementation.get_balance(address, self.chain_id).await
	}
}
