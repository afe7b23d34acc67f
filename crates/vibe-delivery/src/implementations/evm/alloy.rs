//! Alloy-backed delivery over HTTP JSON-RPC.
//!
//! One provider is built per configured chain. Every provider carries the
//! wallet's signer so `submit` can fill nonce, gas and fees before signing.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::{RpcError, TransportErrorKind};
use alloy_transport_http::Http;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use vibe_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString, Transaction,
	TransactionHash, TransactionReceipt, TransportsConfig, ValidationError,
};

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// JSON-RPC error code nodes use for `execution reverted`.
const REVERT_ERROR_CODE: i64 = 3;

/// Alloy-based EVM delivery implementation.
pub struct AlloyDelivery {
	providers: HashMap<u64, HttpProvider>,
}

impl AlloyDelivery {
	/// Builds a provider for each of `chain_ids` from the transport table.
	pub fn new(
		chain_ids: &[u64],
		transports: &TransportsConfig,
		signer: PrivateKeySigner,
	) -> Result<Self, DeliveryError> {
		if chain_ids.is_empty() {
			return Err(DeliveryError::Network(
				"At least one chain must be configured".to_string(),
			));
		}

		let mut providers = HashMap::new();
		for chain_id in chain_ids {
			let transport = transports
				.get(chain_id)
				.ok_or(DeliveryError::NoProviderAvailable(*chain_id))?;

			let url = transport.rpc_url.parse().map_err(|e| {
				DeliveryError::Network(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(*chain_id)));
			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			tracing::debug!(chain_id = chain_id, rpc_url = %transport.rpc_url, "Configured provider");
			providers.insert(*chain_id, Arc::new(provider) as HttpProvider);
		}

		Ok(Self { providers })
	}

	fn get_provider(&self, chain_id: u64) -> Result<&HttpProvider, DeliveryError> {
		self.providers
			.get(&chain_id)
			.ok_or(DeliveryError::NoProviderAvailable(chain_id))
	}
}

fn to_request(tx: &Transaction) -> TransactionRequest {
	let mut request = TransactionRequest::default()
		.to(tx.to)
		.value(tx.value)
		.input(tx.data.clone().into());
	if let Some(from) = tx.from {
		request = request.from(from);
	}
	request.chain_id = Some(tx.chain_id);
	request
}

/// Maps an RPC failure onto the delivery error taxonomy.
///
/// Error responses from the node are either reverts or refusals; anything
/// that never produced a response is a network failure.
fn classify(context: &str, error: RpcError<TransportErrorKind>) -> DeliveryError {
	match error.as_error_resp() {
		Some(payload)
			if payload.code == REVERT_ERROR_CODE
				|| payload.message.contains("execution reverted") =>
		{
			let reason = payload
				.message
				.trim_start_matches("execution reverted")
				.trim_start_matches(':')
				.trim();
			if reason.is_empty() {
				DeliveryError::Reverted("execution reverted".to_string())
			} else {
				DeliveryError::Reverted(reason.to_string())
			}
		},
		Some(payload) => DeliveryError::Rejected(format!("{}: {}", context, payload.message)),
		None => DeliveryError::Network(format!("{}: {}", context, error)),
	}
}

/// Configuration schema for the Alloy delivery implementation.
pub struct AlloyDeliverySchema;

impl AlloyDeliverySchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"chain_ids",
				FieldType::Array(Box::new(FieldType::Integer {
					min: Some(1),
					max: None,
				})),
			)
			.with_validator(|value| match value.as_array() {
				Some(arr) if arr.is_empty() => Err("chain_ids cannot be empty".to_string()),
				_ => Ok(()),
			})],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		let provider = self.get_provider(tx.chain_id)?;
		provider
			.call(&to_request(tx))
			.await
			.map_err(|e| classify("eth_call failed", e))
	}

	async fn call_many(&self, calls: &[Transaction]) -> Result<Vec<Bytes>, DeliveryError> {
		tracing::trace!(count = calls.len(), "Dispatching batched reads");
		try_join_all(calls.iter().map(|tx| self.call(tx))).await
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let chain_id = tx.chain_id;
		let provider = self.get_provider(chain_id)?;

		let pending = provider
			.send_transaction(to_request(&tx))
			.await
			.map_err(|e| classify("Failed to send transaction", e))?;

		let tx_hash = TransactionHash(*pending.tx_hash());
		tracing::info!(tx_hash = %tx_hash, chain_id = chain_id, "Submitted transaction");

		Ok(tx_hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		let receipt = provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| classify("Failed to get receipt", e))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}))
	}

	async fn is_known(
		&self,
		hash: &TransactionHash,
		chain_id: u64,
	) -> Result<bool, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		provider
			.get_transaction_by_hash(hash.0)
			.await
			.map(|tx| tx.is_some())
			.map_err(|e| classify("Failed to look up transaction", e))
	}

	async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		provider
			.get_block_number()
			.await
			.map_err(|e| classify("Failed to get block number", e))
	}

	async fn get_balance(&self, address: Address, chain_id: u64) -> Result<U256, DeliveryError> {
		let provider = self.get_provider(chain_id)?;

		provider
			.get_balance(address)
			.await
			.map_err(|e| classify("Failed to get balance", e))
	}
}

/// Builds an [`AlloyDelivery`] from its configuration table.
///
/// `chain_ids` is optional; when absent, every configured transport gets a
/// provider. The signing key comes from the primary wallet.
pub fn create_http_delivery(
	config: &toml::Value,
	transports: &TransportsConfig,
	signing_key: &SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema::validate_config(config)
		.map_err(|e| DeliveryError::Network(format!("Invalid configuration: {}", e)))?;

	let mut chain_ids: Vec<u64> = match config.get("chain_ids").and_then(|v| v.as_array()) {
		Some(arr) => arr
			.iter()
			.filter_map(|v| v.as_integer().map(|i| i as u64))
			.collect(),
		None => transports.keys().copied().collect(),
	};
	chain_ids.sort_unstable();

	let signer: PrivateKeySigner = signing_key.with_exposed(|key| {
		key.parse()
			.map_err(|_| DeliveryError::Network("Invalid signing key format".to_string()))
	})?;

	Ok(Box::new(AlloyDelivery::new(&chain_ids, transports, signer)?))
}

/// Registry for the HTTP/Alloy delivery implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::DeliveryFactory;

	fn factory() -> Self::Factory {
		create_http_delivery
	}
}

impl crate::DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use vibe_types::TransportConfig;

	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn transports() -> TransportsConfig {
		let mut transports = HashMap::new();
		transports.insert(
			8453,
			TransportConfig {
				rpc_url: "http://localhost:8545".to_string(),
			},
		);
		transports
	}

	#[test]
	fn test_schema_accepts_missing_chain_ids() {
		let config: toml::Value = toml::from_str("").unwrap();
		assert!(AlloyDeliverySchema::validate_config(&config).is_ok());
	}

	#[test]
	fn test_schema_rejects_empty_chain_ids() {
		let config: toml::Value = toml::from_str("chain_ids = []").unwrap();
		assert!(AlloyDeliverySchema::validate_config(&config).is_err());
	}

	#[test]
	fn test_request_conversion() {
		let to = address!("1111111111111111111111111111111111111111");
		let from = address!("2222222222222222222222222222222222222222");
		let tx = Transaction::call(8453, to, vec![0xde, 0xad])
			.with_from(from)
			.with_value(U256::from(7));

		let request = to_request(&tx);
		assert_eq!(request.from, Some(from));
		assert_eq!(request.value, Some(U256::from(7)));
		assert_eq!(request.chain_id, Some(8453));
	}

	#[tokio::test]
	async fn test_factory_uses_all_transports_by_default() {
		let config: toml::Value = toml::from_str("").unwrap();
		let delivery =
			create_http_delivery(&config, &transports(), &SecretString::from(DEV_KEY)).unwrap();
		assert!(delivery.config_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_factory_rejects_unknown_chain() {
		let config: toml::Value = toml::from_str("chain_ids = [1]").unwrap();
		let result = create_http_delivery(&config, &transports(), &SecretString::from(DEV_KEY));
		assert!(matches!(result, Err(DeliveryError::NoProviderAvailable(1))));
	}

	#[test]
	fn test_factory_rejects_bad_key() {
		let config: toml::Value = toml::from_str("").unwrap();
		let result = create_http_delivery(&config, &transports(), &SecretString::from("nope"));
		assert!(result.is_err());
	}

	#[test]
	fn test_only_network_errors_are_transient() {
		assert!(DeliveryError::Network("timeout".into()).is_transient());
		assert!(!DeliveryError::Reverted("sold out".into()).is_transient());
		assert!(!DeliveryError::Rejected("nonce too low".into()).is_transient());
	}
}
