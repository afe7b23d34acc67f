//! Transaction types exchanged with the delivery layer.
//!
//! These types describe a call or transaction before it reaches the chain
//! and what the chain reports back once it has been mined.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash identifying a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// A contract call, used both for read-only `eth_call` requests and for
/// state-changing submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
	/// Chain the call targets.
	pub chain_id: u64,
	/// Sender. Filled in by the wallet for submissions when absent.
	pub from: Option<Address>,
	/// Contract being called.
	pub to: Address,
	/// Native value attached to the call, in wei.
	pub value: U256,
	/// ABI-encoded calldata.
	pub data: Bytes,
}

impl Transaction {
	/// Builds a read-only call with no sender and no value.
	pub fn call(chain_id: u64, to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			chain_id,
			from: None,
			to,
			value: U256::ZERO,
			data: data.into(),
		}
	}

	pub fn with_from(mut self, from: Address) -> Self {
		self.from = Some(from);
		self
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}
}
