//! Purchase lifecycle types.
//!
//! A purchase attempt moves through
//! `Idle -> AwaitingWalletApproval -> Submitted -> Confirming -> Confirmed`,
//! and may drop into `Failed` from any non-terminal state. `Confirmed` and
//! `Failed` are terminal.

use crate::{BuyTokenParams, TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message carried by every wallet rejection.
pub const REJECTED_MESSAGE: &str = "rejected";

/// State of a single purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TransactionLifecycleState {
	/// Created, nothing sent to the wallet yet.
	Idle,
	/// The wallet has been asked to sign.
	AwaitingWalletApproval,
	/// Signed and broadcast.
	#[serde(rename_all = "camelCase")]
	Submitted { tx_hash: TransactionHash },
	/// Accepted by the node, waiting for confirmations.
	#[serde(rename_all = "camelCase")]
	Confirming { tx_hash: TransactionHash },
	/// Mined successfully with the required confirmations.
	Confirmed { receipt: TransactionReceipt },
	/// The attempt ended without a successful purchase.
	Failed { reason: FailureReason },
}

impl TransactionLifecycleState {
	/// Returns true for `Confirmed` and `Failed`.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::AwaitingWalletApproval => "awaitingWalletApproval",
			Self::Submitted { .. } => "submitted",
			Self::Confirming { .. } => "confirming",
			Self::Confirmed { .. } => "confirmed",
			Self::Failed { .. } => "failed",
		}
	}

	/// Hash of the broadcast transaction, once there is one.
	pub fn tx_hash(&self) -> Option<TransactionHash> {
		match self {
			Self::Submitted { tx_hash } | Self::Confirming { tx_hash } => Some(*tx_hash),
			Self::Confirmed { receipt } => Some(receipt.hash),
			_ => None,
		}
	}

	pub fn failure(&self) -> Option<&FailureReason> {
		match self {
			Self::Failed { reason } => Some(reason),
			_ => None,
		}
	}
}

impl fmt::Display for TransactionLifecycleState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Failed { reason } => write!(f, "failed ({})", reason),
			other => f.write_str(other.name()),
		}
	}
}

/// Category of a purchase failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
	/// Parameters failed validation; nothing was sent to the network.
	Validation,
	/// The wallet prompt was declined, cancelled or left unanswered.
	Rejected,
	/// The RPC endpoint was unreachable or timed out.
	Network,
	/// The chain rejected the call or the mined transaction reverted.
	Reverted,
	/// The node forgot the transaction before it was mined.
	Dropped,
	/// Confirmations were not observed within the configured ceiling.
	Timeout,
	/// The broadcast was sent but its response was lost, so the node may
	/// or may not hold the transaction.
	BroadcastUnknown,
	/// A pre-condition read ruled the purchase out (e.g. insufficient funds).
	Precondition,
}

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
	pub kind: FailureKind,
	pub message: String,
}

impl FailureReason {
	pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	/// The reason recorded for any wallet rejection.
	pub fn rejected() -> Self {
		Self::new(FailureKind::Rejected, REJECTED_MESSAGE)
	}

	/// Whether resubmitting the same purchase as a new attempt may succeed.
	///
	/// Only failures before the broadcast are retryable. After a confirmation
	/// timeout or a lost broadcast response the original transaction can
	/// still be mined and a resubmission would buy twice.
	pub fn retryable(&self) -> bool {
		self.kind == FailureKind::Network
	}
}

impl fmt::Display for FailureReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// A tracked purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAttempt {
	/// Attempt identifier (UUID v4).
	pub id: String,
	/// Parameters the attempt was started with.
	pub params: BuyTokenParams,
	/// Current lifecycle state.
	pub state: TransactionLifecycleState,
	/// Unix timestamp of creation.
	pub created_at: u64,
	/// Unix timestamp of the last state change.
	pub updated_at: u64,
}
