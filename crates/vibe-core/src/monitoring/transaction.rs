//! Confirmation monitoring for broadcast transactions.
//!
//! Polls the node at a fixed interval until the transaction is accepted and
//! then buried under the required number of blocks. Every wait is bounded by
//! a deadline fixed at submission time.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::instrument;
use vibe_delivery::{DeliveryError, DeliveryService};
use vibe_types::{truncate_id, TransactionHash, TransactionReceipt};

/// Consecutive polls a transaction may be unknown to the node before it is
/// considered dropped.
pub const DEFAULT_DROPPED_GRACE_POLLS: u32 = 5;

/// Ways a wait for confirmation can end without a successful receipt.
#[derive(Debug, Error)]
pub enum MonitorError {
	#[error("Transaction reverted in block {}", .0.block_number)]
	Reverted(TransactionReceipt),
	#[error("Transaction dropped: unknown to the node after {0} polls")]
	Dropped(u32),
	#[error("No confirmation within {0}s")]
	Timeout(u64),
	#[error(transparent)]
	Delivery(DeliveryError),
}

pub struct ConfirmationMonitor {
	delivery: Arc<DeliveryService>,
	min_confirmations: u64,
	timeout: Duration,
	poll_interval: Duration,
	dropped_grace_polls: u32,
}

impl ConfirmationMonitor {
	pub fn new(
		delivery: Arc<DeliveryService>,
		min_confirmations: u64,
		timeout: Duration,
		poll_interval: Duration,
	) -> Self {
		Self {
			delivery,
			min_confirmations: min_confirmations.max(1),
			timeout,
			poll_interval,
			dropped_grace_polls: DEFAULT_DROPPED_GRACE_POLLS,
		}
	}

	pub fn with_dropped_grace_polls(mut self, polls: u32) -> Self {
		self.dropped_grace_polls = polls.max(1);
		self
	}

	/// Deadline for a transaction submitted now.
	pub fn deadline(&self) -> Instant {
		Instant::now() + self.timeout
	}

	/// Waits until the node reports the transaction as pending or mined.
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&tx_hash.to_string())))]
	pub async fn wait_for_acceptance(
		&self,
		tx_hash: &TransactionHash,
		deadline: Instant,
	) -> Result<(), MonitorError> {
		let mut unknown_polls = 0;

		loop {
			match self.delivery.is_known(tx_hash).await {
				Ok(true) => {
					tracing::debug!("Accepted by node");
					return Ok(());
				},
				Ok(false) => {
					unknown_polls += 1;
					if unknown_polls >= self.dropped_grace_polls {
						return Err(MonitorError::Dropped(unknown_polls));
					}
				},
				Err(e) if e.is_transient() => {
					tracing::debug!(error = %e, "Transient error while waiting for acceptance");
				},
				Err(e) => return Err(MonitorError::Delivery(e)),
			}

			self.sleep_until_next_poll(deadline).await?;
		}
	}

	/// Waits for a receipt with at least the configured number of
	/// confirmations.
	///
	/// A reverted receipt is returned as [`MonitorError::Reverted`] as soon as
	/// it is seen, without waiting for further confirmations.
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&tx_hash.to_string())))]
	pub async fn wait_for_confirmation(
		&self,
		tx_hash: &TransactionHash,
		deadline: Instant,
	) -> Result<TransactionReceipt, MonitorError> {
		let mut unknown_polls = 0;

		loop {
			match self.poll_receipt(tx_hash).await {
				Ok(Some(receipt)) if !receipt.success => {
					return Err(MonitorError::Reverted(receipt));
				},
				Ok(Some(receipt)) => {
					unknown_polls = 0;
					let confirmations = self.confirmations(&receipt).await?;
					if confirmations >= self.min_confirmations {
						tracing::info!(
							block_number = receipt.block_number,
							confirmations,
							"Confirmed"
						);
						return Ok(receipt);
					}
					tracing::debug!(
						remaining = self.min_confirmations - confirmations,
						"Waiting for more confirmations"
					);
				},
				Ok(None) => match self.delivery.is_known(tx_hash).await {
					Ok(true) => unknown_polls = 0,
					Ok(false) => {
						unknown_polls += 1;
						tracing::debug!(unknown_polls, "Transaction unknown to node");
						if unknown_polls >= self.dropped_grace_polls {
							return Err(MonitorError::Dropped(unknown_polls));
						}
					},
					Err(e) if e.is_transient() => {
						tracing::debug!(error = %e, "Transient error while checking mempool");
					},
					Err(e) => return Err(MonitorError::Delivery(e)),
				},
				Err(e) => return Err(e),
			}

			self.sleep_until_next_poll(deadline).await?;
		}
	}

	/// Receipt lookup where transient failures count as "not yet mined".
	async fn poll_receipt(
		&self,
		tx_hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, MonitorError> {
		match self.delivery.get_receipt(tx_hash).await {
			Ok(receipt) => Ok(receipt),
			Err(e) if e.is_transient() => {
				tracing::debug!(error = %e, "Transient error while fetching receipt");
				Ok(None)
			},
			Err(e) => Err(MonitorError::Delivery(e)),
		}
	}

	/// Confirmations include the block the transaction was mined in.
	async fn confirmations(&self, receipt: &TransactionReceipt) -> Result<u64, MonitorError> {
		if self.min_confirmations <= 1 {
			return Ok(1);
		}
		match self.delivery.get_block_number().await {
			Ok(current) => Ok((current + 1).saturating_sub(receipt.block_number)),
			Err(e) if e.is_transient() => Ok(0),
			Err(e) => Err(MonitorError::Delivery(e)),
		}
	}

	async fn sleep_until_next_poll(&self, deadline: Instant) -> Result<(), MonitorError> {
		let now = Instant::now();
		if now >= deadline {
			return Err(MonitorError::Timeout(self.timeout.as_secs()));
		}
		let wake = (now + self.poll_interval).min(deadline);
		tokio::time::sleep_until(wake).await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FakeChain, ReceiptMode};

	fn monitor(chain: &FakeChain, min_confirmations: u64) -> ConfirmationMonitor {
		ConfirmationMonitor::new(
			chain.delivery_service(),
			min_confirmations,
			Duration::from_secs(120),
			Duration::from_secs(3),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirms_mined_transaction() {
		let chain = FakeChain::new();
		let hash = chain.seed_transaction();

		let monitor = monitor(&chain, 1);
		let deadline = monitor.deadline();
		monitor.wait_for_acceptance(&hash, deadline).await.unwrap();
		let receipt = monitor.wait_for_confirmation(&hash, deadline).await.unwrap();
		assert!(receipt.success);
		assert_eq!(receipt.hash, hash);
	}

	#[tokio::test(start_paused = true)]
	async fn test_waits_for_required_depth() {
		let chain = FakeChain::new();
		let hash = chain.seed_transaction();
		chain.set_block_number(chain.mined_block());

		let monitor = monitor(&chain, 3);
		let deadline = monitor.deadline();

		let advancing = chain.clone();
		tokio::spawn(async move {
			for _ in 0..2 {
				tokio::time::sleep(Duration::from_secs(4)).await;
				advancing.advance_blocks(1);
			}
		});

		let started = Instant::now();
		monitor.wait_for_confirmation(&hash, deadline).await.unwrap();
		assert!(started.elapsed() >= Duration::from_secs(8));
	}

	#[tokio::test(start_paused = true)]
	async fn test_reverted_receipt_reported() {
		let chain = FakeChain::new().with_receipt_mode(ReceiptMode::Revert);
		let hash = chain.seed_transaction();

		let monitor = monitor(&chain, 1);
		let result = monitor.wait_for_confirmation(&hash, monitor.deadline()).await;
		assert!(matches!(result, Err(MonitorError::Reverted(r)) if !r.success));
	}

	#[tokio::test(start_paused = true)]
	async fn test_pending_forever_times_out() {
		let chain = FakeChain::new().with_receipt_mode(ReceiptMode::Pending);
		let hash = chain.seed_transaction();

		let monitor = monitor(&chain, 1);
		let started = Instant::now();
		let result = monitor.wait_for_confirmation(&hash, monitor.deadline()).await;
		assert!(matches!(result, Err(MonitorError::Timeout(120))));
		assert_eq!(started.elapsed(), Duration::from_secs(120));
	}

	#[tokio::test(start_paused = true)]
	async fn test_unknown_transaction_is_dropped() {
		let chain = FakeChain::new().with_receipt_mode(ReceiptMode::Dropped);
		let hash = chain.seed_transaction();

		let monitor = monitor(&chain, 1).with_dropped_grace_polls(2);
		let result = monitor.wait_for_acceptance(&hash, monitor.deadline()).await;
		assert!(matches!(result, Err(MonitorError::Dropped(2))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_transient_errors_keep_polling() {
		let chain = FakeChain::new();
		let hash = chain.seed_transaction();
		chain.fail_next_reads(2);

		let monitor = monitor(&chain, 1);
		let receipt = monitor
			.wait_for_confirmation(&hash, monitor.deadline())
			.await
			.unwrap();
		assert!(receipt.success);
	}
}
