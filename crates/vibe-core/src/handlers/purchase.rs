//! Purchase orchestration.
//!
//! Drives one attempt from parameter validation through wallet approval,
//! broadcast and confirmation. Every outcome, including user rejection and
//! chain failures, ends in a terminal lifecycle state recorded in the tracker
//! and published on the event bus.

use crate::engine::event_bus::EventBus;
use crate::monitoring::{ConfirmationMonitor, MonitorError};
use crate::state::purchase::apply_transition;
use crate::state::{PurchaseStateError, PurchaseTracker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::instrument;
use vibe_contracts::{drop_token, drop_token_descriptor, ContractDescriptor, ContractError};
use vibe_delivery::{DeliveryError, DeliveryService};
use vibe_types::{
	format_token_amount, truncate_id, Address, FailureKind, FailureReason, MarketEvent,
	PurchaseAttempt, PurchaseEvent, Transaction, TransactionHash, TransactionLifecycleState,
	TransactionReceipt, U256,
};
use vibe_wallet::{WalletError, WalletService};

/// Native token decimals, for log and error messages.
const NATIVE_DECIMALS: u8 = 18;

/// Timing policy for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct PurchasePolicy {
	pub min_confirmations: u64,
	pub confirmation_timeout: Duration,
	pub poll_interval: Duration,
	pub approval_timeout: Duration,
}

impl Default for PurchasePolicy {
	fn default() -> Self {
		Self {
			min_confirmations: 1,
			confirmation_timeout: Duration::from_secs(120),
			poll_interval: Duration::from_secs(3),
			approval_timeout: Duration::from_secs(300),
		}
	}
}

pub struct PurchaseOrchestrator {
	delivery: Arc<DeliveryService>,
	wallet: Arc<WalletService>,
	tracker: Arc<PurchaseTracker>,
	event_bus: EventBus,
	monitor: ConfirmationMonitor,
	approval_timeout: Duration,
}

impl PurchaseOrchestrator {
	/// Creates an orchestrator for one chain.
	///
	/// # Arguments
	///
	/// * `delivery` - Chain access used for quotes, simulation, broadcast and
	///   confirmation polling
	/// * `wallet` - Signs and approves the purchase transaction
	/// * `tracker` - Where every state change of an attempt is recorded
	/// * `event_bus` - Where every state change is published
	/// * `policy` - Confirmation and approval timing
	///
	/// # Errors
	///
	/// Fails if the drop token descriptor does not declare `getBuyQuote` as a
	/// read and `buy` as payable.
	pub fn new(
		delivery: Arc<DeliveryService>,
		wallet: Arc<WalletService>,
		tracker: Arc<PurchaseTracker>,
		event_bus: EventBus,
		policy: PurchasePolicy,
	) -> Result<Self, ContractError> {
		check_drop_token(&drop_token_descriptor()?)?;

		let monitor = ConfirmationMonitor::new(
			delivery.clone(),
			policy.min_confirmations,
			policy.confirmation_timeout,
			policy.poll_interval,
		);
		Ok(Self {
			delivery,
			wallet,
			tracker,
			event_bus,
			monitor,
			approval_timeout: policy.approval_timeout,
		})
	}

	/// Runs `attempt` to a terminal state and returns the final record.
	///
	/// `cancel` flipping to `true` while the wallet prompt is open ends the
	/// attempt as rejected. After broadcast, cancellation no longer applies:
	/// the transaction is out of our hands and is monitored to the end.
	///
	/// # Arguments
	///
	/// * `attempt` - A freshly registered attempt, still `Idle`
	/// * `cancel` - The dismissal signal returned by the tracker
	///
	/// # Returns
	///
	/// The attempt in `Confirmed` or `Failed`. Chain and wallet failures are
	/// recorded in the attempt, not returned as errors.
	///
	/// # Errors
	///
	/// [`PurchaseStateError::InvalidTransition`] if `attempt` is not `Idle`.
	#[instrument(skip_all, fields(attempt_id = %truncate_id(&attempt.id)))]
	pub async fn execute(
		&self,
		mut attempt: PurchaseAttempt,
		mut cancel: watch::Receiver<bool>,
	) -> Result<PurchaseAttempt, PurchaseStateError> {
		if !matches!(attempt.state, TransactionLifecycleState::Idle) {
			return Err(PurchaseStateError::InvalidTransition {
				from: attempt.state.name(),
				to: TransactionLifecycleState::AwaitingWalletApproval.name(),
			});
		}

		let outcome = self.run(&mut attempt, &mut cancel).await?;
		let terminal = match outcome {
			Ok(receipt) => TransactionLifecycleState::Confirmed { receipt },
			Err(reason) => {
				tracing::warn!(kind = ?reason.kind, reason = %reason, "Purchase failed");
				TransactionLifecycleState::Failed { reason }
			},
		};
		self.advance(&mut attempt, terminal).await?;

		Ok(attempt)
	}

	/// The lifecycle proper. The outer `Result` carries bookkeeping errors,
	/// the inner one the purchase outcome.
	async fn run(
		&self,
		attempt: &mut PurchaseAttempt,
		cancel: &mut watch::Receiver<bool>,
	) -> Result<Result<TransactionReceipt, FailureReason>, PurchaseStateError> {
		if let Err(e) = attempt.params.validate() {
			return Ok(Err(FailureReason::new(FailureKind::Validation, e.to_string())));
		}

		let tx = match self.prepare(attempt).await {
			Ok(tx) => tx,
			Err(reason) => return Ok(Err(reason)),
		};

		self.advance(attempt, TransactionLifecycleState::AwaitingWalletApproval)
			.await?;
		if let Err(reason) = self.await_approval(&tx, cancel).await {
			return Ok(Err(reason));
		}

		let tx_hash = match self.delivery.submit(tx.clone()).await {
			Ok(hash) => hash,
			Err(e) => return Ok(Err(submit_failure(e))),
		};
		tracing::info!(tx_hash = %tx_hash, "Purchase submitted");

		let deadline = self.monitor.deadline();
		self.advance(attempt, TransactionLifecycleState::Submitted { tx_hash })
			.await?;

		if let Err(e) = self.monitor.wait_for_acceptance(&tx_hash, deadline).await {
			return Ok(Err(self.monitor_failure(&tx, &tx_hash, e).await));
		}
		self.advance(attempt, TransactionLifecycleState::Confirming { tx_hash })
			.await?;

		match self.monitor.wait_for_confirmation(&tx_hash, deadline).await {
			Ok(receipt) => Ok(Ok(receipt)),
			Err(e) => Ok(Err(self.monitor_failure(&tx, &tx_hash, e).await)),
		}
	}

	/// Reads the quote and balance, then simulates the purchase from the
	/// buyer. Nothing here prompts the user.
	async fn prepare(&self, attempt: &PurchaseAttempt) -> Result<Transaction, FailureReason> {
		let params = &attempt.params;
		let buyer = self.wallet.get_address().await.map_err(wallet_failure)?;

		let (quote, balance) = tokio::try_join!(
			self.quote(params.token_address, params.token_amount),
			async {
				self.delivery
					.get_balance(buyer)
					.await
					.map_err(delivery_failure)
			},
		)?;

		tracing::debug!(
			buyer = %buyer,
			quote = %format_token_amount(quote, NATIVE_DECIMALS),
			balance = %format_token_amount(balance, NATIVE_DECIMALS),
			"Read purchase preconditions"
		);

		if balance < quote {
			return Err(FailureReason::new(
				FailureKind::Precondition,
				format!(
					"insufficient balance: {} available, {} required",
					format_token_amount(balance, NATIVE_DECIMALS),
					format_token_amount(quote, NATIVE_DECIMALS)
				),
			));
		}

		let tx = Transaction::call(
			self.delivery.chain_id(),
			params.token_address,
			drop_token::buy_calldata(params),
		)
		.with_from(buyer)
		.with_value(quote);

		self.delivery
			.simulate(&tx)
			.await
			.map_err(delivery_failure)?;

		Ok(tx)
	}

	async fn quote(&self, token: Address, token_amount: U256) -> Result<U256, FailureReason> {
		let data = self
			.delivery
			.read(token, drop_token::quote_calldata(token_amount))
			.await
			.map_err(delivery_failure)?;
		drop_token::decode_quote(&data)
			.map_err(|e| FailureReason::new(FailureKind::Precondition, e.to_string()))
	}

	/// Races the wallet prompt against cancellation and the approval timeout.
	async fn await_approval(
		&self,
		tx: &Transaction,
		cancel: &mut watch::Receiver<bool>,
	) -> Result<(), FailureReason> {
		tokio::select! {
			biased;
			_ = cancelled(cancel) => {
				tracing::info!("Purchase cancelled while awaiting approval");
				Err(FailureReason::rejected())
			}
			result = tokio::time::timeout(self.approval_timeout, self.wallet.request_approval(tx)) => {
				match result {
					Ok(Ok(())) => Ok(()),
					Ok(Err(WalletError::Rejected(message))) => {
						tracing::info!(message = %message, "Wallet rejected purchase");
						Err(FailureReason::rejected())
					}
					Ok(Err(e)) => Err(wallet_failure(e)),
					Err(_) => {
						tracing::info!(
							timeout_secs = self.approval_timeout.as_secs(),
							"Wallet approval timed out"
						);
						Err(FailureReason::rejected())
					}
				}
			}
		}
	}

	async fn monitor_failure(
		&self,
		tx: &Transaction,
		tx_hash: &TransactionHash,
		error: MonitorError,
	) -> FailureReason {
		match error {
			MonitorError::Reverted(receipt) => {
				let reason = self.revert_reason(tx, receipt.block_number).await;
				tracing::warn!(tx_hash = %tx_hash, reason = %reason, "Purchase reverted");
				FailureReason::new(FailureKind::Reverted, reason)
			},
			MonitorError::Dropped(_) => {
				FailureReason::new(FailureKind::Dropped, error.to_string())
			},
			MonitorError::Timeout(_) => {
				FailureReason::new(FailureKind::Timeout, error.to_string())
			},
			MonitorError::Delivery(e) => submit_failure(e),
		}
	}

	/// Receipts carry no revert data; replaying the call usually recovers it.
	async fn revert_reason(&self, tx: &Transaction, block_number: u64) -> String {
		match self.delivery.simulate(tx).await {
			Err(DeliveryError::Reverted(reason)) => reason,
			_ => {
				tracing::debug!(block_number, "Replay did not revert, no reason available");
				"transaction reverted".to_string()
			},
		}
	}

	/// Records a transition locally, in the tracker and on the event bus.
	async fn advance(
		&self,
		attempt: &mut PurchaseAttempt,
		next: TransactionLifecycleState,
	) -> Result<(), PurchaseStateError> {
		apply_transition(attempt, next)?;
		tracing::debug!(state = %attempt.state, "Purchase state changed");

		if !self.tracker.store(attempt).await {
			tracing::debug!("Attempt dismissed, state not recorded");
		}
		self.event_bus
			.publish(MarketEvent::Purchase(PurchaseEvent::StateChanged {
				attempt_id: attempt.id.clone(),
				state: attempt.state.clone(),
			}));
		Ok(())
	}
}

/// Resolves once `cancel` holds `true`. Never resolves if the sender is gone
/// without having cancelled.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
	loop {
		if *cancel.borrow_and_update() {
			return;
		}
		if cancel.changed().await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}

fn delivery_failure(error: DeliveryError) -> FailureReason {
	match error {
		DeliveryError::Network(message) => FailureReason::new(FailureKind::Network, message),
		DeliveryError::Reverted(reason) => FailureReason::new(FailureKind::Reverted, reason),
		e @ (DeliveryError::Rejected(_) | DeliveryError::NoProviderAvailable(_)) => {
			FailureReason::new(FailureKind::Precondition, e.to_string())
		},
	}
}

/// Quotes must be reads and purchases must carry value.
fn check_drop_token(descriptor: &ContractDescriptor) -> Result<(), ContractError> {
	descriptor.ensure_read_only("getBuyQuote")?;
	descriptor.ensure_payable("buy")?;
	Ok(())
}

/// From the broadcast onward a network error leaves the outcome unknown: the
/// node may hold the transaction even though the response was lost.
fn submit_failure(error: DeliveryError) -> FailureReason {
	match error {
		DeliveryError::Network(message) => {
			tracing::warn!(error = %message, "Broadcast outcome unknown");
			FailureReason::new(
				FailureKind::BroadcastUnknown,
				format!("broadcast outcome unknown: {}", message),
			)
		},
		e => delivery_failure(e),
	}
}

fn wallet_failure(error: WalletError) -> FailureReason {
	match error {
		WalletError::Rejected(_) => FailureReason::rejected(),
		e => FailureReason::new(FailureKind::Precondition, e.to_string()),
	}
}
