//! Market engine: the entry point UI layers talk to.
//!
//! Owns the purchase orchestrator, the attempt tracker, the card service and
//! the event bus. Cheap to clone; clones share all state.

pub mod event_bus;

use crate::handlers::{CardError, CardService, PurchaseOrchestrator, PurchasePolicy};
use crate::state::{PurchaseStateError, PurchaseTracker, RetentionPolicy};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Semaphore};
use vibe_config::{Config, MAX_CONFIRMATION_TIMEOUT_SECONDS};
use vibe_contracts::{CardAttributes, ContractError};
use vibe_delivery::DeliveryService;
use vibe_types::{
	truncate_id, BuyTokenParams, MarketEvent, ParamsError, PurchaseAttempt, PurchaseEvent, B256,
};
use vibe_wallet::WalletService;

/// Attempts driven concurrently by background tasks. Further attempts queue.
const MAX_CONCURRENT_ATTEMPTS: usize = 100;

#[derive(Debug, Error)]
pub enum MarketError {
	#[error("Invalid purchase parameters: {0}")]
	InvalidParams(#[from] ParamsError),
	#[error(transparent)]
	State(#[from] PurchaseStateError),
	#[error(transparent)]
	Card(#[from] CardError),
	#[error("Contract descriptor check failed: {0}")]
	Contract(#[from] ContractError),
}

/// Entry point for purchases, card reads and event subscriptions.
#[derive(Clone)]
pub struct MarketEngine {
	config: Config,
	tracker: Arc<PurchaseTracker>,
	orchestrator: Arc<PurchaseOrchestrator>,
	cards: Arc<CardService>,
	event_bus: event_bus::EventBus,
	permits: Arc<Semaphore>,
}

impl MarketEngine {
	/// Wires the engine around an existing wallet and delivery service.
	///
	/// # Arguments
	///
	/// * `config` - Timing, retention and contract settings
	/// * `wallet` - Approves purchases and supplies the buyer address
	/// * `delivery` - Chain access for the configured chain
	/// * `event_bus` - Where lifecycle events are published
	///
	/// # Errors
	///
	/// Fails if the contract descriptors do not match how they are called.
	pub fn new(
		config: Config,
		wallet: Arc<WalletService>,
		delivery: Arc<DeliveryService>,
		event_bus: event_bus::EventBus,
	) -> Result<Self, MarketError> {
		let tracker = Arc::new(PurchaseTracker::with_retention(RetentionPolicy {
			window: Duration::from_secs(config.delivery.attempt_retention_seconds),
			max_finished: config.delivery.max_finished_attempts,
		}));
		let policy = PurchasePolicy {
			min_confirmations: config.delivery.min_confirmations,
			confirmation_timeout: Duration::from_secs(
				config
					.delivery
					.confirmation_timeout_seconds
					.min(MAX_CONFIRMATION_TIMEOUT_SECONDS),
			),
			poll_interval: Duration::from_secs(config.delivery.poll_interval_seconds),
			approval_timeout: Duration::from_secs(config.delivery.approval_timeout_seconds),
		};
		let orchestrator = Arc::new(PurchaseOrchestrator::new(
			delivery.clone(),
			wallet.clone(),
			tracker.clone(),
			event_bus.clone(),
			policy,
		)?);
		let cards = Arc::new(CardService::new(
			delivery.clone(),
			config.contracts.card_seed,
		)?);

		Ok(Self {
			config,
			tracker,
			orchestrator,
			cards,
			event_bus,
			permits: Arc::new(Semaphore::new(MAX_CONCURRENT_ATTEMPTS)),
		})
	}

	/// Runs a purchase to completion and returns the final attempt record.
	///
	/// Invalid parameters do not produce an error here; the attempt ends in
	/// `Failed` with a validation reason and no network call is made.
	pub async fn purchase(&self, params: BuyTokenParams) -> Result<PurchaseAttempt, MarketError> {
		let (attempt, cancel) = self.tracker.register(params).await;
		tracing::info!(attempt_id = %truncate_id(&attempt.id), "Purchase started");
		Ok(self.orchestrator.execute(attempt, cancel).await?)
	}

	/// Validates `params`, registers an attempt and drives it in the
	/// background.
	///
	/// # Returns
	///
	/// The attempt id, as soon as the attempt is registered. Progress is
	/// published on the event bus and readable through [`Self::attempt`].
	///
	/// # Errors
	///
	/// [`MarketError::InvalidParams`] if `params` fail validation; nothing is
	/// registered in that case.
	pub async fn start_purchase(&self, params: BuyTokenParams) -> Result<String, MarketError> {
		params.validate()?;

		let (attempt, cancel) = self.tracker.register(params).await;
		let attempt_id = attempt.id.clone();
		tracing::info!(attempt_id = %truncate_id(&attempt_id), "Purchase accepted");

		let orchestrator = self.orchestrator.clone();
		let permits = self.permits.clone();
		tokio::spawn(async move {
			let _permit = match permits.acquire_owned().await {
				Ok(permit) => permit,
				Err(e) => {
					tracing::error!("Failed to acquire attempt permit: {}", e);
					return;
				},
			};
			if let Err(e) = orchestrator.execute(attempt, cancel).await {
				tracing::error!(error = %e, "Purchase attempt aborted");
			}
		});

		Ok(attempt_id)
	}

	/// Latest record of an attempt, unless it was dismissed or evicted.
	pub async fn attempt(&self, attempt_id: &str) -> Option<PurchaseAttempt> {
		self.tracker.get(attempt_id).await
	}

	pub async fn attempts(&self) -> Vec<PurchaseAttempt> {
		self.tracker.list().await
	}

	/// Discards an attempt, cancelling it if the wallet prompt is still open.
	pub async fn dismiss(&self, attempt_id: &str) -> Result<PurchaseAttempt, MarketError> {
		let attempt = self.tracker.dismiss(attempt_id).await?;
		self.event_bus
			.publish(MarketEvent::Purchase(PurchaseEvent::Dismissed {
				attempt_id: attempt.id.clone(),
			}));
		tracing::info!(attempt_id = %truncate_id(attempt_id), state = %attempt.state, "Purchase dismissed");
		Ok(attempt)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.event_bus.subscribe()
	}

	pub async fn card_attributes(&self, seed: B256) -> Result<CardAttributes, MarketError> {
		Ok(self.cards.attributes(seed).await?)
	}

	/// Cross-checks the combined and individual card seed reads.
	pub async fn verify_card_seed(&self, seed: B256) -> Result<CardAttributes, MarketError> {
		Ok(self.cards.verify(seed).await?)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}
