//! Card attribute reads against the card seed contract.

use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use vibe_contracts::{card_seed, card_seed_descriptor, CardAttributes, ContractError};
use vibe_delivery::{DeliveryError, DeliveryService};
use vibe_types::{Address, Bytes, B256};

/// Total time transient read failures are retried for.
const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CardError {
	#[error("No card seed contract configured")]
	NotConfigured,
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Contract(#[from] ContractError),
	#[error(
		"Inconsistent card data for seed {seed}: getCardSeedData returned {combined:?}, individual reads returned {individual:?}"
	)]
	Inconsistent {
		seed: B256,
		combined: CardAttributes,
		individual: CardAttributes,
	},
}

impl CardError {
	pub fn is_transient(&self) -> bool {
		matches!(self, CardError::Delivery(e) if e.is_transient())
	}
}

pub struct CardService {
	delivery: Arc<DeliveryService>,
	contract: Option<Address>,
	retry_window: Duration,
}

impl CardService {
	/// Fails if the card seed descriptor declares any of the functions used
	/// here as state-changing.
	pub fn new(delivery: Arc<DeliveryService>, contract: Option<Address>) -> Result<Self, CardError> {
		let descriptor = card_seed_descriptor()?;
		for function in ["wearFromSeed", "getFoilMappingFromSeed", "getCardSeedData"] {
			descriptor.ensure_read_only(function)?;
		}

		Ok(Self {
			delivery,
			contract,
			retry_window: DEFAULT_RETRY_WINDOW,
		})
	}

	/// Wear and foil for `seed` from a single `getCardSeedData` read.
	pub async fn attributes(&self, seed: B256) -> Result<CardAttributes, CardError> {
		let contract = self.contract.ok_or(CardError::NotConfigured)?;
		let results = self
			.read(vec![(contract, card_seed::card_seed_data_calldata(seed))])
			.await?;
		let data = results.first().ok_or_else(|| {
			DeliveryError::Network("empty response to getCardSeedData".to_string())
		})?;
		Ok(card_seed::decode_card_seed_data(data)?)
	}

	/// Reads all three functions and checks that the combined read agrees
	/// with the individual ones.
	pub async fn verify(&self, seed: B256) -> Result<CardAttributes, CardError> {
		let contract = self.contract.ok_or(CardError::NotConfigured)?;
		let results = self
			.read(vec![
				(contract, card_seed::wear_calldata(seed)),
				(contract, card_seed::foil_calldata(seed)),
				(contract, card_seed::card_seed_data_calldata(seed)),
			])
			.await?;

		let [wear, foil, combined] = results.as_slice() else {
			return Err(DeliveryError::Network(format!(
				"expected 3 responses, got {}",
				results.len()
			))
			.into());
		};

		let individual = CardAttributes {
			wear: card_seed::decode_wear(wear)?,
			foil: card_seed::decode_foil(foil)?,
		};
		let combined = card_seed::decode_card_seed_data(combined)?;

		if combined != individual {
			tracing::warn!(seed = %seed, "Card seed contract returned inconsistent data");
			return Err(CardError::Inconsistent {
				seed,
				combined,
				individual,
			});
		}
		Ok(combined)
	}

	/// Reads with exponential backoff on transient failures.
	async fn read(&self, requests: Vec<(Address, Bytes)>) -> Result<Vec<Bytes>, DeliveryError> {
		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(250))
			.with_max_elapsed_time(Some(self.retry_window))
			.build();

		backoff::future::retry(policy, || {
			let requests = requests.clone();
			async move {
				self.delivery.read_many(requests).await.map_err(|e| {
					if e.is_transient() {
						tracing::debug!(error = %e, "Retrying card read");
						backoff::Error::transient(e)
					} else {
						backoff::Error::permanent(e)
					}
				})
			}
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{foil_for, wear_for, FakeChain};

	fn contract() -> Address {
		Address::repeat_byte(0xc5)
	}

	#[tokio::test]
	async fn test_attributes_for_seed() {
		let chain = FakeChain::new();
		let cards = CardService::new(chain.delivery_service(), Some(contract())).unwrap();

		let seed = B256::with_last_byte(7);
		let attributes = cards.attributes(seed).await.unwrap();
		assert_eq!(attributes.wear, wear_for(seed));
		assert_eq!(attributes.foil, foil_for(seed));
	}

	#[tokio::test]
	async fn test_same_seed_same_attributes() {
		let chain = FakeChain::new();
		let cards = CardService::new(chain.delivery_service(), Some(contract())).unwrap();

		let seed = B256::repeat_byte(0x42);
		let first = cards.attributes(seed).await.unwrap();
		let second = cards.attributes(seed).await.unwrap();
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_verify_seed_one_consistent() {
		let chain = FakeChain::new();
		let cards = CardService::new(chain.delivery_service(), Some(contract())).unwrap();

		let seed = B256::with_last_byte(1);
		let verified = cards.verify(seed).await.unwrap();
		assert_eq!(verified, cards.attributes(seed).await.unwrap());
	}

	#[tokio::test]
	async fn test_verify_detects_inconsistency() {
		let chain = FakeChain::new().with_inconsistent_card_data();
		let cards = CardService::new(chain.delivery_service(), Some(contract())).unwrap();

		let result = cards.verify(B256::with_last_byte(1)).await;
		assert!(matches!(result, Err(CardError::Inconsistent { .. })));
	}

	#[tokio::test]
	async fn test_transient_failure_retried() {
		let chain = FakeChain::new();
		let cards = CardService::new(chain.delivery_service(), Some(contract())).unwrap();
		chain.fail_next_reads(1);

		assert!(cards.attributes(B256::with_last_byte(3)).await.is_ok());
	}

	#[tokio::test]
	async fn test_missing_contract() {
		let chain = FakeChain::new();
		let cards = CardService::new(chain.delivery_service(), None).unwrap();

		let result = cards.attributes(B256::ZERO).await;
		assert!(matches!(result, Err(CardError::NotConfigured)));
		assert_eq!(chain.read_count(), 0);
	}
}
