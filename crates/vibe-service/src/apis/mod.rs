//! Request handling behind the HTTP routes.
//!
//! Each submodule turns engine results into API bodies; the mapping from
//! engine errors to HTTP errors lives here so every route reports the same
//! failure the same way.

pub mod cards;
pub mod colors;
pub mod config;
pub mod purchase;

use vibe_core::{CardError, MarketError, PurchaseStateError};
use vibe_types::APIError;

/// Maps an engine error to its API error.
pub fn market_error(error: MarketError) -> APIError {
	match error {
		MarketError::InvalidParams(e) => APIError::BadRequest {
			error_type: "INVALID_PARAMS".to_string(),
			message: e.to_string(),
		},
		MarketError::State(PurchaseStateError::AttemptNotFound(id)) => APIError::NotFound {
			error_type: "PURCHASE_NOT_FOUND".to_string(),
			message: format!("No purchase attempt with id {}", id),
		},
		MarketError::State(e) => APIError::InternalServerError {
			error_type: "INVALID_STATE".to_string(),
			message: e.to_string(),
		},
		MarketError::Card(e) => card_error(e),
		MarketError::Contract(e) => APIError::InternalServerError {
			error_type: "CONTRACT_MISMATCH".to_string(),
			message: e.to_string(),
		},
	}
}

fn card_error(error: CardError) -> APIError {
	match error {
		CardError::NotConfigured => APIError::ServiceUnavailable {
			error_type: "CARD_SEED_NOT_CONFIGURED".to_string(),
			message: error.to_string(),
		},
		CardError::Inconsistent { .. } => APIError::BadGateway {
			error_type: "CARD_DATA_INCONSISTENT".to_string(),
			message: error.to_string(),
			retryable: false,
		},
		CardError::Delivery(_) | CardError::Contract(_) => {
			let retryable = error.is_transient();
			APIError::BadGateway {
				error_type: "CHAIN_READ_FAILED".to_string(),
				message: error.to_string(),
				retryable,
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use vibe_contracts::CardAttributes;
	use vibe_delivery::DeliveryError;
	use vibe_types::{ParamsError, B256};

	#[test]
	fn test_invalid_params_are_bad_requests() {
		let error = market_error(MarketError::InvalidParams(ParamsError::ZeroAmount));
		assert_eq!(error.status_code(), 400);
		assert_eq!(error.to_error_response().error, "INVALID_PARAMS");
	}

	#[test]
	fn test_unknown_attempt_is_not_found() {
		let error = market_error(MarketError::State(PurchaseStateError::AttemptNotFound(
			"abc".to_string(),
		)));
		assert_eq!(error.status_code(), 404);
		assert!(error.to_error_response().message.contains("abc"));
	}

	#[test]
	fn test_card_errors() {
		let unconfigured = market_error(MarketError::Card(CardError::NotConfigured));
		assert_eq!(unconfigured.status_code(), 503);

		let network = market_error(MarketError::Card(CardError::Delivery(
			DeliveryError::Network("connection refused".to_string()),
		)));
		assert_eq!(network.status_code(), 502);
		assert!(network.to_error_response().retryable);

		let reverted = market_error(MarketError::Card(CardError::Delivery(
			DeliveryError::Reverted("bad seed".to_string()),
		)));
		assert!(!reverted.to_error_response().retryable);

		let inconsistent = market_error(MarketError::Card(CardError::Inconsistent {
			seed: B256::ZERO,
			combined: CardAttributes {
				wear: "Mint".to_string(),
				foil: "Normal".to_string(),
			},
			individual: CardAttributes {
				wear: "Worn".to_string(),
				foil: "Normal".to_string(),
			},
		}));
		assert_eq!(
			inconsistent.to_error_response().error,
			"CARD_DATA_INCONSISTENT"
		);
	}
}
