//! Card attribute lookups.

use super::market_error;
use serde::Deserialize;
use vibe_core::MarketEngine;
use vibe_types::{APIError, CardAttributesResponse, B256};

#[derive(Debug, Default, Deserialize)]
pub struct CardQuery {
	/// Cross-check the combined read against the individual ones.
	#[serde(default)]
	pub verify: bool,
}

/// Handles `GET /api/cards/{seed}`.
pub async fn get_card(
	seed: &str,
	query: CardQuery,
	engine: &MarketEngine,
) -> Result<CardAttributesResponse, APIError> {
	let seed = parse_seed(seed)?;

	let attributes = if query.verify {
		engine.verify_card_seed(seed).await
	} else {
		engine.card_attributes(seed).await
	}
	.map_err(market_error)?;

	Ok(CardAttributesResponse {
		seed,
		wear: attributes.wear,
		foil: attributes.foil,
	})
}

/// Seeds are `0x`-prefixed 32-byte hex strings.
pub fn parse_seed(seed: &str) -> Result<B256, APIError> {
	let invalid = || APIError::BadRequest {
		error_type: "INVALID_SEED".to_string(),
		message: format!("Seed must be 32 bytes of 0x-prefixed hex, got '{}'", seed),
	};

	let digits = seed.strip_prefix("0x").ok_or_else(invalid)?;
	if digits.len() != 64 {
		return Err(invalid());
	}
	seed.parse::<B256>().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_seed() {
		let seed = format!("0x{}", "ab".repeat(32));
		assert_eq!(parse_seed(&seed).unwrap(), B256::repeat_byte(0xab));
	}

	#[test]
	fn test_parse_seed_rejects_malformed_input() {
		for seed in [
			"".to_string(),
			"ab".repeat(32),
			"0x1234".to_string(),
			format!("0x{}", "zz".repeat(32)),
		] {
			let error = parse_seed(&seed).unwrap_err();
			assert_eq!(error.status_code(), 400, "accepted {:?}", seed);
		}
	}
}
