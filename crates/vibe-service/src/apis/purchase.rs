//! Purchase submission, status and dismissal.

use super::market_error;
use vibe_core::MarketEngine;
use vibe_types::{
	truncate_id, APIError, BuyTokenParams, BuyTokenRequest, PurchaseAccepted, PurchaseAttempt,
};

/// Handles `POST /api/purchases`.
///
/// Parameters are validated before anything is registered; a bad request
/// never reaches the chain.
pub async fn submit_purchase(
	request: BuyTokenRequest,
	engine: &MarketEngine,
) -> Result<PurchaseAccepted, APIError> {
	let params = parse_request(request)?;
	let attempt_id = engine.start_purchase(params).await.map_err(market_error)?;

	tracing::info!(attempt_id = %truncate_id(&attempt_id), "Accepted purchase request");
	Ok(PurchaseAccepted { attempt_id })
}

/// Handles `GET /api/purchases/{id}`.
pub async fn get_purchase(id: &str, engine: &MarketEngine) -> Result<PurchaseAttempt, APIError> {
	engine.attempt(id).await.ok_or_else(|| APIError::NotFound {
		error_type: "PURCHASE_NOT_FOUND".to_string(),
		message: format!("No purchase attempt with id {}", id),
	})
}

/// Handles `DELETE /api/purchases/{id}`. Returns the attempt as it was when
/// dismissed.
pub async fn dismiss_purchase(
	id: &str,
	engine: &MarketEngine,
) -> Result<PurchaseAttempt, APIError> {
	engine.dismiss(id).await.map_err(market_error)
}

pub fn parse_request(request: BuyTokenRequest) -> Result<BuyTokenParams, APIError> {
	BuyTokenParams::try_from(request).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_PARAMS".to_string(),
		message: e.to_string(),
	})
}
