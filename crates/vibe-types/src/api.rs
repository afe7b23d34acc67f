//! API types for the VibeMarket HTTP API.
//!
//! Request and response bodies use camelCase field names so that browser
//! clients can consume them directly.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response for `GET /api/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
	pub chain_id: u64,
	pub wallet_connect_project_id: String,
	pub batching: bool,
	pub card_seed: Option<Address>,
}

/// Response for `POST /api/purchases`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAccepted {
	pub attempt_id: String,
}

/// Response for `GET /api/cards/{seed}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAttributesResponse {
	pub seed: B256,
	pub wear: String,
	pub foil: String,
}

/// Response for `GET /api/colors/{address}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorResponse {
	pub address: String,
	pub color: String,
}

/// API error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error code, e.g. `INVALID_PARAMS`.
	pub error: String,
	/// Human-readable description.
	pub message: String,
	/// Whether the request may succeed if repeated.
	#[serde(default)]
	pub retryable: bool,
}

/// API error with its HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// 400
	BadRequest { error_type: String, message: String },
	/// 404
	NotFound { error_type: String, message: String },
	/// 502, the chain or RPC endpoint failed.
	BadGateway {
		error_type: String,
		message: String,
		retryable: bool,
	},
	/// 503
	ServiceUnavailable { error_type: String, message: String },
	/// 500
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::BadGateway { .. } => 502,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message, retryable) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, false),
			APIError::ServiceUnavailable {
				error_type,
				message,
			} => (error_type, message, true),
			APIError::BadGateway {
				error_type,
				message,
				retryable,
			} => (error_type, message, *retryable),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			retryable,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
