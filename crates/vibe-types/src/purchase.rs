//! Purchase parameter model.
//!
//! [`BuyTokenParams`] is the typed request the orchestrator accepts.
//! [`BuyTokenRequest`] is its wire form as received from a UI, with every
//! field still a string; converting one into the other parses and validates.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating purchase parameters.
///
/// These are always raised before any network interaction takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
	/// A field does not hold a `0x`-prefixed, 20-byte hex address.
	#[error("Invalid address for '{field}': {value}")]
	InvalidAddress { field: &'static str, value: String },
	/// The token amount is not a decimal or `0x`-hex unsigned integer.
	#[error("Invalid token amount: {0}")]
	InvalidAmount(String),
	/// The token amount is zero.
	#[error("Token amount must be greater than zero")]
	ZeroAmount,
	/// A mandatory address is the zero address.
	#[error("Field '{0}' cannot be the zero address")]
	ZeroAddress(&'static str),
}

/// Parameters of a single token purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyTokenParams {
	/// Drop token contract the purchase is sent to.
	pub token_address: Address,
	/// Number of tokens to buy.
	pub token_amount: U256,
	/// Address receiving the purchased tokens.
	pub recipient: Address,
	/// Address credited for referring the purchase.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub referrer: Option<Address>,
	/// Address credited as the origin of the referral chain.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub origin_referrer: Option<Address>,
}

impl BuyTokenParams {
	pub fn new(token_address: Address, token_amount: U256, recipient: Address) -> Self {
		Self {
			token_address,
			token_amount,
			recipient,
			referrer: None,
			origin_referrer: None,
		}
	}

	pub fn with_referrer(mut self, referrer: Address) -> Self {
		self.referrer = Some(referrer);
		self
	}

	pub fn with_origin_referrer(mut self, origin_referrer: Address) -> Self {
		self.origin_referrer = Some(origin_referrer);
		self
	}

	/// Checks the field constraints of a purchase.
	///
	/// The amount must be non-zero and neither the token contract nor the
	/// recipient may be the zero address. Referrers are optional and any
	/// value is accepted for them.
	pub fn validate(&self) -> Result<(), ParamsError> {
		if self.token_amount.is_zero() {
			return Err(ParamsError::ZeroAmount);
		}
		if self.token_address.is_zero() {
			return Err(ParamsError::ZeroAddress("tokenAddress"));
		}
		if self.recipient.is_zero() {
			return Err(ParamsError::ZeroAddress("recipient"));
		}
		Ok(())
	}

	/// Referrer as encoded on-chain, where "no referrer" is the zero address.
	pub fn referrer_or_zero(&self) -> Address {
		self.referrer.unwrap_or(Address::ZERO)
	}

	/// Origin referrer as encoded on-chain.
	pub fn origin_referrer_or_zero(&self) -> Address {
		self.origin_referrer.unwrap_or(Address::ZERO)
	}
}

/// Wire form of a purchase request as submitted by a UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyTokenRequest {
	pub token_address: String,
	pub token_amount: String,
	pub recipient: String,
	#[serde(default)]
	pub referrer: Option<String>,
	#[serde(default)]
	pub origin_referrer: Option<String>,
}

impl TryFrom<BuyTokenRequest> for BuyTokenParams {
	type Error = ParamsError;

	fn try_from(request: BuyTokenRequest) -> Result<Self, Self::Error> {
		let params = BuyTokenParams {
			token_address: parse_address("tokenAddress", &request.token_address)?,
			token_amount: parse_amount(&request.token_amount)?,
			recipient: parse_address("recipient", &request.recipient)?,
			referrer: parse_optional_address("referrer", request.referrer.as_deref())?,
			origin_referrer: parse_optional_address(
				"originReferrer",
				request.origin_referrer.as_deref(),
			)?,
		};
		params.validate()?;
		Ok(params)
	}
}

/// Parses a `0x`-prefixed, 40 hex digit address.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ParamsError> {
	let invalid = || ParamsError::InvalidAddress {
		field,
		value: value.to_string(),
	};

	let trimmed = value.trim();
	let digits = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.ok_or_else(invalid)?;
	if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(invalid());
	}
	digits.parse::<Address>().map_err(|_| invalid())
}

fn parse_optional_address(
	field: &'static str,
	value: Option<&str>,
) -> Result<Option<Address>, ParamsError> {
	match value.map(str::trim) {
		None | Some("") => Ok(None),
		Some(v) => parse_address(field, v).map(Some),
	}
}

/// Parses a token amount given in decimal or as `0x`-prefixed hex.
pub fn parse_amount(value: &str) -> Result<U256, ParamsError> {
	let trimmed = value.trim();
	if trimmed.is_empty() || trimmed.starts_with('-') {
		return Err(ParamsError::InvalidAmount(value.to_string()));
	}
	trimmed
		.parse::<U256>()
		.map_err(|_| ParamsError::InvalidAmount(value.to_string()))
}
