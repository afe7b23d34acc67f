//! Calldata encoders and return decoders for the card seed contract.

use crate::bindings::ICardSeed;
use crate::ContractError;
use alloy_primitives::{Bytes, B256};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

/// Cosmetic attributes derived from a seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAttributes {
	pub wear: String,
	pub foil: String,
}

pub fn wear_calldata(seed: B256) -> Bytes {
	ICardSeed::wearFromSeedCall { seed }.abi_encode().into()
}

pub fn foil_calldata(seed: B256) -> Bytes {
	ICardSeed::getFoilMappingFromSeedCall { seed }
		.abi_encode()
		.into()
}

pub fn card_seed_data_calldata(seed: B256) -> Bytes {
	ICardSeed::getCardSeedDataCall { seed }.abi_encode().into()
}

pub fn decode_wear(data: &[u8]) -> Result<String, ContractError> {
	ICardSeed::wearFromSeedCall::abi_decode_returns(data, true)
		.map(|ret| ret.wear)
		.map_err(|e| decode_error("wearFromSeed", e))
}

pub fn decode_foil(data: &[u8]) -> Result<String, ContractError> {
	ICardSeed::getFoilMappingFromSeedCall::abi_decode_returns(data, true)
		.map(|ret| ret.foil)
		.map_err(|e| decode_error("getFoilMappingFromSeed", e))
}

pub fn decode_card_seed_data(data: &[u8]) -> Result<CardAttributes, ContractError> {
	ICardSeed::getCardSeedDataCall::abi_decode_returns(data, true)
		.map(|ret| CardAttributes {
			wear: ret.wear,
			foil: ret.foil,
		})
		.map_err(|e| decode_error("getCardSeedData", e))
}

fn decode_error(function: &'static str, err: alloy_sol_types::Error) -> ContractError {
	ContractError::Decode {
		function,
		message: err.to_string(),
	}
}
