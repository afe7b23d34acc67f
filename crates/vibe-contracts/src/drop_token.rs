//! Calldata encoders and return decoders for the drop token contract.

use crate::bindings::IDropToken;
use crate::ContractError;
use alloy_primitives::{Bytes, U256};
use alloy_sol_types::SolCall;
use vibe_types::BuyTokenParams;

/// Calldata for `getBuyQuote(tokenAmount)`.
pub fn quote_calldata(token_amount: U256) -> Bytes {
	IDropToken::getBuyQuoteCall {
		tokenAmount: token_amount,
	}
	.abi_encode()
	.into()
}

/// Decodes the native cost, in wei, returned by `getBuyQuote`.
pub fn decode_quote(data: &[u8]) -> Result<U256, ContractError> {
	IDropToken::getBuyQuoteCall::abi_decode_returns(data, true)
		.map(|ret| ret.ethCost)
		.map_err(|e| ContractError::Decode {
			function: "getBuyQuote",
			message: e.to_string(),
		})
}

/// Calldata for `buy`, with absent referrers encoded as the zero address.
pub fn buy_calldata(params: &BuyTokenParams) -> Bytes {
	IDropToken::buyCall {
		tokenAmount: params.token_amount,
		recipient: params.recipient,
		referrer: params.referrer_or_zero(),
		originReferrer: params.origin_referrer_or_zero(),
	}
	.abi_encode()
	.into()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Address;
	use alloy_sol_types::SolValue;

	fn params() -> BuyTokenParams {
		BuyTokenParams::new(
			"0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap(),
			U256::from(5u64),
			"0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap(),
		)
	}

	#[test]
	fn test_buy_calldata_without_referrers() {
		let data = buy_calldata(&params());
		let decoded = IDropToken::buyCall::abi_decode(&data, true).unwrap();
		assert_eq!(decoded.tokenAmount, U256::from(5u64));
		assert_eq!(decoded.recipient, params().recipient);
		assert_eq!(decoded.referrer, Address::ZERO);
		assert_eq!(decoded.originReferrer, Address::ZERO);
	}

	#[test]
	fn test_buy_calldata_with_referrers() {
		let referrer: Address = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc".parse().unwrap();
		let origin: Address = "0x90f79bf6eb2c4f870365e785982e1f101e93b906".parse().unwrap();
		let params = params()
			.with_referrer(referrer)
			.with_origin_referrer(origin);

		let decoded = IDropToken::buyCall::abi_decode(&buy_calldata(&params), true).unwrap();
		assert_eq!(decoded.referrer, referrer);
		assert_eq!(decoded.originReferrer, origin);
	}

	#[test]
	fn test_quote_codec() {
		let data = quote_calldata(U256::from(3u64));
		assert_eq!(&data[..4], &IDropToken::getBuyQuoteCall::SELECTOR);

		let cost = U256::from(1_500_000_000_000_000u64);
		assert_eq!(decode_quote(&cost.abi_encode()).unwrap(), cost);
		assert!(decode_quote(&[0u8; 4]).is_err());
	}
}
