//! String formatting utilities.
//!
//! Hex prefix handling, short identifiers for log lines, and decimal
//! rendering of on-chain amounts (wei prices, token counts).

use alloy_primitives::U256;

/// Shortens an identifier to its first 8 characters for log output.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Adds a `0x` prefix unless one (in either case) is already present.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Strips a leading `0x` or `0X`.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a raw on-chain amount with `decimals` fractional digits,
/// dropping trailing zeros: a 1.5 ETH quote in wei renders as `"1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let digits = amount.to_string();
	if decimals == 0 {
		return digits;
	}

	let places = decimals as usize;
	let (integer_part, fraction) = if digits.len() <= places {
		("0".to_string(), format!("{:0>width$}", digits, width = places))
	} else {
		let split = digits.len() - places;
		(digits[..split].to_string(), digits[split..].to_string())
	};

	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, fraction)
	}
}
