//! Deterministic avatar colors for addresses.

/// Saturation and lightness are fixed so every generated color reads well on
/// the same background; only the hue varies.
const SATURATION: u8 = 70;
const LIGHTNESS: u8 = 60;

/// Maps any string to a stable `hsl(H, 70%, 60%)` color with `H` in `0..360`.
///
/// The hue comes from the 32-bit string hash `h = c + ((h << 5) - h)` over the
/// UTF-16 code units of the input, so the same address renders the same
/// color in every front end that uses this hash. Input is not validated:
/// empty, short and non-hex strings all produce a color.
pub fn generate_color_from_address(address: &str) -> String {
	let hash = address.encode_utf16().fold(0i32, |hash, unit| {
		i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
	});
	let hue = hash.unsigned_abs() % 360;

	format!("hsl({}, {}%, {}%)", hue, SATURATION, LIGHTNESS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_string_has_zero_hue() {
		assert_eq!(generate_color_from_address(""), "hsl(0, 70%, 60%)");
	}

	#[test]
	fn test_known_hues() {
		assert_eq!(generate_color_from_address("a"), "hsl(97, 70%, 60%)");
		// 98 + 97 * 31 = 3105
		assert_eq!(generate_color_from_address("ab"), "hsl(225, 70%, 60%)");
		// Surrogate pair hashed as two code units
		assert_eq!(generate_color_from_address("😀"), "hsl(259, 70%, 60%)");
	}

	#[test]
	fn test_same_address_same_color() {
		let address = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
		assert_eq!(
			generate_color_from_address(address),
			generate_color_from_address(address)
		);
		assert_ne!(
			generate_color_from_address(address),
			generate_color_from_address(&address.to_lowercase())
		);
	}

	fn hue(address: &str) -> u32 {
		generate_color_from_address(address)
			.trim_start_matches("hsl(")
			.split(',')
			.next()
			.unwrap()
			.parse()
			.unwrap()
	}

	#[test]
	fn test_distinct_addresses_spread_over_hues() {
		const SPREAD: u128 = 0x9e3779b97f4a7c15f39cc0605cedc835;
		let addresses: Vec<String> = (1..=500u128)
			.map(|i| format!("0x{:040x}", i.wrapping_mul(SPREAD)))
			.collect();

		let mut buckets = std::collections::HashMap::new();
		for address in &addresses {
			*buckets.entry(hue(address)).or_insert(0usize) += 1;
		}

		// 500 uniform draws over 360 hues cover about 270 of them
		assert!(buckets.len() > 240, "only {} distinct hues", buckets.len());
		let largest = buckets.values().copied().max().unwrap();
		assert!(largest <= 10, "{} addresses share one hue", largest);
	}

	#[test]
	fn test_single_character_changes_move_hue() {
		let address = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
		let original = hue(address);

		let mut edits = 0;
		let mut unchanged = 0;
		for (position, current) in address.char_indices().skip(2) {
			for digit in "0123456789abcdef".chars() {
				if digit == current.to_ascii_lowercase() {
					continue;
				}
				let mut edited = address.to_string();
				edited.replace_range(position..position + 1, &digit.to_string());
				edits += 1;
				if hue(&edited) == original {
					unchanged += 1;
				}
			}
		}

		assert_eq!(edits, 600);
		assert!(unchanged * 100 <= edits, "{} of {} edits kept the hue", unchanged, edits);
		// The last character feeds the hash unscaled
		assert_ne!(hue("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488E"), original);
	}

	#[test]
	fn test_long_inputs_stay_in_range() {
		let inputs = [
			"0xffffffffffffffffffffffffffffffffffffffff".to_string(),
			"z".repeat(10_000),
			"\u{ffff}".repeat(64),
		];
		for input in inputs {
			let color = generate_color_from_address(&input);
			let hue: u32 = color
				.trim_start_matches("hsl(")
				.split(',')
				.next()
				.unwrap()
				.parse()
				.unwrap();
			assert!(hue < 360, "hue {} out of range for {:?}", hue, color);
			assert!(color.ends_with(", 70%, 60%)"));
		}
	}
}
