//! Avatar colors.

use vibe_display::generate_color_from_address;
use vibe_types::ColorResponse;

/// Handles `GET /api/colors/{address}`. Any string is accepted.
pub fn get_color(address: String) -> ColorResponse {
	let color = generate_color_from_address(&address);
	ColorResponse { address, color }
}
