//! Client bootstrap configuration.

use vibe_config::Config;
use vibe_types::ConfigResponse;

/// Builds the body of `GET /api/config`.
///
/// Only values a browser client needs are exposed. Transport URLs and wallet
/// settings stay server-side.
pub fn get_config(config: &Config) -> ConfigResponse {
	ConfigResponse {
		chain_id: config.chain.chain_id,
		wallet_connect_project_id: config.wallet_connect_project_id().to_string(),
		batching: config.chain.batching,
		card_seed: config.contracts.card_seed,
	}
}
