//! RPC transport configuration.
//!
//! Maps chain ids to the HTTP endpoints used to reach them. TOML tables
//! cannot have integer keys, so chain ids arrive as strings and are parsed
//! during deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Endpoint for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportConfig {
	pub rpc_url: String,
}

/// Chain id to transport mapping.
pub type TransportsConfig = HashMap<u64, TransportConfig>;

/// Deserializes a `[chain.transports.<id>]` table keyed by chain id strings.
pub fn deserialize_transports<'de, D>(deserializer: D) -> Result<TransportsConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let by_name: HashMap<String, TransportConfig> = HashMap::deserialize(deserializer)?;
	by_name
		.into_iter()
		.map(|(key, transport)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, transport))
				.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))
		})
		.collect()
}
