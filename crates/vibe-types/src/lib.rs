//! Common types for the VibeMarket purchase client.
//!
//! This crate defines the data types shared by every other crate in the
//! workspace: purchase parameters, the transaction lifecycle, receipts,
//! events published to UI consumers and the HTTP API shapes.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Transaction submission and receipt types.
pub mod delivery;
/// Event types published while a purchase attempt progresses.
pub mod events;
/// Purchase lifecycle states and failure reasons.
pub mod lifecycle;
/// Chain id to RPC transport configuration.
pub mod networks;
/// Purchase parameter model and its wire form.
pub mod purchase;
/// Registry trait for named, factory-built implementations.
pub mod registry;
/// Redacting wrapper for key material.
pub mod secret_string;
/// Hex and amount formatting helpers.
pub mod utils;
/// Configuration schema validation for implementation-specific TOML tables.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use api::*;
pub use delivery::*;
pub use events::*;
pub use lifecycle::*;
pub use networks::{TransportConfig, TransportsConfig};
pub use purchase::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::*;
