//! Formatting helpers shared by the CLI, the API and log output.

pub mod formatting;

pub use formatting::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
