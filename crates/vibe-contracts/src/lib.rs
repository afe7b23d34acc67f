//! Contract interface descriptors and typed codecs.
//!
//! This crate describes the on-chain contracts the purchase client talks to:
//! the card seed contract that derives cosmetic attributes from a 32-byte seed,
//! and the drop token contract purchases are sent to. It performs no I/O;
//! callers hand the encoded calldata to the delivery layer and feed the
//! returned bytes back into the decoders here.

use thiserror::Error;

pub mod bindings;
pub mod card_seed;
pub mod descriptor;
pub mod drop_token;

pub use card_seed::CardAttributes;
pub use descriptor::{
	card_seed_descriptor, drop_token_descriptor, ContractDescriptor, FunctionSignature,
	StateMutability,
};

/// Errors raised while describing, encoding or decoding contract calls.
#[derive(Debug, Error)]
pub enum ContractError {
	/// Two functions in one descriptor share a name.
	#[error("Duplicate function '{function}' in {contract} descriptor")]
	DuplicateFunction {
		contract: &'static str,
		function: &'static str,
	},
	/// The descriptor has no function with this name.
	#[error("Function '{function}' not found in {contract} descriptor")]
	UnknownFunction {
		contract: &'static str,
		function: String,
	},
	/// A function was used in a way its mutability forbids.
	#[error("Function '{function}' is {mutability}, expected {expected}")]
	Mutability {
		function: &'static str,
		mutability: StateMutability,
		expected: &'static str,
	},
	/// Return data did not match the declared output types.
	#[error("Failed to decode {function} return data: {message}")]
	Decode {
		function: &'static str,
		message: String,
	},
}
