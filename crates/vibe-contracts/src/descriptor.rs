//! Static descriptions of contract calling conventions.
//!
//! A [`ContractDescriptor`] lists the functions of a contract with their input
//! and output types and mutability. Function names are unique within a
//! descriptor. Services check their descriptor when they are constructed,
//! before any call is made: reads must go to `pure`/`view` functions and
//! purchases to a `payable` one.

use crate::ContractError;
use alloy_primitives::keccak256;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Solidity state mutability of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
	Pure,
	View,
	NonPayable,
	Payable,
}

impl StateMutability {
	/// Pure and view functions never mutate chain state.
	pub fn is_read_only(self) -> bool {
		matches!(self, StateMutability::Pure | StateMutability::View)
	}
}

impl fmt::Display for StateMutability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			StateMutability::Pure => "pure",
			StateMutability::View => "view",
			StateMutability::NonPayable => "nonpayable",
			StateMutability::Payable => "payable",
		})
	}
}

/// One function of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
	pub name: &'static str,
	pub inputs: &'static [&'static str],
	pub outputs: &'static [&'static str],
	pub mutability: StateMutability,
}

impl FunctionSignature {
	/// Canonical signature, e.g. `wearFromSeed(bytes32)`.
	pub fn canonical(&self) -> String {
		format!("{}({})", self.name, self.inputs.join(","))
	}

	/// First four bytes of the keccak-256 hash of the canonical signature.
	pub fn selector(&self) -> [u8; 4] {
		let hash = keccak256(self.canonical().as_bytes());
		[hash[0], hash[1], hash[2], hash[3]]
	}
}

/// Ordered set of function signatures for one contract.
#[derive(Debug, Clone, Serialize)]
pub struct ContractDescriptor {
	name: &'static str,
	functions: Vec<FunctionSignature>,
}

impl ContractDescriptor {
	/// Builds a descriptor, rejecting duplicate function names.
	pub fn new(
		name: &'static str,
		functions: Vec<FunctionSignature>,
	) -> Result<Self, ContractError> {
		let mut seen = HashSet::new();
		for function in &functions {
			if !seen.insert(function.name) {
				return Err(ContractError::DuplicateFunction {
					contract: name,
					function: function.name,
				});
			}
		}
		Ok(Self { name, functions })
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Functions in declaration order.
	pub fn functions(&self) -> &[FunctionSignature] {
		&self.functions
	}

	pub fn function(&self, name: &str) -> Result<&FunctionSignature, ContractError> {
		self.functions
			.iter()
			.find(|f| f.name == name)
			.ok_or_else(|| ContractError::UnknownFunction {
				contract: self.name,
				function: name.to_string(),
			})
	}

	pub fn by_selector(&self, selector: [u8; 4]) -> Option<&FunctionSignature> {
		self.functions.iter().find(|f| f.selector() == selector)
	}

	/// Fails unless `name` is a pure or view function.
	pub fn ensure_read_only(&self, name: &str) -> Result<&FunctionSignature, ContractError> {
		let function = self.function(name)?;
		if !function.mutability.is_read_only() {
			return Err(ContractError::Mutability {
				function: function.name,
				mutability: function.mutability,
				expected: "pure or view",
			});
		}
		Ok(function)
	}

	/// Fails unless `name` accepts native value.
	pub fn ensure_payable(&self, name: &str) -> Result<&FunctionSignature, ContractError> {
		let function = self.function(name)?;
		if function.mutability != StateMutability::Payable {
			return Err(ContractError::Mutability {
				function: function.name,
				mutability: function.mutability,
				expected: "payable",
			});
		}
		Ok(function)
	}
}

/// Descriptor of the card seed contract.
pub fn card_seed_descriptor() -> Result<ContractDescriptor, ContractError> {
	ContractDescriptor::new(
		"ICardSeed",
		vec![
			FunctionSignature {
				name: "wearFromSeed",
				inputs: &["bytes32"],
				outputs: &["string"],
				mutability: StateMutability::Pure,
			},
			FunctionSignature {
				name: "getFoilMappingFromSeed",
				inputs: &["bytes32"],
				outputs: &["string"],
				mutability: StateMutability::Pure,
			},
			FunctionSignature {
				name: "getCardSeedData",
				inputs: &["bytes32"],
				outputs: &["string", "string"],
				mutability: StateMutability::Pure,
			},
		],
	)
}

/// Descriptor of the drop token contract.
pub fn drop_token_descriptor() -> Result<ContractDescriptor, ContractError> {
	ContractDescriptor::new(
		"IDropToken",
		vec![
			FunctionSignature {
				name: "getBuyQuote",
				inputs: &["uint256"],
				outputs: &["uint256"],
				mutability: StateMutability::View,
			},
			FunctionSignature {
				name: "buy",
				inputs: &["uint256", "address", "address", "address"],
				outputs: &["uint256"],
				mutability: StateMutability::Payable,
			},
		],
	)
}
