//! Local private-key wallet.
//!
//! Holds a secp256k1 key loaded from configuration. Approval is either
//! automatic (headless service use) or an interactive `y/N` prompt on the
//! process-wide [`PromptTerminal`].

use crate::terminal::PromptTerminal;
use crate::{WalletError, WalletInterface};
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::sync::Arc;
use vibe_types::{
	format_token_amount, ConfigSchema, Field, FieldType, Schema, SecretString, Transaction,
	ValidationError,
};

/// How approval requests are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
	/// Every request is approved without asking.
	Auto,
	/// The user is asked on the terminal; anything but `y`/`yes` rejects.
	Prompt,
}

pub struct LocalWallet {
	signer: PrivateKeySigner,
	key: SecretString,
	mode: ApprovalMode,
	terminal: Option<Arc<PromptTerminal>>,
}

impl LocalWallet {
	pub fn new(private_key: SecretString, mode: ApprovalMode) -> Result<Self, WalletError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|e| WalletError::InvalidKey(format!("Invalid private key: {}", e)))
		})?;
		Ok(Self {
			signer,
			key: private_key,
			mode,
			terminal: None,
		})
	}

	/// Prompts on `terminal` instead of stdin.
	pub fn with_terminal(mut self, terminal: Arc<PromptTerminal>) -> Self {
		self.terminal = Some(terminal);
		self
	}

	async fn prompt(&self, tx: &Transaction) -> Result<(), WalletError> {
		let question = format!(
			"\nPurchase from {}\n  contract: {}\n  value:    {} ETH\n  chain:    {}\nSign and send? [y/N] ",
			self.signer.address(),
			tx.to,
			format_token_amount(tx.value, 18),
			tx.chain_id
		);
		let terminal = self.terminal.clone().unwrap_or_else(PromptTerminal::stdio);

		if terminal.confirm(&question).await? {
			Ok(())
		} else {
			Err(WalletError::Rejected("declined by user".to_string()))
		}
	}
}

/// Configuration schema for the local wallet.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let digits = vibe_types::without_0x_prefix(key);
					if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("private_key must be 32 bytes of hex".to_string());
					}
					Ok(())
				}),
			],
			vec![Field::new("auto_approve", FieldType::Boolean)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl WalletInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, WalletError> {
		Ok(self.signer.address())
	}

	async fn request_approval(&self, tx: &Transaction) -> Result<(), WalletError> {
		match self.mode {
			ApprovalMode::Auto => {
				tracing::debug!(to = %tx.to, value = %tx.value, "Auto-approved transaction");
				Ok(())
			},
			ApprovalMode::Prompt => self.prompt(tx).await,
		}
	}

	fn signing_key(&self) -> SecretString {
		self.key.clone()
	}
}

/// Builds a local wallet from configuration.
///
/// - `private_key` (required): hex-encoded secp256k1 key
/// - `auto_approve` (optional, default `false`): skip the terminal prompt
pub fn create_wallet(config: &toml::Value) -> Result<Box<dyn WalletInterface>, WalletError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| WalletError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| WalletError::InvalidKey("private_key is required".to_string()))?;

	let auto_approve = config
		.get("auto_approve")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);
	let mode = if auto_approve {
		ApprovalMode::Auto
	} else {
		ApprovalMode::Prompt
	};

	Ok(Box::new(LocalWallet::new(private_key, mode)?))
}

pub struct Registry;

impl vibe_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::WalletFactory;

	fn factory() -> Self::Factory {
		create_wallet
	}
}

impl crate::WalletRegistry for Registry {}
