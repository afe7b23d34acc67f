//! In-memory chain and wallet doubles shared by the unit tests.

use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vibe_contracts::bindings::{ICardSeed, IDropToken};
use vibe_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use vibe_types::{
	Address, Bytes, ConfigSchema, Schema, SecretString, Transaction, TransactionHash,
	TransactionReceipt, ValidationError, B256, U256,
};
use vibe_wallet::{WalletError, WalletInterface, WalletService};

pub const CHAIN_ID: u64 = 31337;
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const WEAR_LABELS: [&str; 5] = [
	"Pristine",
	"Mint",
	"Lightly Played",
	"Moderately Played",
	"Heavily Played",
];
const FOIL_LABELS: [&str; 3] = ["Normal", "Standard", "Prize"];

pub fn wear_for(seed: B256) -> &'static str {
	WEAR_LABELS[seed[31] as usize % WEAR_LABELS.len()]
}

pub fn foil_for(seed: B256) -> &'static str {
	FOIL_LABELS[seed[30] as usize % FOIL_LABELS.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
	Success,
	Revert,
	Pending,
	Dropped,
}

struct ChainState {
	receipt_mode: ReceiptMode,
	balance: U256,
	price_per_token: U256,
	block_number: u64,
	mined_block: u64,
	simulation_revert: Option<String>,
	revert_after_submit: Option<String>,
	submit_error: Option<String>,
	lost_submit_response: Option<String>,
	inconsistent_card_data: bool,
	failing_reads: usize,
	submitted: Vec<Transaction>,
	known: HashSet<TransactionHash>,
}

struct EmptySchema;

impl ConfigSchema for EmptySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// A scripted chain. Clones share state.
#[derive(Clone)]
pub struct FakeChain {
	state: Arc<Mutex<ChainState>>,
	reads: Arc<AtomicUsize>,
}

impl FakeChain {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(ChainState {
				receipt_mode: ReceiptMode::Success,
				balance: U256::from(10).pow(U256::from(18)),
				price_per_token: U256::from(1_000_000_000_000u64),
				block_number: 100,
				mined_block: 100,
				simulation_revert: None,
				revert_after_submit: None,
				submit_error: None,
				lost_submit_response: None,
				inconsistent_card_data: false,
				failing_reads: 0,
				submitted: Vec::new(),
				known: HashSet::new(),
			})),
			reads: Arc::new(AtomicUsize::new(0)),
		}
	}

	fn with(self, f: impl FnOnce(&mut ChainState)) -> Self {
		f(&mut self.state.lock().unwrap());
		self
	}

	pub fn with_receipt_mode(self, mode: ReceiptMode) -> Self {
		self.with(|s| s.receipt_mode = mode)
	}

	pub fn with_balance(self, balance: U256) -> Self {
		self.with(|s| s.balance = balance)
	}

	pub fn with_simulation_revert(self, reason: &str) -> Self {
		self.with(|s| s.simulation_revert = Some(reason.to_string()))
	}

	/// `buy` simulates fine until a transaction has been submitted, then
	/// reverts with `reason`, and the mined receipt reports failure.
	pub fn with_revert_after_submit(self, reason: &str) -> Self {
		self.with(|s| {
			s.revert_after_submit = Some(reason.to_string());
			s.receipt_mode = ReceiptMode::Revert;
		})
	}

	pub fn with_submit_error(self, message: &str) -> Self {
		self.with(|s| s.submit_error = Some(message.to_string()))
	}

	/// Accepts broadcasts but answers them with a network error.
	pub fn with_lost_submit_response(self, message: &str) -> Self {
		self.with(|s| s.lost_submit_response = Some(message.to_string()))
	}

	pub fn with_inconsistent_card_data(self) -> Self {
		self.with(|s| s.inconsistent_card_data = true)
	}

	pub fn quote_for(&self, token_amount: U256) -> U256 {
		token_amount * self.state.lock().unwrap().price_per_token
	}

	/// Makes the next `count` reads fail with a transient network error.
	pub fn fail_next_reads(&self, count: usize) {
		self.state.lock().unwrap().failing_reads = count;
	}

	pub fn set_block_number(&self, block: u64) {
		self.state.lock().unwrap().block_number = block;
	}

	pub fn advance_blocks(&self, blocks: u64) {
		self.state.lock().unwrap().block_number += blocks;
	}

	pub fn mined_block(&self) -> u64 {
		self.state.lock().unwrap().mined_block
	}

	/// Registers a transaction as broadcast without going through `submit`.
	pub fn seed_transaction(&self) -> TransactionHash {
		let mut state = self.state.lock().unwrap();
		let hash = TransactionHash(B256::with_last_byte(state.known.len() as u8 + 1));
		state.known.insert(hash);
		hash
	}

	/// Number of calls that reached the chain, of any kind.
	pub fn read_count(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	pub fn submitted(&self) -> Vec<Transaction> {
		self.state.lock().unwrap().submitted.clone()
	}

	pub fn delivery_service(&self) -> Arc<DeliveryService> {
		Arc::new(DeliveryService::new(Box::new(self.clone()), CHAIN_ID, true))
	}

	fn enter(&self) -> Result<(), DeliveryError> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		let mut state = self.state.lock().unwrap();
		if state.failing_reads > 0 {
			state.failing_reads -= 1;
			return Err(DeliveryError::Network("connection reset".into()));
		}
		Ok(())
	}

	fn answer(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		let state = self.state.lock().unwrap();
		let data = tx.data.as_ref();
		let selector: [u8; 4] = data
			.get(..4)
			.and_then(|s| s.try_into().ok())
			.ok_or_else(|| DeliveryError::Reverted("missing selector".into()))?;

		let revert = |e: alloy_sol_types::Error| DeliveryError::Reverted(e.to_string());
		let encoded = if selector == ICardSeed::wearFromSeedCall::SELECTOR {
			let call = ICardSeed::wearFromSeedCall::abi_decode(data, true).map_err(revert)?;
			(wear_for(call.seed).to_string(),).abi_encode_params()
		} else if selector == ICardSeed::getFoilMappingFromSeedCall::SELECTOR {
			let call = ICardSeed::getFoilMappingFromSeedCall::abi_decode(data, true).map_err(revert)?;
			(foil_for(call.seed).to_string(),).abi_encode_params()
		} else if selector == ICardSeed::getCardSeedDataCall::SELECTOR {
			let call = ICardSeed::getCardSeedDataCall::abi_decode(data, true).map_err(revert)?;
			let foil = if state.inconsistent_card_data {
				"Mismatched".to_string()
			} else {
				foil_for(call.seed).to_string()
			};
			(wear_for(call.seed).to_string(), foil).abi_encode_params()
		} else if selector == IDropToken::getBuyQuoteCall::SELECTOR {
			let call = IDropToken::getBuyQuoteCall::abi_decode(data, true).map_err(revert)?;
			(call.tokenAmount * state.price_per_token,).abi_encode_params()
		} else if selector == IDropToken::buyCall::SELECTOR {
			let call = IDropToken::buyCall::abi_decode(data, true).map_err(revert)?;
			if let Some(reason) = &state.simulation_revert {
				return Err(DeliveryError::Reverted(reason.clone()));
			}
			if let Some(reason) = &state.revert_after_submit {
				if !state.submitted.is_empty() {
					return Err(DeliveryError::Reverted(reason.clone()));
				}
			}
			if tx.value < call.tokenAmount * state.price_per_token {
				return Err(DeliveryError::Reverted("insufficient payment".into()));
			}
			(call.tokenAmount,).abi_encode_params()
		} else {
			return Err(DeliveryError::Reverted("unknown selector".into()));
		};

		Ok(encoded.into())
	}
}

#[async_trait]
impl DeliveryInterface for FakeChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn call(&self, tx: &Transaction) -> Result<Bytes, DeliveryError> {
		self.enter()?;
		self.answer(tx)
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.enter()?;
		let mut state = self.state.lock().unwrap();
		if let Some(message) = &state.submit_error {
			return Err(DeliveryError::Rejected(message.clone()));
		}
		state.submitted.push(tx);
		let hash = TransactionHash(B256::with_last_byte(0x80 + state.submitted.len() as u8));
		state.known.insert(hash);
		if let Some(message) = &state.lost_submit_response {
			return Err(DeliveryError::Network(message.clone()));
		}
		Ok(hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		_chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.enter()?;
		let state = self.state.lock().unwrap();
		if !state.known.contains(hash) {
			return Ok(None);
		}
		let receipt = |success| TransactionReceipt {
			hash: *hash,
			block_number: state.mined_block,
			success,
		};
		Ok(match state.receipt_mode {
			ReceiptMode::Success => Some(receipt(true)),
			ReceiptMode::Revert => Some(receipt(false)),
			ReceiptMode::Pending | ReceiptMode::Dropped => None,
		})
	}

	async fn is_known(&self, hash: &TransactionHash, _chain_id: u64) -> Result<bool, DeliveryError> {
		self.enter()?;
		let state = self.state.lock().unwrap();
		Ok(state.receipt_mode != ReceiptMode::Dropped && state.known.contains(hash))
	}

	async fn get_block_number(&self, _chain_id: u64) -> Result<u64, DeliveryError> {
		self.enter()?;
		Ok(self.state.lock().unwrap().block_number)
	}

	async fn get_balance(&self, _address: Address, _chain_id: u64) -> Result<U256, DeliveryError> {
		self.enter()?;
		Ok(self.state.lock().unwrap().balance)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalBehavior {
	Approve,
	Reject,
	/// Never answers the prompt.
	Hang,
}

pub struct FakeWallet {
	behavior: ApprovalBehavior,
	prompts: Arc<AtomicUsize>,
}

impl FakeWallet {
	pub fn new(behavior: ApprovalBehavior) -> Self {
		Self {
			behavior,
			prompts: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn service(behavior: ApprovalBehavior) -> (Arc<WalletService>, Arc<AtomicUsize>) {
		let prompts = Arc::new(AtomicUsize::new(0));
		let wallet = FakeWallet {
			behavior,
			prompts: prompts.clone(),
		};
		(Arc::new(WalletService::new(Box::new(wallet))), prompts)
	}

	pub fn address() -> Address {
		Address::repeat_byte(0xbb)
	}
}

#[async_trait]
impl WalletInterface for FakeWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EmptySchema)
	}

	async fn address(&self) -> Result<Address, WalletError> {
		Ok(Self::address())
	}

	async fn request_approval(&self, _tx: &Transaction) -> Result<(), WalletError> {
		self.prompts.fetch_add(1, Ordering::SeqCst);
		match self.behavior {
			ApprovalBehavior::Approve => Ok(()),
			ApprovalBehavior::Reject => Err(WalletError::Rejected("user declined".into())),
			ApprovalBehavior::Hang => std::future::pending().await,
		}
	}

	fn signing_key(&self) -> SecretString {
		SecretString::from(DEV_KEY)
	}
}

