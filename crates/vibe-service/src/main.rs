//! Main entry point for the VibeMarket client.
//!
//! Runs the purchase API for browser front ends, or drives a single
//! purchase, card lookup or color lookup from the terminal.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use vibe_config::Config;
use vibe_core::MarketEngine;
use vibe_display::{generate_color_from_address, GeoLoading, LoadingIndicator, LoadingSize};
use vibe_types::{
	BuyTokenParams, BuyTokenRequest, MarketEvent, PurchaseEvent, TransactionLifecycleState,
};

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the VibeMarket client.
#[derive(Parser, Debug)]
#[command(name = "vibemarket", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/demo.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Serve the HTTP API
	Serve,
	/// Buy tokens from a drop
	Buy(BuyArgs),
	/// Read the cosmetic attributes of a card seed
	Card {
		/// 32-byte seed, 0x-prefixed hex
		seed: String,
		/// Cross-check the combined read against the individual reads
		#[arg(long)]
		verify: bool,
	},
	/// Print the avatar color for an address
	Color { address: String },
}

#[derive(clap::Args, Debug)]
struct BuyArgs {
	/// Drop token contract
	#[arg(long)]
	token: String,
	/// Number of tokens to buy
	#[arg(long)]
	amount: String,
	/// Address receiving the tokens
	#[arg(long)]
	recipient: String,
	#[arg(long)]
	referrer: Option<String>,
	#[arg(long)]
	origin_referrer: Option<String>,
	/// Loading indicator size (small, medium, large)
	#[arg(long, default_value = "medium")]
	spinner: LoadingSize,
}

impl From<&BuyArgs> for BuyTokenRequest {
	fn from(args: &BuyArgs) -> Self {
		BuyTokenRequest {
			token_address: args.token.clone(),
			token_amount: args.amount.clone(),
			recipient: args.recipient.clone(),
			referrer: args.referrer.clone(),
			origin_referrer: args.origin_referrer.clone(),
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	// Needs neither configuration nor chain access
	if let Command::Color { address } = &args.command {
		println!("{}", generate_color_from_address(address));
		return Ok(());
	}

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.market.id);

	let engine = Arc::new(factory_registry::build_market_from_config(config.clone()).await?);

	match args.command {
		Command::Serve => {
			let api_config = match config.api {
				Some(api) if api.enabled => api,
				_ => return Err("API server is disabled, set [api] enabled = true".into()),
			};
			tokio::select! {
				result = server::start_server(api_config, engine) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutting down");
				}
			}
		},
		Command::Buy(buy) => run_purchase(&engine, buy).await?,
		Command::Card { seed, verify } => {
			let seed = apis::cards::parse_seed(&seed)?;
			let attributes = if verify {
				engine.verify_card_seed(seed).await?
			} else {
				engine.card_attributes(seed).await?
			};
			println!("wear: {}", attributes.wear);
			println!("foil: {}", attributes.foil);
		},
		Command::Color { .. } => {},
	}

	Ok(())
}

/// Starts a purchase and follows it to a terminal state, drawing a loading
/// indicator meanwhile. Ctrl-C dismisses the attempt; if the wallet prompt
/// is still open that cancels the purchase.
async fn run_purchase(
	engine: &MarketEngine,
	args: BuyArgs,
) -> Result<(), Box<dyn std::error::Error>> {
	let params = BuyTokenParams::try_from(BuyTokenRequest::from(&args))?;

	let mut events = engine.subscribe();
	let attempt_id = engine.start_purchase(params).await?;

	let mut indicator =
		GeoLoading::new(args.spinner).with_text(status_text(&TransactionLifecycleState::Idle));
	let mut ticker = tokio::time::interval(vibe_display::loading::FRAME_INTERVAL);
	let mut tick = 0usize;
	let mut drawing = true;
	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);

	let state = loop {
		tokio::select! {
			_ = ticker.tick(), if drawing => {
				eprint!("\r{}", indicator.frame(tick));
				let _ = std::io::stderr().flush();
				tick = tick.wrapping_add(1);
			}
			_ = &mut ctrl_c => {
				clear_line();
				let attempt = engine.dismiss(&attempt_id).await?;
				println!("Purchase dismissed while {}", attempt.state);
				return Ok(());
			}
			event = events.recv() => match event {
				Ok(MarketEvent::Purchase(PurchaseEvent::StateChanged { attempt_id: id, state }))
					if id == attempt_id =>
				{
					if state.is_terminal() {
						break state;
					}
					// The wallet may prompt on this terminal
					drawing = state != TransactionLifecycleState::AwaitingWalletApproval;
					clear_line();
					indicator.text = Some(status_text(&state));
				},
				Ok(_) => {},
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Missed purchase events");
					if let Some(attempt) = engine.attempt(&attempt_id).await {
						if attempt.state.is_terminal() {
							break attempt.state;
						}
					}
				},
				Err(RecvError::Closed) => return Err("Event bus closed".into()),
			}
		}
	};
	clear_line();

	match state {
		TransactionLifecycleState::Confirmed { receipt } => {
			println!(
				"Purchase confirmed: {} in block {}",
				receipt.hash, receipt.block_number
			);
			Ok(())
		},
		TransactionLifecycleState::Failed { reason } => {
			Err(format!("Purchase failed: {}", reason).into())
		},
		other => Err(format!("Purchase ended in unexpected state {}", other).into()),
	}
}

fn status_text(state: &TransactionLifecycleState) -> String {
	match state {
		TransactionLifecycleState::Idle => "Preparing purchase".to_string(),
		TransactionLifecycleState::AwaitingWalletApproval => {
			"Waiting for wallet approval".to_string()
		},
		TransactionLifecycleState::Submitted { tx_hash } => format!("Submitted {}", tx_hash),
		TransactionLifecycleState::Confirming { tx_hash } => format!("Confirming {}", tx_hash),
		TransactionLifecycleState::Confirmed { .. } => "Confirmed".to_string(),
		TransactionLifecycleState::Failed { reason } => format!("Failed: {}", reason),
	}
}

fn clear_line() {
	eprint!("\r\x1b[2K");
}
