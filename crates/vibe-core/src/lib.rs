//! Core purchase engine for the VibeMarket client.
//!
//! Coordinates the wallet, the delivery layer and the contract codecs to run
//! purchase attempts through their lifecycle, and serves card attribute
//! reads. UI layers use [`MarketEngine`]; [`MarketBuilder`] assembles one
//! from configuration.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod monitoring;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuilderError, MarketBuilder, MarketFactories};
pub use engine::{event_bus::EventBus, MarketEngine, MarketError};
pub use handlers::{CardError, CardService, PurchaseOrchestrator, PurchasePolicy};
pub use monitoring::{ConfirmationMonitor, MonitorError};
pub use state::{is_valid_transition, PurchaseStateError, PurchaseTracker, RetentionPolicy};
