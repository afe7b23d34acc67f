//! Events published on the market event bus.
//!
//! UI consumers subscribe to these to follow a purchase attempt without
//! polling the attempt tracker.

use crate::TransactionLifecycleState;
use serde::{Deserialize, Serialize};

/// Top-level event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	/// Events from the purchase orchestrator.
	Purchase(PurchaseEvent),
}

/// Events related to a single purchase attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PurchaseEvent {
	/// An attempt moved to a new lifecycle state.
	StateChanged {
		attempt_id: String,
		state: TransactionLifecycleState,
	},
	/// The UI dismissed an attempt and its record was discarded.
	Dismissed { attempt_id: String },
}
