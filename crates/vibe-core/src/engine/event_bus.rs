//! Broadcast channel for market events.
//!
//! Every subscriber sees every event published after it subscribed. Slow
//! subscribers that fall more than the channel capacity behind observe a
//! `Lagged` error and skip ahead; publishing never blocks.

use tokio::sync::broadcast;
use vibe_types::MarketEvent;

/// Capacity used by [`EventBus::default`].
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, returning how many subscribers received it.
	///
	/// Having no subscribers is not an error.
	pub fn publish(&self, event: MarketEvent) -> usize {
		self.sender.send(event).unwrap_or(0)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
