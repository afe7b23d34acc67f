//! Purchase lifecycle state machine and attempt tracker.
//!
//! Attempts move Idle -> AwaitingWalletApproval -> Submitted -> Confirming ->
//! Confirmed, with Failed reachable from every non-terminal state. The
//! tracker keeps the latest record of each attempt keyed by its id.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use vibe_types::{BuyTokenParams, PurchaseAttempt, TransactionLifecycleState};

#[derive(Debug, Error)]
pub enum PurchaseStateError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: &'static str,
		to: &'static str,
	},
	#[error("Purchase attempt not found: {0}")]
	AttemptNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StateKind {
	Idle,
	AwaitingWalletApproval,
	Submitted,
	Confirming,
	Confirmed,
	Failed,
}

impl From<&TransactionLifecycleState> for StateKind {
	fn from(state: &TransactionLifecycleState) -> Self {
		match state {
			TransactionLifecycleState::Idle => StateKind::Idle,
			TransactionLifecycleState::AwaitingWalletApproval => StateKind::AwaitingWalletApproval,
			TransactionLifecycleState::Submitted { .. } => StateKind::Submitted,
			TransactionLifecycleState::Confirming { .. } => StateKind::Confirming,
			TransactionLifecycleState::Confirmed { .. } => StateKind::Confirmed,
			TransactionLifecycleState::Failed { .. } => StateKind::Failed,
		}
	}
}

static TRANSITIONS: Lazy<HashMap<StateKind, HashSet<StateKind>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		StateKind::Idle,
		HashSet::from([StateKind::AwaitingWalletApproval, StateKind::Failed]),
	);
	m.insert(
		StateKind::AwaitingWalletApproval,
		HashSet::from([StateKind::Submitted, StateKind::Failed]),
	);
	m.insert(
		StateKind::Submitted,
		HashSet::from([StateKind::Confirming, StateKind::Failed]),
	);
	m.insert(
		StateKind::Confirming,
		HashSet::from([StateKind::Confirmed, StateKind::Failed]),
	);
	m.insert(StateKind::Confirmed, HashSet::new()); // terminal
	m.insert(StateKind::Failed, HashSet::new()); // terminal
	m
});

/// Checks a lifecycle transition against the table.
pub fn is_valid_transition(from: &TransactionLifecycleState, to: &TransactionLifecycleState) -> bool {
	TRANSITIONS
		.get(&StateKind::from(from))
		.is_some_and(|set| set.contains(&StateKind::from(to)))
}

/// Applies `next` to `attempt` if the table allows it.
pub(crate) fn apply_transition(
	attempt: &mut PurchaseAttempt,
	next: TransactionLifecycleState,
) -> Result<(), PurchaseStateError> {
	if !is_valid_transition(&attempt.state, &next) {
		return Err(PurchaseStateError::InvalidTransition {
			from: attempt.state.name(),
			to: next.name(),
		});
	}
	attempt.state = next;
	attempt.updated_at = now_secs();
	Ok(())
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

struct TrackedAttempt {
	attempt: PurchaseAttempt,
	cancel: watch::Sender<bool>,
}

/// How long finished attempts stay queryable.
///
/// Confirmed and failed attempts are dropped once they have been terminal
/// for longer than `window`, and the oldest are dropped first whenever more
/// than `max_finished` of them are held. Live attempts are never evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
	pub window: Duration,
	pub max_finished: usize,
}

impl Default for RetentionPolicy {
	fn default() -> Self {
		Self {
			window: Duration::from_secs(3600),
			max_finished: 1000,
		}
	}
}

/// In-memory record of every attempt that has not been dismissed or evicted.
#[derive(Default)]
pub struct PurchaseTracker {
	attempts: RwLock<HashMap<String, TrackedAttempt>>,
	retention: RetentionPolicy,
}

impl PurchaseTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_retention(retention: RetentionPolicy) -> Self {
		Self {
			attempts: RwLock::default(),
			retention,
		}
	}

	/// Registers a new Idle attempt, evicting expired finished attempts first.
	///
	/// The returned receiver flips to `true` when the attempt is dismissed.
	pub async fn register(&self, params: BuyTokenParams) -> (PurchaseAttempt, watch::Receiver<bool>) {
		let now = now_secs();
		let attempt = PurchaseAttempt {
			id: uuid::Uuid::new_v4().to_string(),
			params,
			state: TransactionLifecycleState::Idle,
			created_at: now,
			updated_at: now,
		};
		let (cancel, cancelled) = watch::channel(false);

		let mut attempts = self.attempts.write().await;
		self.evict(&mut attempts, now);
		attempts.insert(
			attempt.id.clone(),
			TrackedAttempt {
				attempt: attempt.clone(),
				cancel,
			},
		);

		(attempt, cancelled)
	}

	fn evict(&self, attempts: &mut HashMap<String, TrackedAttempt>, now: u64) {
		let window = self.retention.window.as_secs();
		let before = attempts.len();
		attempts.retain(|_, tracked| {
			!tracked.attempt.state.is_terminal()
				|| now.saturating_sub(tracked.attempt.updated_at) <= window
		});

		let mut finished: Vec<(u64, String)> = attempts
			.values()
			.filter(|tracked| tracked.attempt.state.is_terminal())
			.map(|tracked| (tracked.attempt.updated_at, tracked.attempt.id.clone()))
			.collect();
		if finished.len() > self.retention.max_finished {
			finished.sort();
			let excess = finished.len() - self.retention.max_finished;
			for (_, id) in finished.into_iter().take(excess) {
				attempts.remove(&id);
			}
		}

		let evicted = before - attempts.len();
		if evicted > 0 {
			tracing::debug!(evicted, remaining = attempts.len(), "Evicted finished attempts");
		}
	}

	pub async fn get(&self, id: &str) -> Option<PurchaseAttempt> {
		self.attempts
			.read()
			.await
			.get(id)
			.map(|tracked| tracked.attempt.clone())
	}

	/// All tracked attempts, oldest first.
	pub async fn list(&self) -> Vec<PurchaseAttempt> {
		let mut attempts: Vec<PurchaseAttempt> = self
			.attempts
			.read()
			.await
			.values()
			.map(|tracked| tracked.attempt.clone())
			.collect();
		attempts.sort_by_key(|attempt| attempt.created_at);
		attempts
	}

	/// Replaces the stored record with `attempt`.
	///
	/// Returns `false` when the attempt was dismissed in the meantime, in
	/// which case nothing is stored.
	pub async fn store(&self, attempt: &PurchaseAttempt) -> bool {
		match self.attempts.write().await.get_mut(&attempt.id) {
			Some(tracked) => {
				tracked.attempt = attempt.clone();
				true
			},
			None => false,
		}
	}

	/// Removes an attempt and signals cancellation to whoever drives it.
	pub async fn dismiss(&self, id: &str) -> Result<PurchaseAttempt, PurchaseStateError> {
		let tracked = self
			.attempts
			.write()
			.await
			.remove(id)
			.ok_or_else(|| PurchaseStateError::AttemptNotFound(id.to_string()))?;

		// The driver may already have finished and dropped its receiver
		let _ = tracked.cancel.send(true);
		Ok(tracked.attempt)
	}
}
