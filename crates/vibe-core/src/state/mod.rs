//! Purchase attempt state: the lifecycle transition table and the in-memory
//! tracker UI sessions poll.

pub mod purchase;

pub use purchase::{
	is_valid_transition, now_secs, PurchaseStateError, PurchaseTracker, RetentionPolicy,
};
