//! Handlers driving purchases and card reads against the chain.

pub mod cards;
pub mod purchase;

pub use cards::{CardError, CardService};
pub use purchase::{PurchaseOrchestrator, PurchasePolicy};
