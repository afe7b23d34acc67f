//! Confirmation monitoring for submitted purchases.

pub mod transaction;

pub use transaction::{ConfirmationMonitor, MonitorError};
