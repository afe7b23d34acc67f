//! Registry trait for self-registering implementations.
//!
//! Wallet and delivery implementations each expose a `Registry` marker that
//! names the configuration table they are built from and hands out their
//! factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The key used under `[wallet.implementations]` or
	/// `[delivery.implementations]` to select this implementation, for
	/// example `"local"` or `"evm_alloy"`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory that builds this implementation from its TOML table.
	fn factory() -> Self::Factory;
}
