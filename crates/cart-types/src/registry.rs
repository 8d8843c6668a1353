//! Registry trait for implementations selected by name in configuration.

/// Base trait for implementation registries.
///
/// Each pluggable implementation module provides a `Registry` struct that
/// declares the name used for it in configuration files together with the
/// factory that builds it, e.g. `"file"` for
/// `[storage.implementations.file]`.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
