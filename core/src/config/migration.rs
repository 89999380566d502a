//! Versioning of persisted configuration files

use anyhow::Result;

/// A configuration stored with a schema version, upgraded in place on load.
pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32;

	/// Upgrades `self` one or more versions, up to [`Migrate::target_version`]
	fn migrate(&mut self) -> Result<()>;

	fn needs_migration(&self) -> bool {
		self.current_version() < Self::target_version()
	}
}
