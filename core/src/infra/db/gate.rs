//! Startup checks on the database engine and the vector extension
//!
//! Runs once before migrations. A failure here is fatal: the server must not
//! start against an engine or extension it cannot drive.

use sea_orm::ConnectionTrait;
use tracing::{error, info, warn};

use super::{
	catalog::Catalog,
	error::{DatabaseError, Result},
	extension::ExtensionPolicy,
	lifecycle::ExtensionLifecycle,
};

pub struct VersionGate<'a> {
	lifecycle: &'a ExtensionLifecycle,
	policy: ExtensionPolicy,
	min_engine_major: u32,
}

impl<'a> VersionGate<'a> {
	pub fn new(lifecycle: &'a ExtensionLifecycle, policy: ExtensionPolicy, min_engine_major: u32) -> Self {
		Self {
			lifecycle,
			policy,
			min_engine_major,
		}
	}

	pub async fn init(&self) -> Result<()> {
		self.assert_engine_version().await?;
		self.ensure_extension().await?;

		if let Err(e) = self.update_extension().await {
			warn!(?e, "Failed to update the vector extension, keeping the installed version");
		}

		self.assert_extension_version().await
	}

	async fn assert_engine_version(&self) -> Result<()> {
		let installed = Catalog::engine_version(self.lifecycle.db()).await?;

		if installed.major < self.min_engine_major {
			return Err(DatabaseError::UnsupportedEngine {
				installed,
				required_major: self.min_engine_major,
			});
		}

		info!(%installed, "PostgreSQL version is supported");
		Ok(())
	}

	async fn ensure_extension(&self) -> Result<()> {
		let extension = self.lifecycle.extension();

		if let Err(e) = self.lifecycle.create_extension(extension).await {
			let source = match e {
				DatabaseError::Db(source) => source,
				e => return Err(e),
			};

			let e = DatabaseError::ExtensionUnavailable { extension, source };
			error!(%extension, "{e}");
			return Err(e);
		}

		Ok(())
	}

	/// Updates the extension in place when the server ships a newer version
	/// that still satisfies the policy. Never fatal.
	async fn update_extension(&self) -> Result<()> {
		let db = self.lifecycle.db();
		let extension = self.lifecycle.extension();

		let (Some(installed), Some(available)) = (
			Catalog::installed_version(db, extension).await?,
			Catalog::available_version(db, extension).await?,
		) else {
			return Ok(());
		};

		if !available.is_newer_than(&installed) || !self.policy.is_satisfied_by(&available) {
			return Ok(());
		}

		info!(%extension, %installed, %available, "Updating vector extension");

		db.execute_unprepared(&format!(
			"ALTER EXTENSION {} UPDATE TO '{available}'",
			extension.extension_name()
		))
		.await?;

		if extension.restart_required_after_update() {
			warn!(
				%extension,
				version = %available,
				"The {extension} extension was updated, please restart the PostgreSQL server \
				before using Lumen"
			);
		}

		Ok(())
	}

	async fn assert_extension_version(&self) -> Result<()> {
		let extension = self.lifecycle.extension();

		let installed = Catalog::installed_version(self.lifecycle.db(), extension)
			.await?
			.ok_or(DatabaseError::ExtensionMissing { extension })?;

		if installed.is_nightly() {
			return Err(DatabaseError::NightlyExtension {
				extension,
				range: self.policy.describe_range(),
			});
		}

		if !self.policy.is_satisfied_by(&installed) {
			return Err(DatabaseError::UnsupportedExtensionVersion {
				extension,
				installed,
				range: self.policy.describe_range(),
			});
		}

		info!(%extension, %installed, "Vector extension version is supported");
		Ok(())
	}
}
