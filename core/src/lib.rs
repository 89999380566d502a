//! Lumen core: asset search over PostgreSQL with pgvecto.rs or pgvector
//! embeddings, and the lifecycle of the vector schema backing it.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

pub mod config;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod ops;

use config::AppConfig;
use infra::db::{
	extension::PolicyTable,
	gate::VersionGate,
	lifecycle::ExtensionLifecycle,
	lock::{DatabaseLock, LockCoordinator},
	Database, DatabaseError,
};
use ops::search::{SearchError, SearchRepository};

#[derive(Error, Debug)]
pub enum CoreError {
	#[error(transparent)]
	Database(#[from] DatabaseError),
	#[error(transparent)]
	Search(#[from] SearchError),
}

/// Everything the API layer needs, brought up in startup order
pub struct Core {
	pub config: AppConfig,
	pub db: Database,
	pub locks: Arc<LockCoordinator>,
	pub lifecycle: Arc<ExtensionLifecycle>,
	pub search: SearchRepository,
}

impl Core {
	/// Connects and validates the database, runs migrations, creates the
	/// vector tables for the configured extension and sizes the
	/// CLIP table for the configured model. Any failing step aborts startup.
	pub async fn start(config: AppConfig) -> Result<Self, CoreError> {
		let db = Database::connect(&config.database)
			.await
			.map_err(DatabaseError::from)?;
		let locks = Arc::new(LockCoordinator::postgres(db.shared()));
		let lifecycle = Arc::new(ExtensionLifecycle::new(
			db.shared(),
			Arc::clone(&locks),
			config.database.vector_extension,
		));

		Self::check(&config, &lifecycle).await?;

		locks
			.with_lock(DatabaseLock::Migrations, || async {
				db.migrate().await?;
				lifecycle.ensure_vector_tables().await?;
				Ok::<_, DatabaseError>(())
			})
			.await?;

		let reindexed = lifecycle.reindex_stale_indexes().await?;
		if !reindexed.is_empty() {
			info!(?reindexed, "Rebuilt stale vector indexes");
		}

		let search = SearchRepository::new(Arc::clone(&lifecycle));
		search.init(&config.machine_learning.clip_model).await?;

		info!(
			extension = %config.database.vector_extension,
			clip_model = %config.machine_learning.clip_model,
			"Lumen core started"
		);

		Ok(Self {
			config,
			db,
			locks,
			lifecycle,
			search,
		})
	}

	/// Startup checks on the engine and the configured vector extension
	pub async fn check(
		config: &AppConfig,
		lifecycle: &ExtensionLifecycle,
	) -> Result<(), DatabaseError> {
		let policies = PolicyTable::new(&config.database.extension_policies);

		VersionGate::new(
			lifecycle,
			policies.get(lifecycle.extension()),
			config.database.min_engine_major,
		)
		.init()
		.await
	}
}
