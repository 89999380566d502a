//! Creation, resizing and swapping of the vector schema
//!
//! Everything here rewrites tables other server processes may be reading, so
//! each reshaping operation runs under its registry lock and inside a single
//! transaction: a failure leaves the previous schema in place.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{debug, info, warn};

use super::{
	catalog::Catalog,
	error::{DatabaseError, Result},
	extension::{
		VectorExtension, CLIP_INDEX, CLIP_TABLE, DEFAULT_CLIP_DIMENSION, DEFAULT_FACE_DIMENSION,
		FACE_INDEX, FACE_TABLE,
	},
	lock::{DatabaseLock, LockCoordinator},
};

/// Largest dimension either extension accepts for a vector column
pub const MAX_DIMENSION: i64 = 65_536;

pub struct ExtensionLifecycle {
	db: Arc<DatabaseConnection>,
	locks: Arc<LockCoordinator>,
	extension: VectorExtension,
}

impl ExtensionLifecycle {
	pub fn new(
		db: Arc<DatabaseConnection>,
		locks: Arc<LockCoordinator>,
		extension: VectorExtension,
	) -> Self {
		Self {
			db,
			locks,
			extension,
		}
	}

	pub fn db(&self) -> &DatabaseConnection {
		&self.db
	}

	pub fn locks(&self) -> &Arc<LockCoordinator> {
		&self.locks
	}

	/// The extension this process was configured with
	pub fn extension(&self) -> VectorExtension {
		self.extension
	}

	/// Installs `extension` if missing. Idempotent.
	pub async fn create_extension(&self, extension: VectorExtension) -> Result<()> {
		self.db
			.execute_unprepared(&format!(
				"CREATE EXTENSION IF NOT EXISTS {} CASCADE",
				extension.extension_name()
			))
			.await?;

		Ok(())
	}

	/// Creates the embedding tables and their indexes with the configured
	/// extension's column type when missing.
	///
	/// Fails with [`DatabaseError::ExtensionMismatch`] when a table already
	/// stores embeddings of the other extension.
	pub async fn ensure_vector_tables(&self) -> Result<()> {
		let txn = self.db.begin().await?;

		txn.execute_unprepared(&self.extension.create_clip_table_sql(DEFAULT_CLIP_DIMENSION))
			.await?;
		txn.execute_unprepared(&self.extension.create_face_table_sql(DEFAULT_FACE_DIMENSION))
			.await?;

		for table in [CLIP_TABLE, FACE_TABLE] {
			match Catalog::embedding_extension(&txn, table).await? {
				Some(found) if found != self.extension => {
					return Err(DatabaseError::ExtensionMismatch {
						table,
						configured: self.extension,
						found,
					});
				}
				_ => {}
			}
		}

		txn.execute_unprepared(&self.extension.create_index_sql(CLIP_INDEX, CLIP_TABLE))
			.await?;
		txn.execute_unprepared(&self.extension.create_index_sql(FACE_INDEX, FACE_TABLE))
			.await?;

		txn.commit().await?;

		debug!(extension = %self.extension, "Vector tables ready");

		Ok(())
	}

	/// Recreates the CLIP table for embeddings of `dimension` floats.
	///
	/// Returns whether the table was rebuilt. Every stored CLIP embedding is
	/// discarded when it is, and must be recomputed by the caller.
	pub async fn change_embedding_dimension(&self, dimension: i64) -> Result<bool> {
		let dimension = validate_dimension(dimension)?;

		if Catalog::clip_dimension(self.db()).await? == Some(i64::from(dimension)) {
			debug!(dimension, "CLIP embedding dimension unchanged");
			return Ok(false);
		}

		self.locks
			.with_lock(DatabaseLock::ClipDimSize, || async {
				let txn = self.db.begin().await?;

				// Another process may have resized while we waited for the lock
				let current = Catalog::clip_dimension(&txn).await?;
				if current == Some(i64::from(dimension)) {
					return Ok(false);
				}

				info!(
					from = ?current,
					to = dimension,
					extension = %self.extension,
					"Changing CLIP embedding dimension, existing CLIP embeddings will be discarded"
				);

				txn.execute_unprepared(&format!("DROP TABLE IF EXISTS {CLIP_TABLE}"))
					.await?;
				txn.execute_unprepared(&self.extension.create_clip_table_sql(dimension))
					.await?;
				txn.execute_unprepared(&self.extension.create_index_sql(CLIP_INDEX, CLIP_TABLE))
					.await?;

				txn.commit().await?;

				Ok::<_, DatabaseError>(true)
			})
			.await
	}

	/// Converts both embedding tables from `from`'s column type to `to`'s,
	/// keeping every stored embedding.
	pub async fn swap_extension(
		&self,
		from: VectorExtension,
		to: VectorExtension,
		clip_dimension: u32,
	) -> Result<()> {
		if from == to {
			debug!(extension = %to, "Vector extension unchanged, nothing to swap");
			return Ok(());
		}

		self.locks
			.with_lock(DatabaseLock::VectorExtensionSwap, || async {
				let txn = self.db.begin().await?;

				if let Some(statement) = to.compatibility_statement() {
					txn.execute_unprepared(statement).await?;
				}

				let face_dimension = match Catalog::face_dimension(&txn).await? {
					Some(dimension) => validate_dimension(dimension)?,
					None => DEFAULT_FACE_DIMENSION,
				};

				info!(
					%from,
					%to,
					clip_dimension,
					face_dimension,
					"Swapping vector extension"
				);

				for index in [CLIP_INDEX, FACE_INDEX] {
					txn.execute_unprepared(&format!("DROP INDEX IF EXISTS {index}"))
						.await?;
				}

				for (table, dimension) in [(FACE_TABLE, face_dimension), (CLIP_TABLE, clip_dimension)] {
					// Through real[] since neither extension casts the other's type
					txn.execute_unprepared(&format!(
						"ALTER TABLE {table} ALTER COLUMN embedding SET DATA TYPE real[]"
					))
					.await?;
					txn.execute_unprepared(&format!(
						"ALTER TABLE {table} ALTER COLUMN embedding SET DATA TYPE {}",
						to.vector_type(dimension)
					))
					.await?;
				}

				txn.execute_unprepared(&to.create_index_sql(CLIP_INDEX, CLIP_TABLE))
					.await?;
				txn.execute_unprepared(&to.create_index_sql(FACE_INDEX, FACE_TABLE))
					.await?;

				txn.commit().await?;

				Ok::<_, DatabaseError>(())
			})
			.await
	}

	/// Rebuilds the indexes the active extension reports as stale, typically
	/// after an extension upgrade. Returns the rebuilt index names.
	pub async fn reindex_stale_indexes(&self) -> Result<Vec<String>> {
		let stale = Catalog::stale_indexes(self.db(), self.extension).await?;

		for index in &stale {
			warn!(index, "Vector index needs a rebuild after an extension upgrade, reindexing");
			self.db
				.execute_unprepared(&format!("REINDEX INDEX {index}"))
				.await?;
		}

		Ok(stale)
	}
}

fn validate_dimension(dimension: i64) -> Result<u32> {
	if !(1..=MAX_DIMENSION).contains(&dimension) {
		return Err(DatabaseError::InvalidDimension(dimension));
	}

	u32::try_from(dimension).map_err(|_| DatabaseError::InvalidDimension(dimension))
}
