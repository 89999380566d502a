//! Reads from the PostgreSQL system catalog
//!
//! Every function takes any [`ConnectionTrait`] so it can run either on the
//! pool or inside a caller's transaction.

use sea_orm::{ConnectionTrait, DbBackend, QueryResult, Statement, Value};
use tracing::trace;

use super::{
	error::{DatabaseError, Result},
	extension::{VectorExtension, CLIP_TABLE, FACE_TABLE},
	lock::DatabaseLock,
	version::Version,
};

pub struct Catalog;

impl Catalog {
	/// Version of the database engine, from `SHOW server_version`
	pub async fn engine_version(db: &impl ConnectionTrait) -> Result<Version> {
		let row = query_one(db, "SHOW server_version", []).await?.ok_or_else(|| {
			DatabaseError::Catalog("SHOW server_version returned no row".to_string())
		})?;

		let raw: String = row.try_get("", "server_version")?;
		Ok(raw.parse()?)
	}

	/// Version of `extension` installed in the current database, if any
	pub async fn installed_version(
		db: &impl ConnectionTrait,
		extension: VectorExtension,
	) -> Result<Option<Version>> {
		version_column(
			db,
			"SELECT extversion AS version FROM pg_extension WHERE extname = $1",
			extension,
		)
		.await
	}

	/// Default version of `extension` shipped with the server, if it ships it
	pub async fn available_version(
		db: &impl ConnectionTrait,
		extension: VectorExtension,
	) -> Result<Option<Version>> {
		version_column(
			db,
			"SELECT default_version AS version FROM pg_available_extensions WHERE name = $1",
			extension,
		)
		.await
	}

	/// Extension owning the type of `table`'s embedding column, `None` if
	/// the table does not exist. pgvecto.rs keeps its types in the `vectors`
	/// schema.
	pub async fn embedding_extension(
		db: &impl ConnectionTrait,
		table: &str,
	) -> Result<Option<VectorExtension>> {
		let Some(row) = query_one(
			db,
			"SELECT n.nspname AS type_schema \
			FROM pg_attribute a \
			JOIN pg_type t ON t.oid = a.atttypid \
			JOIN pg_namespace n ON n.oid = t.typnamespace \
			WHERE a.attrelid = to_regclass($1) AND a.attname = 'embedding'",
			[table.into()],
		)
		.await?
		else {
			return Ok(None);
		};

		let schema: String = row.try_get("", "type_schema")?;
		Ok(Some(if schema == "vectors" {
			VectorExtension::PgVectors
		} else {
			VectorExtension::PgVector
		}))
	}

	/// Declared dimension of the CLIP embedding column, `None` if the table
	/// does not exist.
	pub async fn clip_dimension(db: &impl ConnectionTrait) -> Result<Option<i64>> {
		let row = query_one(
			db,
			"SELECT atttypmod AS dimsize \
			FROM pg_attribute f \
			JOIN pg_class c ON c.oid = f.attrelid \
			WHERE c.relkind = 'r'::char \
			AND f.attnum > 0 \
			AND c.relname = $1 \
			AND f.attname = 'embedding'",
			[CLIP_TABLE.into()],
		)
		.await?;

		row.map(|row| row.try_get::<i32>("", "dimsize").map(i64::from))
			.transpose()
			.map_err(Into::into)
	}

	/// Dimension of the stored face embeddings, probed from any row.
	///
	/// The column is cast to `real[]` so this works with either extension.
	pub async fn face_dimension(db: &impl ConnectionTrait) -> Result<Option<i64>> {
		let row = query_one(
			db,
			&format!("SELECT array_length(embedding::real[], 1) AS dimsize FROM {FACE_TABLE} LIMIT 1"),
			[],
		)
		.await?;

		row.map(|row| row.try_get::<Option<i32>>("", "dimsize"))
			.transpose()
			.map(|dimension| dimension.flatten().map(i64::from))
			.map_err(Into::into)
	}

	/// Names of vector indexes the extension asks to rebuild
	pub async fn stale_indexes(
		db: &impl ConnectionTrait,
		extension: VectorExtension,
	) -> Result<Vec<String>> {
		let Some(sql) = extension.stale_index_query() else {
			return Ok(Vec::new());
		};

		db.query_all(Statement::from_string(DbBackend::Postgres, sql))
			.await?
			.iter()
			.map(|row| row.try_get::<String>("", "indexname").map_err(Into::into))
			.collect()
	}

	/// Registry locks currently granted to any session
	pub async fn held_locks(db: &impl ConnectionTrait) -> Result<Vec<(DatabaseLock, i32)>> {
		use strum::IntoEnumIterator;

		let rows = db
			.query_all(Statement::from_string(
				DbBackend::Postgres,
				"SELECT (classid::bigint << 32) | objid::bigint AS lock_id, pid \
				FROM pg_locks \
				WHERE locktype = 'advisory' AND granted",
			))
			.await?;

		let mut held = Vec::new();
		for row in rows {
			let id: i64 = row.try_get("", "lock_id")?;
			let pid: i32 = row.try_get("", "pid")?;
			if let Some(lock) = DatabaseLock::iter().find(|lock| lock.id() == id) {
				held.push((lock, pid));
			}
		}

		Ok(held)
	}
}

async fn query_one<const N: usize>(
	db: &impl ConnectionTrait,
	sql: &str,
	values: [Value; N],
) -> Result<Option<QueryResult>> {
	trace!(sql, "Catalog query");

	Ok(db
		.query_one(Statement::from_sql_and_values(
			DbBackend::Postgres,
			sql,
			values,
		))
		.await?)
}

async fn version_column(
	db: &impl ConnectionTrait,
	sql: &str,
	extension: VectorExtension,
) -> Result<Option<Version>> {
	let Some(row) = query_one(db, sql, [extension.extension_name().into()]).await? else {
		return Ok(None);
	};

	match row.try_get::<Option<String>>("", "version")? {
		Some(raw) => Ok(Some(raw.parse()?)),
		None => Ok(None),
	}
}
