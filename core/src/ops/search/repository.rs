//! Search entry points used by the API layer

use std::{collections::HashSet, sync::Arc};

use lumen_utils::{chunked_set, MAX_BIND_PARAMETERS};
use sea_orm::{
	sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend,
	EntityTrait, IntoActiveModel, QueryFilter, Statement, TransactionTrait,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
	builder::AssetSearchBuilder,
	error::Result,
	input::{EmbeddingSearch, FaceEmbeddingSearch, SearchFilter},
	output::{AssetSearchResult, FaceSearchResult},
	relations::load_relations,
	vector::VectorSearch,
};
use crate::{
	domain::clip_dimension,
	infra::db::{
		embedding::Embedding,
		entities::{asset, smart_info, smart_search},
		extension::CLIP_TABLE,
		lifecycle::ExtensionLifecycle,
		lock::DatabaseLock,
		pagination::{paginate, Paginated, Pagination, PaginationMode},
		DatabaseError,
	},
};

pub struct SearchRepository {
	lifecycle: Arc<ExtensionLifecycle>,
	pagination_mode: PaginationMode,
}

impl SearchRepository {
	pub fn new(lifecycle: Arc<ExtensionLifecycle>) -> Self {
		Self {
			lifecycle,
			pagination_mode: PaginationMode::default(),
		}
	}

	fn db(&self) -> &DatabaseConnection {
		self.lifecycle.db()
	}

	pub fn with_pagination_mode(mut self, mode: PaginationMode) -> Self {
		self.pagination_mode = mode;
		self
	}

	/// Sizes the CLIP table for `model_name`'s embeddings.
	///
	/// Returns whether the table was rebuilt, in which case every asset needs
	/// its CLIP embedding computed again.
	#[instrument(skip(self))]
	pub async fn init(&self, model_name: &str) -> Result<bool> {
		let dimension = clip_dimension(model_name)
			.ok_or_else(|| DatabaseError::UnknownClipModel(model_name.to_string()))?;

		let rebuilt = self
			.lifecycle
			.change_embedding_dimension(i64::from(dimension))
			.await?;

		if rebuilt {
			info!(dimension, "CLIP table rebuilt, smart search must run again for all assets");
		}

		Ok(rebuilt)
	}

	#[instrument(skip(self, filter))]
	pub async fn search_assets(
		&self,
		pagination: Pagination,
		filter: &SearchFilter,
	) -> Result<Paginated<AssetSearchResult>> {
		let select = AssetSearchBuilder::new(filter).build();
		let page = paginate(select, pagination, self.pagination_mode, self.db()).await?;

		self.with_relations(page, filter).await
	}

	#[instrument(skip(self, search), fields(users = search.user_ids.len()))]
	pub async fn search_clip(
		&self,
		pagination: Pagination,
		search: &EmbeddingSearch,
	) -> Result<Paginated<AssetSearchResult>> {
		let locks = self.lifecycle.locks();
		if locks.is_busy(DatabaseLock::ClipDimSize) {
			debug!("Waiting for the CLIP dimension change to finish");
			locks.wait(DatabaseLock::ClipDimSize).await;
		}

		let page = VectorSearch::new(self.db(), self.lifecycle.extension())
			.search_clip(pagination, search)
			.await?;

		self.with_relations(page, &search.filter).await
	}

	#[instrument(skip(self, search), fields(users = search.user_ids.len()))]
	pub async fn search_faces(&self, search: &FaceEmbeddingSearch) -> Result<Vec<FaceSearchResult>> {
		VectorSearch::new(self.db(), self.lifecycle.extension())
			.search_faces(search)
			.await
	}

	/// Stores the tags and objects of an asset and, when given, its CLIP
	/// embedding.
	#[instrument(skip_all, fields(asset_id = %smart_info.asset_id))]
	pub async fn upsert(&self, smart_info: smart_info::Model, embedding: Option<&Embedding>) -> Result<()> {
		let asset_id = smart_info.asset_id;

		smart_info::Entity::insert(smart_info.into_active_model())
			.on_conflict(
				OnConflict::column(smart_info::Column::AssetId)
					.update_columns([smart_info::Column::Tags, smart_info::Column::Objects])
					.to_owned(),
			)
			.exec_without_returning(self.db())
			.await?;

		let Some(embedding) = embedding else {
			return Ok(());
		};

		// Writing into a table being rebuilt would fail or be lost
		let locks = self.lifecycle.locks();
		if locks.is_busy(DatabaseLock::ClipDimSize) {
			debug!("Waiting for the CLIP dimension change to finish");
			locks.wait(DatabaseLock::ClipDimSize).await;
		}

		let txn = self.db().begin().await?;
		txn.execute(Statement::from_sql_and_values(
			DbBackend::Postgres,
			format!(
				"INSERT INTO {CLIP_TABLE} (asset_id, embedding) VALUES ($1, {}) \
				ON CONFLICT (asset_id) DO UPDATE SET embedding = EXCLUDED.embedding",
				embedding.to_sql_literal()
			),
			[asset_id.into()],
		))
		.await?;
		txn.commit().await?;

		Ok(())
	}

	/// Which of `asset_ids` currently have a CLIP embedding
	pub async fn embedded_assets(&self, asset_ids: Vec<Uuid>) -> Result<HashSet<Uuid>> {
		Ok(chunked_set(asset_ids, MAX_BIND_PARAMETERS, |ids| async move {
			smart_search::Entity::find()
				.filter(smart_search::Column::AssetId.is_in(ids))
				.all(self.db())
				.await
				.map(|rows| rows.into_iter().map(|row| row.asset_id).collect())
		})
		.await?)
	}

	async fn with_relations(
		&self,
		page: Paginated<asset::Model>,
		filter: &SearchFilter,
	) -> Result<Paginated<AssetSearchResult>> {
		Ok(Paginated {
			items: load_relations(self.db(), page.items, filter.relations).await?,
			has_next_page: page.has_next_page,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

	use crate::{
		infra::db::{
			extension::VectorExtension,
			lock::{LockCoordinator, ProcessLocalOnly},
		},
		ops::search::error::SearchError,
	};

	fn repository(db: MockDatabase) -> SearchRepository {
		SearchRepository::new(Arc::new(ExtensionLifecycle::new(
			Arc::new(db.into_connection()),
			Arc::new(LockCoordinator::new(Arc::new(ProcessLocalOnly))),
			VectorExtension::PgVector,
		)))
	}

	fn transaction_log(repository: SearchRepository) -> Vec<Transaction> {
		match Arc::try_unwrap(repository.lifecycle) {
			Ok(lifecycle) => lifecycle.into_transaction_log(),
			Err(_) => panic!("lifecycle is still shared"),
		}
	}

	fn exec_ok() -> MockExecResult {
		MockExecResult {
			last_insert_id: 0,
			rows_affected: 1,
		}
	}

	#[tokio::test]
	async fn unknown_model_fails_without_queries() {
		let repository = repository(MockDatabase::new(DatabaseBackend::Postgres));

		assert!(matches!(
			repository.init("not-a-model").await,
			Err(SearchError::Database(DatabaseError::UnknownClipModel(name))) if name == "not-a-model"
		));
		assert!(transaction_log(repository).is_empty());
	}

	#[tokio::test]
	async fn upsert_writes_smart_info_then_embedding() {
		let repository = repository(
			MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec_ok(), exec_ok()]),
		);

		let asset_id = Uuid::new_v4();
		repository
			.upsert(
				smart_info::Model {
					asset_id,
					tags: Some(serde_json::json!(["beach"])),
					objects: None,
				},
				Some(&Embedding::new(vec![1.0, 0.0]).unwrap()),
			)
			.await
			.unwrap();

		let log = format!("{:?}", transaction_log(repository));
		// Statements are Debug formatted, identifier quotes come out escaped
		let info = log.find(r#"INSERT INTO \"smart_info\""#).unwrap();
		let embedding = log
			.find("INSERT INTO smart_search (asset_id, embedding) VALUES ($1, '[1,0]')")
			.unwrap();

		assert!(info < embedding);
		assert!(log.contains(r#"ON CONFLICT (\"asset_id\") DO UPDATE"#));
		assert!(log.contains("ON CONFLICT (asset_id) DO UPDATE SET embedding = EXCLUDED.embedding"));
	}

	#[tokio::test]
	async fn upsert_without_embedding_leaves_clip_table_alone() {
		let repository =
			repository(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec_ok()]));

		repository
			.upsert(
				smart_info::Model {
					asset_id: Uuid::new_v4(),
					tags: None,
					objects: Some(serde_json::json!(["dog"])),
				},
				None,
			)
			.await
			.unwrap();

		let log = format!("{:?}", transaction_log(repository));
		assert!(!log.contains("smart_search"));
	}
}
