//! Nearest neighbour searches over CLIP and face embeddings
//!
//! Each search runs in its own transaction so the `SET LOCAL` tuning applied
//! before the query never outlives it.

use chrono::Utc;
use sea_orm::{
	sea_query::{Alias, Asterisk, Expr, Query, SelectStatement, SimpleExpr},
	ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
	FromQueryResult, Iterable, JoinType, Order, QueryOrder, QuerySelect, RelationTrait, Select,
	TransactionTrait,
};
use tracing::debug;

use super::{
	builder::AssetSearchBuilder,
	error::{Result, SearchError},
	input::{EmbeddingSearch, FaceEmbeddingSearch},
	output::FaceSearchResult,
};
use crate::infra::db::{
	embedding::Embedding,
	entities::{asset, asset_face, face_search},
	extension::{VectorExtension, CLIP_TABLE, FACE_TABLE},
	pagination::{paginate_capped, Paginated, Pagination},
};

/// Face searches always rank at least this many candidates before filtering
/// on distance.
pub const MIN_FACE_CANDIDATES: u64 = 64;

pub(crate) fn validate_cap(cap: i64) -> Result<u64> {
	u64::try_from(cap)
		.ok()
		.filter(|cap| *cap > 0)
		.ok_or(SearchError::InvalidResultCap(cap))
}

/// Cosine distance between `table`'s stored embedding and `embedding`
fn distance(table: &str, embedding: &Embedding) -> SimpleExpr {
	Expr::cust(format!("{table}.embedding <=> {}", embedding.to_sql_literal()))
}

/// Assets of `search.user_ids` ordered by CLIP distance to the query
pub fn clip_select(search: &EmbeddingSearch) -> Select<asset::Entity> {
	let builder = AssetSearchBuilder::new(&search.filter);

	let mut required = vec![
		asset::Column::OwnerId.is_in(search.user_ids.iter().copied()),
		asset::Column::IsVisible.eq(true),
		asset::Column::FileCreatedAt.lte(Utc::now()),
	];

	if !search.with_archived && search.filter.status.is_archived.is_none() {
		required.push(asset::Column::IsArchived.eq(false));
	}

	// The builder leaves trashed rows in when the filter asks for them
	if builder.includes_deleted() {
		required.push(asset::Column::DeletedAt.is_null());
	}

	builder
		.select_with(required)
		.join(JoinType::InnerJoin, asset::Relation::SmartSearch.def())
		.order_by(distance(CLIP_TABLE, &search.embedding), Order::Asc)
}

/// Faces ranked by distance, then cut at `search.max_distance`
pub fn face_statement(search: &FaceEmbeddingSearch, candidates: u64) -> SelectStatement {
	let distance = distance(FACE_TABLE, &search.embedding);
	let cte = Alias::new("cte");

	let mut ranked = Query::select();
	ranked
		.columns(asset_face::Column::iter().map(|column| (asset_face::Entity, column)))
		.expr_as(
			Expr::cust(format!(
				"({FACE_TABLE}.embedding <=> {})::float8",
				search.embedding.to_sql_literal()
			)),
			Alias::new("distance"),
		)
		.from(asset_face::Entity)
		.inner_join(
			asset::Entity,
			Expr::col((asset::Entity, asset::Column::Id))
				.equals((asset_face::Entity, asset_face::Column::AssetId)),
		)
		.inner_join(
			face_search::Entity,
			Expr::col((face_search::Entity, face_search::Column::FaceId))
				.equals((asset_face::Entity, asset_face::Column::Id)),
		)
		.and_where(
			Expr::col((asset::Entity, asset::Column::OwnerId))
				.is_in(search.user_ids.iter().copied()),
		)
		.order_by_expr(distance, Order::Asc)
		.limit(candidates);

	if search.has_person {
		ranked.and_where(Expr::col((asset_face::Entity, asset_face::Column::PersonId)).is_not_null());
	}

	Query::select()
		.column(Asterisk)
		.from_subquery(ranked, cte.clone())
		.and_where(Expr::col((cte.clone(), Alias::new("distance"))).lte(search.max_distance))
		.order_by((cte, Alias::new("distance")), Order::Asc)
		.to_owned()
}

pub struct VectorSearch<'a> {
	db: &'a DatabaseConnection,
	extension: VectorExtension,
}

impl<'a> VectorSearch<'a> {
	pub fn new(db: &'a DatabaseConnection, extension: VectorExtension) -> Self {
		Self { db, extension }
	}

	async fn begin_tuned(&self, breadth: Option<u64>) -> Result<DatabaseTransaction> {
		let txn = self.db.begin().await?;

		for statement in self.extension.search_statements(breadth) {
			txn.execute_unprepared(&statement).await?;
		}

		Ok(txn)
	}

	pub async fn search_clip(
		&self,
		pagination: Pagination,
		search: &EmbeddingSearch,
	) -> Result<Paginated<asset::Model>> {
		let cap = search.num_results.map(validate_cap).transpose()?;
		let select = clip_select(search);

		let txn = self.begin_tuned(cap).await?;
		let page = paginate_capped(select, pagination, cap, &txn).await?;
		txn.commit().await?;

		debug!(
			results = page.items.len(),
			has_next_page = page.has_next_page,
			"CLIP search finished"
		);

		Ok(page)
	}

	pub async fn search_faces(&self, search: &FaceEmbeddingSearch) -> Result<Vec<FaceSearchResult>> {
		let cap = validate_cap(search.num_results)?;
		if !search.max_distance.is_finite() || search.max_distance < 0.0 {
			return Err(SearchError::InvalidMaxDistance(search.max_distance));
		}

		let candidates = cap.max(MIN_FACE_CANDIDATES);
		let statement = DbBackend::Postgres.build(&face_statement(search, candidates));

		let txn = self.begin_tuned(Some(candidates)).await?;
		let rows = txn.query_all(statement).await?;
		txn.commit().await?;

		rows.iter()
			.map(|row| -> Result<FaceSearchResult> {
				Ok(FaceSearchResult {
					face: asset_face::Model::from_query_result(row, "")?,
					distance: row.try_get("", "distance")?,
				})
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::BTreeMap;

	use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, Value};
	use uuid::Uuid;

	use crate::ops::search::input::SearchFilter;

	fn exec_ok() -> MockExecResult {
		MockExecResult {
			last_insert_id: 0,
			rows_affected: 0,
		}
	}

	fn clip_search(num_results: Option<i64>) -> EmbeddingSearch {
		EmbeddingSearch {
			user_ids: vec![Uuid::nil()],
			embedding: Embedding::new(vec![0.1, 0.2, 0.3]).unwrap(),
			num_results,
			with_archived: false,
			filter: SearchFilter::default(),
		}
	}

	fn face_search(num_results: i64) -> FaceEmbeddingSearch {
		FaceEmbeddingSearch {
			user_ids: vec![Uuid::nil()],
			embedding: Embedding::new(vec![0.5, 0.5]).unwrap(),
			num_results,
			max_distance: 0.5,
			has_person: true,
		}
	}

	#[test]
	fn caps_must_be_positive() {
		assert_eq!(validate_cap(1).unwrap(), 1);
		assert!(matches!(validate_cap(0), Err(SearchError::InvalidResultCap(0))));
		assert!(matches!(validate_cap(-5), Err(SearchError::InvalidResultCap(-5))));
	}

	#[test]
	fn clip_query_orders_by_distance_over_visible_assets() {
		let sql = clip_select(&clip_search(None))
			.build(DbBackend::Postgres)
			.to_string();

		assert!(sql.contains(r#"INNER JOIN "smart_search" ON "assets"."id" = "smart_search"."asset_id""#));
		assert!(sql.contains(r#""assets"."is_visible" = TRUE"#));
		assert!(sql.contains(r#""assets"."is_archived" = FALSE"#));
		assert!(sql.contains(r#""assets"."deleted_at" IS NULL"#));
		assert!(sql.contains(r#""assets"."file_created_at" <="#));
		assert!(sql.ends_with("ORDER BY smart_search.embedding <=> '[0.1,0.2,0.3]' ASC"));
	}

	#[test]
	fn clip_query_can_include_archived() {
		let mut search = clip_search(None);
		search.with_archived = true;

		let sql = clip_select(&search).build(DbBackend::Postgres).to_string();
		let (_, predicates) = sql.split_once(" WHERE ").unwrap();
		assert!(!predicates.contains("is_archived"));
	}

	#[test]
	fn clip_query_never_returns_trashed_assets() {
		let mut search = clip_search(None);
		search.filter.status.with_deleted = Some(true);

		let sql = clip_select(&search).build(DbBackend::Postgres).to_string();
		assert!(sql.contains(r#""assets"."deleted_at" IS NULL"#));
	}

	#[test]
	fn face_query_ranks_then_filters_on_distance() {
		let sql = DbBackend::Postgres
			.build(&face_statement(&face_search(10), 64))
			.to_string();

		assert!(sql.starts_with(r#"SELECT * FROM (SELECT "asset_faces"."id""#));
		assert!(sql.contains(r#""asset_faces"."person_id" IS NOT NULL"#));
		assert!(sql.contains("ORDER BY face_search.embedding <=> '[0.5,0.5]' ASC LIMIT 64"));
		assert!(sql.contains(r#"AS "cte" WHERE "cte"."distance" <= 0.5"#));
		assert!(!sql.contains("embedding\" "));
	}

	#[tokio::test]
	async fn invalid_cap_fails_before_any_query() {
		let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
		let search = VectorSearch::new(&db, VectorExtension::PgVector);

		assert!(matches!(
			search.search_clip(Pagination::new(10, 0), &clip_search(Some(0))).await,
			Err(SearchError::InvalidResultCap(0))
		));
		assert!(matches!(
			search.search_faces(&face_search(-1)).await,
			Err(SearchError::InvalidResultCap(-1))
		));

		assert!(db.into_transaction_log().is_empty());
	}

	#[tokio::test]
	async fn face_search_tunes_breadth_to_candidates() {
		let face_id = Uuid::new_v4();
		let asset_id = Uuid::new_v4();

		let db = MockDatabase::new(DatabaseBackend::Postgres)
			.append_exec_results([exec_ok(), exec_ok(), exec_ok()])
			.append_query_results([[BTreeMap::from([
				("id", Value::from(face_id)),
				("asset_id", Value::from(asset_id)),
				("person_id", Value::from(Option::<Uuid>::None)),
				("image_width", Value::from(1920)),
				("image_height", Value::from(1080)),
				("bounding_box_x1", Value::from(10)),
				("bounding_box_y1", Value::from(20)),
				("bounding_box_x2", Value::from(110)),
				("bounding_box_y2", Value::from(120)),
				("distance", Value::from(0.25f64)),
			])]])
			.into_connection();

		let results = VectorSearch::new(&db, VectorExtension::PgVectors)
			.search_faces(&face_search(100))
			.await
			.unwrap();

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].face.id, face_id);
		assert_eq!(results[0].distance, 0.25);

		let log = format!("{:?}", db.into_transaction_log());
		assert!(log.contains("SET LOCAL vectors.enable_prefilter = on"));
		assert!(log.contains("SET LOCAL vectors.hnsw_ef_search = 100"));
	}

	#[tokio::test]
	async fn clip_search_past_cap_is_empty_after_tuning() {
		let db = MockDatabase::new(DatabaseBackend::Postgres)
			.append_exec_results([exec_ok()])
			.into_connection();

		let page = VectorSearch::new(&db, VectorExtension::PgVector)
			.search_clip(Pagination::new(10, 20), &clip_search(Some(5)))
			.await
			.unwrap();

		assert!(page.items.is_empty());
		assert!(!page.has_next_page);

		let log = format!("{:?}", db.into_transaction_log());
		assert!(log.contains("SET LOCAL hnsw.ef_search = 5"));
		assert!(!log.contains("SELECT"));
	}
}
