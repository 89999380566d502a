//! Asset search integration tests
//!
//! Runs the structured search against an in-memory SQLite database built
//! from the entities. The vector searches need a PostgreSQL extension and are
//! covered by the unit tests in `ops::search`.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lumen_core::{
	config::DatabaseConfig,
	infra::db::{
		entities::{asset, asset_face, asset_stack, exif, person, smart_info, smart_search},
		extension::VectorExtension,
		lifecycle::ExtensionLifecycle,
		lock::{LockCoordinator, ProcessLocalOnly},
		pagination::{Pagination, PaginationMode},
		Database,
	},
	ops::search::{SearchFilter, SearchRepository, SortOrder},
};
use sea_orm::{
	ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Schema,
};
use tracing_test::traced_test;
use uuid::Uuid;

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn setup() -> Result<Database, Box<dyn std::error::Error>> {
	let db = Database::connect(&DatabaseConfig {
		url: "sqlite::memory:".to_string(),
		max_connections: 1,
		min_connections: 1,
		..Default::default()
	})
	.await?;

	let conn = db.conn();
	let backend = conn.get_database_backend();
	let schema = Schema::new(backend);

	for statement in [
		schema.create_table_from_entity(asset_stack::Entity),
		schema.create_table_from_entity(asset::Entity),
		schema.create_table_from_entity(exif::Entity),
		schema.create_table_from_entity(person::Entity),
		schema.create_table_from_entity(asset_face::Entity),
		schema.create_table_from_entity(smart_info::Entity),
		schema.create_table_from_entity(smart_search::Entity),
	] {
		conn.execute(backend.build(&statement)).await?;
	}

	Ok(db)
}

fn repository(db: &Database) -> SearchRepository {
	SearchRepository::new(Arc::new(ExtensionLifecycle::new(
		db.shared(),
		Arc::new(LockCoordinator::new(Arc::new(ProcessLocalOnly))),
		VectorExtension::PgVector,
	)))
}

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn asset(owner_id: Uuid, n: u32, created_at: DateTime<Utc>) -> asset::Model {
	asset::Model {
		id: Uuid::new_v4(),
		owner_id,
		library_id: None,
		device_asset_id: format!("device-asset-{n}"),
		device_id: "phone".to_string(),
		asset_type: "IMAGE".to_string(),
		checksum: vec![n as u8; 20],
		original_path: format!("/upload/{n}.jpg"),
		original_file_name: format!("{n}.jpg"),
		preview_path: None,
		thumbnail_path: None,
		encoded_video_path: None,
		live_photo_video_id: None,
		stack_id: None,
		duration: None,
		is_favorite: false,
		is_archived: false,
		is_external: false,
		is_offline: false,
		is_read_only: false,
		is_visible: true,
		file_created_at: created_at,
		file_modified_at: created_at,
		local_date_time: created_at,
		created_at,
		updated_at: created_at,
		deleted_at: None,
	}
}

async fn insert_assets(
	conn: &DatabaseConnection,
	assets: &[asset::Model],
) -> Result<(), sea_orm::DbErr> {
	for asset in assets {
		asset.clone().into_active_model().insert(conn).await?;
	}

	Ok(())
}

/// Three live assets and two trashed ones, all created in 2023
async fn seed_with_trash(
	conn: &DatabaseConnection,
) -> Result<Vec<asset::Model>, Box<dyn std::error::Error>> {
	let owner = Uuid::new_v4();

	let mut assets = (0..5u32)
		.map(|n| asset(owner, n, at(2023, 3, 1 + n)))
		.collect::<Vec<_>>();

	assets[3].deleted_at = Some(at(2023, 6, 1));
	assets[4].deleted_at = Some(at(2023, 6, 2));

	insert_assets(conn, &assets).await?;

	Ok(assets)
}

#[tokio::test]
#[traced_test]
async fn created_after_skips_trashed_assets() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	seed_with_trash(conn).await?;

	let filter: SearchFilter = serde_json::from_str(r#"{"createdAfter": "2023-01-01T00:00:00Z"}"#)?;

	let page = repository(&db)
		.search_assets(Pagination::new(10, 0), &filter)
		.await?;

	assert_eq!(page.items.len(), 3);
	assert!(!page.has_next_page);
	assert!(page.items.iter().all(|item| item.asset.deleted_at.is_none()));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn trash_bounds_include_trashed_assets() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let assets = seed_with_trash(conn).await?;

	let filter = SearchFilter {
		dates: lumen_core::ops::search::SearchDateOptions {
			trashed_after: Some(at(2023, 5, 1)),
			..Default::default()
		},
		..Default::default()
	};

	let page = repository(&db)
		.search_assets(Pagination::new(10, 0), &filter)
		.await?;

	let mut found = page.items.iter().map(|item| item.asset.id).collect::<Vec<_>>();
	let mut expected = vec![assets[3].id, assets[4].id];
	found.sort();
	expected.sort();
	assert_eq!(found, expected);

	let mut with_deleted = SearchFilter::default();
	with_deleted.status.with_deleted = Some(true);

	let page = repository(&db)
		.search_assets(Pagination::new(10, 0), &with_deleted)
		.await?;
	assert_eq!(page.items.len(), 5);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn results_follow_requested_order() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let assets = seed_with_trash(conn).await?;

	let repository = repository(&db);

	let newest_first = repository
		.search_assets(Pagination::new(10, 0), &SearchFilter::default())
		.await?;
	assert_eq!(
		newest_first
			.items
			.iter()
			.map(|item| item.asset.id)
			.collect::<Vec<_>>(),
		vec![assets[2].id, assets[1].id, assets[0].id]
	);

	let oldest_first = repository
		.search_assets(
			Pagination::new(10, 0),
			&SearchFilter {
				order: SortOrder::Asc,
				..Default::default()
			},
		)
		.await?;
	assert_eq!(
		oldest_first
			.items
			.iter()
			.map(|item| item.asset.id)
			.collect::<Vec<_>>(),
		vec![assets[0].id, assets[1].id, assets[2].id]
	);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn pagination_modes_return_the_same_pages() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let owner = Uuid::new_v4();

	// Shared timestamps force the id tie breaker
	let assets = (0..7u32)
		.map(|n| asset(owner, n, at(2024, 1, 1 + n / 3)))
		.collect::<Vec<_>>();
	insert_assets(conn, &assets).await?;

	let limit_offset = repository(&db);
	let skip_take = repository(&db).with_pagination_mode(PaginationMode::SkipTake);
	let filter = SearchFilter::default();

	let mut seen = Vec::new();
	for page in 1..=4 {
		let pagination = Pagination::page(page, 2);

		let a = limit_offset.search_assets(pagination, &filter).await?;
		let b = skip_take.search_assets(pagination, &filter).await?;

		assert_eq!(a, b);
		assert!(a.items.len() <= 2);
		assert_eq!(a.has_next_page, page < 4);

		seen.extend(a.items.into_iter().map(|item| item.asset.id));
	}

	seen.sort();
	seen.dedup();
	assert_eq!(seen.len(), assets.len());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn relations_are_attached_without_narrowing() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let owner = Uuid::new_v4();

	let stack = asset_stack::Model {
		id: Uuid::new_v4(),
		owner_id: owner,
		primary_asset_id: Uuid::new_v4(),
	};
	stack.clone().into_active_model().insert(conn).await?;

	let mut with_everything = asset(owner, 1, at(2024, 2, 2));
	with_everything.stack_id = Some(stack.id);
	let bare = asset(owner, 2, at(2024, 2, 1));
	insert_assets(conn, &[with_everything.clone(), bare.clone()]).await?;

	exif::Model {
		asset_id: with_everything.id,
		make: Some("Canon".to_string()),
		model: Some("EOS R5".to_string()),
		lens_model: None,
		exif_image_width: Some(8192),
		exif_image_height: Some(5464),
		f_number: Some(2.8),
		iso: Some(100),
		date_time_original: None,
		latitude: None,
		longitude: None,
		city: Some("Lisbon".to_string()),
		state: None,
		country: Some("Portugal".to_string()),
		description: None,
	}
	.into_active_model()
	.insert(conn)
	.await?;

	let alice = person::Model {
		id: Uuid::new_v4(),
		owner_id: owner,
		name: "Alice".to_string(),
		birth_date: None,
		thumbnail_path: String::new(),
		face_asset_id: None,
		is_hidden: false,
		created_at: at(2024, 1, 1),
		updated_at: at(2024, 1, 1),
	};
	alice.clone().into_active_model().insert(conn).await?;

	for person_id in [Some(alice.id), Some(alice.id), None] {
		asset_face::Model {
			id: Uuid::new_v4(),
			asset_id: with_everything.id,
			person_id,
			image_width: 100,
			image_height: 100,
			bounding_box_x1: 0,
			bounding_box_y1: 0,
			bounding_box_x2: 10,
			bounding_box_y2: 10,
		}
		.into_active_model()
		.insert(conn)
		.await?;
	}

	let mut filter = SearchFilter::default();
	filter.relations.with_exif = true;
	filter.relations.with_faces = true;
	filter.relations.with_people = true;
	filter.relations.with_stacked = true;

	let page = repository(&db)
		.search_assets(Pagination::new(10, 0), &filter)
		.await?;

	assert_eq!(page.items.len(), 2);

	let first = &page.items[0];
	assert_eq!(first.asset.id, with_everything.id);
	assert_eq!(
		first.exif.as_ref().and_then(|exif| exif.city.as_deref()),
		Some("Lisbon")
	);
	assert_eq!(first.faces.len(), 3);
	assert_eq!(first.people, vec![alice]);
	assert_eq!(first.stack, Some(stack));

	let second = &page.items[1];
	assert_eq!(second.asset.id, bare.id);
	assert!(second.exif.is_none());
	assert!(second.faces.is_empty());
	assert!(second.people.is_empty());
	assert!(second.stack.is_none());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn exif_filters_join_exif() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let owner = Uuid::new_v4();

	let in_paris = asset(owner, 1, at(2024, 4, 1));
	let elsewhere = asset(owner, 2, at(2024, 4, 2));
	insert_assets(conn, &[in_paris.clone(), elsewhere.clone()]).await?;

	exif::ActiveModel {
		asset_id: sea_orm::Set(in_paris.id),
		city: sea_orm::Set(Some("Paris".to_string())),
		..Default::default()
	}
	.insert(conn)
	.await?;

	let mut filter = SearchFilter::default();
	filter.exif.city = Some("Paris".to_string());

	let page = repository(&db)
		.search_assets(Pagination::new(10, 0), &filter)
		.await?;

	assert_eq!(page.items.len(), 1);
	assert_eq!(page.items[0].asset.id, in_paris.id);

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn embedded_assets_reports_only_embedded_ids() -> TestResult {
	let db = setup().await?;
	let conn = db.conn();
	let owner = Uuid::new_v4();

	let assets = (0..4u32)
		.map(|n| asset(owner, n, at(2024, 5, 1) + Duration::hours(n.into())))
		.collect::<Vec<_>>();
	insert_assets(conn, &assets).await?;

	for asset in &assets[..2] {
		smart_search::Entity::insert(smart_search::ActiveModel {
			asset_id: sea_orm::Set(asset.id),
		})
		.exec_without_returning(conn)
		.await?;
	}

	let embedded = repository(&db)
		.embedded_assets(assets.iter().map(|asset| asset.id).collect())
		.await?;

	assert_eq!(embedded.len(), 2);
	assert!(embedded.contains(&assets[0].id));
	assert!(embedded.contains(&assets[1].id));
	assert!(!embedded.contains(&assets[2].id));

	assert!(repository(&db).embedded_assets(Vec::new()).await?.is_empty());

	Ok(())
}
