//! Eager loading of the relations a search asked for
//!
//! Relations are fetched with one `IN (...)` query per relation rather than
//! joined, so an asset missing a relation is never dropped from the page.

use std::collections::{HashMap, HashSet};

use lumen_utils::{chunked, MAX_BIND_PARAMETERS};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::{input::SearchRelationOptions, output::AssetSearchResult};
use crate::infra::db::entities::{asset, asset_face, asset_stack, exif, person, smart_info};

/// Each lookup binds one parameter per id
const ID_CHUNK_SIZE: usize = MAX_BIND_PARAMETERS;

pub async fn load_relations(
	db: &impl ConnectionTrait,
	assets: Vec<asset::Model>,
	options: SearchRelationOptions,
) -> Result<Vec<AssetSearchResult>, DbErr> {
	if !options.any() || assets.is_empty() {
		return Ok(assets.into_iter().map(AssetSearchResult::bare).collect());
	}

	let asset_ids = assets.iter().map(|asset| asset.id).collect::<Vec<_>>();

	let mut exif = if options.with_exif {
		chunked(asset_ids.iter().copied(), ID_CHUNK_SIZE, |ids| {
			exif::Entity::find()
				.filter(exif::Column::AssetId.is_in(ids))
				.all(db)
		})
		.await?
		.into_iter()
		.map(|exif| (exif.asset_id, exif))
		.collect::<HashMap<_, _>>()
	} else {
		HashMap::new()
	};

	let mut smart_info = if options.with_smart_info {
		chunked(asset_ids.iter().copied(), ID_CHUNK_SIZE, |ids| {
			smart_info::Entity::find()
				.filter(smart_info::Column::AssetId.is_in(ids))
				.all(db)
		})
		.await?
		.into_iter()
		.map(|info| (info.asset_id, info))
		.collect::<HashMap<_, _>>()
	} else {
		HashMap::new()
	};

	// People are reached through faces, so faces are loaded for either flag
	let faces = if options.with_faces || options.with_people {
		chunked(asset_ids.iter().copied(), ID_CHUNK_SIZE, |ids| {
			asset_face::Entity::find()
				.filter(asset_face::Column::AssetId.is_in(ids))
				.order_by_asc(asset_face::Column::Id)
				.all(db)
		})
		.await?
	} else {
		Vec::new()
	};

	let people = if options.with_people {
		let person_ids = faces
			.iter()
			.filter_map(|face| face.person_id)
			.collect::<HashSet<_>>();

		chunked(person_ids, ID_CHUNK_SIZE, |ids| {
			person::Entity::find()
				.filter(person::Column::Id.is_in(ids))
				.all(db)
		})
		.await?
		.into_iter()
		.map(|person| (person.id, person))
		.collect::<HashMap<_, _>>()
	} else {
		HashMap::new()
	};

	let stacks = if options.with_stacked {
		let stack_ids = assets
			.iter()
			.filter_map(|asset| asset.stack_id)
			.collect::<HashSet<_>>();

		chunked(stack_ids, ID_CHUNK_SIZE, |ids| {
			asset_stack::Entity::find()
				.filter(asset_stack::Column::Id.is_in(ids))
				.all(db)
		})
		.await?
		.into_iter()
		.map(|stack| (stack.id, stack))
		.collect::<HashMap<_, _>>()
	} else {
		HashMap::new()
	};

	let mut faces_by_asset = HashMap::<Uuid, Vec<asset_face::Model>>::new();
	for face in faces {
		faces_by_asset.entry(face.asset_id).or_default().push(face);
	}

	Ok(assets
		.into_iter()
		.map(|asset| {
			let faces = faces_by_asset.remove(&asset.id).unwrap_or_default();

			let mut seen = HashSet::new();
			let asset_people = faces
				.iter()
				.filter_map(|face| face.person_id)
				.filter(|id| seen.insert(*id))
				.filter_map(|id| people.get(&id).cloned())
				.collect();

			AssetSearchResult {
				exif: exif.remove(&asset.id),
				smart_info: smart_info.remove(&asset.id),
				stack: asset.stack_id.and_then(|id| stacks.get(&id).cloned()),
				faces: if options.with_faces { faces } else { Vec::new() },
				people: asset_people,
				asset,
			}
		})
		.collect())
}
