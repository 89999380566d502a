//! Translates a [`SearchFilter`] into a single query over `assets`

use chrono::{DateTime, Utc};
use lumen_utils::chain_optional_iter;
use sea_orm::{
	sea_query::SimpleExpr, ColumnTrait, Condition, EntityTrait, JoinType, QueryFilter, QueryOrder,
	QuerySelect, RelationTrait, Select,
};

use super::input::{SearchFilter, SortOrder};
use crate::infra::db::entities::{asset, exif};

pub struct AssetSearchBuilder<'a> {
	filter: &'a SearchFilter,
}

impl<'a> AssetSearchBuilder<'a> {
	pub fn new(filter: &'a SearchFilter) -> Self {
		Self { filter }
	}

	/// Filtered but unordered, for callers imposing their own ordering
	pub fn select(&self) -> Select<asset::Entity> {
		self.select_with([])
	}

	/// Like [`Self::select`], with extra predicates the caller always applies
	pub fn select_with(&self, required: impl IntoIterator<Item = SimpleExpr>) -> Select<asset::Entity> {
		let mut select = asset::Entity::find();

		if self.needs_exif_join() {
			select = select.join(JoinType::LeftJoin, asset::Relation::Exif.def());
		}

		select.filter(self.condition_with(required))
	}

	/// Filtered and ordered by `file_created_at`, ties broken by id
	pub fn build(&self) -> Select<asset::Entity> {
		let select = match self.filter.order {
			SortOrder::Desc => self.select().order_by_desc(asset::Column::FileCreatedAt),
			SortOrder::Asc => self.select().order_by_asc(asset::Column::FileCreatedAt),
		};

		select.order_by_asc(asset::Column::Id)
	}

	/// The filter's predicates, ANDed with `required`
	pub fn condition_with(&self, required: impl IntoIterator<Item = SimpleExpr>) -> Condition {
		let predicates = chain_optional_iter(
			required,
			self.date_predicates()
				.into_iter()
				.chain(self.id_predicates())
				.chain(self.path_predicates())
				.chain(self.exif_predicates())
				.chain(self.status_predicates())
				.chain([self.soft_delete_predicate()]),
		);

		predicates
			.into_iter()
			.fold(Condition::all(), |condition, predicate| condition.add(predicate))
	}

	pub fn needs_exif_join(&self) -> bool {
		self.exif_predicates().iter().any(Option::is_some)
	}

	/// Soft deleted rows are only eligible when asked for, or when a trash
	/// date bound implies them.
	pub fn includes_deleted(&self) -> bool {
		let dates = &self.filter.dates;
		self.filter.status.with_deleted == Some(true)
			|| dates.trashed_after.is_some()
			|| dates.trashed_before.is_some()
	}

	fn date_predicates(&self) -> [Option<SimpleExpr>; 4] {
		let dates = &self.filter.dates;
		[
			date_range(asset::Column::CreatedAt, dates.created_after, dates.created_before),
			date_range(asset::Column::UpdatedAt, dates.updated_after, dates.updated_before),
			date_range(asset::Column::DeletedAt, dates.trashed_after, dates.trashed_before),
			date_range(asset::Column::FileCreatedAt, dates.taken_after, dates.taken_before),
		]
	}

	fn id_predicates(&self) -> [Option<SimpleExpr>; 6] {
		let ids = &self.filter.ids;
		[
			ids.id.map(|id| asset::Column::Id.eq(id)),
			ids.owner_id.map(|id| asset::Column::OwnerId.eq(id)),
			ids.device_id
				.clone()
				.map(|id| asset::Column::DeviceId.eq(id)),
			ids.device_asset_id
				.clone()
				.map(|id| asset::Column::DeviceAssetId.eq(id)),
			ids.library_id.map(|id| asset::Column::LibraryId.eq(id)),
			ids.checksum
				.clone()
				.map(|checksum| asset::Column::Checksum.eq(checksum)),
		]
	}

	fn path_predicates(&self) -> [Option<SimpleExpr>; 5] {
		let paths = &self.filter.paths;
		[
			equals(asset::Column::OriginalPath, &paths.original_path),
			equals(asset::Column::OriginalFileName, &paths.original_file_name),
			equals(asset::Column::EncodedVideoPath, &paths.encoded_video_path),
			equals(asset::Column::PreviewPath, &paths.preview_path),
			equals(asset::Column::ThumbnailPath, &paths.thumbnail_path),
		]
	}

	fn exif_predicates(&self) -> [Option<SimpleExpr>; 6] {
		let exif = &self.filter.exif;
		[
			equals(exif::Column::City, &exif.city),
			equals(exif::Column::Country, &exif.country),
			equals(exif::Column::State, &exif.state),
			equals(exif::Column::Make, &exif.make),
			equals(exif::Column::Model, &exif.model),
			equals(exif::Column::LensModel, &exif.lens_model),
		]
	}

	fn status_predicates(&self) -> [Option<SimpleExpr>; 9] {
		let status = &self.filter.status;

		let archived = match (status.is_archived, status.with_archived) {
			(Some(is_archived), _) => Some(is_archived),
			(None, Some(false)) => Some(false),
			(None, _) => None,
		};

		// An explicit encoded path already implies the column is set
		let encoded = match status.is_encoded {
			Some(_) if self.filter.paths.encoded_video_path.is_some() => None,
			Some(true) => Some(asset::Column::EncodedVideoPath.is_not_null()),
			Some(false) => Some(asset::Column::EncodedVideoPath.is_null()),
			None => None,
		};

		let motion = status.is_motion.map(|is_motion| {
			if is_motion {
				asset::Column::LivePhotoVideoId.is_not_null()
			} else {
				asset::Column::LivePhotoVideoId.is_null()
			}
		});

		[
			archived.map(|value| asset::Column::IsArchived.eq(value)),
			status.is_favorite.map(|value| asset::Column::IsFavorite.eq(value)),
			status.is_external.map(|value| asset::Column::IsExternal.eq(value)),
			status.is_offline.map(|value| asset::Column::IsOffline.eq(value)),
			status.is_read_only.map(|value| asset::Column::IsReadOnly.eq(value)),
			status.is_visible.map(|value| asset::Column::IsVisible.eq(value)),
			status
				.asset_type
				.map(|asset_type| asset::Column::AssetType.eq(asset_type.to_string())),
			encoded,
			motion,
		]
	}

	fn soft_delete_predicate(&self) -> Option<SimpleExpr> {
		(!self.includes_deleted()).then(|| asset::Column::DeletedAt.is_null())
	}
}

fn date_range(
	column: asset::Column,
	after: Option<DateTime<Utc>>,
	before: Option<DateTime<Utc>>,
) -> Option<SimpleExpr> {
	match (after, before) {
		(Some(after), Some(before)) => Some(column.between(after, before)),
		(Some(after), None) => Some(column.gte(after)),
		(None, Some(before)) => Some(column.lte(before)),
		(None, None) => None,
	}
}

fn equals(column: impl ColumnTrait, value: &Option<String>) -> Option<SimpleExpr> {
	value.as_ref().map(|value| column.eq(value.as_str()))
}
