//! Asset entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub id: Uuid,
	pub owner_id: Uuid,
	pub library_id: Option<Uuid>,
	pub device_asset_id: String,
	pub device_id: String,
	pub asset_type: String, // IMAGE, VIDEO, AUDIO or OTHER
	pub checksum: Vec<u8>,
	pub original_path: String,
	pub original_file_name: String,
	pub preview_path: Option<String>,
	pub thumbnail_path: Option<String>,
	pub encoded_video_path: Option<String>,
	pub live_photo_video_id: Option<Uuid>,
	pub stack_id: Option<Uuid>,
	pub duration: Option<String>,
	pub is_favorite: bool,
	pub is_archived: bool,
	pub is_external: bool,
	pub is_offline: bool,
	pub is_read_only: bool,
	pub is_visible: bool,
	pub file_created_at: DateTimeUtc,
	pub file_modified_at: DateTimeUtc,
	pub local_date_time: DateTimeUtc,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
	pub deleted_at: Option<DateTimeUtc>, // Soft deleted (trashed) when set
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_one = "super::exif::Entity")]
	Exif,
	#[sea_orm(has_many = "super::asset_face::Entity")]
	Faces,
	#[sea_orm(has_one = "super::smart_info::Entity")]
	SmartInfo,
	#[sea_orm(has_one = "super::smart_search::Entity")]
	SmartSearch,
	#[sea_orm(
		belongs_to = "super::asset_stack::Entity",
		from = "Column::StackId",
		to = "super::asset_stack::Column::Id",
		on_delete = "SetNull"
	)]
	Stack,
}

impl Related<super::exif::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Exif.def()
	}
}

impl Related<super::asset_face::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Faces.def()
	}
}

impl Related<super::smart_info::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::SmartInfo.def()
	}
}

impl Related<super::smart_search::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::SmartSearch.def()
	}
}

impl Related<super::asset_stack::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Stack.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
