//! EXIF metadata extracted from an asset

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exif")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub asset_id: Uuid,
	pub make: Option<String>,
	pub model: Option<String>,
	pub lens_model: Option<String>,
	pub exif_image_width: Option<i32>,
	pub exif_image_height: Option<i32>,
	pub f_number: Option<f64>,
	pub iso: Option<i32>,
	pub date_time_original: Option<DateTimeUtc>,
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub country: Option<String>,
	pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::asset::Entity",
		from = "Column::AssetId",
		to = "super::asset::Column::Id",
		on_delete = "Cascade"
	)]
	Asset,
}

impl Related<super::asset::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Asset.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
