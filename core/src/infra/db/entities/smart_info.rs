//! Tags and objects recognized in an asset

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "smart_info")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub asset_id: Uuid,
	pub tags: Option<Json>,    // JSON array of strings
	pub objects: Option<Json>, // JSON array of strings
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
