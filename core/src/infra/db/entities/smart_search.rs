//! CLIP embedding row of an asset
//!
//! Only the key is mapped. The `embedding` column type depends on the active
//! vector extension and is read and written with raw SQL.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "smart_search")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub asset_id: Uuid,
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
