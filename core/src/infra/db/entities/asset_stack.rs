//! Stack grouping several assets behind a primary one

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_stack")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub id: Uuid,
	pub owner_id: Uuid,
	pub primary_asset_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::asset::Entity")]
	Assets,
}

impl Related<super::asset::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Assets.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
