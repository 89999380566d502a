//! Person entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "person")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub id: Uuid,
	pub owner_id: Uuid,
	pub name: String,
	pub birth_date: Option<Date>,
	pub thumbnail_path: String,
	pub face_asset_id: Option<Uuid>,
	pub is_hidden: bool,
	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::asset_face::Entity")]
	Faces,
}

impl Related<super::asset_face::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Faces.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
