//! A face detected in an asset

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "asset_faces")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub id: Uuid,
	pub asset_id: Uuid,
	pub person_id: Option<Uuid>, // None until the face is clustered
	pub image_width: i32,
	pub image_height: i32,
	pub bounding_box_x1: i32,
	pub bounding_box_y1: i32,
	pub bounding_box_x2: i32,
	pub bounding_box_y2: i32,
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
	#[sea_orm(
		belongs_to = "super::person::Entity",
		from = "Column::PersonId",
		to = "super::person::Column::Id",
		on_delete = "SetNull"
	)]
	Person,
	#[sea_orm(has_one = "super::face_search::Entity")]
	FaceSearch,
}

impl Related<super::asset::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Asset.def()
	}
}

impl Related<super::person::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Person.def()
	}
}

impl Related<super::face_search::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::FaceSearch.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
