//! Face embedding row, keyed by face
//!
//! Like [`super::smart_search`], the embedding column is not mapped.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "face_search")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub face_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::asset_face::Entity",
		from = "Column::FaceId",
		to = "super::asset_face::Column::Id",
		on_delete = "Cascade"
	)]
	Face,
}

impl Related<super::asset_face::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Face.def()
	}
}

impl ActiveModelBehavior for ActiveModel {}
