//! Inputs of the asset search operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::infra::db::embedding::Embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AssetType {
	Image,
	Video,
	Audio,
	Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchDateOptions {
	pub created_before: Option<DateTime<Utc>>,
	pub created_after: Option<DateTime<Utc>>,
	pub taken_before: Option<DateTime<Utc>>,
	pub taken_after: Option<DateTime<Utc>>,
	pub trashed_before: Option<DateTime<Utc>>,
	pub trashed_after: Option<DateTime<Utc>>,
	pub updated_before: Option<DateTime<Utc>>,
	pub updated_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchIdOptions {
	pub id: Option<Uuid>,
	pub owner_id: Option<Uuid>,
	pub device_id: Option<String>,
	pub device_asset_id: Option<String>,
	pub library_id: Option<Uuid>,
	pub checksum: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchExifOptions {
	pub city: Option<String>,
	pub country: Option<String>,
	pub state: Option<String>,
	pub make: Option<String>,
	pub model: Option<String>,
	pub lens_model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPathOptions {
	pub original_path: Option<String>,
	pub original_file_name: Option<String>,
	pub encoded_video_path: Option<String>,
	pub preview_path: Option<String>,
	pub thumbnail_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchStatusOptions {
	pub is_archived: Option<bool>,
	pub with_archived: Option<bool>,
	pub is_encoded: Option<bool>,
	pub is_external: Option<bool>,
	pub is_favorite: Option<bool>,
	pub is_motion: Option<bool>,
	pub is_offline: Option<bool>,
	pub is_read_only: Option<bool>,
	pub is_visible: Option<bool>,
	pub with_deleted: Option<bool>,
	#[serde(rename = "type")]
	pub asset_type: Option<AssetType>,
}

/// Relations loaded next to each asset. Never narrows the result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRelationOptions {
	pub with_exif: bool,
	pub with_faces: bool,
	pub with_people: bool,
	pub with_smart_info: bool,
	pub with_stacked: bool,
}

impl SearchRelationOptions {
	pub fn any(&self) -> bool {
		self.with_exif || self.with_faces || self.with_people || self.with_smart_info || self.with_stacked
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}

/// Structured predicates of an asset search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilter {
	#[serde(flatten)]
	pub dates: SearchDateOptions,
	#[serde(flatten)]
	pub ids: SearchIdOptions,
	#[serde(flatten)]
	pub exif: SearchExifOptions,
	#[serde(flatten)]
	pub paths: SearchPathOptions,
	#[serde(flatten)]
	pub status: SearchStatusOptions,
	#[serde(flatten)]
	pub relations: SearchRelationOptions,
	/// Direction of the `file_created_at` ordering
	pub order: SortOrder,
}

/// CLIP similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSearch {
	pub user_ids: Vec<Uuid>,
	pub embedding: Embedding,
	/// Upper bound on the number of rows ever returned across pages
	#[serde(default)]
	pub num_results: Option<i64>,
	#[serde(default)]
	pub with_archived: bool,
	#[serde(default)]
	pub filter: SearchFilter,
}

/// Nearest faces to a face embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceEmbeddingSearch {
	pub user_ids: Vec<Uuid>,
	pub embedding: Embedding,
	pub num_results: i64,
	pub max_distance: f64,
	#[serde(default)]
	pub has_person: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filter_deserializes_from_flat_camel_case() {
		let filter: SearchFilter = serde_json::from_value(serde_json::json!({
			"createdAfter": "2023-01-01T00:00:00Z",
			"city": "Paris",
			"isEncoded": true,
			"type": "VIDEO",
			"withExif": true,
		}))
		.unwrap();

		assert!(filter.dates.created_after.is_some());
		assert_eq!(filter.exif.city.as_deref(), Some("Paris"));
		assert_eq!(filter.status.is_encoded, Some(true));
		assert_eq!(filter.status.asset_type, Some(AssetType::Video));
		assert!(filter.relations.with_exif);
		assert_eq!(filter.order, SortOrder::Desc);
	}

	#[test]
	fn asset_type_round_trips_through_strings() {
		assert_eq!(AssetType::Image.to_string(), "IMAGE");
		assert_eq!("video".parse::<AssetType>().unwrap(), AssetType::Video);
	}
}
