//! Output of the asset search operations

use serde::Serialize;

use crate::infra::db::entities::{asset, asset_face, asset_stack, exif, person, smart_info};

/// An asset with whichever relations the search asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSearchResult {
	#[serde(flatten)]
	pub asset: asset::Model,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exif: Option<exif::Model>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub faces: Vec<asset_face::Model>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub people: Vec<person::Model>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub smart_info: Option<smart_info::Model>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<asset_stack::Model>,
}

impl AssetSearchResult {
	pub fn bare(asset: asset::Model) -> Self {
		Self {
			asset,
			exif: None,
			faces: Vec::new(),
			people: Vec::new(),
			smart_info: None,
			stack: None,
		}
	}
}

/// A face near the query embedding. The stored embedding is never returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSearchResult {
	pub face: asset_face::Model,
	pub distance: f64,
}
