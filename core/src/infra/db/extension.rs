//! Vector extension kinds and everything that differs between them
//!
//! Lumen runs on either pgvecto.rs (`vectors`) or pgvector (`vector`). All
//! extension specific SQL lives here so the rest of the crate never has to
//! branch on the active kind.

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::version::{Version, VersionPrecision};

/// Table holding one CLIP embedding per asset.
pub const CLIP_TABLE: &str = "smart_search";
/// Table holding one embedding per detected face.
pub const FACE_TABLE: &str = "face_search";
/// ANN index on [`CLIP_TABLE`].
pub const CLIP_INDEX: &str = "clip_index";
/// ANN index on [`FACE_TABLE`].
pub const FACE_INDEX: &str = "face_index";

/// Dimension of both embedding tables before any model has been configured.
pub const DEFAULT_CLIP_DIMENSION: u32 = 512;
/// Assumed face embedding dimension when [`FACE_TABLE`] holds no row to probe.
pub const DEFAULT_FACE_DIMENSION: u32 = 512;

/// HNSW graph construction parameters, shared by every index we build.
pub const HNSW_EF_CONSTRUCTION: u32 = 300;
pub const HNSW_M: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorExtension {
	/// pgvecto.rs
	#[serde(rename = "pgvecto.rs", alias = "vectors")]
	PgVectors,
	/// pgvector
	#[serde(rename = "pgvector", alias = "vector")]
	PgVector,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown vector extension '{0}', expected one of: pgvecto.rs, pgvector")]
pub struct UnknownExtensionError(pub String);

impl FromStr for VectorExtension {
	type Err = UnknownExtensionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"pgvecto.rs" | "pgvectors" | "vectors" => Ok(Self::PgVectors),
			"pgvector" | "vector" => Ok(Self::PgVector),
			other => Err(UnknownExtensionError(other.to_string())),
		}
	}
}

impl fmt::Display for VectorExtension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.display_name())
	}
}

/// Session settings applied before an ANN query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTuning {
	/// Statements enabling structured predicate prefiltering and the search mode
	pub session: &'static [&'static str],
	/// Setting controlling how many candidates the HNSW search explores
	pub breadth_setting: &'static str,
	/// Breadth used when the caller did not bound the number of results
	pub default_breadth: u32,
	/// Largest breadth the extension accepts
	pub max_breadth: u32,
}

impl VectorExtension {
	pub const ALL: [Self; 2] = [Self::PgVectors, Self::PgVector];

	/// Name passed to `CREATE EXTENSION`
	pub fn extension_name(&self) -> &'static str {
		match self {
			Self::PgVectors => "vectors",
			Self::PgVector => "vector",
		}
	}

	pub fn display_name(&self) -> &'static str {
		match self {
			Self::PgVectors => "pgvecto.rs",
			Self::PgVector => "pgvector",
		}
	}

	/// The interchangeable backend a user can fall back to
	pub fn alternative(&self) -> Self {
		match self {
			Self::PgVectors => Self::PgVector,
			Self::PgVector => Self::PgVectors,
		}
	}

	/// Column type of an embedding of `dimension` floats
	pub fn vector_type(&self, dimension: u32) -> String {
		let name = match self {
			Self::PgVectors => "vectors.vector",
			Self::PgVector => "vector",
		};

		format!("{name}({dimension})")
	}

	/// Statement required in the same session before DDL touching vector
	/// columns, if the extension needs one.
	pub fn compatibility_statement(&self) -> Option<&'static str> {
		match self {
			Self::PgVectors => Some("SET LOCAL vectors.pgvector_compatibility = on"),
			Self::PgVector => None,
		}
	}

	/// Whether the server must be restarted after `ALTER EXTENSION ... UPDATE`
	pub fn restart_required_after_update(&self) -> bool {
		matches!(self, Self::PgVectors)
	}

	pub fn tuning(&self) -> SearchTuning {
		match self {
			Self::PgVectors => SearchTuning {
				session: &[
					"SET LOCAL vectors.enable_prefilter = on",
					"SET LOCAL vectors.search_mode = vbase",
				],
				breadth_setting: "vectors.hnsw_ef_search",
				default_breadth: 1000,
				max_breadth: 65_535,
			},
			Self::PgVector => SearchTuning {
				session: &[],
				breadth_setting: "hnsw.ef_search",
				default_breadth: 1000,
				max_breadth: 1000,
			},
		}
	}

	/// `SET LOCAL` statements for a search returning at most `cap` rows.
	///
	/// Breadth is at least the cap, clamped to what the extension accepts.
	pub fn search_statements(&self, cap: Option<u64>) -> Vec<String> {
		let tuning = self.tuning();
		let breadth = cap
			.map(|cap| cap.min(u64::from(tuning.max_breadth)))
			.unwrap_or(u64::from(tuning.default_breadth));

		tuning
			.session
			.iter()
			.map(|statement| statement.to_string())
			.chain([format!("SET LOCAL {} = {breadth}", tuning.breadth_setting)])
			.collect()
	}

	pub fn create_index_sql(&self, index_name: &str, table: &str) -> String {
		match self {
			Self::PgVectors => format!(
				"CREATE INDEX IF NOT EXISTS {index_name} ON {table} \
				USING vectors (embedding vector_cos_ops) \
				WITH (options = $$[indexing.hnsw]\nm = {HNSW_M}\nef_construction = {HNSW_EF_CONSTRUCTION}$$)"
			),
			Self::PgVector => format!(
				"CREATE INDEX IF NOT EXISTS {index_name} ON {table} \
				USING hnsw (embedding vector_cosine_ops) \
				WITH (ef_construction = {HNSW_EF_CONSTRUCTION}, m = {HNSW_M})"
			),
		}
	}

	pub fn create_clip_table_sql(&self, dimension: u32) -> String {
		format!(
			"CREATE TABLE IF NOT EXISTS {CLIP_TABLE} (\
			asset_id uuid PRIMARY KEY REFERENCES assets(id) ON DELETE CASCADE, \
			embedding {} NOT NULL)",
			self.vector_type(dimension)
		)
	}

	pub fn create_face_table_sql(&self, dimension: u32) -> String {
		format!(
			"CREATE TABLE IF NOT EXISTS {FACE_TABLE} (\
			face_id uuid PRIMARY KEY REFERENCES asset_faces(id) ON DELETE CASCADE, \
			embedding {} NOT NULL)",
			self.vector_type(dimension)
		)
	}

	/// Query listing vector indexes the extension reports as needing a rebuild.
	pub fn stale_index_query(&self) -> Option<&'static str> {
		match self {
			Self::PgVectors => Some(
				"SELECT indexname FROM pg_vector_index_stat WHERE idx_status = 'UPGRADE'",
			),
			Self::PgVector => None,
		}
	}

	pub fn default_policy(&self) -> ExtensionPolicy {
		match self {
			Self::PgVectors => ExtensionPolicy {
				min_version: Version::new(0, 2, 0),
				bound: VersionBound::Pinned(VersionPrecision::Minor),
			},
			Self::PgVector => ExtensionPolicy {
				min_version: Version::new(0, 5, 0),
				bound: VersionBound::Max(Version::new(0, 7, 4)),
			},
		}
	}
}

/// Upper side of an [`ExtensionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionBound {
	/// Installed version must equal the minimum down to this field
	Pinned(VersionPrecision),
	/// Installed version must not exceed this one
	Max(Version),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPolicy {
	pub min_version: Version,
	pub bound: VersionBound,
}

impl ExtensionPolicy {
	pub fn is_satisfied_by(&self, version: &Version) -> bool {
		if version.is_nightly() || version.is_older_than(&self.min_version) {
			return false;
		}

		match self.bound {
			VersionBound::Pinned(precision) => version
				.compare_at(&self.min_version, precision)
				.is_eq(),
			VersionBound::Max(max) => !version.is_newer_than(&max),
		}
	}

	/// Human readable range, used in startup diagnostics
	pub fn describe_range(&self) -> String {
		let min = self.min_version;
		match self.bound {
			VersionBound::Pinned(VersionPrecision::Patch) => format!("{min}"),
			VersionBound::Pinned(VersionPrecision::Minor) => {
				format!(">={min}, <{}.{}.0", min.major, min.minor + 1)
			}
			VersionBound::Pinned(VersionPrecision::Major) => {
				format!(">={min}, <{}.0.0", min.major + 1)
			}
			VersionBound::Max(max) => format!(">={min}, <={max}"),
		}
	}
}

/// Per kind policies, fixed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable(HashMap<VectorExtension, ExtensionPolicy>);

impl PolicyTable {
	pub fn new(overrides: &HashMap<VectorExtension, ExtensionPolicy>) -> Self {
		Self(
			VectorExtension::ALL
				.into_iter()
				.map(|kind| {
					let policy = overrides
						.get(&kind)
						.copied()
						.unwrap_or_else(|| kind.default_policy());
					(kind, policy)
				})
				.collect(),
		)
	}

	pub fn get(&self, kind: VectorExtension) -> ExtensionPolicy {
		self.0
			.get(&kind)
			.copied()
			.unwrap_or_else(|| kind.default_policy())
	}
}

impl Default for PolicyTable {
	fn default() -> Self {
		Self::new(&HashMap::new())
	}
}
