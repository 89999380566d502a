//! Errors raised while bringing up or reshaping the vector schema

use sea_orm::DbErr;
use thiserror::Error;

use super::{
	extension::VectorExtension,
	lock::LockError,
	version::{Version, VersionParseError},
};

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
	#[error(
		"PostgreSQL {installed} is not supported, version {required_major} or newer is required. \
		Please upgrade the database server"
	)]
	UnsupportedEngine {
		installed: Version,
		required_major: u32,
	},
	#[error(
		"Failed to activate the {extension} extension. Make sure the server has {extension} \
		installed and that the database user may create extensions, or run \
		`CREATE EXTENSION IF NOT EXISTS {} CASCADE;` as a superuser. If {} is installed instead, \
		set LUMEN_VECTOR_EXTENSION={} to use it",
		.extension.extension_name(),
		.extension.alternative(),
		.extension.alternative()
	)]
	ExtensionUnavailable {
		extension: VectorExtension,
		#[source]
		source: DbErr,
	},
	#[error("The {extension} extension is not installed in this database")]
	ExtensionMissing { extension: VectorExtension },
	#[error(
		"The {extension} extension reports a nightly build (0.0.0), which is not supported. \
		Please install a release in range {range}"
	)]
	NightlyExtension {
		extension: VectorExtension,
		range: String,
	},
	#[error(
		"The {extension} extension version {installed} is not supported, expected {range}. \
		Please install a supported version with `ALTER EXTENSION {} UPDATE TO '<version>';`, \
		or set LUMEN_VECTOR_EXTENSION={} to switch extensions",
		.extension.extension_name(),
		.extension.alternative()
	)]
	UnsupportedExtensionVersion {
		extension: VectorExtension,
		installed: Version,
		range: String,
	},
	#[error(
		"Table {table} stores {found} embeddings but {configured} is configured. \
		Run `lumen-admin swap-extension {found} {configured}` to convert it"
	)]
	ExtensionMismatch {
		table: &'static str,
		configured: VectorExtension,
		found: VectorExtension,
	},
	#[error("Invalid embedding dimension {0}, expected an integer between 1 and 65536")]
	InvalidDimension(i64),
	#[error("Unknown CLIP model '{0}'")]
	UnknownClipModel(String),
	#[error("Unexpected value in the system catalog: {0}")]
	Catalog(String),
	#[error(transparent)]
	VersionParse(#[from] VersionParseError),
	#[error(transparent)]
	Lock(#[from] LockError),
	#[error("Database error: {0}")]
	Db(#[from] DbErr),
}
