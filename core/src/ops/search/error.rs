use sea_orm::DbErr;
use thiserror::Error;

use crate::infra::db::DatabaseError;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
	#[error("Invalid number of results {0}, expected a positive integer")]
	InvalidResultCap(i64),
	#[error("Invalid maximum distance {0}")]
	InvalidMaxDistance(f64),
	#[error(transparent)]
	Database(#[from] DatabaseError),
	#[error("Database error: {0}")]
	Db(#[from] DbErr),
}
