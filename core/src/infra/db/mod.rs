//! Database infrastructure using SeaORM

use std::{sync::Arc, time::Duration};

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod catalog;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod extension;
pub mod gate;
pub mod lifecycle;
pub mod lock;
pub mod migration;
pub mod pagination;
pub mod version;

pub use error::DatabaseError;

/// Database wrapper for Lumen
pub struct Database {
	/// SeaORM database connection, shared with the services built on it
	conn: Arc<DatabaseConnection>,
}

impl Database {
	pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
		let mut opt = ConnectOptions::new(config.url.clone());
		opt.max_connections(config.max_connections)
			.min_connections(config.min_connections)
			.connect_timeout(Duration::from_secs(config.connect_timeout_secs))
			.sqlx_logging(false); // We'll use tracing instead

		let conn = SeaDatabase::connect(opt).await?;

		info!(
			max_connections = config.max_connections,
			"Connected to database"
		);

		Ok(Self {
			conn: Arc::new(conn),
		})
	}

	/// Run migrations
	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(self.conn(), None).await?;
		info!("Database migrations completed successfully");
		Ok(())
	}

	/// Get the database connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}

	/// A handle on the connection pool for long lived services
	pub fn shared(&self) -> Arc<DatabaseConnection> {
		Arc::clone(&self.conn)
	}
}
