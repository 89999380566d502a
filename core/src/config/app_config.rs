//! Application configuration

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
	migration::Migrate, DatabaseConfig, MachineLearningConfig, DATABASE_URL_ENV, VECTOR_EXTENSION_ENV,
};
use crate::infra::db::extension::VectorExtension;

const CONFIG_FILE_NAME: &str = "lumen.json";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	pub database: DatabaseConfig,

	#[serde(default)]
	pub machine_learning: MachineLearningConfig,
}

impl AppConfig {
	/// Load configuration from a specific data directory, creating a default
	/// one if missing. Environment overrides are applied on top.
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let mut config = Self::load_stored(data_dir)?;
		config.apply_env_overrides(|key| std::env::var(key).ok())?;

		Ok(config)
	}

	/// Configuration as stored on disk, without environment overrides. Use
	/// this when the result is going to be saved back.
	pub fn load_stored(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE_NAME);

		let config = if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)
				.with_context(|| format!("Failed to read {}", config_path.display()))?;
			let mut config: AppConfig = serde_json::from_str(&json)
				.with_context(|| format!("Failed to parse {}", config_path.display()))?;

			if config.needs_migration() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			config
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			config
		};

		Ok(config)
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			database: DatabaseConfig::default(),
			machine_learning: MachineLearningConfig::default(),
		}
	}

	/// Applies `LUMEN_*` overrides, read through `var` so tests need not
	/// touch the process environment. Overrides are never saved.
	pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
		if let Some(url) = var(DATABASE_URL_ENV) {
			self.database.url = url;
		}

		if let Some(raw) = var(VECTOR_EXTENSION_ENV) {
			self.database.vector_extension = raw
				.parse::<VectorExtension>()
				.with_context(|| format!("Invalid {VECTOR_EXTENSION_ENV}"))?;
		}

		Ok(())
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		// Ensure directory exists
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE_NAME);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	/// Get the path for logs directory
	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		2 // Machine learning settings
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				self.migrate() // Continue migration chain
			}
			1 => {
				// v1 had no machine learning section, the CLIP table was sized for the default model
				self.machine_learning = MachineLearningConfig::default();
				self.version = 2;
				Ok(())
			}
			2 => Ok(()), // Already at target version
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}
