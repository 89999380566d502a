use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use lumen_core::{
	config::{default_data_dir, AppConfig},
	domain::clip_dimension,
	infra::db::{
		catalog::Catalog,
		extension::VectorExtension,
		lifecycle::ExtensionLifecycle,
		lock::LockCoordinator,
		Database,
	},
	logging, Core,
};
use lumen_utils::error::report_error;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lumen-admin", about = "Lumen database administration")]
struct Args {
	/// Path to the Lumen data directory
	#[arg(long, env = "LUMEN_DATA_DIR")]
	data_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Check the engine and vector extension versions
	Check,
	/// Run the full startup sequence, migrations included
	Migrate,
	/// Switch the CLIP model, resizing the smart search table if needed
	SetModel { name: String },
	/// Move stored embeddings from one vector extension to the other
	SwapExtension {
		from: VectorExtension,
		to: VectorExtension,
	},
	/// List registry locks currently held in the database
	LockStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let data_dir = match args.data_dir {
		Some(dir) => dir,
		None => default_data_dir()?,
	};

	let config = AppConfig::load_from(&data_dir)?;
	let _guard = logging::init(&config)?;

	let res = run(args.command, config, &data_dir).await;
	report_error(&res);

	res
}

async fn run(command: Command, config: AppConfig, data_dir: &Path) -> Result<()> {
	match command {
		Command::Check => {
			let lifecycle = connect(&config).await?;
			Core::check(&config, &lifecycle).await?;
			info!(extension = %lifecycle.extension(), "Database checks passed");
		}

		Command::Migrate => {
			Core::start(config).await?;
			info!("Database is up to date");
		}

		Command::SetModel { name } => {
			clip_dimension(&name).ok_or_else(|| anyhow!("Unknown CLIP model '{name}'"))?;

			let mut config = config;
			config.machine_learning.clip_model = name.clone();
			let core = Core::start(config).await?;

			let mut stored = AppConfig::load_stored(data_dir)?;
			stored.machine_learning.clip_model = name;
			stored.save()?;

			info!(
				clip_model = %core.config.machine_learning.clip_model,
				"CLIP model updated"
			);
		}

		Command::SwapExtension { from, to } => {
			let dimension = clip_dimension(&config.machine_learning.clip_model)
				.ok_or_else(|| {
					anyhow!("Unknown CLIP model '{}'", config.machine_learning.clip_model)
				})?;

			let lifecycle = connect(&config).await?;
			lifecycle.create_extension(to).await?;
			lifecycle.swap_extension(from, to, dimension).await?;

			let mut stored = AppConfig::load_stored(data_dir)?;
			stored.database.vector_extension = to;
			stored.save()?;

			info!(%from, %to, "Vector extension swapped");
		}

		Command::LockStatus => {
			let db = Database::connect(&config.database)
				.await
				.context("Failed to connect to the database")?;

			let held = Catalog::held_locks(db.conn()).await?;
			if held.is_empty() {
				println!("No Lumen locks are held");
			}

			for (lock, pid) in held {
				println!("{:<28} id {:<6} pid {pid}", lock.to_string(), lock.id());
			}
		}
	}

	Ok(())
}

async fn connect(config: &AppConfig) -> Result<ExtensionLifecycle> {
	let db = Database::connect(&config.database)
		.await
		.context("Failed to connect to the database")?;

	let locks = Arc::new(LockCoordinator::postgres(db.shared()));

	Ok(ExtensionLifecycle::new(
		db.shared(),
		locks,
		config.database.vector_extension,
	))
}
