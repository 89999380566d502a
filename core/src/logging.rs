//! Tracing setup shared by the server and the admin CLI

use std::fs;

use anyhow::Result;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
	filter::{Directive, LevelFilter},
	fmt::{self, Layer},
	prelude::*,
	EnvFilter,
};

use crate::config::AppConfig;

#[cfg(debug_assertions)]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::DEBUG;

#[cfg(not(debug_assertions))]
const CONSOLE_LOG_FILTER: LevelFilter = LevelFilter::INFO;

/// Installs the global subscriber: console output plus a daily rolling file
/// under `<data_dir>/logs`. Keep the returned guard alive until exit, file
/// logs still buffered when it drops are lost.
pub fn init(config: &AppConfig) -> Result<WorkerGuard> {
	let logs_dir = config.logs_dir();
	fs::create_dir_all(&logs_dir)?;

	let (non_blocking, guard) = tracing_appender::non_blocking(rolling::daily(logs_dir, "log"));

	tracing_subscriber::registry()
		.with(env_filter(&config.log_level)?)
		.with(fmt::layer().with_filter(CONSOLE_LOG_FILTER))
		.with(
			Layer::default()
				.with_writer(non_blocking)
				.with_ansi(false)
				.with_filter(LevelFilter::DEBUG),
		)
		.try_init()?;

	Ok(guard)
}

/// `RUST_LOG` wins over the configured level for our own crates
fn env_filter(log_level: &str) -> Result<EnvFilter> {
	let mut filter = EnvFilter::from_default_env().add_directive("warn".parse::<Directive>()?);

	for krate in ["lumen_core", "lumen_utils", "lumen_admin"] {
		filter = filter.add_directive(format!("{krate}={log_level}").parse()?);
	}

	Ok(filter)
}
