//! Mutual exclusion for operations rewriting shared schema
//!
//! A lock is taken twice: first a mutex local to this process, then a
//! PostgreSQL advisory lock so that other server processes sharing the
//! database are excluded as well.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::{
	ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
	TransactionTrait,
};
use serde::Serialize;
use strum::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, warn};

/// Registry of advisory lock ids.
///
/// Ids are shared with every process using the database: never reuse or
/// renumber an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
#[repr(i64)]
pub enum DatabaseLock {
	GetSystemConfig = 69,
	GeodataImport = 100,
	Migrations = 200,
	SystemFileMounts = 300,
	StorageTemplateMigration = 420,
	VersionHistory = 500,
	ClipDimSize = 512,
	VectorExtensionSwap = 600,
	Library = 1337,
}

impl DatabaseLock {
	pub const fn id(self) -> i64 {
		self as i64
	}
}

#[derive(Error, Debug)]
pub enum LockError {
	#[error("Failed to acquire database lock {lock} (id {})", .lock.id())]
	Acquire {
		lock: DatabaseLock,
		#[source]
		source: DbErr,
	},
	#[error("Failed to release database lock {lock} (id {})", .lock.id())]
	Release {
		lock: DatabaseLock,
		#[source]
		source: DbErr,
	},
}

/// Cross process half of a lock.
#[async_trait]
pub trait SessionLocks: Send + Sync {
	async fn acquire(&self, id: i64) -> Result<Box<dyn HeldSessionLock>, DbErr>;
}

/// A granted session lock. Dropping it without calling
/// [`HeldSessionLock::release`] must still give the lock back.
#[async_trait]
pub trait HeldSessionLock: Send {
	async fn release(self: Box<Self>) -> Result<(), DbErr>;
}

/// Advisory locks held by a dedicated transaction.
///
/// The lock is transaction scoped (`pg_advisory_xact_lock`), so committing
/// releases it, and so does the rollback issued when the transaction is
/// dropped on an error or cancellation path.
pub struct PostgresSessionLocks {
	db: Arc<DatabaseConnection>,
}

impl PostgresSessionLocks {
	pub fn new(db: Arc<DatabaseConnection>) -> Self {
		Self { db }
	}
}

struct PostgresHeldLock(DatabaseTransaction);

#[async_trait]
impl SessionLocks for PostgresSessionLocks {
	async fn acquire(&self, id: i64) -> Result<Box<dyn HeldSessionLock>, DbErr> {
		let txn = self.db.begin().await?;

		txn.execute(Statement::from_sql_and_values(
			DbBackend::Postgres,
			"SELECT pg_advisory_xact_lock($1)",
			[id.into()],
		))
		.await?;

		Ok(Box::new(PostgresHeldLock(txn)))
	}
}

#[async_trait]
impl HeldSessionLock for PostgresHeldLock {
	async fn release(self: Box<Self>) -> Result<(), DbErr> {
		self.0.commit().await
	}
}

/// Session locks for deployments where a single process owns the database.
pub struct ProcessLocalOnly;

struct Nothing;

#[async_trait]
impl SessionLocks for ProcessLocalOnly {
	async fn acquire(&self, _id: i64) -> Result<Box<dyn HeldSessionLock>, DbErr> {
		Ok(Box::new(Nothing))
	}
}

#[async_trait]
impl HeldSessionLock for Nothing {
	async fn release(self: Box<Self>) -> Result<(), DbErr> {
		Ok(())
	}
}

/// Hands out [`DatabaseLock`]s. Built once at startup and shared by handle.
pub struct LockCoordinator {
	local: Mutex<HashMap<DatabaseLock, Arc<tokio::sync::Mutex<()>>>>,
	session: Arc<dyn SessionLocks>,
}

impl LockCoordinator {
	pub fn new(session: Arc<dyn SessionLocks>) -> Self {
		Self {
			local: Mutex::new(HashMap::new()),
			session,
		}
	}

	pub fn postgres(db: Arc<DatabaseConnection>) -> Self {
		Self::new(Arc::new(PostgresSessionLocks::new(db)))
	}

	fn local_lock(&self, lock: DatabaseLock) -> Arc<tokio::sync::Mutex<()>> {
		Arc::clone(self.local.lock().entry(lock).or_default())
	}

	/// Runs `operation` while holding `lock` both in this process and in the
	/// database.
	///
	/// Both locks are released whatever `operation` returns. An error from
	/// `operation` takes precedence over a failed release.
	pub async fn with_lock<T, E, F, Fut>(&self, lock: DatabaseLock, operation: F) -> Result<T, E>
	where
		E: From<LockError>,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let _local = self.local_lock(lock).lock_owned().await;

		let held = self
			.session
			.acquire(lock.id())
			.await
			.map_err(|source| LockError::Acquire { lock, source })?;

		debug!(%lock, id = lock.id(), "Acquired lock");

		let res = operation().await;
		let released = held.release().await;

		debug!(%lock, id = lock.id(), "Released lock");

		match (res, released) {
			(Ok(value), Ok(())) => Ok(value),
			(Ok(_), Err(source)) => Err(LockError::Release { lock, source }.into()),
			(Err(e), Ok(())) => Err(e),
			(Err(e), Err(source)) => {
				warn!(%lock, ?source, "Failed to release lock after a failed operation");
				Err(e)
			}
		}
	}

	/// Whether `lock` is currently held by this process. Never blocks.
	pub fn is_busy(&self, lock: DatabaseLock) -> bool {
		self.local_lock(lock).try_lock().is_err()
	}

	/// Waits until `lock` is free in this process, without taking it.
	pub async fn wait(&self, lock: DatabaseLock) {
		drop(self.local_lock(lock).lock().await);
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		time::Duration,
	};

	use strum::IntoEnumIterator;

	/// Records every acquire and release so tests can check pairing
	#[derive(Default)]
	pub(crate) struct RecordingSessionLocks {
		pub events: Arc<Mutex<Vec<String>>>,
		pub fail_acquire: bool,
	}

	struct RecordedLock {
		id: i64,
		events: Arc<Mutex<Vec<String>>>,
	}

	#[async_trait]
	impl SessionLocks for RecordingSessionLocks {
		async fn acquire(&self, id: i64) -> Result<Box<dyn HeldSessionLock>, DbErr> {
			if self.fail_acquire {
				return Err(DbErr::Custom("connection refused".to_string()));
			}

			self.events.lock().push(format!("acquire {id}"));
			Ok(Box::new(RecordedLock {
				id,
				events: Arc::clone(&self.events),
			}))
		}
	}

	#[async_trait]
	impl HeldSessionLock for RecordedLock {
		async fn release(self: Box<Self>) -> Result<(), DbErr> {
			self.events.lock().push(format!("release {}", self.id));
			Ok(())
		}
	}

	#[derive(Error, Debug)]
	enum TestError {
		#[error("operation failed")]
		Failed,
		#[error(transparent)]
		Lock(#[from] LockError),
	}

	#[test]
	fn lock_ids_are_stable_and_unique() {
		assert_eq!(DatabaseLock::ClipDimSize.id(), 512);
		assert_eq!(DatabaseLock::GeodataImport.id(), 100);
		assert_eq!(DatabaseLock::StorageTemplateMigration.id(), 420);

		let mut ids = DatabaseLock::iter().map(DatabaseLock::id).collect::<Vec<_>>();
		let count = ids.len();
		ids.sort_unstable();
		ids.dedup();
		assert_eq!(ids.len(), count);
	}

	#[tokio::test]
	async fn same_lock_never_runs_concurrently() {
		let locks = Arc::new(LockCoordinator::new(Arc::new(
			RecordingSessionLocks::default(),
		)));
		let running = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));

		let handles = (0..8)
			.map(|_| {
				let locks = Arc::clone(&locks);
				let running = Arc::clone(&running);
				let peak = Arc::clone(&peak);

				tokio::spawn(async move {
					locks
						.with_lock(DatabaseLock::ClipDimSize, || async {
							let now = running.fetch_add(1, Ordering::SeqCst) + 1;
							peak.fetch_max(now, Ordering::SeqCst);
							tokio::time::sleep(Duration::from_millis(5)).await;
							running.fetch_sub(1, Ordering::SeqCst);
							Ok::<_, TestError>(())
						})
						.await
				})
			})
			.collect::<Vec<_>>();

		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		assert_eq!(peak.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn busy_while_held_and_free_after_failure() {
		let session = RecordingSessionLocks::default();
		let events = Arc::clone(&session.events);
		let locks = LockCoordinator::new(Arc::new(session));

		assert!(!locks.is_busy(DatabaseLock::Migrations));

		let res: Result<(), TestError> = locks
			.with_lock(DatabaseLock::Migrations, || async {
				assert!(locks.is_busy(DatabaseLock::Migrations));
				assert!(!locks.is_busy(DatabaseLock::GeodataImport));
				Err(TestError::Failed)
			})
			.await;

		assert!(matches!(res, Err(TestError::Failed)));
		assert!(!locks.is_busy(DatabaseLock::Migrations));
		assert_eq!(*events.lock(), vec!["acquire 200", "release 200"]);
	}

	#[tokio::test]
	async fn failed_acquire_frees_local_lock() {
		let locks = LockCoordinator::new(Arc::new(RecordingSessionLocks {
			fail_acquire: true,
			..Default::default()
		}));

		let mut ran = false;
		let res: Result<(), TestError> = locks
			.with_lock(DatabaseLock::Library, || {
				ran = true;
				async { Ok(()) }
			})
			.await;

		assert!(matches!(
			res,
			Err(TestError::Lock(LockError::Acquire {
				lock: DatabaseLock::Library,
				..
			}))
		));
		assert!(!ran);
		assert!(!locks.is_busy(DatabaseLock::Library));
	}

	#[tokio::test]
	async fn wait_returns_once_lock_is_released() {
		let locks = Arc::new(LockCoordinator::new(Arc::new(ProcessLocalOnly)));
		let (started_tx, started_rx) = tokio::sync::oneshot::channel();
		let (finish_tx, finish_rx) = tokio::sync::oneshot::channel::<()>();

		let holder = {
			let locks = Arc::clone(&locks);
			tokio::spawn(async move {
				locks
					.with_lock(DatabaseLock::ClipDimSize, || async move {
						started_tx.send(()).unwrap();
						finish_rx.await.unwrap();
						Ok::<_, TestError>(())
					})
					.await
			})
		};

		started_rx.await.unwrap();
		assert!(locks.is_busy(DatabaseLock::ClipDimSize));

		let waiter = {
			let locks = Arc::clone(&locks);
			tokio::spawn(async move { locks.wait(DatabaseLock::ClipDimSize).await })
		};

		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!waiter.is_finished());

		finish_tx.send(()).unwrap();
		holder.await.unwrap().unwrap();
		waiter.await.unwrap();

		assert!(!locks.is_busy(DatabaseLock::ClipDimSize));
	}
}
