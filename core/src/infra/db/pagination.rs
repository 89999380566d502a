//! Lookahead pagination
//!
//! Pages are fetched with one extra row: if it shows up there is a next page,
//! and it is dropped before returning.

use futures::{StreamExt, TryStreamExt};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QuerySelect, Select, StreamTrait};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub take: u64,
	#[serde(default)]
	pub skip: u64,
}

impl Pagination {
	pub fn new(take: u64, skip: u64) -> Self {
		Self { take, skip }
	}

	/// One based page numbers, as used by the API layer
	pub fn page(page: u64, size: u64) -> Self {
		Self {
			take: size,
			skip: page.saturating_sub(1).saturating_mul(size),
		}
	}

	fn lookahead(&self) -> u64 {
		self.take.saturating_add(1)
	}

	/// `(offset, limit)` to fetch when no more than `cap` rows may be returned
	/// across all pages, or `None` when this page starts past the cap.
	pub fn capped_window(&self, cap: Option<u64>) -> Option<(u64, u64)> {
		match cap {
			None => Some((self.skip, self.lookahead())),
			Some(cap) if self.skip >= cap => None,
			Some(cap) => Some((self.skip, self.lookahead().min(cap - self.skip))),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
	pub items: Vec<T>,
	pub has_next_page: bool,
}

impl<T> Paginated<T> {
	/// Builds a page out of rows fetched with `take + 1` as limit
	pub fn from_lookahead(mut rows: Vec<T>, take: u64) -> Self {
		let take = usize::try_from(take).unwrap_or(usize::MAX);
		let has_next_page = rows.len() > take;
		rows.truncate(take);

		Self {
			items: rows,
			has_next_page,
		}
	}

	pub fn empty() -> Self {
		Self {
			items: Vec::new(),
			has_next_page: false,
		}
	}

	pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
		Paginated {
			items: self.items.into_iter().map(f).collect(),
			has_next_page: self.has_next_page,
		}
	}
}

/// How the window of rows is cut out of the ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationMode {
	/// `LIMIT take + 1 OFFSET skip` pushed down to the database
	#[default]
	LimitOffset,
	/// Rows streamed in order, skipping and taking on our side
	SkipTake,
}

/// Runs `select` and cuts a page out of it.
///
/// `select` must already be ordered deterministically, both modes then return
/// the same page.
pub async fn paginate<E, C>(
	select: Select<E>,
	pagination: Pagination,
	mode: PaginationMode,
	db: &C,
) -> Result<Paginated<E::Model>, DbErr>
where
	E: EntityTrait,
	E::Model: Send,
	C: ConnectionTrait + StreamTrait + Send,
{
	let rows = match mode {
		PaginationMode::LimitOffset => return paginate_capped(select, pagination, None, db).await,
		PaginationMode::SkipTake => {
			let skip = usize::try_from(pagination.skip).unwrap_or(usize::MAX);
			let take = usize::try_from(pagination.lookahead()).unwrap_or(usize::MAX);

			select
				.stream(db)
				.await?
				.skip(skip)
				.take(take)
				.try_collect::<Vec<_>>()
				.await?
		}
	};

	Ok(Paginated::from_lookahead(rows, pagination.take))
}

/// [`paginate`] in limit/offset mode over a result set truncated to `cap` rows
pub async fn paginate_capped<E, C>(
	select: Select<E>,
	pagination: Pagination,
	cap: Option<u64>,
	db: &C,
) -> Result<Paginated<E::Model>, DbErr>
where
	E: EntityTrait,
	C: ConnectionTrait,
{
	let Some((offset, limit)) = pagination.capped_window(cap) else {
		return Ok(Paginated::empty());
	};

	let rows = select.limit(limit).offset(offset).all(db).await?;

	Ok(Paginated::from_lookahead(rows, pagination.take))
}
