//! Splitting oversized parameter collections across several statements.
//!
//! PostgreSQL refuses statements with more than 65535 bind parameters, so any
//! query taking a caller supplied list (`IN (...)` over ids, bulk inserts) has
//! to be split. [`chunked`] and [`chunked_set`] do the splitting explicitly:
//! the operation runs once per chunk, in order, and the partial results are
//! merged.

use std::{collections::HashSet, future::Future, hash::Hash};

use itertools::Itertools;

/// Upper bound of bind parameters accepted by a single PostgreSQL statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

fn split<T>(items: impl IntoIterator<Item = T>, chunk_size: usize) -> Vec<Vec<T>> {
	items
		.into_iter()
		.chunks(chunk_size.max(1))
		.into_iter()
		.map(Iterator::collect)
		.collect()
}

/// Runs `operation` once per chunk of at most `chunk_size` items and
/// concatenates the results, preserving chunk order.
///
/// An empty input never invokes `operation`.
pub async fn chunked<T, R, E, F, Fut>(
	items: impl IntoIterator<Item = T>,
	chunk_size: usize,
	mut operation: F,
) -> Result<Vec<R>, E>
where
	F: FnMut(Vec<T>) -> Fut,
	Fut: Future<Output = Result<Vec<R>, E>>,
{
	let mut merged = Vec::new();

	for chunk in split(items, chunk_size) {
		merged.extend(operation(chunk).await?);
	}

	Ok(merged)
}

/// Same as [`chunked`], but for operations answering with a set: partial
/// results are merged with a union.
pub async fn chunked_set<T, R, E, F, Fut>(
	items: impl IntoIterator<Item = T>,
	chunk_size: usize,
	mut operation: F,
) -> Result<HashSet<R>, E>
where
	R: Eq + Hash,
	F: FnMut(Vec<T>) -> Fut,
	Fut: Future<Output = Result<HashSet<R>, E>>,
{
	let mut merged = HashSet::new();

	for chunk in split(items, chunk_size) {
		merged.extend(operation(chunk).await?);
	}

	Ok(merged)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn concatenates_in_chunk_order() {
		let mut calls = Vec::new();

		let doubled = chunked(1..=7, 3, |chunk: Vec<i32>| {
			calls.push(chunk.len());
			async move { Ok::<_, ()>(chunk.into_iter().map(|n| n * 2).collect()) }
		})
		.await
		.unwrap();

		assert_eq!(doubled, vec![2, 4, 6, 8, 10, 12, 14]);
		assert_eq!(calls, vec![3, 3, 1]);
	}

	#[tokio::test]
	async fn empty_input_never_calls_operation() {
		let mut called = false;

		let out = chunked(Vec::<u8>::new(), 10, |_chunk| {
			called = true;
			async { Ok::<Vec<u8>, ()>(Vec::new()) }
		})
		.await
		.unwrap();

		assert!(out.is_empty());
		assert!(!called);
	}

	#[tokio::test]
	async fn set_results_are_unioned() {
		let out = chunked_set(vec![1, 2, 3, 4, 5], 2, |chunk: Vec<i32>| async move {
			Ok::<_, ()>(chunk.into_iter().map(|n| n % 3).collect())
		})
		.await
		.unwrap();

		assert_eq!(out, HashSet::from([0, 1, 2]));
	}

	#[tokio::test]
	async fn first_error_stops_processing() {
		let mut seen = 0;

		let res = chunked(1..=6, 2, |chunk: Vec<i32>| {
			seen += 1;
			async move {
				if chunk.contains(&3) {
					Err("boom")
				} else {
					Ok(chunk)
				}
			}
		})
		.await;

		assert_eq!(res, Err("boom"));
		assert_eq!(seen, 2);
	}

	#[tokio::test]
	async fn zero_chunk_size_is_treated_as_one() {
		let out = chunked(vec!['a', 'b'], 0, |chunk: Vec<char>| async move {
			assert_eq!(chunk.len(), 1);
			Ok::<_, ()>(chunk)
		})
		.await
		.unwrap();

		assert_eq!(out, vec!['a', 'b']);
	}
}
