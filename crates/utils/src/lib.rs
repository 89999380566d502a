pub mod chunk;
pub mod error;

pub use chunk::{chunked, chunked_set, MAX_BIND_PARAMETERS};

/// Combines an iterator of `T` and an iterator of `Option<T>`,
/// removing any `None` values in the process
pub fn chain_optional_iter<T>(
	required: impl IntoIterator<Item = T>,
	optional: impl IntoIterator<Item = Option<T>>,
) -> Vec<T> {
	required
		.into_iter()
		.map(Some)
		.chain(optional)
		.flatten()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn optional_items_are_dropped() {
		let items = chain_optional_iter([1, 2], [None, Some(3), None, Some(4)]);
		assert_eq!(items, vec![1, 2, 3, 4]);
	}

	#[test]
	fn required_items_come_first() {
		let items = chain_optional_iter(["a"], [Some("b")]);
		assert_eq!(items, vec!["a", "b"]);
	}
}
