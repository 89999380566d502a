//! Embedding wire format
//!
//! Both extensions accept the textual form `[0.1,0.2,...]`. When inlined into
//! a larger statement the text is single quoted.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
	#[error("Embedding must not be empty")]
	Empty,
	#[error("Embedding component {index} is not a finite number: {value}")]
	NonFinite { index: usize, value: f32 },
	#[error("Malformed embedding literal: {0}")]
	Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
	pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
		if values.is_empty() {
			return Err(EmbeddingError::Empty);
		}

		if let Some((index, value)) = values
			.iter()
			.enumerate()
			.find(|(_, value)| !value.is_finite())
		{
			return Err(EmbeddingError::NonFinite {
				index,
				value: *value,
			});
		}

		Ok(Self(values))
	}

	pub fn as_slice(&self) -> &[f32] {
		&self.0
	}

	/// Quoted form, safe to inline since it only ever contains numbers
	pub fn to_sql_literal(&self) -> String {
		format!("'{self}'")
	}
}

impl TryFrom<Vec<f32>> for Embedding {
	type Error = EmbeddingError;

	fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
		Self::new(values)
	}
}

impl From<Embedding> for Vec<f32> {
	fn from(embedding: Embedding) -> Self {
		embedding.0
	}
}

impl fmt::Display for Embedding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[")?;
		for (i, value) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(",")?;
			}
			write!(f, "{value}")?;
		}
		f.write_str("]")
	}
}

impl FromStr for Embedding {
	type Err = EmbeddingError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let trimmed = trimmed
			.strip_prefix('\'')
			.and_then(|inner| inner.strip_suffix('\''))
			.unwrap_or(trimmed);

		let inner = trimmed
			.strip_prefix('[')
			.and_then(|inner| inner.strip_suffix(']'))
			.ok_or_else(|| EmbeddingError::Malformed(s.to_string()))?;

		if inner.trim().is_empty() {
			return Err(EmbeddingError::Empty);
		}

		let values = inner
			.split(',')
			.map(|value| {
				value
					.trim()
					.parse::<f32>()
					.map_err(|_| EmbeddingError::Malformed(s.to_string()))
			})
			.collect::<Result<Vec<_>, _>>()?;

		Self::new(values)
	}
}
