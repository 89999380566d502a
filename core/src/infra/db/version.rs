//! Semantic versions of the database engine and its extensions

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Field of a [`Version`] up to which two versions must agree.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VersionPrecision {
	Major,
	Minor,
	Patch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid version string: '{0}'")]
pub struct VersionParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
	pub major: u32,
	pub minor: u32,
	pub patch: u32,
}

impl Version {
	/// Nightly builds of the vector extensions report themselves as `0.0.0`
	pub const NIGHTLY: Self = Self::new(0, 0, 0);

	pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
		Self {
			major,
			minor,
			patch,
		}
	}

	pub fn is_nightly(&self) -> bool {
		*self == Self::NIGHTLY
	}

	pub fn is_older_than(&self, other: &Self) -> bool {
		self < other
	}

	pub fn is_newer_than(&self, other: &Self) -> bool {
		self > other
	}

	/// Compares only the fields down to `precision`, ignoring the rest.
	///
	/// `1.2.3` and `1.2.9` are equal at [`VersionPrecision::Minor`], while
	/// `1.3.0` is greater.
	pub fn compare_at(&self, other: &Self, precision: VersionPrecision) -> Ordering {
		let ordering = self.major.cmp(&other.major);
		if precision == VersionPrecision::Major || ordering != Ordering::Equal {
			return ordering;
		}

		let ordering = self.minor.cmp(&other.minor);
		if precision == VersionPrecision::Minor || ordering != Ordering::Equal {
			return ordering;
		}

		self.patch.cmp(&other.patch)
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
	}
}

impl FromStr for Version {
	type Err = VersionParseError;

	/// Accepts plain versions (`0.2.1`), a leading `v` (`v0.2.0`), missing
	/// trailing fields (`14` or `14.10`) and trailing build noise as reported
	/// by `SHOW server_version` (`14.10 (Debian 14.10-1.pgdg120+1)`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

		let core = trimmed
			.split(|c: char| !(c.is_ascii_digit() || c == '.'))
			.next()
			.unwrap_or_default();

		let mut fields = core.split('.').filter(|field| !field.is_empty());

		let mut next_field = |required: bool| -> Result<u32, VersionParseError> {
			match fields.next() {
				Some(field) => field
					.parse()
					.map_err(|_| VersionParseError(s.to_string())),
				None if required => Err(VersionParseError(s.to_string())),
				None => Ok(0),
			}
		};

		Ok(Self {
			major: next_field(true)?,
			minor: next_field(false)?,
			patch: next_field(false)?,
		})
	}
}

impl Serialize for Version {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Version {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}
