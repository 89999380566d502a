//! Operations exposed to the API layer

pub mod search;
