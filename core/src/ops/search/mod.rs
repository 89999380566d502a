//! Asset search operations

pub mod builder;
pub mod error;
pub mod input;
pub mod output;
pub mod relations;
pub mod repository;
pub mod vector;

pub use builder::AssetSearchBuilder;
pub use error::SearchError;
pub use input::*;
pub use output::*;
pub use repository::SearchRepository;
pub use vector::VectorSearch;
