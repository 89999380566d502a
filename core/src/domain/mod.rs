//! Domain models shared by the search and schema layers

pub mod clip_model;

pub use clip_model::{clip_dimension, ClipModel};
