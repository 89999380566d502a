//! Database entities

pub mod asset;
pub mod asset_face;
pub mod asset_stack;
pub mod exif;
pub mod face_search;
pub mod person;
pub mod smart_info;
pub mod smart_search;

pub use asset::Entity as Asset;
pub use asset_face::Entity as AssetFace;
pub use asset_stack::Entity as AssetStack;
pub use exif::Entity as Exif;
pub use face_search::Entity as FaceSearch;
pub use person::Entity as Person;
pub use smart_info::Entity as SmartInfo;
pub use smart_search::Entity as SmartSearch;
