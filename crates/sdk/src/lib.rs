//! protoforge SDK - Plain Value Types
//!
//! This crate contains the value types shared by every layer of the object
//! model. It has no dependencies and compiles quickly, allowing parallel
//! compilation of dependent crates.
//!
//! # Modules
//!
//! - [`id`] - Interned object identifiers
//! - [`architype`] - The closed set of object categories
//! - [`math`] - Vector and color values stored in reflected fields
//! - [`buffer`] - Binary blobs persisted next to their owning package

pub mod architype;
pub mod buffer;
pub mod id;
pub mod math;

pub use architype::Architype;
pub use buffer::Buffer;
pub use id::ObjectId;
pub use math::{Color, Vec3};

/// Parent index of a component that is a root of its owner's forest
pub const NO_PARENT: i32 = -1;

/// Order index of an object that is not a member of a component collection
pub const NO_INDEX: i32 = -1;
