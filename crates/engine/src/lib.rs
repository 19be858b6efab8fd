//! protoforge Engine - Collaborators of the Object Model
//!
//! This crate handles:
//! - Reading and writing structured containers (one JSON document per file)
//! - Resolving resource paths by category under a content root
//!
//! # Architecture
//!
//! The object model never touches the file system directly. Files are read
//! through [`codec::read_container`] and written through
//! [`codec::write_container`], and every package or level path comes from a
//! [`locator::ResourceLocator`].
//!
//! # Container Format
//!
//! Containers keep their key order, so an object written after a load comes
//! out with its fields in the same order it went in.

pub mod codec;
pub mod error;
pub mod locator;

pub use codec::{read_container, write_container, Container, ContainerMap};
pub use error::{CodecError, LocatorError};
pub use locator::{Category, ResourceLocator};
