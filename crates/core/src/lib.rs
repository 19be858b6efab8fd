//! protoforge core - prototype/instance object model
//!
//! Smart objects are loaded from JSON containers as class objects
//! (prototypes) or instances, cloned from prototypes, patched, diffed
//! against their prototype and saved back with only the changed
//! properties.
//!
//! # Layers
//!
//! ```text
//! ModelManager ── packages (.apkg) / levels (.alvl)
//!      │
//!      ▼
//! constructor ── load_full / load_partial / clone_create / diff / update / save
//!      │
//!      ▼
//! ObjectConstructionContext ── pending stack, load chain, cache scopes
//!      │
//!      ▼
//! reflection ── PropertyDescriptor + per-kind handlers
//!      │
//!      ▼
//! caches ── CacheSet (one SlotMap arena per architype)
//! ```
//!
//! # Re-exports
//!
//! - [`sdk`] - Ids, architypes and plain value types
//! - [`engine`] - Container codec and resource locator

// Allow the crate to refer to itself as `protoforge_core` for the derive macro
extern crate self as protoforge_core;

pub use protoforge_engine as engine;
pub use protoforge_sdk as sdk;

pub mod caches;
pub mod config;
pub mod constructor;
pub mod context;
pub mod error;
pub mod id_generator;
pub mod level;
pub mod manager;
pub mod mapping;
pub mod object;
pub mod objects;
pub mod package;
pub mod reflection;

pub use caches::{CacheChain, CacheSet, ObjectCache, ObjectLookup};
pub use config::{ConfigError, ConfigResult, CoreConfig};
pub use constructor::{
    clone_create, diff_properties, load_container, load_full, load_partial, object_load,
    object_load_by_id, object_save, save_full, save_object, save_partial, update_object_properties,
    update_properties, SaveContext,
};
pub use context::{ConstructionMode, ObjectConstructionContext};
pub use error::{ModelError, ModelResult};
pub use id_generator::IdGenerator;
pub use level::{Level, LevelRoot};
pub use manager::ModelManager;
pub use mapping::ObjectMapping;
pub use object::{ObjectFlags, ObjectHeader, SmartObject};
pub use package::{LoadScope, Package};
pub use reflection::{PropertyDescriptor, PropertyKind, PropertyValue, Reflected, TypeRegistry};

// Re-export the derive
pub use protoforge_macros::SmartObject;
