//! Class and instance caches
//!
//! Caches own every finished smart object. A package or level keeps one
//! [`CacheSet`] for its class objects and one for its instances (the local
//! scopes); the model manager keeps a process-wide pair (the global scopes)
//! that outlives package unloads.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        CacheSet                          │
//! │  ┌──────────┐ ┌──────────┐ ┌────────┐ ┌─────┐ ┌───────┐  │
//! │  │ textures │ │materials │ │ meshes │ │comps│ │objects│  │
//! │  └──────────┘ └──────────┘ └────────┘ └─────┘ └───────┘  │
//! │        each: SlotMap arena + id index + insertion order  │
//! └──────────────────────────────────────────────────────────┘
//!
//!   lookup order inside a construction context:
//!   pending stack → local set → CacheChain (global scope)
//! ```

mod cache;
mod lookup;
mod set;

pub use cache::{ObjectCache, ObjectKey};
pub use lookup::{CacheChain, ObjectLookup};
pub use set::CacheSet;
