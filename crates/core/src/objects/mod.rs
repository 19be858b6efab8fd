//! Built-in smart object types
//!
//! | type id                 | architype     | struct                  |
//! |-------------------------|---------------|-------------------------|
//! | `texture`               | texture       | [`Texture`]             |
//! | `material`              | material      | [`Material`]            |
//! | `mesh`                  | mesh          | [`Mesh`]                |
//! | `component`             | component     | [`Component`]           |
//! | `game_object_component` | component     | [`GameObjectComponent`] |
//! | `mesh_component`        | component     | [`MeshComponent`]       |
//! | `game_object`           | game_object   | [`GameObject`]          |

mod component;
mod game_object;
mod material;
mod mesh;
mod texture;

pub use component::{Component, GameObjectComponent, MeshComponent};
pub use game_object::GameObject;
pub use material::Material;
pub use mesh::Mesh;
pub use texture::Texture;

use crate::reflection::TypeRegistry;

/// Register every built-in type
pub fn register_builtin_types(registry: &mut TypeRegistry) {
    registry.register::<Texture>();
    registry.register::<Material>();
    registry.register::<Mesh>();
    registry.register::<Component>();
    registry.register::<GameObjectComponent>();
    registry.register::<MeshComponent>();
    registry.register::<GameObject>();
}
