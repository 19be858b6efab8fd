//! Component types
//!
//! Components are owned by game objects and laid out as a flattened forest
//! (see `order_idx` / `parent_idx` on [`ObjectHeader`]). Their transform is
//! relative to the parent component.

use protoforge_macros::SmartObject;
use protoforge_sdk::{ObjectId, Vec3};

use crate::object::ObjectHeader;

/// Component without data, used to group other components
#[derive(Debug, Default, SmartObject)]
#[object(type_id = "component", architype = "component")]
pub struct Component {
    header: ObjectHeader,
}

/// Component with a transform
#[derive(Debug, SmartObject)]
#[object(type_id = "game_object_component", architype = "component")]
pub struct GameObjectComponent {
    header: ObjectHeader,

    #[property(default)]
    position: Vec3,

    #[property(default)]
    rotation: Vec3,

    #[property(default)]
    scale: Vec3,
}

impl Default for GameObjectComponent {
    fn default() -> Self {
        Self {
            header: ObjectHeader::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Component rendering a mesh with a material
#[derive(Debug, SmartObject)]
#[object(type_id = "mesh_component", architype = "component")]
pub struct MeshComponent {
    header: ObjectHeader,

    #[property(default)]
    position: Vec3,

    #[property(default)]
    rotation: Vec3,

    #[property(default)]
    scale: Vec3,

    #[property(kind = "material")]
    material: Option<ObjectId>,

    #[property(kind = "mesh")]
    mesh: Option<ObjectId>,

    #[property(default)]
    visible: bool,
}

impl Default for MeshComponent {
    fn default() -> Self {
        Self {
            header: ObjectHeader::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            material: None,
            mesh: None,
            visible: true,
        }
    }
}
