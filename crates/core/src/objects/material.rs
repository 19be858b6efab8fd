use protoforge_macros::SmartObject;
use protoforge_sdk::{Color, ObjectId};

use crate::object::ObjectHeader;

/// Surface description referenced by mesh components
#[derive(Debug, Default, SmartObject)]
#[object(type_id = "material", architype = "material")]
pub struct Material {
    header: ObjectHeader,

    #[property(default)]
    color: Color,

    /// Optional albedo texture
    #[property(kind = "texture", default)]
    albedo: Option<ObjectId>,

    #[property(default)]
    roughness: f32,

    #[property(default)]
    metallic: f32,
}
