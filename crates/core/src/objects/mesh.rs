use protoforge_macros::SmartObject;
use protoforge_sdk::Buffer;

use crate::object::ObjectHeader;

/// Geometry referenced by mesh components
#[derive(Debug, Default, SmartObject)]
#[object(type_id = "mesh", architype = "mesh")]
pub struct Mesh {
    header: ObjectHeader,

    vertices: Buffer,

    indices: Buffer,
}
