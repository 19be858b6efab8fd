use protoforge_macros::SmartObject;
use protoforge_sdk::Buffer;

use crate::object::ObjectHeader;

/// Image data sampled by materials
#[derive(Debug, Default, SmartObject)]
#[object(type_id = "texture", architype = "texture")]
pub struct Texture {
    header: ObjectHeader,

    width: u32,

    height: u32,

    /// Raw pixel data
    data: Buffer,
}
