//! Property descriptors
//!
//! A descriptor names one reflected field and carries the typed accessor
//! pair generated for it at registration time. Descriptors are metadata:
//! they are built once per type and shared by every object of that type.

use std::fmt;

use protoforge_sdk::Architype;

use super::value::PropertyValue;
use crate::error::ModelResult;
use crate::object::SmartObject;

/// Closed set of property type tags
///
/// Every reflected operation (serialize, deserialize, copy, compare,
/// prototype merge) is a `match` over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Str,
    Id,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Vec3,
    Color,
    Buffer,
    /// Reference to a texture object
    Texture,
    /// Reference to a material object
    Material,
    /// Reference to a mesh object
    Mesh,
    /// Reference to an object of any architype
    Object,
    /// Reference to a component owned by the referencing object
    Component,
    /// Ordered collection of components owned by the object
    Components,
}

impl PropertyKind {
    /// Name used in derive attributes and error messages
    pub const fn name(self) -> &'static str {
        match self {
            PropertyKind::Str => "string",
            PropertyKind::Id => "id",
            PropertyKind::Bool => "bool",
            PropertyKind::I8 => "i8",
            PropertyKind::I16 => "i16",
            PropertyKind::I32 => "i32",
            PropertyKind::I64 => "i64",
            PropertyKind::U8 => "u8",
            PropertyKind::U16 => "u16",
            PropertyKind::U32 => "u32",
            PropertyKind::U64 => "u64",
            PropertyKind::F32 => "f32",
            PropertyKind::F64 => "f64",
            PropertyKind::Vec3 => "vec3",
            PropertyKind::Color => "color",
            PropertyKind::Buffer => "buffer",
            PropertyKind::Texture => "texture",
            PropertyKind::Material => "material",
            PropertyKind::Mesh => "mesh",
            PropertyKind::Object => "object",
            PropertyKind::Component => "component",
            PropertyKind::Components => "components",
        }
    }

    /// Check if the value is the id of another object
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            PropertyKind::Texture
                | PropertyKind::Material
                | PropertyKind::Mesh
                | PropertyKind::Object
                | PropertyKind::Component
        )
    }

    /// Check if the value is a collection of owned objects
    pub const fn is_collection(self) -> bool {
        matches!(self, PropertyKind::Components)
    }

    /// Architype a referenced object must have, if restricted
    pub const fn referenced_architype(self) -> Option<Architype> {
        match self {
            PropertyKind::Texture => Some(Architype::Texture),
            PropertyKind::Material => Some(Architype::Material),
            PropertyKind::Mesh => Some(Architype::Mesh),
            PropertyKind::Component | PropertyKind::Components => Some(Architype::Component),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed getter generated for a reflected field
pub type PropertyGetter = fn(&dyn SmartObject) -> PropertyValue;

/// Typed setter generated for a reflected field
pub type PropertySetter = fn(&mut dyn SmartObject, PropertyValue) -> ModelResult<()>;

/// One reflected field of a smart object type
#[derive(Clone, Copy)]
pub struct PropertyDescriptor {
    name: &'static str,
    kind: PropertyKind,
    has_default: bool,
    getter: PropertyGetter,
    setter: PropertySetter,
}

impl PropertyDescriptor {
    pub const fn new(
        name: &'static str,
        kind: PropertyKind,
        has_default: bool,
        getter: PropertyGetter,
        setter: PropertySetter,
    ) -> Self {
        Self {
            name,
            kind,
            has_default,
            getter,
            setter,
        }
    }

    /// Container key of the field
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Check if the field may be missing from a full container
    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn is_reference(&self) -> bool {
        self.kind.is_reference()
    }

    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    /// Read the field from an object of the descriptor's type
    ///
    /// # Panics
    /// Panics if `object` is not of the type the descriptor was registered for.
    pub fn get(&self, object: &dyn SmartObject) -> PropertyValue {
        (self.getter)(object)
    }

    /// Write the field on an object of the descriptor's type
    ///
    /// # Returns
    /// `TypeMismatch` if the value variant does not fit the field type.
    ///
    /// # Panics
    /// Panics if `object` is not of the type the descriptor was registered for.
    pub fn set(&self, object: &mut dyn SmartObject, value: PropertyValue) -> ModelResult<()> {
        (self.setter)(object, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_default", &self.has_default)
            .finish()
    }
}

impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}
