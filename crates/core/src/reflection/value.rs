//! Type-erased property values
//!
//! Generated accessors convert between a field's concrete Rust type and
//! [`PropertyValue`] through the [`PropertyField`] trait. The dispatch
//! handlers only ever see `PropertyValue`s, which keeps them independent of
//! the concrete object types.

use protoforge_sdk::{Buffer, Color, ObjectId, Vec3};

use super::property::PropertyKind;
use crate::error::{ModelError, ModelResult};

/// Value of one reflected field
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Id(ObjectId),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Vec3(Vec3),
    Color(Color),
    Buffer(Buffer),
    /// Id of a referenced object, `None` when unset
    Ref(Option<ObjectId>),
    /// Ids of owned components in order
    Components(Vec<ObjectId>),
}

impl PropertyValue {
    /// Short name of the variant for error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            PropertyValue::Str(_) => "string",
            PropertyValue::Id(_) => "id",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::I8(_) => "i8",
            PropertyValue::I16(_) => "i16",
            PropertyValue::I32(_) => "i32",
            PropertyValue::I64(_) => "i64",
            PropertyValue::U8(_) => "u8",
            PropertyValue::U16(_) => "u16",
            PropertyValue::U32(_) => "u32",
            PropertyValue::U64(_) => "u64",
            PropertyValue::F32(_) => "f32",
            PropertyValue::F64(_) => "f64",
            PropertyValue::Vec3(_) => "vec3",
            PropertyValue::Color(_) => "color",
            PropertyValue::Buffer(_) => "buffer",
            PropertyValue::Ref(_) => "reference",
            PropertyValue::Components(_) => "components",
        }
    }

    /// Exact equality, comparing floats by their bit patterns
    ///
    /// Unlike `==`, a NaN equals itself and `0.0` differs from `-0.0`, so a
    /// value read back from a file compares equal to the value written.
    pub fn same_as(&self, other: &PropertyValue) -> bool {
        fn vec3_bits(v: &Vec3) -> [u32; 3] {
            [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
        }
        fn color_bits(c: &Color) -> [u32; 4] {
            [c.r.to_bits(), c.g.to_bits(), c.b.to_bits(), c.a.to_bits()]
        }

        match (self, other) {
            (PropertyValue::F32(a), PropertyValue::F32(b)) => a.to_bits() == b.to_bits(),
            (PropertyValue::F64(a), PropertyValue::F64(b)) => a.to_bits() == b.to_bits(),
            (PropertyValue::Vec3(a), PropertyValue::Vec3(b)) => vec3_bits(a) == vec3_bits(b),
            (PropertyValue::Color(a), PropertyValue::Color(b)) => color_bits(a) == color_bits(b),
            _ => self == other,
        }
    }
}

/// Conversion between a field type and [`PropertyValue`]
pub trait PropertyField: Sized {
    /// Kind used when the field does not name one explicitly
    const KIND: PropertyKind;

    fn to_value(&self) -> PropertyValue;

    fn from_value(value: PropertyValue) -> ModelResult<Self>;
}

fn mismatch(expected: &str, found: &PropertyValue) -> ModelError {
    ModelError::TypeMismatch {
        expected: expected.to_string(),
        found: found.variant_name().to_string(),
    }
}

macro_rules! impl_property_field {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl PropertyField for $ty {
            const KIND: PropertyKind = PropertyKind::$kind;

            fn to_value(&self) -> PropertyValue {
                PropertyValue::$variant(self.clone())
            }

            fn from_value(value: PropertyValue) -> ModelResult<Self> {
                match value {
                    PropertyValue::$variant(v) => Ok(v),
                    other => Err(mismatch(PropertyKind::$kind.name(), &other)),
                }
            }
        }
    };
}

impl_property_field!(String, Str, Str);
impl_property_field!(ObjectId, Id, Id);
impl_property_field!(bool, Bool, Bool);
impl_property_field!(i8, I8, I8);
impl_property_field!(i16, I16, I16);
impl_property_field!(i32, I32, I32);
impl_property_field!(i64, I64, I64);
impl_property_field!(u8, U8, U8);
impl_property_field!(u16, U16, U16);
impl_property_field!(u32, U32, U32);
impl_property_field!(u64, U64, U64);
impl_property_field!(f32, F32, F32);
impl_property_field!(f64, F64, F64);
impl_property_field!(Vec3, Vec3, Vec3);
impl_property_field!(Color, Color, Color);
impl_property_field!(Buffer, Buffer, Buffer);
impl_property_field!(Option<ObjectId>, Object, Ref);
impl_property_field!(Vec<ObjectId>, Components, Components);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversion() {
        let value = 42u32.to_value();
        assert_eq!(value, PropertyValue::U32(42));
        assert_eq!(u32::from_value(value).unwrap(), 42);
    }

    #[test]
    fn test_field_conversion_mismatch() {
        let err = u32::from_value(PropertyValue::Str("nope".into())).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
    }

    #[test]
    fn test_default_kinds() {
        assert_eq!(<Option<ObjectId> as PropertyField>::KIND, PropertyKind::Object);
        assert_eq!(<Vec<ObjectId> as PropertyField>::KIND, PropertyKind::Components);
        assert_eq!(<Vec3 as PropertyField>::KIND, PropertyKind::Vec3);
    }

    #[test]
    fn test_same_as_is_bitwise_for_floats() {
        assert!(PropertyValue::F32(f32::NAN).same_as(&PropertyValue::F32(f32::NAN)));
        assert!(!PropertyValue::F32(0.0).same_as(&PropertyValue::F32(-0.0)));
        assert!(PropertyValue::Vec3(Vec3::ONE).same_as(&PropertyValue::Vec3(Vec3::ONE)));
        assert!(!PropertyValue::I32(1).same_as(&PropertyValue::I64(1)));
    }
}
