//! Per-kind property operations
//!
//! Every operation is a `match` over [`PropertyKind`]. Scalar kinds go
//! through [`PropertyValue`] conversions, reference kinds resolve ids
//! through the construction context, and component collections recurse into
//! the constructor for each nested object.

use std::borrow::Cow;
use std::fs;
use std::io;

use protoforge_engine::{Container, ContainerMap};
use protoforge_sdk::{Architype, Buffer, Color, ObjectId, Vec3, NO_PARENT};
use serde_json::{Number, Value};
use tracing::trace;

use super::property::{PropertyDescriptor, PropertyKind};
use super::value::PropertyValue;
use crate::caches::ObjectLookup;
use crate::constructor::{self, ElementUpdate, SaveContext, CLASS_ID_KEY, ID_KEY};
use crate::context::ObjectConstructionContext;
use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;

/// Key of the parent index array written next to the `components` collection
pub const LAYOUT_KEY: &str = "layout";

/// Key of the position written into each collection element
pub const ORDER_IDX_KEY: &str = "order_idx";

/// Container key of the layout array belonging to a collection property
pub fn layout_key(name: &str) -> Cow<'static, str> {
    if name == "components" {
        Cow::Borrowed(LAYOUT_KEY)
    } else {
        Cow::Owned(format!("{}_{}", name, LAYOUT_KEY))
    }
}

fn malformed(p: &PropertyDescriptor, expected: &str) -> ModelError {
    ModelError::MalformedContainer(format!("'{}' must be {}", p.name(), expected))
}

// ============================================================================
// Serialize
// ============================================================================

/// Write the property of `object` into `out` under its name
pub(crate) fn serialize(
    p: &PropertyDescriptor,
    object: &dyn SmartObject,
    out: &mut ContainerMap,
    save: &SaveContext<'_>,
) -> ModelResult<()> {
    match (p.kind(), p.get(object)) {
        (PropertyKind::Components, PropertyValue::Components(ids)) => {
            serialize_components(p, &ids, out, save)
        }
        (PropertyKind::Component, PropertyValue::Ref(reference)) => {
            let encoded = encode_component_ref(reference.as_ref(), save)?;
            out.insert(p.name().to_string(), encoded);
            Ok(())
        }
        (_, value) => {
            let encoded = encode_value(p, &value, save)?;
            out.insert(p.name().to_string(), encoded);
            Ok(())
        }
    }
}

fn encode_value(
    p: &PropertyDescriptor,
    value: &PropertyValue,
    save: &SaveContext<'_>,
) -> ModelResult<Container> {
    let encoded = match value {
        PropertyValue::Str(s) => Value::String(s.clone()),
        PropertyValue::Id(id) => Value::String(id.to_string()),
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::I8(v) => Value::from(*v),
        PropertyValue::I16(v) => Value::from(*v),
        PropertyValue::I32(v) => Value::from(*v),
        PropertyValue::I64(v) => Value::from(*v),
        PropertyValue::U8(v) => Value::from(*v),
        PropertyValue::U16(v) => Value::from(*v),
        PropertyValue::U32(v) => Value::from(*v),
        PropertyValue::U64(v) => Value::from(*v),
        PropertyValue::F32(v) => encode_f32(p, *v)?,
        PropertyValue::F64(v) => encode_f64(p, *v)?,
        PropertyValue::Vec3(v) => encode_vec3(p, v)?,
        PropertyValue::Color(c) => Value::String(c.to_hex()),
        PropertyValue::Buffer(buffer) => {
            save.write_buffer(buffer)?;
            Value::String(buffer.path.clone())
        }
        PropertyValue::Ref(Some(id)) => Value::String(id.to_string()),
        PropertyValue::Ref(None) => Value::Null,
        PropertyValue::Components(_) => {
            return Err(ModelError::InvalidState(format!(
                "collection '{}' encoded as a scalar",
                p.name()
            )))
        }
    };
    Ok(encoded)
}

/// Encode an `f32` through its shortest decimal form
///
/// Widening with `as f64` would write `0.1f32` as `0.10000000149011612`.
fn encode_f32(p: &PropertyDescriptor, v: f32) -> ModelResult<Container> {
    let widened = v.to_string().parse::<f64>().unwrap_or(v as f64);
    encode_f64(p, widened)
}

fn encode_f64(p: &PropertyDescriptor, v: f64) -> ModelResult<Container> {
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| malformed(p, "a finite number"))
}

fn encode_vec3(p: &PropertyDescriptor, v: &Vec3) -> ModelResult<Container> {
    let mut map = ContainerMap::new();
    map.insert("x".to_string(), encode_f32(p, v.x)?);
    map.insert("y".to_string(), encode_f32(p, v.y)?);
    map.insert("z".to_string(), encode_f32(p, v.z)?);
    Ok(Value::Object(map))
}

fn encode_component_ref(
    reference: Option<&ObjectId>,
    save: &SaveContext<'_>,
) -> ModelResult<Container> {
    let Some(id) = reference else {
        return Ok(Value::Null);
    };

    let component = save
        .lookup()
        .find(id)
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;

    let mut map = ContainerMap::new();
    map.insert(ID_KEY.to_string(), Value::String(id.to_string()));
    if let Some(class_id) = component.class_obj() {
        map.insert(CLASS_ID_KEY.to_string(), Value::String(class_id.to_string()));
    }
    Ok(Value::Object(map))
}

fn serialize_components(
    p: &PropertyDescriptor,
    ids: &[ObjectId],
    out: &mut ContainerMap,
    save: &SaveContext<'_>,
) -> ModelResult<()> {
    let mut items = Vec::with_capacity(ids.len());
    let mut layout = Vec::with_capacity(ids.len());

    for (order_idx, id) in ids.iter().enumerate() {
        let component = save
            .lookup()
            .find(id)
            .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;

        let container = constructor::save_object(component, save)?;
        items.push(Value::Object(with_order_idx(container, order_idx)));
        layout.push(Value::from(component.parent_idx()));
    }

    out.insert(p.name().to_string(), Value::Array(items));
    out.insert(layout_key(p.name()).into_owned(), Value::Array(layout));
    Ok(())
}

/// Insert `order_idx` right after the element's id
fn with_order_idx(container: ContainerMap, order_idx: usize) -> ContainerMap {
    let mut ordered = ContainerMap::new();
    for (key, value) in container {
        let is_id = key == ID_KEY;
        ordered.insert(key, value);
        if is_id {
            ordered.insert(ORDER_IDX_KEY.to_string(), Value::from(order_idx));
        }
    }
    ordered
}

// ============================================================================
// Deserialize
// ============================================================================

/// Read the property from `container` into `object`
///
/// # Returns
/// `PropertyNotFound` if the container has no value for the property.
pub(crate) fn deserialize(
    p: &PropertyDescriptor,
    object: &mut dyn SmartObject,
    container: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<()> {
    let raw = container
        .get(p.name())
        .ok_or_else(|| ModelError::PropertyNotFound {
            object: object.id().clone(),
            property: p.name().to_string(),
        })?;

    let value = match p.kind() {
        PropertyKind::Components => {
            let layout = container.get(layout_key(p.name()).as_ref());
            PropertyValue::Components(load_components(p, raw, layout, ctx)?)
        }
        _ => decode_value(p, raw, ctx)?,
    };

    trace!("Deserialized '{}.{}'", object.id(), p.name());
    p.set(object, value)
}

fn decode_value(
    p: &PropertyDescriptor,
    raw: &Container,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<PropertyValue> {
    let value = match p.kind() {
        PropertyKind::Str => PropertyValue::Str(as_str(p, raw)?.to_string()),
        PropertyKind::Id => PropertyValue::Id(ObjectId::from(as_str(p, raw)?)),
        PropertyKind::Bool => {
            PropertyValue::Bool(raw.as_bool().ok_or_else(|| malformed(p, "a bool"))?)
        }
        PropertyKind::I8 => PropertyValue::I8(as_int(p, raw)?),
        PropertyKind::I16 => PropertyValue::I16(as_int(p, raw)?),
        PropertyKind::I32 => PropertyValue::I32(as_int(p, raw)?),
        PropertyKind::I64 => PropertyValue::I64(as_int(p, raw)?),
        PropertyKind::U8 => PropertyValue::U8(as_uint(p, raw)?),
        PropertyKind::U16 => PropertyValue::U16(as_uint(p, raw)?),
        PropertyKind::U32 => PropertyValue::U32(as_uint(p, raw)?),
        PropertyKind::U64 => PropertyValue::U64(as_uint(p, raw)?),
        PropertyKind::F32 => PropertyValue::F32(as_f32(p, raw)?),
        PropertyKind::F64 => PropertyValue::F64(as_f64(p, raw)?),
        PropertyKind::Vec3 => PropertyValue::Vec3(decode_vec3(p, raw)?),
        PropertyKind::Color => PropertyValue::Color(
            Color::from_hex(as_str(p, raw)?)
                .ok_or_else(|| malformed(p, "an RRGGBBAA hex color"))?,
        ),
        PropertyKind::Buffer => PropertyValue::Buffer(load_buffer(p, raw, ctx)?),
        PropertyKind::Texture
        | PropertyKind::Material
        | PropertyKind::Mesh
        | PropertyKind::Object => PropertyValue::Ref(resolve_reference(p, raw, ctx)?),
        PropertyKind::Component => PropertyValue::Ref(decode_component_ref(p, raw, ctx)?),
        PropertyKind::Components => {
            return Err(ModelError::InvalidState(format!(
                "collection '{}' decoded as a scalar",
                p.name()
            )))
        }
    };
    Ok(value)
}

fn as_str<'c>(p: &PropertyDescriptor, raw: &'c Container) -> ModelResult<&'c str> {
    raw.as_str().ok_or_else(|| malformed(p, "a string"))
}

fn as_f64(p: &PropertyDescriptor, raw: &Container) -> ModelResult<f64> {
    raw.as_f64().ok_or_else(|| malformed(p, "a number"))
}

fn as_f32(p: &PropertyDescriptor, raw: &Container) -> ModelResult<f32> {
    Some(as_f64(p, raw)? as f32)
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(p, "a finite f32"))
}

fn as_int<T: TryFrom<i64>>(p: &PropertyDescriptor, raw: &Container) -> ModelResult<T> {
    raw.as_i64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| malformed(p, "an integer in range"))
}

fn as_uint<T: TryFrom<u64>>(p: &PropertyDescriptor, raw: &Container) -> ModelResult<T> {
    raw.as_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| malformed(p, "an unsigned integer in range"))
}

fn decode_vec3(p: &PropertyDescriptor, raw: &Container) -> ModelResult<Vec3> {
    let map = raw
        .as_object()
        .ok_or_else(|| malformed(p, "an {x, y, z} object"))?;
    let axis = |name: &str| {
        map.get(name)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .ok_or_else(|| malformed(p, "an {x, y, z} object of finite f32"))
    };
    Ok(Vec3::new(axis("x")?, axis("y")?, axis("z")?))
}

fn load_buffer(
    p: &PropertyDescriptor,
    raw: &Container,
    ctx: &ObjectConstructionContext<'_>,
) -> ModelResult<Buffer> {
    let rel_path = as_str(p, raw)?;
    if rel_path.is_empty() {
        return Ok(Buffer::default());
    }

    let path = ctx.root().join(rel_path);
    let data = fs::read(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ModelError::PathNotFound(path.clone()),
        _ => ModelError::io(&path, e),
    })?;
    Ok(Buffer::new(rel_path, data))
}

fn check_architype(p: &PropertyDescriptor, id: &ObjectId, found: Architype) -> ModelResult<()> {
    match p.kind().referenced_architype() {
        Some(expected) if expected != found => Err(ModelError::TypeMismatch {
            expected: expected.to_string(),
            found: format!("{} '{}'", found, id),
        }),
        _ => Ok(()),
    }
}

/// Make sure `id` is visible to the context, loading it if needed
fn ensure_loaded(id: &ObjectId, ctx: &mut ObjectConstructionContext<'_>) -> ModelResult<Architype> {
    if ctx.find_object(id).is_none() {
        constructor::object_load_by_id(id, ctx)?;
    }
    ctx.find_object(id)
        .map(|o| o.architype())
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))
}

fn resolve_reference(
    p: &PropertyDescriptor,
    raw: &Container,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Option<ObjectId>> {
    if raw.is_null() {
        return Ok(None);
    }

    let id = ObjectId::from(as_str(p, raw)?);
    let architype = ensure_loaded(&id, ctx)?;
    check_architype(p, &id, architype)?;
    Ok(Some(id))
}

fn decode_component_ref(
    p: &PropertyDescriptor,
    raw: &Container,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Option<ObjectId>> {
    if raw.is_null() {
        return Ok(None);
    }

    let map = raw
        .as_object()
        .ok_or_else(|| malformed(p, "an {id, class_id} object"))?;
    let id = map
        .get(ID_KEY)
        .and_then(Value::as_str)
        .map(ObjectId::from)
        .ok_or_else(|| malformed(p, "an {id, class_id} object"))?;

    if ctx.find_object(&id).is_none() {
        if let Some(class_id) = map.get(CLASS_ID_KEY).and_then(Value::as_str) {
            constructor::clone_create(&ObjectId::from(class_id), id.clone(), ctx)?;
        }
    }

    let architype = ensure_loaded(&id, ctx)?;
    check_architype(p, &id, architype)?;
    Ok(Some(id))
}

/// Construct every element of a component collection
///
/// Elements are pushed onto the pending stack with `order_idx` set to their
/// position and `parent_idx` taken from the layout array.
fn load_components(
    p: &PropertyDescriptor,
    raw: &Container,
    layout: Option<&Container>,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Vec<ObjectId>> {
    let items = raw
        .as_array()
        .ok_or_else(|| malformed(p, "an array of objects"))?;
    let key = layout_key(p.name());
    let layout = layout
        .ok_or_else(|| {
            ModelError::MalformedContainer(format!("'{}' present without '{}'", p.name(), key))
        })?
        .as_array()
        .ok_or_else(|| ModelError::MalformedContainer(format!("'{}' must be an array", key)))?;

    if layout.len() != items.len() {
        return Err(ModelError::MalformedContainer(format!(
            "'{}' has {} elements but '{}' has {}",
            p.name(),
            items.len(),
            key,
            layout.len()
        )));
    }

    let mut ids = Vec::with_capacity(items.len());
    for (i, (item, parent)) in items.iter().zip(layout).enumerate() {
        let order_idx = i as i32;
        let parent_idx = parent
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .filter(|&v| v == NO_PARENT || (0..order_idx).contains(&v))
            .ok_or_else(|| {
                ModelError::MalformedContainer(format!(
                    "'{}[{}]' must be {} or the index of an earlier element",
                    key, i, NO_PARENT
                ))
            })?;

        let map = item
            .as_object()
            .ok_or_else(|| malformed(p, "an array of objects"))?;
        if let Some(declared) = map.get(ORDER_IDX_KEY) {
            if declared.as_i64() != Some(i as i64) {
                return Err(ModelError::MalformedContainer(format!(
                    "'{}[{}]' declares order_idx {}",
                    p.name(),
                    i,
                    declared
                )));
            }
        }

        let mut component = constructor::construct(map, ctx)?;
        check_architype(p, component.id(), component.architype())?;
        component.header_mut().set_layout(order_idx, parent_idx);

        let id = component.id().clone();
        ctx.add_pending(component, None)?;
        ids.push(id);
    }
    Ok(ids)
}

// ============================================================================
// Copy
// ============================================================================

/// Write a value taken from another object into `dst`
///
/// Owned components are cloned under ids derived from the owner; every
/// other kind is copied as is (references keep pointing at the same object).
pub(crate) fn copy(
    p: &PropertyDescriptor,
    value: PropertyValue,
    dst: &mut dyn SmartObject,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<()> {
    let owner = dst.id().clone();
    let value = match (p.kind(), value) {
        (PropertyKind::Components, PropertyValue::Components(ids)) => {
            PropertyValue::Components(clone_components(&owner, &ids, ctx)?)
        }
        (PropertyKind::Component, PropertyValue::Ref(Some(id))) => {
            PropertyValue::Ref(Some(clone_member(&owner, &id, false, ctx)?))
        }
        (_, value) => value,
    };
    p.set(dst, value)
}

fn clone_components(
    owner: &ObjectId,
    ids: &[ObjectId],
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Vec<ObjectId>> {
    ids.iter()
        .map(|id| clone_member(owner, id, true, ctx))
        .collect()
}

/// Clone an owned component for `owner`
///
/// The clone is named `<owner>/<source class id>`; the id generator picks a
/// suffixed name if that id is taken. Collection elements keep the layout of
/// their source, a single owned component becomes the root of its owner.
fn clone_member(
    owner: &ObjectId,
    src_id: &ObjectId,
    keep_layout: bool,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    let (base, order_idx, parent_idx) = ctx
        .find_any(src_id)
        .map(|c| {
            (
                c.class_obj().unwrap_or(c.id()).clone(),
                c.order_idx(),
                c.parent_idx(),
            )
        })
        .ok_or_else(|| ModelError::ObjectNotFound(src_id.clone()))?;

    let candidate = ObjectId::scoped(owner, &base);
    let new_id = if ctx.exists(&candidate) {
        ctx.generate_scoped_id(owner, &base)
    } else {
        candidate
    };

    let mut object = constructor::clone_object(src_id, new_id.clone(), ctx)?;
    if keep_layout {
        object.header_mut().set_layout(order_idx, parent_idx);
    } else {
        object.header_mut().set_layout(0, NO_PARENT);
    }
    ctx.add_pending(object, None)?;
    Ok(new_id)
}

// ============================================================================
// Compare
// ============================================================================

/// Check if the property holds the same value on both objects
///
/// Component collections are equal when every element of `dst` is an
/// unmodified clone of the matching element of `src`, carrying the id a
/// fresh clone under `dst` would derive.
pub(crate) fn compare(
    p: &PropertyDescriptor,
    src: &dyn SmartObject,
    dst: &dyn SmartObject,
    lookup: &dyn ObjectLookup,
) -> bool {
    match (p.get(src), p.get(dst)) {
        (PropertyValue::Components(a), PropertyValue::Components(b)) => {
            a.len() == b.len() && a.iter().zip(&b).all(|(s, d)| same_member(dst.id(), s, d, lookup))
        }
        (PropertyValue::Ref(a), PropertyValue::Ref(b)) if p.kind() == PropertyKind::Component => {
            match (a, b) {
                (None, None) => true,
                (Some(s), Some(d)) => same_member(dst.id(), &s, &d, lookup),
                _ => false,
            }
        }
        (a, b) => a.same_as(&b),
    }
}

fn same_member(
    owner: &ObjectId,
    src_id: &ObjectId,
    dst_id: &ObjectId,
    lookup: &dyn ObjectLookup,
) -> bool {
    if src_id == dst_id {
        return true;
    }

    let (Some(src), Some(dst)) = (lookup.find(src_id), lookup.find(dst_id)) else {
        return false;
    };

    let base = src.class_obj().unwrap_or(src.id());
    *dst_id == ObjectId::scoped(owner, base)
        && dst.class_obj() == Some(src_id)
        && src.order_idx() == dst.order_idx()
        && src.parent_idx() == dst.parent_idx()
        && constructor::diff_properties(src, dst, lookup)
            .map(|diff| diff.is_empty())
            .unwrap_or(false)
}

// ============================================================================
// Prototype merge and update
// ============================================================================

/// Take the property from `patch` if present, otherwise inherit the class value
pub(crate) fn prototype_merge(
    p: &PropertyDescriptor,
    class_value: PropertyValue,
    dst: &mut dyn SmartObject,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<()> {
    if patch.contains_key(p.name()) {
        trace!("'{}.{}' overridden by patch", dst.id(), p.name());
        return deserialize(p, dst, patch, ctx);
    }

    if p.is_collection() && patch.contains_key(layout_key(p.name()).as_ref()) {
        return Err(ModelError::MalformedContainer(format!(
            "'{}' present without '{}'",
            layout_key(p.name()),
            p.name()
        )));
    }

    copy(p, class_value, dst, ctx)
}

/// Decode a patch value for a live object
///
/// # Returns
/// The new value to store, or `None` for component collections, which patch
/// their existing elements by position. Element values are decoded into
/// `elements` and left for the caller to write.
pub(crate) fn update(
    p: &PropertyDescriptor,
    current: PropertyValue,
    raw: &Container,
    ctx: &mut ObjectConstructionContext<'_>,
    elements: &mut Vec<ElementUpdate>,
) -> ModelResult<Option<PropertyValue>> {
    match (p.kind(), current) {
        (PropertyKind::Components, PropertyValue::Components(ids)) => {
            let items = raw
                .as_array()
                .ok_or_else(|| malformed(p, "an array of patches"))?;
            if items.len() > ids.len() {
                return Err(ModelError::MalformedContainer(format!(
                    "'{}' patch has {} elements but the object has {}",
                    p.name(),
                    items.len(),
                    ids.len()
                )));
            }

            for (id, item) in ids.iter().zip(items) {
                let patch = item
                    .as_object()
                    .ok_or_else(|| malformed(p, "an array of patches"))?;
                constructor::decode_element_patch(id, patch, ctx, elements)?;
            }
            Ok(None)
        }
        _ => decode_value(p, raw, ctx).map(Some),
    }
}
