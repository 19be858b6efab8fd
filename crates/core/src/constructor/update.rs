//! Applying patches to live objects
//!
//! Patch application is tolerant: reserved keys are skipped, unknown keys
//! are logged and skipped. A value that fails to convert aborts the update
//! before anything is written, including to component collection elements.

use protoforge_engine::ContainerMap;
use protoforge_sdk::ObjectId;
use tracing::{debug, trace, warn};

use super::{CLASS_ID_KEY, ID_KEY, TYPE_ID_KEY};
use crate::context::ObjectConstructionContext;
use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;
use crate::reflection::handlers;
use crate::reflection::{layout_key, PropertyDescriptor, PropertyValue, ReflectionType, ORDER_IDX_KEY};

/// Decoded value waiting to be written to a collection element
pub(crate) type ElementUpdate = (ObjectId, &'static PropertyDescriptor, PropertyValue);

fn is_reserved(reflection: &ReflectionType, key: &str) -> bool {
    [ID_KEY, TYPE_ID_KEY, CLASS_ID_KEY, ORDER_IDX_KEY].contains(&key)
        || reflection
            .properties()
            .iter()
            .any(|p| p.is_collection() && layout_key(p.name()) == key)
}

/// Decode every applicable patch entry
///
/// `current` reads the present value of a property from the target.
/// Decoded entries of nested collection elements land in `elements`.
fn decode_patch(
    reflection: &'static ReflectionType,
    id: &ObjectId,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
    mut current: impl FnMut(
        &PropertyDescriptor,
        &mut ObjectConstructionContext<'_>,
    ) -> ModelResult<PropertyValue>,
    elements: &mut Vec<ElementUpdate>,
) -> ModelResult<Vec<(&'static PropertyDescriptor, PropertyValue)>> {
    let mut updates = Vec::new();

    for (key, raw) in patch {
        if is_reserved(reflection, key) {
            trace!("Patch key '{}' on '{}' is reserved, skipped", key, id);
            continue;
        }

        let Some(p) = reflection.property(key) else {
            warn!(
                "Unknown property '{}' on '{}' ({}), skipped",
                key,
                id,
                reflection.type_id()
            );
            continue;
        };

        let value = current(p, ctx)?;
        if let Some(value) = handlers::update(p, value, raw, ctx, elements)? {
            updates.push((p, value));
        }
    }

    Ok(updates)
}

fn current_value(
    id: &ObjectId,
    p: &PropertyDescriptor,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<PropertyValue> {
    ctx.find_mut(id)
        .map(|o| p.get(o))
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))
}

/// Decode the patch of collection element `id` without writing it
pub(crate) fn decode_element_patch(
    id: &ObjectId,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
    elements: &mut Vec<ElementUpdate>,
) -> ModelResult<()> {
    let reflection = ctx
        .find_mut(id)
        .map(|o| o.reflection())
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;

    let own = decode_patch(
        reflection,
        id,
        patch,
        ctx,
        |p, ctx| current_value(id, p, ctx),
        elements,
    )?;
    elements.extend(own.into_iter().map(|(p, value)| (id.clone(), p, value)));
    Ok(())
}

fn apply_elements(
    elements: Vec<ElementUpdate>,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<()> {
    for (id, p, value) in elements {
        let object = ctx
            .find_mut(&id)
            .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;
        p.set(object, value)?;
    }
    Ok(())
}

/// Apply `patch` to the pending or cached instance `id`
///
/// # Returns
/// The number of properties written. Component collections are patched
/// element by element and do not count.
pub fn update_properties(
    id: &ObjectId,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<usize> {
    let reflection = ctx
        .find_mut(id)
        .map(|o| o.reflection())
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;

    let mut elements = Vec::new();
    let updates = decode_patch(
        reflection,
        id,
        patch,
        ctx,
        |p, ctx| current_value(id, p, ctx),
        &mut elements,
    )?;

    let count = updates.len();
    {
        let object = ctx
            .find_mut(id)
            .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;
        for (p, value) in updates {
            p.set(object, value)?;
        }
    }
    apply_elements(elements, ctx)?;

    debug!("Updated {} properties of '{}'", count, id);
    Ok(count)
}

/// Apply `patch` to an object that is not held by the context
pub fn update_object_properties(
    object: &mut dyn SmartObject,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<usize> {
    let reflection = object.reflection();
    let id = object.id().clone();

    let mut elements = Vec::new();
    let updates = {
        let target: &dyn SmartObject = object;
        decode_patch(
            reflection,
            &id,
            patch,
            ctx,
            |p, _| Ok(p.get(target)),
            &mut elements,
        )?
    };

    let count = updates.len();
    for (p, value) in updates {
        p.set(object, value)?;
    }
    apply_elements(elements, ctx)?;

    debug!("Updated {} properties of '{}'", count, id);
    Ok(count)
}
