//! Saving objects to containers

use std::fs;
use std::path::Path;

use protoforge_engine::{write_container, Container, ContainerMap};
use protoforge_sdk::Buffer;
use serde_json::Value;
use tracing::{debug, trace};

use super::{diff_properties, CLASS_ID_KEY, ID_KEY, TYPE_ID_KEY};
use crate::caches::ObjectLookup;
use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;
use crate::reflection::handlers;

/// Options and lookup scope of a save operation
pub struct SaveContext<'a> {
    lookup: &'a dyn ObjectLookup,
    save_root: Option<&'a Path>,
    skip_default_values: bool,
}

impl<'a> SaveContext<'a> {
    /// Save through `lookup`, without writing buffers
    ///
    /// Class objects and owned components are resolved through `lookup`.
    pub fn new(lookup: &'a dyn ObjectLookup) -> Self {
        Self {
            lookup,
            save_root: None,
            skip_default_values: true,
        }
    }

    /// Write buffer files relative to `root`
    pub fn with_save_root(mut self, root: &'a Path) -> Self {
        self.save_root = Some(root);
        self
    }

    /// Whether full saves omit properties still equal to their declared default
    pub fn with_skip_default_values(mut self, skip: bool) -> Self {
        self.skip_default_values = skip;
        self
    }

    pub fn lookup(&self) -> &'a dyn ObjectLookup {
        self.lookup
    }

    pub fn save_root(&self) -> Option<&'a Path> {
        self.save_root
    }

    pub(crate) fn write_buffer(&self, buffer: &Buffer) -> ModelResult<()> {
        let Some(root) = self.save_root else {
            return Ok(());
        };
        if buffer.is_unset() {
            return Ok(());
        }

        let path = root.join(&buffer.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ModelError::io(parent, e))?;
        }
        fs::write(&path, &buffer.data).map_err(|e| ModelError::io(&path, e))?;
        trace!("Wrote buffer {:?} ({} bytes)", path, buffer.data.len());
        Ok(())
    }
}

/// Save every property of `object`
///
/// Properties with a declared default are left out while they still hold
/// that default, unless the context disables it.
pub fn save_full(object: &dyn SmartObject, save: &SaveContext<'_>) -> ModelResult<ContainerMap> {
    let mut out = ContainerMap::new();
    out.insert(
        TYPE_ID_KEY.to_string(),
        Value::String(object.object_type().to_string()),
    );
    out.insert(ID_KEY.to_string(), Value::String(object.id().to_string()));

    let reflection = object.reflection();
    for (p, default) in reflection
        .properties()
        .iter()
        .zip(reflection.default_values())
    {
        if save.skip_default_values && p.has_default() && p.get(object).same_as(default) {
            trace!("'{}.{}' at default, not saved", object.id(), p.name());
            continue;
        }
        handlers::serialize(p, object, &mut out, save)?;
    }

    Ok(out)
}

/// Save only the properties of `object` that differ from its class object
///
/// # Returns
/// `InvalidState` if the object has no class object.
pub fn save_partial(
    object: &dyn SmartObject,
    save: &SaveContext<'_>,
) -> ModelResult<ContainerMap> {
    let class_id = object.class_obj().ok_or_else(|| {
        ModelError::InvalidState(format!("'{}' has no class object", object.id()))
    })?;
    let class_obj = save
        .lookup()
        .find(class_id)
        .ok_or_else(|| ModelError::ObjectNotFound(class_id.clone()))?;

    let mut out = ContainerMap::new();
    out.insert(CLASS_ID_KEY.to_string(), Value::String(class_id.to_string()));
    out.insert(ID_KEY.to_string(), Value::String(object.id().to_string()));

    for p in diff_properties(class_obj, object, save.lookup())? {
        handlers::serialize(p, object, &mut out, save)?;
    }

    Ok(out)
}

/// Save partially if the object has a class object, fully otherwise
pub fn save_object(object: &dyn SmartObject, save: &SaveContext<'_>) -> ModelResult<ContainerMap> {
    if object.class_obj().is_some() {
        save_partial(object, save)
    } else {
        save_full(object, save)
    }
}

/// Save `object` to `path`
pub fn object_save(
    object: &dyn SmartObject,
    path: &Path,
    save: &SaveContext<'_>,
) -> ModelResult<()> {
    let container = Container::Object(save_object(object, save)?);
    write_container(path, &container)?;
    debug!("Saved '{}' to {:?}", object.id(), path);
    Ok(())
}
