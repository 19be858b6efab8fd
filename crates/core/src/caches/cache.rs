//! Owning object store for a single architype

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use protoforge_sdk::ObjectId;
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;

new_key_type! {
    /// Key of an object inside its owning cache
    pub struct ObjectKey;
}

struct CacheEntry {
    object: Box<dyn SmartObject>,
    source: Option<PathBuf>,
}

/// Owning store of smart objects keyed by id
///
/// Objects keep their insertion order, which is the order packages and
/// levels save them in. Entries are write-once: there is no way to replace
/// an object once inserted.
#[derive(Default)]
pub struct ObjectCache {
    objects: SlotMap<ObjectKey, CacheEntry>,
    ids: HashMap<ObjectId, ObjectKey>,
    order: Vec<ObjectKey>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an object by id
    pub fn get(&self, id: &str) -> Option<&dyn SmartObject> {
        let key = self.ids.get(id)?;
        self.objects.get(*key).map(|entry| &*entry.object)
    }

    /// Get an object by id for in-place property updates
    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn SmartObject + 'static)> {
        let key = *self.ids.get(id)?;
        let entry = self.objects.get_mut(key)?;
        Some(&mut *entry.object)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Insert an object
    ///
    /// # Arguments
    /// * `object` - Object to take ownership of
    /// * `source` - File the object was loaded from, if any
    ///
    /// # Returns
    /// The object's key, or `DuplicateId` if an object with the same id is
    /// already cached. The cache is unchanged on error.
    pub fn insert(
        &mut self,
        object: Box<dyn SmartObject>,
        source: Option<PathBuf>,
    ) -> ModelResult<ObjectKey> {
        let id = object.id().clone();
        if self.ids.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }

        let key = self.objects.insert(CacheEntry { object, source });
        self.ids.insert(id.clone(), key);
        self.order.push(key);
        trace!("Cached object '{}'", id);
        Ok(key)
    }

    /// File the object was loaded from
    pub fn source_path(&self, id: &str) -> Option<&Path> {
        let key = self.ids.get(id)?;
        self.objects.get(*key)?.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate objects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn SmartObject> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.objects.get(*key))
            .map(|entry| &*entry.object)
    }

    /// Drop every object
    pub fn clear(&mut self) {
        self.objects.clear();
        self.ids.clear();
        self.order.clear();
    }
}
