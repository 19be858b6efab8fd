//! One cache per architype

use std::path::{Path, PathBuf};

use protoforge_sdk::Architype;

use super::cache::{ObjectCache, ObjectKey};
use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;

/// Group of caches, one per architype
///
/// Ids are unique across the whole set, not only within one architype.
#[derive(Default)]
pub struct CacheSet {
    caches: [ObjectCache; Architype::COUNT],
}

impl CacheSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding one architype
    pub fn cache(&self, architype: Architype) -> &ObjectCache {
        &self.caches[architype.index()]
    }

    pub fn get(&self, id: &str) -> Option<&dyn SmartObject> {
        self.caches.iter().find_map(|cache| cache.get(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn SmartObject + 'static)> {
        self.caches
            .iter_mut()
            .find(|cache| cache.exists(id))
            .and_then(|cache| cache.get_mut(id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.caches.iter().any(|cache| cache.exists(id))
    }

    /// Insert an object into the cache of its architype
    ///
    /// # Returns
    /// `DuplicateId` if any cache of the set already holds the id.
    pub fn insert(
        &mut self,
        object: Box<dyn SmartObject>,
        source: Option<PathBuf>,
    ) -> ModelResult<ObjectKey> {
        if self.exists(object.id()) {
            return Err(ModelError::DuplicateId(object.id().clone()));
        }
        self.caches[object.architype().index()].insert(object, source)
    }

    /// File an object was loaded from
    pub fn source_path(&self, id: &str) -> Option<&Path> {
        self.caches.iter().find_map(|cache| cache.source_path(id))
    }

    pub fn len(&self) -> usize {
        self.caches.iter().map(ObjectCache::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.iter().all(ObjectCache::is_empty)
    }

    /// Iterate every object, architype by architype in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn SmartObject> + '_ {
        self.caches.iter().flat_map(|cache| cache.iter())
    }

    /// Drop every object
    pub fn clear(&mut self) {
        for cache in &mut self.caches {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use protoforge_sdk::ObjectId;

    use super::*;
    use crate::objects::{Material, Texture};
    use crate::reflection::Reflected;

    #[test]
    fn test_insert_routes_by_architype() {
        let mut set = CacheSet::new();
        set.insert(
            Texture::reflection_type().create_empty(ObjectId::from("noise")),
            None,
        )
        .unwrap();

        assert_eq!(set.cache(Architype::Texture).len(), 1);
        assert!(set.cache(Architype::Material).is_empty());
        assert_eq!(set.get("noise").unwrap().object_type(), "texture");
    }

    #[test]
    fn test_ids_are_unique_across_architypes() {
        let mut set = CacheSet::new();
        set.insert(
            Texture::reflection_type().create_empty(ObjectId::from("stone")),
            None,
        )
        .unwrap();

        let err = set
            .insert(
                Material::reflection_type().create_empty(ObjectId::from("stone")),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(_)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_mut_finds_object() {
        let mut set = CacheSet::new();
        set.insert(
            Material::reflection_type().create_empty(ObjectId::from("stone")),
            None,
        )
        .unwrap();

        let object = set.get_mut("stone").unwrap();
        object.header_mut().set_layout(3, 1);
        assert_eq!(set.get("stone").unwrap().order_idx(), 3);
        assert!(set.get_mut("missing").is_none());
    }
}
