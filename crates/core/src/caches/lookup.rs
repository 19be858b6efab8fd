//! Read-only object lookup across cache scopes

use protoforge_sdk::ObjectId;

use super::set::CacheSet;
use crate::object::SmartObject;

/// Anything that can resolve an id to a live object
pub trait ObjectLookup {
    fn find(&self, id: &ObjectId) -> Option<&dyn SmartObject>;

    fn contains(&self, id: &ObjectId) -> bool {
        self.find(id).is_some()
    }
}

impl ObjectLookup for CacheSet {
    fn find(&self, id: &ObjectId) -> Option<&dyn SmartObject> {
        self.get(id)
    }
}

/// Ordered list of cache sets searched front to back
///
/// Used for the global scopes of a construction context (every other loaded
/// package plus the process-wide caches) and for save-time lookups.
#[derive(Default, Clone)]
pub struct CacheChain<'a> {
    sets: Vec<&'a CacheSet>,
}

impl<'a> CacheChain<'a> {
    pub fn new() -> Self {
        Self { sets: Vec::new() }
    }

    /// Append a set searched after every set already in the chain
    pub fn with(mut self, set: &'a CacheSet) -> Self {
        self.sets.push(set);
        self
    }

    /// Append every set of another chain
    pub fn extend(mut self, other: &CacheChain<'a>) -> Self {
        self.sets.extend(other.sets.iter().copied());
        self
    }

    pub fn get(&self, id: &str) -> Option<&'a dyn SmartObject> {
        self.sets.iter().find_map(|&set| set.get(id))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.sets.iter().any(|set| set.exists(id))
    }

    pub fn sets(&self) -> &[&'a CacheSet] {
        &self.sets
    }
}

impl ObjectLookup for CacheChain<'_> {
    fn find(&self, id: &ObjectId) -> Option<&dyn SmartObject> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Material, Texture};
    use crate::reflection::Reflected;

    #[test]
    fn test_chain_searches_front_to_back() {
        let mut first = CacheSet::new();
        first
            .insert(Texture::reflection_type().create_empty(ObjectId::from("a")), None)
            .unwrap();
        let mut second = CacheSet::new();
        second
            .insert(Material::reflection_type().create_empty(ObjectId::from("a")), None)
            .unwrap();
        second
            .insert(Material::reflection_type().create_empty(ObjectId::from("b")), None)
            .unwrap();

        let chain = CacheChain::new().with(&first).with(&second);
        assert_eq!(chain.get("a").unwrap().object_type(), "texture");
        assert_eq!(chain.get("b").unwrap().object_type(), "material");
        assert!(chain.get("c").is_none());
        assert!(chain.contains(&ObjectId::from("b")));
    }

    #[test]
    fn test_extend_appends_sets() {
        let set = CacheSet::new();
        let chain = CacheChain::new().with(&set);
        let extended = CacheChain::new().extend(&chain).with(&set);
        assert_eq!(extended.sets().len(), 2);
    }
}
