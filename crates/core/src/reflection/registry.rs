//! Reflected type metadata and the empty-object factory

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use protoforge_sdk::{Architype, ObjectId};
use tracing::{debug, warn};

use super::property::PropertyDescriptor;
use super::value::PropertyValue;
use crate::error::{ModelError, ModelResult};
use crate::object::SmartObject;

/// Constructor of an empty object with the given id
pub type CreateEmptyFn = fn(ObjectId) -> Box<dyn SmartObject>;

/// Reflection metadata of one smart object type
///
/// Built once per type (the derive keeps it in a `OnceLock`) and never
/// mutated afterwards.
pub struct ReflectionType {
    type_id: &'static str,
    architype: Architype,
    properties: Vec<PropertyDescriptor>,
    create: CreateEmptyFn,
    defaults: OnceLock<Vec<PropertyValue>>,
}

impl ReflectionType {
    pub fn new(
        type_id: &'static str,
        architype: Architype,
        properties: Vec<PropertyDescriptor>,
        create: CreateEmptyFn,
    ) -> Self {
        Self {
            type_id,
            architype,
            properties,
            create,
            defaults: OnceLock::new(),
        }
    }

    pub fn type_id(&self) -> &'static str {
        self.type_id
    }

    pub fn architype(&self) -> Architype {
        self.architype
    }

    /// Reflected properties in declaration order
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Find a property by its container key
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Create an empty object of this type
    pub fn create_empty(&self, id: ObjectId) -> Box<dyn SmartObject> {
        (self.create)(id)
    }

    /// Property values of an empty object, in property order
    pub fn default_values(&self) -> &[PropertyValue] {
        self.defaults.get_or_init(|| {
            let empty = self.create_empty(ObjectId::default());
            self.properties.iter().map(|p| p.get(&*empty)).collect()
        })
    }
}

impl fmt::Debug for ReflectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectionType")
            .field("type_id", &self.type_id)
            .field("architype", &self.architype)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Types with static reflection metadata, implemented by the derive
pub trait Reflected: SmartObject + Sized {
    fn reflection_type() -> &'static ReflectionType;
}

/// Registry of reflected types keyed by type id
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, &'static ReflectionType>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in object type
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        crate::objects::register_builtin_types(&mut registry);
        registry
    }

    /// Register a derived type
    pub fn register<T: Reflected>(&mut self) {
        self.register_type(T::reflection_type());
    }

    /// Register reflection metadata, replacing any type with the same id
    pub fn register_type(&mut self, reflection: &'static ReflectionType) {
        if self.types.insert(reflection.type_id(), reflection).is_some() {
            warn!("Reflected type '{}' registered twice", reflection.type_id());
        } else {
            debug!(
                "Registered type '{}' ({}, {} properties)",
                reflection.type_id(),
                reflection.architype(),
                reflection.properties().len()
            );
        }
    }

    /// Look up reflection metadata by type id
    pub fn get(&self, type_id: &str) -> Option<&'static ReflectionType> {
        self.types.get(type_id).copied()
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Create an empty object of a registered type
    ///
    /// # Arguments
    /// * `type_id` - Reflected type id from the container
    /// * `id` - Id given to the new object
    ///
    /// # Returns
    /// The empty object, or `UnknownType` if nothing is registered under `type_id`.
    pub fn create_empty(&self, type_id: &str, id: ObjectId) -> ModelResult<Box<dyn SmartObject>> {
        self.get(type_id)
            .map(|reflection| reflection.create_empty(id))
            .ok_or_else(|| ModelError::UnknownType(type_id.to_string()))
    }
}
