//! Smart objects
//!
//! Every loadable entity (texture, material, mesh, component, game object)
//! is a struct deriving [`SmartObject`](protoforge_macros::SmartObject). The
//! derive wires the struct's [`ObjectHeader`] and its reflected fields into
//! the trait below, so the loaders can treat all of them as
//! `Box<dyn SmartObject>`.
//!
//! Objects never point at each other. Back-references (`class_obj`),
//! component lists and reference fields all hold [`ObjectId`]s that are
//! resolved through a cache or a construction context.

mod header;

use std::any::Any;
use std::fmt;

use protoforge_sdk::{Architype, ObjectId};

use crate::reflection::ReflectionType;

pub use header::{ObjectFlags, ObjectHeader};

/// Universal entity of the object model
pub trait SmartObject: Any + fmt::Debug {
    /// Identity and composition data
    fn header(&self) -> &ObjectHeader;

    /// Mutable identity and composition data
    fn header_mut(&mut self) -> &mut ObjectHeader;

    /// Reflection metadata shared by every object of this type
    fn reflection(&self) -> &'static ReflectionType;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn id(&self) -> &ObjectId {
        self.header().id()
    }

    /// Reflected type id, e.g. `"mesh_component"`
    fn object_type(&self) -> &'static str {
        self.header().type_id()
    }

    fn architype(&self) -> Architype {
        self.header().architype()
    }

    fn is_class_object(&self) -> bool {
        self.header().is_class_object()
    }

    /// Id of the prototype this object derives from
    fn class_obj(&self) -> Option<&ObjectId> {
        self.header().class_obj()
    }

    fn order_idx(&self) -> i32 {
        self.header().order_idx()
    }

    fn parent_idx(&self) -> i32 {
        self.header().parent_idx()
    }
}

impl<'a> dyn SmartObject + 'a {
    /// Downcast to a concrete object type
    pub fn downcast_ref<T: SmartObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete object type
    pub fn downcast_mut<T: SmartObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
