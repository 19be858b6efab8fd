//! Per-object bookkeeping shared by every smart object type

use bitflags::bitflags;
use protoforge_sdk::{Architype, ObjectId, NO_INDEX, NO_PARENT};

bitflags! {
    /// Flags describing how an object was constructed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u32 {
        /// Object is a prototype stored in a class cache
        const CLASS_OBJ = 0x01;
        /// Object is an instance stored in an instance cache
        const INSTANCE_OBJ = 0x02;
        /// Object was loaded from a full container
        const STANDALONE = 0x04;
        /// Object was derived from a class object
        const INHERITED = 0x08;
    }
}

/// Identity and composition data carried by every smart object
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    id: ObjectId,
    type_id: &'static str,
    architype: Architype,
    flags: ObjectFlags,
    class_obj: Option<ObjectId>,
    order_idx: i32,
    parent_idx: i32,
}

impl Default for ObjectHeader {
    fn default() -> Self {
        Self::new(ObjectId::default(), "", Architype::Component)
    }
}

impl ObjectHeader {
    pub fn new(id: ObjectId, type_id: &'static str, architype: Architype) -> Self {
        Self {
            id,
            type_id,
            architype,
            flags: ObjectFlags::empty(),
            class_obj: None,
            order_idx: NO_INDEX,
            parent_idx: NO_PARENT,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn type_id(&self) -> &'static str {
        self.type_id
    }

    pub fn architype(&self) -> Architype {
        self.architype
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn class_obj(&self) -> Option<&ObjectId> {
        self.class_obj.as_ref()
    }

    pub fn order_idx(&self) -> i32 {
        self.order_idx
    }

    pub fn parent_idx(&self) -> i32 {
        self.parent_idx
    }

    pub fn is_class_object(&self) -> bool {
        self.flags.contains(ObjectFlags::CLASS_OBJ)
    }

    /// Check if the object is a member of a component collection
    pub fn is_member(&self) -> bool {
        self.order_idx != NO_INDEX
    }

    pub(crate) fn set_flags(&mut self, flags: ObjectFlags) {
        self.flags = flags;
    }

    pub(crate) fn set_class_obj(&mut self, class_obj: Option<ObjectId>) {
        self.class_obj = class_obj;
    }

    /// Place the object in its owner's flattened component forest
    pub fn set_layout(&mut self, order_idx: i32, parent_idx: i32) {
        self.order_idx = order_idx;
        self.parent_idx = parent_idx;
    }
}
