use protoforge_macros::SmartObject;
use protoforge_sdk::{ObjectId, NO_PARENT};

use crate::caches::ObjectLookup;
use crate::object::{ObjectHeader, SmartObject as _};

/// Entity made of an ordered forest of components
#[derive(Debug, Default, SmartObject)]
#[object(type_id = "game_object", architype = "game_object")]
pub struct GameObject {
    header: ObjectHeader,

    #[property(kind = "components")]
    components: Vec<ObjectId>,
}

impl GameObject {
    /// First component without a parent
    pub fn root_component(&self, lookup: &dyn ObjectLookup) -> Option<&ObjectId> {
        self.components
            .iter()
            .find(|id| lookup.find(id).map(|c| c.parent_idx()) == Some(NO_PARENT))
    }

    /// Components whose parent is the component at `order_idx`
    pub fn children_of(&self, order_idx: i32, lookup: &dyn ObjectLookup) -> Vec<&ObjectId> {
        self.components
            .iter()
            .filter(|id| lookup.find(id).map(|c| c.parent_idx()) == Some(order_idx))
            .collect()
    }
}
