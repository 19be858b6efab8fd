//! Reflection dispatch table
//!
//! Each smart object type carries a static [`ReflectionType`]: its type id,
//! its architype, an empty-object factory and one [`PropertyDescriptor`] per
//! reflected field. Loaders iterate the descriptors and dispatch on
//! [`PropertyKind`] instead of calling into the concrete type.
//!
//! ```text
//! ┌────────────────────┐      get/set       ┌──────────────────┐
//! │ PropertyDescriptor │ ◄────────────────► │ dyn SmartObject  │
//! │  name, kind        │   PropertyValue    │  (concrete T)    │
//! └─────────┬──────────┘                    └──────────────────┘
//!           │ kind
//!           ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │ handlers: serialize / deserialize / copy / compare /        │
//! │           prototype_merge / update                          │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub(crate) mod handlers;
mod property;
mod registry;
mod value;

pub use handlers::{layout_key, LAYOUT_KEY, ORDER_IDX_KEY};
pub use property::{PropertyDescriptor, PropertyGetter, PropertyKind, PropertySetter};
pub use registry::{CreateEmptyFn, Reflected, ReflectionType, TypeRegistry};
pub use value::{PropertyField, PropertyValue};
