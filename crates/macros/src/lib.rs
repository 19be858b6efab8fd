//! protoforge Proc Macros
//!
//! This crate provides `#[derive(SmartObject)]`, which turns a plain struct
//! into a reflected smart object type.
//!
//! # Example
//!
//! ```ignore
//! use protoforge_core::object::ObjectHeader;
//! use protoforge_core::sdk::{ObjectId, Vec3};
//! use protoforge_core::SmartObject;
//!
//! #[derive(Debug, Default, SmartObject)]
//! #[object(type_id = "mesh_component", architype = "component")]
//! pub struct MeshComponent {
//!     header: ObjectHeader,
//!
//!     #[property(default)]
//!     position: Vec3,
//!
//!     #[property(kind = "material")]
//!     material: Option<ObjectId>,
//! }
//!
//! // Generated:
//! // - MeshComponent::TYPE_ID / MeshComponent::ARCHITYPE
//! // - MeshComponent::POSITION_PROPERTY / MeshComponent::MATERIAL_PROPERTY
//! // - component.position() / component.set_position(..)
//! // - Reflected + SmartObject implementations
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[object(type_id = "name")]` - **Required.** Reflected type id used in containers.
//! - `#[object(architype = "component")]` - **Required.** One of `texture`, `material`,
//!   `mesh`, `component`, `game_object`.
//!
//! ## Field Attributes
//!
//! Every field except `header` is reflected, in declaration order.
//!
//! - `#[property(kind = "mesh")]` - Override the property kind (needed for references).
//! - `#[property(default)]` - Field may be missing from a full container.
//! - `#[property(rename = "key")]` - Use a different container key.
//! - `#[property(skip)]` - Runtime state, not reflected.

mod parse;
mod smart_object;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for reflected smart object types
///
/// Generates typed property accessors, the reflection metadata shared by all
/// instances of the type, and the empty-object constructor used when loading.
///
/// # Requirements
///
/// - The struct has a `header: ObjectHeader` field.
/// - The struct implements `Default`; the empty object is the default value
///   with its header replaced.
/// - Every reflected field type implements `PropertyField`.
///
/// # Generated Code
///
/// For each reflected field, the macro generates:
///
/// - A getter method (`fn position(&self) -> &Vec3`)
/// - A setter method (`fn set_position(&mut self, value: Vec3)`)
/// - A constant holding the container key (`POSITION_PROPERTY`)
/// - A `PropertyDescriptor` with getter/setter closures
#[proc_macro_derive(SmartObject, attributes(object, property))]
pub fn derive_smart_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    smart_object::derive_smart_object(input).into()
}
