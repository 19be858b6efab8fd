//! Attribute parsing for SmartObject derive macro

use darling::{FromDeriveInput, FromField};
use syn::{DeriveInput, Ident, Type};

/// Parsed #[object(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(object), supports(struct_named))]
pub struct SmartObjectArgs {
    /// Struct identifier
    pub ident: Ident,

    /// Struct fields
    pub data: darling::ast::Data<(), PropertyArgs>,

    /// Reflected type id (e.g., "mesh_component")
    pub type_id: String,

    /// Architype name (e.g., "component")
    pub architype: String,
}

/// Parsed #[property(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(property))]
pub struct PropertyArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Container key, defaults to the field name
    #[darling(default)]
    pub rename: Option<String>,

    /// Property kind name, defaults to the natural kind of the field type
    #[darling(default)]
    pub kind: Option<String>,

    /// Field may be missing from a full container
    #[darling(default)]
    pub default: bool,

    /// Field is runtime state, not reflected
    #[darling(default)]
    pub skip: bool,
}

impl PropertyArgs {
    /// Check if this is the object header field
    pub fn is_header_field(&self) -> bool {
        self.ident.as_ref().map(|i| i == "header").unwrap_or(false)
    }

    /// Check if this field is reflected
    pub fn is_property(&self) -> bool {
        !self.skip && !self.is_header_field()
    }

    /// Container key of the property
    pub fn property_name(&self) -> String {
        match (&self.rename, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Parse a DeriveInput into SmartObjectArgs
pub fn parse_smart_object(input: &DeriveInput) -> darling::Result<SmartObjectArgs> {
    SmartObjectArgs::from_derive_input(input)
}
