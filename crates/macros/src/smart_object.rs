//! SmartObject derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident};

use crate::parse::{parse_smart_object, PropertyArgs, SmartObjectArgs};

/// Map a property kind name to its `PropertyKind` variant
fn kind_variant(name: &str) -> Option<&'static str> {
    let variant = match name {
        "string" => "Str",
        "id" => "Id",
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "u64" => "U64",
        "f32" => "F32",
        "f64" => "F64",
        "vec3" => "Vec3",
        "color" => "Color",
        "buffer" => "Buffer",
        "texture" => "Texture",
        "material" => "Material",
        "mesh" => "Mesh",
        "object" => "Object",
        "component" => "Component",
        "components" => "Components",
        _ => return None,
    };
    Some(variant)
}

/// Map an architype name to its `Architype` variant
fn architype_variant(name: &str) -> Option<&'static str> {
    let variant = match name {
        "texture" => "Texture",
        "material" => "Material",
        "mesh" => "Mesh",
        "component" => "Component",
        "game_object" => "GameObject",
        _ => return None,
    };
    Some(variant)
}

/// Generate the SmartObject implementation
pub fn derive_smart_object(input: DeriveInput) -> TokenStream {
    match parse_smart_object(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: SmartObjectArgs) -> TokenStream {
    let struct_name = &args.ident;
    let type_id = &args.type_id;

    let fields = match args.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        _ => {
            return syn::Error::new_spanned(
                &args.ident,
                "SmartObject can only be derived for structs",
            )
            .to_compile_error()
        }
    };

    if !fields.iter().any(|f| f.is_header_field()) {
        return syn::Error::new_spanned(
            struct_name,
            "SmartObject requires a `header: ObjectHeader` field",
        )
        .to_compile_error();
    }

    let architype = match architype_variant(&args.architype) {
        Some(variant) => format_ident!("{}", variant),
        None => {
            return syn::Error::new_spanned(
                struct_name,
                format!("Unknown architype `{}`", args.architype),
            )
            .to_compile_error()
        }
    };

    let properties: Vec<_> = fields.iter().filter(|f| f.is_property()).collect();

    let mut descriptors = Vec::with_capacity(properties.len());
    for field in &properties {
        match generate_descriptor(struct_name, field) {
            Ok(tokens) => descriptors.push(tokens),
            Err(e) => return e.to_compile_error(),
        }
    }

    let constants = properties.iter().map(|f| generate_constant(f));
    let accessors = properties.iter().map(|f| generate_accessors(f));

    quote! {
        impl #struct_name {
            /// Reflected type id
            pub const TYPE_ID: &'static str = #type_id;

            /// Architype of every object of this type
            pub const ARCHITYPE: ::protoforge_core::sdk::Architype =
                ::protoforge_core::sdk::Architype::#architype;

            #(#constants)*

            #(#accessors)*
        }

        impl ::protoforge_core::reflection::Reflected for #struct_name {
            fn reflection_type() -> &'static ::protoforge_core::reflection::ReflectionType {
                static REFLECTION: ::std::sync::OnceLock<::protoforge_core::reflection::ReflectionType> =
                    ::std::sync::OnceLock::new();

                REFLECTION.get_or_init(|| {
                    ::protoforge_core::reflection::ReflectionType::new(
                        #struct_name::TYPE_ID,
                        #struct_name::ARCHITYPE,
                        ::std::vec![#(#descriptors),*],
                        |id: ::protoforge_core::sdk::ObjectId| -> ::std::boxed::Box<dyn ::protoforge_core::object::SmartObject> {
                            let mut object = <#struct_name as ::std::default::Default>::default();
                            object.header = ::protoforge_core::object::ObjectHeader::new(
                                id,
                                #struct_name::TYPE_ID,
                                #struct_name::ARCHITYPE,
                            );
                            ::std::boxed::Box::new(object)
                        },
                    )
                })
            }
        }

        impl ::protoforge_core::object::SmartObject for #struct_name {
            fn header(&self) -> &::protoforge_core::object::ObjectHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut ::protoforge_core::object::ObjectHeader {
                &mut self.header
            }

            fn reflection(&self) -> &'static ::protoforge_core::reflection::ReflectionType {
                <#struct_name as ::protoforge_core::reflection::Reflected>::reflection_type()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    }
}

fn generate_descriptor(struct_name: &Ident, field: &PropertyArgs) -> syn::Result<TokenStream> {
    let field_ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(&field.ty, "Property fields must be named"))?;
    let field_ty = &field.ty;
    let property_name = field.property_name();
    let has_default = field.default;

    let kind = match &field.kind {
        Some(name) => {
            let variant = kind_variant(name).ok_or_else(|| {
                syn::Error::new_spanned(field_ident, format!("Unknown property kind `{}`", name))
            })?;
            let variant = format_ident!("{}", variant);
            quote! { ::protoforge_core::reflection::PropertyKind::#variant }
        }
        None => quote! { <#field_ty as ::protoforge_core::reflection::PropertyField>::KIND },
    };

    let downcast_msg = format!(
        "`{}` accessor applied to a foreign type",
        property_name
    );

    Ok(quote! {
        ::protoforge_core::reflection::PropertyDescriptor::new(
            #property_name,
            #kind,
            #has_default,
            |object: &dyn ::protoforge_core::object::SmartObject| -> ::protoforge_core::reflection::PropertyValue {
                let this = ::protoforge_core::object::SmartObject::as_any(object)
                    .downcast_ref::<#struct_name>()
                    .expect(#downcast_msg);
                <#field_ty as ::protoforge_core::reflection::PropertyField>::to_value(&this.#field_ident)
            },
            |object: &mut dyn ::protoforge_core::object::SmartObject,
             value: ::protoforge_core::reflection::PropertyValue|
             -> ::protoforge_core::ModelResult<()> {
                let this = ::protoforge_core::object::SmartObject::as_any_mut(object)
                    .downcast_mut::<#struct_name>()
                    .expect(#downcast_msg);
                this.#field_ident =
                    <#field_ty as ::protoforge_core::reflection::PropertyField>::from_value(value)?;
                ::std::result::Result::Ok(())
            },
        )
    })
}

fn generate_constant(field: &PropertyArgs) -> TokenStream {
    let property_name = field.property_name();
    let const_name = format_ident!("{}_PROPERTY", property_name.to_uppercase());
    let doc = format!("Container key of `{}`", property_name);

    quote! {
        #[doc = #doc]
        pub const #const_name: &'static str = #property_name;
    }
}

fn generate_accessors(field: &PropertyArgs) -> TokenStream {
    let Some(field_ident) = field.ident.as_ref() else {
        return quote! {};
    };
    let field_ty = &field.ty;

    let field_name_str = field_ident.to_string();
    let clean_name = field_name_str.strip_prefix('_').unwrap_or(&field_name_str);
    let getter_name = format_ident!("{}", clean_name);
    let setter_name = format_ident!("set_{}", clean_name);

    let getter_doc = format!("Get the value of `{}`", clean_name);
    let setter_doc = format!("Set the value of `{}`", clean_name);

    quote! {
        #[doc = #getter_doc]
        #[inline]
        pub fn #getter_name(&self) -> &#field_ty {
            &self.#field_ident
        }

        #[doc = #setter_doc]
        #[inline]
        pub fn #setter_name(&mut self, value: #field_ty) {
            self.#field_ident = value;
        }
    }
}
