//! Object constructor
//!
//! Load, clone, diff, update and save algorithms over reflected objects.
//! Every operation works through an [`ObjectConstructionContext`]: finished
//! objects land on its pending stack and only reach a cache when the caller
//! flushes the context.
//!
//! # Load State Machine
//!
//! ```text
//! Unloaded ──► Parsing ──► Constructed ──► (pending) ──► Flushed
//!                 │  ▲
//!                 ▼  │ reference to an unloaded object
//!           nested Unloaded ──► …
//!
//! any state ──► Failed (pending objects of this load are rolled back)
//! ```
//!
//! # Container Shapes
//!
//! ```text
//! full:    { "type_id": "material", "id": "stone", <every property> }
//! partial: { "class_id": "stone", "id": "stone_wet", <changed properties> }
//! ```

mod save;
mod update;

use std::path::Path;

use protoforge_engine::{read_container, Container, ContainerMap};
use protoforge_sdk::ObjectId;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::caches::ObjectLookup;
use crate::context::{ConstructionMode, ObjectConstructionContext};
use crate::error::{ModelError, ModelResult};
use crate::object::{ObjectFlags, SmartObject};
use crate::reflection::handlers;
use crate::reflection::{PropertyDescriptor, PropertyValue, ReflectionType};

pub use save::{object_save, save_full, save_object, save_partial, SaveContext};
pub use update::{update_object_properties, update_properties};
pub(crate) use update::{decode_element_patch, ElementUpdate};

/// Container key of the object id
pub const ID_KEY: &str = "id";

/// Container key of the reflected type of a full object
pub const TYPE_ID_KEY: &str = "type_id";

/// Container key of the prototype of a partial object
pub const CLASS_ID_KEY: &str = "class_id";

fn container_id(container: &ContainerMap) -> ModelResult<ObjectId> {
    container
        .get(ID_KEY)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(ObjectId::from)
        .ok_or_else(|| ModelError::MalformedContainer("object without an 'id' string".into()))
}

// ============================================================================
// File loads
// ============================================================================

/// Load the object stored in `path`
///
/// Objects already visible in the scope of `mode` are not loaded twice. The
/// mode is switched for the duration of the load so that nested references
/// resolve against the right caches.
///
/// # Arguments
/// * `path` - Object file to read
/// * `mode` - Whether the file holds a class object or an instance
/// * `ctx` - Construction context receiving the object
///
/// # Returns
/// The id of the loaded object. On failure every object pushed by this load
/// is removed from the pending stack again.
pub fn object_load(
    path: &Path,
    mode: ConstructionMode,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    if !path.is_file() {
        return Err(ModelError::PathNotFound(path.to_path_buf()));
    }

    let container = read_container(path)?;
    let map = container.as_object().ok_or_else(|| {
        ModelError::MalformedContainer(format!("{:?} does not hold an object", path))
    })?;
    let id = container_id(map)?;

    let visible = match mode {
        ConstructionMode::LoadingClass => ctx.find_class_object(&id).is_some(),
        _ => ctx.find_instance_object(&id).is_some(),
    };
    if visible {
        trace!("'{}' already loaded, skipping {:?}", id, path);
        return Ok(id);
    }

    if path.file_stem().and_then(|s| s.to_str()) != Some(id.as_str()) {
        warn!("File {:?} holds object '{}'", path, id);
    }

    let previous = ctx.set_mode(mode);
    ctx.push_path(path);
    let mark = ctx.pending_mark();

    let result = construct(map, ctx)
        .and_then(|object| ctx.add_pending(object, Some(path.to_path_buf())));

    ctx.pop_path();
    ctx.set_mode(previous);

    if let Err(e) = result {
        ctx.rollback_to(mark);
        return Err(e);
    }

    debug!("Loaded '{}' from {:?}", id, path);
    Ok(id)
}

/// Load a referenced object that is not visible yet
///
/// # Returns
/// `CyclicReference` if `id` is still under construction further up the
/// stack, `ObjectNotFound` if no file for `id` can be located.
pub fn object_load_by_id(
    id: &ObjectId,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    if ctx.find_object(id).is_some() {
        return Ok(id.clone());
    }
    if ctx.is_loading(id) {
        return Err(ctx.cycle_error(id));
    }

    let (path, mode) = ctx
        .resolve_source(id)
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;
    trace!("Lazy loading '{}' from {:?}", id, path);

    let loaded = object_load(&path, mode, ctx)?;
    if &loaded != id {
        return Err(ModelError::MalformedContainer(format!(
            "{:?} holds '{}' instead of '{}'",
            path, loaded, id
        )));
    }
    Ok(loaded)
}

/// Load a prototype in class mode, whatever the current mode is
fn load_prototype(id: &ObjectId, ctx: &mut ObjectConstructionContext<'_>) -> ModelResult<()> {
    if ctx.is_loading(id) {
        return Err(ctx.cycle_error(id));
    }

    let (path, _) = ctx
        .resolve_source(id)
        .ok_or_else(|| ModelError::ObjectNotFound(id.clone()))?;
    trace!("Lazy loading prototype '{}' from {:?}", id, path);
    object_load(&path, ConstructionMode::LoadingClass, ctx)?;
    Ok(())
}

// ============================================================================
// Container loads
// ============================================================================

/// Run `f` with `id` marked as under construction
fn while_loading<T>(
    id: &ObjectId,
    ctx: &mut ObjectConstructionContext<'_>,
    f: impl FnOnce(&mut ObjectConstructionContext<'_>) -> ModelResult<T>,
) -> ModelResult<T> {
    ctx.begin_loading(id)?;
    let result = f(ctx);
    ctx.end_loading(id);
    result
}

/// Build an object from a container without pushing it
///
/// Containers with a `class_id` are partial, everything else is full.
pub(crate) fn construct(
    container: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Box<dyn SmartObject>> {
    let id = container_id(container)?;
    while_loading(&id, ctx, |ctx| match container.get(CLASS_ID_KEY) {
        Some(class_id) => {
            let class_id = class_id.as_str().map(ObjectId::from).ok_or_else(|| {
                ModelError::MalformedContainer(format!("'{}' has a non-string class_id", id))
            })?;
            construct_partial(&class_id, id.clone(), container, ctx)
        }
        None => construct_full(id.clone(), container, ctx),
    })
}

/// Build a standalone object from every property in the container
fn construct_full(
    id: ObjectId,
    container: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Box<dyn SmartObject>> {
    let type_id = container
        .get(TYPE_ID_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ModelError::MalformedContainer(format!(
                "'{}' has neither a type_id nor a class_id",
                id
            ))
        })?;

    let mut object = ctx.registry().create_empty(type_id, id)?;
    object
        .header_mut()
        .set_flags(ctx.mode().object_flags() | ObjectFlags::STANDALONE);

    for p in object.reflection().properties() {
        if !container.contains_key(p.name()) && p.has_default() {
            trace!("'{}.{}' keeps its default", object.id(), p.name());
            continue;
        }
        handlers::deserialize(p, &mut *object, container, ctx)?;
    }

    Ok(object)
}

/// Reflection and current property values of a visible object
fn snapshot(object: &dyn SmartObject) -> (&'static ReflectionType, Vec<PropertyValue>) {
    let reflection = object.reflection();
    let values = reflection
        .properties()
        .iter()
        .map(|p| p.get(object))
        .collect();
    (reflection, values)
}

/// Build an object that inherits from `class_id` and applies `patch`
fn construct_partial(
    class_id: &ObjectId,
    id: ObjectId,
    patch: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Box<dyn SmartObject>> {
    if ctx.find_class_object(class_id).is_none() {
        load_prototype(class_id, ctx)?;
    }

    let (reflection, class_values) = ctx
        .find_class_object(class_id)
        .map(snapshot)
        .ok_or_else(|| ModelError::ObjectNotFound(class_id.clone()))?;

    if let Some(type_id) = patch.get(TYPE_ID_KEY).and_then(Value::as_str) {
        if type_id != reflection.type_id() {
            return Err(ModelError::TypeMismatch {
                expected: reflection.type_id().to_string(),
                found: type_id.to_string(),
            });
        }
    }

    let mut object = reflection.create_empty(id);
    object.header_mut().set_class_obj(Some(class_id.clone()));
    object
        .header_mut()
        .set_flags(ctx.mode().object_flags() | ObjectFlags::INHERITED);

    for (p, value) in reflection.properties().iter().zip(class_values) {
        handlers::prototype_merge(p, value, &mut *object, patch, ctx)?;
    }

    Ok(object)
}

/// Load a full container and push the object onto the pending stack
///
/// Every property must be present unless the type declares a default for it.
pub fn load_full(
    container: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    let id = container_id(container)?;
    let object = while_loading(&id, ctx, |ctx| construct_full(id.clone(), container, ctx))?;
    ctx.add_pending(object, None)?;
    Ok(id)
}

/// Load a partial container and push the object onto the pending stack
///
/// The prototype named by `class_id` is loaded lazily if it is not cached.
pub fn load_partial(
    container: &ContainerMap,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    let id = container_id(container)?;
    let class_id = container
        .get(CLASS_ID_KEY)
        .and_then(Value::as_str)
        .map(ObjectId::from)
        .ok_or_else(|| ModelError::MalformedContainer(format!("'{}' has no class_id", id)))?;

    let object = while_loading(&id, ctx, |ctx| {
        construct_partial(&class_id, id.clone(), container, ctx)
    })?;
    ctx.add_pending(object, None)?;
    Ok(id)
}

/// Load a full or partial container, whichever it is
pub fn load_container(
    container: &Container,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    let map = container
        .as_object()
        .ok_or_else(|| ModelError::MalformedContainer("container is not an object".into()))?;
    let object = construct(map, ctx)?;
    let id = object.id().clone();
    ctx.add_pending(object, None)?;
    Ok(id)
}

// ============================================================================
// Clone and diff
// ============================================================================

/// Build a copy of `src_id` named `new_id` without pushing it
pub(crate) fn clone_object(
    src_id: &ObjectId,
    new_id: ObjectId,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<Box<dyn SmartObject>> {
    if ctx.find_any(src_id).is_none() {
        object_load_by_id(src_id, ctx)?;
    }

    let (reflection, values) = ctx
        .find_any(src_id)
        .map(snapshot)
        .ok_or_else(|| ModelError::ObjectNotFound(src_id.clone()))?;

    let mut object = reflection.create_empty(new_id);
    object.header_mut().set_class_obj(Some(src_id.clone()));
    object
        .header_mut()
        .set_flags(ctx.mode().object_flags() | ObjectFlags::INHERITED);

    for (p, value) in reflection.properties().iter().zip(values) {
        handlers::copy(p, value, &mut *object, ctx)?;
    }

    Ok(object)
}

/// Clone `prototype` into a new object named `new_id`
///
/// Owned components are cloned too, under ids derived from `new_id`. The
/// clone and its components are pushed onto the pending stack.
///
/// # Returns
/// `DuplicateId` if `new_id` is already taken in any scope.
pub fn clone_create(
    prototype: &ObjectId,
    new_id: ObjectId,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<ObjectId> {
    if ctx.exists(&new_id) {
        return Err(ModelError::DuplicateId(new_id));
    }

    let mark = ctx.pending_mark();
    let result = clone_object(prototype, new_id.clone(), ctx)
        .and_then(|object| ctx.add_pending(object, None));
    if let Err(e) = result {
        ctx.rollback_to(mark);
        return Err(e);
    }

    debug!("Cloned '{}' from '{}'", new_id, prototype);
    Ok(new_id)
}

/// Properties of `instance` that differ from `class_obj`
///
/// # Returns
/// `TypeMismatch` if the objects are of different reflected types.
pub fn diff_properties(
    class_obj: &dyn SmartObject,
    instance: &dyn SmartObject,
    lookup: &dyn ObjectLookup,
) -> ModelResult<Vec<&'static PropertyDescriptor>> {
    if class_obj.object_type() != instance.object_type() {
        return Err(ModelError::TypeMismatch {
            expected: class_obj.object_type().to_string(),
            found: instance.object_type().to_string(),
        });
    }

    Ok(instance
        .reflection()
        .properties()
        .iter()
        .filter(|p| !handlers::compare(p, class_obj, instance, lookup))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use protoforge_engine::codec::encode;
    use protoforge_engine::{Container, ContainerMap};
    use protoforge_sdk::{ObjectId, Vec3, NO_PARENT};
    use tempfile::TempDir;

    use super::*;
    use crate::caches::{CacheChain, CacheSet};
    use crate::id_generator::IdGenerator;
    use crate::object::ObjectHeader;
    use crate::objects::{GameObject, GameObjectComponent, Material, MeshComponent};
    use crate::reflection::TypeRegistry;

    const STONE: &str = r#"{
  "type_id": "material",
  "id": "stone",
  "color": "808080FF",
  "roughness": 0.75
}
"#;

    const WET_STONE: &str = r#"{
  "class_id": "stone",
  "id": "wet_stone",
  "roughness": 0.25
}
"#;

    const CRATE: &str = r#"{
  "type_id": "game_object",
  "id": "crate",
  "components": [
    {
      "type_id": "game_object_component",
      "id": "body",
      "order_idx": 0
    },
    {
      "type_id": "mesh_component",
      "id": "lid",
      "order_idx": 1,
      "position": {
        "x": 0.0,
        "y": 1.5,
        "z": 0.0
      },
      "material": "stone",
      "mesh": null
    }
  ],
  "layout": [
    -1,
    0
  ]
}
"#;

    const RED_CRATE: &str = r#"{
  "class_id": "crate",
  "id": "red_crate",
  "components": [
    {
      "class_id": "body",
      "id": "red_crate/body",
      "order_idx": 0
    },
    {
      "class_id": "lid",
      "id": "red_crate/lid",
      "order_idx": 1,
      "position": {
        "x": 0.0,
        "y": 2.0,
        "z": 0.0
      }
    }
  ],
  "layout": [
    -1,
    0
  ]
}
"#;

    const BLUE_CRATE: &str = r#"{
  "class_id": "crate",
  "id": "blue_crate",
  "components": [
    {
      "class_id": "body",
      "id": "blue_body",
      "order_idx": 0
    },
    {
      "class_id": "lid",
      "id": "blue_lid",
      "order_idx": 1
    }
  ],
  "layout": [
    -1,
    0
  ]
}
"#;

    /// Object with a single owned component, exercising component references
    #[derive(Debug, Default, protoforge_macros::SmartObject)]
    #[object(type_id = "socket", architype = "game_object")]
    struct Socket {
        header: ObjectHeader,

        #[property(kind = "component", default)]
        plug: Option<ObjectId>,
    }

    struct Fixture {
        registry: TypeRegistry,
        ids: IdGenerator,
        class_cache: CacheSet,
        instance_cache: CacheSet,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = TypeRegistry::with_builtin_types();
            registry.register::<Socket>();
            Self {
                registry,
                ids: IdGenerator::new(),
                class_cache: CacheSet::new(),
                instance_cache: CacheSet::new(),
            }
        }

        fn ctx(&mut self, mode: ConstructionMode) -> ObjectConstructionContext<'_> {
            let mut ctx = ObjectConstructionContext::new(&self.registry, &mut self.ids)
                .with_class_local(&mut self.class_cache)
                .with_instance_local(&mut self.instance_cache);
            ctx.set_mode(mode);
            ctx
        }

        fn lookup(&self) -> CacheChain<'_> {
            CacheChain::new()
                .with(&self.class_cache)
                .with(&self.instance_cache)
        }

        /// Load the given containers as class objects and flush them
        fn load_classes(&mut self, texts: &[&str]) {
            let mut ctx = self.ctx(ConstructionMode::LoadingClass);
            for text in texts {
                load_container(&parse(text), &mut ctx).unwrap();
            }
            ctx.flush().unwrap();
        }

        fn resave(&self, id: &str) -> String {
            let lookup = self.lookup();
            let object = lookup.get(id).unwrap();
            let saved = save_object(object, &SaveContext::new(&lookup)).unwrap();
            encode(&Container::Object(saved)).unwrap()
        }
    }

    fn parse(text: &str) -> Container {
        serde_json::from_str(text).unwrap()
    }

    fn parse_map(text: &str) -> ContainerMap {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_full_object_resaves_identically() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        let stone = fx.class_cache.get("stone").unwrap();
        assert!(stone.is_class_object());
        assert!(stone.class_obj().is_none());
        let material = stone.downcast_ref::<Material>().unwrap();
        assert_eq!(*material.roughness(), 0.75);
        assert_eq!(*material.metallic(), 0.0);

        assert_eq!(fx.resave("stone"), STONE);
    }

    #[test]
    fn test_partial_object_resaves_identically() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            load_partial(&parse_map(WET_STONE), &mut ctx).unwrap();
            ctx.flush().unwrap();
        }

        let wet = fx.instance_cache.get("wet_stone").unwrap();
        assert!(!wet.is_class_object());
        assert_eq!(wet.class_obj().map(ObjectId::as_str), Some("stone"));
        let material = wet.downcast_ref::<Material>().unwrap();
        assert_eq!(*material.roughness(), 0.25);
        assert_eq!(material.color().to_hex(), "808080FF");

        assert_eq!(fx.resave("wet_stone"), WET_STONE);
    }

    #[test]
    fn test_missing_required_property_fails() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::LoadingClass);

        let texture = parse_map(r#"{ "type_id": "texture", "id": "noise", "width": 4, "data": "" }"#);
        let err = load_full(&texture, &mut ctx).unwrap_err();

        assert!(matches!(err, ModelError::PropertyNotFound { ref property, .. } if property == "height"));
        assert_eq!(ctx.pending_len(), 0);
    }

    #[test]
    fn test_unknown_type_fails() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::LoadingClass);

        let err = load_full(&parse_map(r#"{ "type_id": "light", "id": "sun" }"#), &mut ctx).unwrap_err();
        assert!(matches!(err, ModelError::UnknownType(ref t) if t == "light"));
    }

    #[test]
    fn test_out_of_range_integer_is_malformed() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::LoadingClass);

        let texture = parse_map(
            r#"{ "type_id": "texture", "id": "noise", "width": -4, "height": 4, "data": "" }"#,
        );
        let err = load_full(&texture, &mut ctx).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_non_finite_float_is_malformed() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::LoadingClass);

        let material = parse_map(r#"{ "type_id": "material", "id": "glass", "roughness": 1e40 }"#);
        assert!(load_full(&material, &mut ctx).unwrap_err().is_malformed());

        let lid = parse_map(
            r#"{ "type_id": "mesh_component", "id": "lid", "position": { "x": 0.0, "y": -1e39, "z": 0.0 }, "material": null, "mesh": null }"#,
        );
        assert!(load_full(&lid, &mut ctx).unwrap_err().is_malformed());
        assert_eq!(ctx.pending_len(), 0);
    }

    #[test]
    fn test_component_layout_round_trip() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        let lookup = fx.lookup();
        let crate_obj = lookup.get("crate").unwrap();
        let game_object = crate_obj.downcast_ref::<GameObject>().unwrap();
        assert_eq!(game_object.components(), &vec![ObjectId::from("body"), ObjectId::from("lid")]);

        let body = lookup.get("body").unwrap();
        assert_eq!((body.order_idx(), body.parent_idx()), (0, NO_PARENT));
        let lid = lookup.get("lid").unwrap();
        assert_eq!((lid.order_idx(), lid.parent_idx()), (1, 0));
        assert_eq!(
            game_object.root_component(&lookup).map(ObjectId::as_str),
            Some("body")
        );
        let children: Vec<_> = game_object
            .children_of(0, &lookup)
            .into_iter()
            .map(ObjectId::as_str)
            .collect();
        assert_eq!(children, vec!["lid"]);
        assert!(game_object.children_of(1, &lookup).is_empty());

        let mesh = lid.downcast_ref::<MeshComponent>().unwrap();
        assert_eq!(mesh.material().as_ref().map(ObjectId::as_str), Some("stone"));
        assert_eq!(*mesh.position(), Vec3::new(0.0, 1.5, 0.0));
        assert!(*mesh.visible());

        assert_eq!(fx.resave("crate"), CRATE);
    }

    #[test]
    fn test_component_layout_is_validated() {
        let cases = [
            (r#"[0, -1]"#, "forward parent"),
            (r#"[-1]"#, "short layout"),
        ];

        for (layout, case) in cases {
            let mut fx = Fixture::new();
            let mut ctx = fx.ctx(ConstructionMode::LoadingClass);
            let text = format!(
                r#"{{ "type_id": "game_object", "id": "g", "components": [
                {{ "type_id": "component", "id": "a" }},
                {{ "type_id": "component", "id": "b" }}
            ], "layout": {} }}"#,
                layout
            );

            let err = load_full(&parse_map(&text), &mut ctx).unwrap_err();
            assert!(err.is_malformed(), "{}: {}", case, err);
        }
    }

    #[test]
    fn test_components_without_layout_are_malformed() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::LoadingClass);

        let text = r#"{ "type_id": "game_object", "id": "g", "components": [
        { "type_id": "component", "id": "a" }
    ] }"#;
        let err = load_full(&parse_map(text), &mut ctx).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_partial_game_object_overrides_component() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            load_partial(&parse_map(RED_CRATE), &mut ctx).unwrap();
            ctx.flush().unwrap();
        }

        let lookup = fx.lookup();
        let lid = lookup.get("red_crate/lid").unwrap();
        assert_eq!(lid.class_obj().map(ObjectId::as_str), Some("lid"));
        assert_eq!((lid.order_idx(), lid.parent_idx()), (1, 0));
        let mesh = lid.downcast_ref::<MeshComponent>().unwrap();
        assert_eq!(*mesh.position(), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(mesh.material().as_ref().map(ObjectId::as_str), Some("stone"));

        assert_eq!(fx.resave("red_crate"), RED_CRATE);
    }

    #[test]
    fn test_partial_keeps_custom_component_ids() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            load_partial(&parse_map(BLUE_CRATE), &mut ctx).unwrap();
            ctx.flush().unwrap();
        }

        let lookup = fx.lookup();
        let blue = lookup.get("blue_crate").unwrap();
        let game_object = blue.downcast_ref::<GameObject>().unwrap();
        assert_eq!(
            game_object.components(),
            &vec![ObjectId::from("blue_body"), ObjectId::from("blue_lid")]
        );
        let names: Vec<_> = diff_properties(lookup.get("crate").unwrap(), blue, &lookup)
            .unwrap()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["components"]);

        assert_eq!(fx.resave("blue_crate"), BLUE_CRATE);
    }

    #[test]
    fn test_clone_create_has_empty_diff() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            let id = clone_create(&ObjectId::from("crate"), ObjectId::from("crate_1"), &mut ctx).unwrap();
            assert_eq!(id, "crate_1");
            assert_eq!(ctx.pending_len(), 3);
            ctx.flush().unwrap();
        }

        let lookup = fx.lookup();
        let prototype = lookup.get("crate").unwrap();
        let clone = lookup.get("crate_1").unwrap();
        assert_eq!(clone.class_obj().map(ObjectId::as_str), Some("crate"));
        assert!(diff_properties(prototype, clone, &lookup).unwrap().is_empty());

        let game_object = clone.downcast_ref::<GameObject>().unwrap();
        assert_eq!(
            game_object.components(),
            &vec![ObjectId::from("crate_1/body"), ObjectId::from("crate_1/lid")]
        );
        let lid = lookup.get("crate_1/lid").unwrap();
        assert_eq!(lid.class_obj().map(ObjectId::as_str), Some("lid"));
        assert_eq!((lid.order_idx(), lid.parent_idx()), (1, 0));

        assert_eq!(
            fx.resave("crate_1"),
            "{\n  \"class_id\": \"crate\",\n  \"id\": \"crate_1\"\n}\n"
        );
    }

    #[test]
    fn test_clone_create_rejects_taken_id() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
        let err = clone_create(&ObjectId::from("stone"), ObjectId::from("stone"), &mut ctx).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(_)));
    }

    #[test]
    fn test_cloned_components_avoid_id_collisions() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            load_full(
                &parse_map(r#"{ "type_id": "component", "id": "crate_1/body" }"#),
                &mut ctx,
            )
            .unwrap();
            clone_create(&ObjectId::from("crate"), ObjectId::from("crate_1"), &mut ctx).unwrap();

            let ids: Vec<_> = ctx.pending_ids().map(ObjectId::as_str).collect();
            assert!(ids.contains(&"crate_1/body#2"));
            assert!(ids.contains(&"crate_1/lid"));
            ctx.flush().unwrap();
        }

        // The suffixed id is not derivable from the owner, so it is saved
        let saved = fx.resave("crate_1");
        assert!(saved.contains("\"id\": \"crate_1/body#2\""));
        assert!(saved.contains("\"id\": \"crate_1/lid\""));
    }

    #[test]
    fn test_diff_reports_changed_properties() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
            let id = clone_create(&ObjectId::from("stone"), ObjectId::from("stone_2"), &mut ctx).unwrap();
            let count = update_properties(&id, &parse_map(r#"{ "roughness": 0.5 }"#), &mut ctx).unwrap();
            assert_eq!(count, 1);
            ctx.flush().unwrap();
        }

        let lookup = fx.lookup();
        let diff = diff_properties(
            lookup.get("stone").unwrap(),
            lookup.get("stone_2").unwrap(),
            &lookup,
        )
        .unwrap();
        let names: Vec<_> = diff.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["roughness"]);
    }

    #[test]
    fn test_diff_rejects_type_mismatch() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        let lookup = fx.lookup();
        let err = diff_properties(
            lookup.get("stone").unwrap(),
            lookup.get("crate").unwrap(),
            &lookup,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
    }

    #[test]
    fn test_update_skips_unknown_and_reserved_keys() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
        let id = clone_create(&ObjectId::from("stone"), ObjectId::from("stone_2"), &mut ctx).unwrap();
        let patch = parse_map(r#"{ "shininess": 3, "id": "renamed", "metallic": 0.5 }"#);
        assert_eq!(update_properties(&id, &patch, &mut ctx).unwrap(), 1);

        let object = ctx.find_any("stone_2").unwrap();
        assert_eq!(object.id(), "stone_2");
        assert_eq!(*object.downcast_ref::<Material>().unwrap().metallic(), 0.5);
    }

    #[test]
    fn test_update_bad_value_aborts_whole_patch() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
        let id = clone_create(&ObjectId::from("stone"), ObjectId::from("stone_2"), &mut ctx).unwrap();
        let patch = parse_map(r#"{ "metallic": 0.5, "roughness": "rough" }"#);
        let err = update_properties(&id, &patch, &mut ctx).unwrap_err();
        assert!(err.is_malformed());

        let material = ctx.find_any("stone_2").unwrap().downcast_ref::<Material>().unwrap();
        assert_eq!(*material.metallic(), 0.0);
        assert_eq!(*material.roughness(), 0.75);
    }

    #[test]
    fn test_update_bad_component_value_leaves_siblings_untouched() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
        let id = clone_create(&ObjectId::from("crate"), ObjectId::from("crate_1"), &mut ctx).unwrap();
        let patch = parse_map(
            r#"{ "components": [ { "position": { "x": 9.0, "y": 9.0, "z": 9.0 } }, { "visible": "nope" } ] }"#,
        );
        let err = update_properties(&id, &patch, &mut ctx).unwrap_err();
        assert!(err.is_malformed());

        let body = ctx.find_any("crate_1/body").unwrap();
        assert_eq!(*body.downcast_ref::<GameObjectComponent>().unwrap().position(), Vec3::ZERO);
        let lid = ctx.find_any("crate_1/lid").unwrap();
        assert!(*lid.downcast_ref::<MeshComponent>().unwrap().visible());
    }

    #[test]
    fn test_update_component_collection_in_place() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE, CRATE]);

        let mut ctx = fx.ctx(ConstructionMode::LoadingInstance);
        let id = clone_create(&ObjectId::from("crate"), ObjectId::from("crate_1"), &mut ctx).unwrap();
        let patch = parse_map(r#"{ "components": [ {}, { "visible": false } ] }"#);
        update_properties(&id, &patch, &mut ctx).unwrap();

        let lid = ctx.find_any("crate_1/lid").unwrap();
        assert!(!*lid.downcast_ref::<MeshComponent>().unwrap().visible());
    }

    #[test]
    fn test_update_detached_object() {
        let mut fx = Fixture::new();
        let mut material = Material::default();
        let mut ctx = fx.ctx(ConstructionMode::Navigating);

        let patch = parse_map(r#"{ "color": "FF0000FF", "bogus": 1 }"#);
        assert_eq!(update_object_properties(&mut material, &patch, &mut ctx).unwrap(), 1);
        assert_eq!(material.color().to_hex(), "FF0000FF");
    }

    #[test]
    fn test_component_reference_clones_prototype() {
        let mut fx = Fixture::new();
        let socket = r#"{
  "type_id": "socket",
  "id": "socket",
  "plug": {
    "id": "socket/plug",
    "class_id": "plug"
  }
}
"#;
        fx.load_classes(&[r#"{ "type_id": "game_object_component", "id": "plug" }"#, socket]);

        let plug = fx.class_cache.get("socket/plug").unwrap();
        assert_eq!(plug.class_obj().map(ObjectId::as_str), Some("plug"));
        assert_eq!(fx.resave("socket"), socket);
    }

    #[test]
    fn test_lazy_load_of_sibling_prototype() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stone.aobj"), STONE).unwrap();
        fs::write(dir.path().join("wet_stone.aobj"), WET_STONE).unwrap();

        let mut fx = Fixture::new();
        {
            let mut ctx = fx.ctx(ConstructionMode::Navigating);
            let id = object_load(
                &dir.path().join("wet_stone.aobj"),
                ConstructionMode::LoadingInstance,
                &mut ctx,
            )
            .unwrap();
            assert_eq!(id, "wet_stone");
            assert_eq!(ctx.mode(), ConstructionMode::Navigating);
            ctx.flush().unwrap();
        }

        assert!(fx.class_cache.get("stone").unwrap().is_class_object());
        assert!(fx.instance_cache.exists("wet_stone"));
        assert_eq!(
            fx.class_cache.source_path("stone"),
            Some(dir.path().join("stone.aobj").as_path())
        );
    }

    #[test]
    fn test_cyclic_prototype_reference_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.aobj"),
            r#"{ "class_id": "b", "id": "a" }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.aobj"),
            r#"{ "class_id": "a", "id": "b" }"#,
        )
        .unwrap();

        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::Navigating);
        let err = object_load(&dir.path().join("a.aobj"), ConstructionMode::LoadingClass, &mut ctx)
            .unwrap_err();

        match err {
            ModelError::CyclicReference(chain) => {
                let chain: Vec<_> = chain.iter().map(ObjectId::as_str).collect();
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected a cyclic reference, got {}", other),
        }
        assert_eq!(ctx.pending_len(), 0);
    }

    #[test]
    fn test_failed_load_leaves_nothing_pending() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stone.aobj"), STONE).unwrap();
        fs::write(
            dir.path().join("broken.aobj"),
            r#"{ "type_id": "game_object", "id": "broken", "components": [
            { "type_id": "mesh_component", "id": "m", "material": "stone", "mesh": "missing" }
        ], "layout": [-1] }"#,
        )
        .unwrap();

        let mut fx = Fixture::new();
        {
            let mut ctx = fx.ctx(ConstructionMode::Navigating);
            let err = object_load(
                &dir.path().join("broken.aobj"),
                ConstructionMode::LoadingClass,
                &mut ctx,
            )
            .unwrap_err();
            assert!(matches!(err, ModelError::ObjectNotFound(ref id) if id == "missing"));
            assert_eq!(ctx.pending_len(), 0);
        }

        assert!(fx.class_cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_path_not_found() {
        let dir = TempDir::new().unwrap();
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(ConstructionMode::Navigating);

        let err = object_load(&dir.path().join("nope.aobj"), ConstructionMode::LoadingClass, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, ModelError::PathNotFound(_)));
    }

    #[test]
    fn test_buffers_are_read_and_written() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("noise.bin"), [1u8, 2, 3, 4]).unwrap();

        let mut fx = Fixture::new();
        {
            let mut ctx = fx.ctx(ConstructionMode::LoadingClass).with_root(src.path());
            load_full(
                &parse_map(r#"{ "type_id": "texture", "id": "noise", "width": 2, "height": 2, "data": "noise.bin" }"#),
                &mut ctx,
            )
            .unwrap();
            ctx.flush().unwrap();
        }

        let dst = TempDir::new().unwrap();
        let texture = fx.class_cache.get("noise").unwrap();
        let save = SaveContext::new(&fx.class_cache).with_save_root(dst.path());
        let saved = save_full(texture, &save).unwrap();

        assert_eq!(saved["data"], "noise.bin");
        assert_eq!(fs::read(dst.path().join("noise.bin")).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_default_values_can_be_written() {
        let mut fx = Fixture::new();
        fx.load_classes(&[STONE]);

        let stone = fx.class_cache.get("stone").unwrap();
        let save = SaveContext::new(&fx.class_cache).with_skip_default_values(false);
        let saved = save_full(stone, &save).unwrap();

        let keys: Vec<_> = saved.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["type_id", "id", "color", "albedo", "roughness", "metallic"]);
        assert!(saved["albedo"].is_null());
    }
}
