//! Model manager
//!
//! Owns the type registry, the id generator, the global cache scopes and
//! every loaded package and level.
//!
//! ```text
//! ┌───────────────────────── ModelManager ─────────────────────────┐
//! │ registry   locator   id_generator   class_global instance_global│
//! │                                                                │
//! │ packages: [props.apkg] [nature.apkg] ...   (class + instance)  │
//! │ levels:   [yard.alvl] ...                  (instance only)     │
//! └────────────────────────────────────────────────────────────────┘
//!
//! class lookups from a level:   every package's class set → class_global
//! class lookups from a package: every other package's set → class_global
//! ```

use std::path::Path;

use protoforge_engine::{Category, ContainerMap, ResourceLocator};
use protoforge_sdk::ObjectId;
use tracing::{debug, info};

use crate::caches::{CacheChain, CacheSet, ObjectLookup};
use crate::config::CoreConfig;
use crate::constructor::object_load;
use crate::context::{ConstructionMode, ObjectConstructionContext};
use crate::error::{ModelError, ModelResult};
use crate::id_generator::IdGenerator;
use crate::level::{Level, LevelRoot};
use crate::mapping::{LEVEL_EXTENSION, PACKAGE_EXTENSION};
use crate::object::SmartObject;
use crate::package::{resource_id, LoadScope, Package};
use crate::reflection::TypeRegistry;

fn class_chain<'a>(packages: &'a [Package], global: &'a CacheSet) -> CacheChain<'a> {
    packages
        .iter()
        .fold(CacheChain::new(), |chain, p| chain.with(p.class_objects()))
        .with(global)
}

fn instance_chain<'a>(packages: &'a [Package], global: &'a CacheSet) -> CacheChain<'a> {
    packages
        .iter()
        .fold(CacheChain::new(), |chain, p| chain.with(p.instances()))
        .with(global)
}

/// Every set of every package except `skip`, then both global sets
fn save_chain<'a>(
    packages: &'a [Package],
    skip: Option<usize>,
    class_global: &'a CacheSet,
    instance_global: &'a CacheSet,
) -> CacheChain<'a> {
    packages
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .fold(CacheChain::new(), |chain, (_, p)| {
            chain.with(p.class_objects()).with(p.instances())
        })
        .with(class_global)
        .with(instance_global)
}

fn not_loaded(kind: &str, id: &str) -> ModelError {
    ModelError::InvalidState(format!("{} '{}' is not loaded", kind, id))
}

/// Entry point for loading, editing and saving content
pub struct ModelManager {
    registry: TypeRegistry,
    locator: ResourceLocator,
    id_generator: IdGenerator,
    class_global: CacheSet,
    instance_global: CacheSet,
    packages: Vec<Package>,
    levels: Vec<Level>,
    skip_default_values: bool,
}

impl ModelManager {
    /// Create a manager with the built-in types registered
    pub fn new(locator: ResourceLocator) -> Self {
        Self {
            registry: TypeRegistry::with_builtin_types(),
            locator,
            id_generator: IdGenerator::new(),
            class_global: CacheSet::new(),
            instance_global: CacheSet::new(),
            packages: Vec::new(),
            levels: Vec::new(),
            skip_default_values: true,
        }
    }

    /// Create a manager from the core config
    ///
    /// # Arguments
    /// * `config` - Resource directories and save options
    /// * `base` - Directory a relative content root resolves against
    pub fn from_config(config: &CoreConfig, base: &Path) -> Self {
        let locator = ResourceLocator::new(config.content_root(base))
            .with_category_dir(Category::Packages, &config.resources.packages_dir)
            .with_category_dir(Category::Levels, &config.resources.levels_dir);

        let mut manager = Self::new(locator);
        manager.skip_default_values = config.save.skip_default_values;
        manager
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn set_skip_default_values(&mut self, skip: bool) {
        self.skip_default_values = skip;
    }

    // ========================================================================
    // Packages
    // ========================================================================

    fn package_index(&self, id: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.id() == id)
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.package_index(id).map(|i| &self.packages[i])
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Load the package `<id>.apkg` from the packages directory
    ///
    /// Loading a package that is already loaded returns it unchanged.
    pub fn load_package(&mut self, id: &str) -> ModelResult<&Package> {
        if let Some(index) = self.package_index(id) {
            return Ok(&self.packages[index]);
        }

        let path = self
            .locator
            .require(Category::Packages, &format!("{}.{}", id, PACKAGE_EXTENSION))?;
        self.load_package_from(&path)
    }

    /// Load a package from an explicit directory
    pub fn load_package_from(&mut self, path: &Path) -> ModelResult<&Package> {
        let id = resource_id(path, PACKAGE_EXTENSION)?;
        if let Some(index) = self.package_index(&id) {
            debug!("Package '{}' already loaded", id);
            return Ok(&self.packages[index]);
        }

        let scope = LoadScope {
            registry: &self.registry,
            id_generator: &mut self.id_generator,
            class_global: class_chain(&self.packages, &self.class_global),
            instance_global: instance_chain(&self.packages, &self.instance_global),
        };
        let package = Package::load(path, scope)?;

        let index = self.packages.len();
        self.packages.push(package);
        Ok(&self.packages[index])
    }

    /// Drop a package and every object it owns
    ///
    /// # Returns
    /// `false` if the package was not loaded, `InvalidState` if a loaded
    /// level depends on it.
    pub fn unload_package(&mut self, id: &str) -> ModelResult<bool> {
        let Some(index) = self.package_index(id) else {
            return Ok(false);
        };

        if let Some(level) = self
            .levels
            .iter()
            .find(|l| l.packages().iter().any(|p| p == id))
        {
            return Err(ModelError::InvalidState(format!(
                "package '{}' is used by level '{}'",
                id,
                level.id()
            )));
        }

        self.packages.remove(index);
        info!("Unloaded package '{}'", id);
        Ok(true)
    }

    /// Save a package to `dest`, or back to where it was loaded from
    ///
    /// # Returns
    /// The number of files written.
    pub fn save_package(&self, id: &str, dest: Option<&Path>) -> ModelResult<usize> {
        let index = self
            .package_index(id)
            .ok_or_else(|| not_loaded("package", id))?;
        let package = &self.packages[index];

        let global = save_chain(
            &self.packages,
            Some(index),
            &self.class_global,
            &self.instance_global,
        );
        package.save(
            dest.unwrap_or(package.path()),
            &global,
            self.skip_default_values,
        )
    }

    // ========================================================================
    // Levels
    // ========================================================================

    fn level_index(&self, id: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.id() == id)
    }

    pub fn level(&self, id: &str) -> Option<&Level> {
        self.level_index(id).map(|i| &self.levels[i])
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Load the level `<id>.alvl` and the packages it depends on
    pub fn load_level(&mut self, id: &str) -> ModelResult<&Level> {
        if let Some(index) = self.level_index(id) {
            return Ok(&self.levels[index]);
        }

        let path = self
            .locator
            .require(Category::Levels, &format!("{}.{}", id, LEVEL_EXTENSION))?;
        self.load_level_from(&path)
    }

    /// Load a level from an explicit directory
    pub fn load_level_from(&mut self, path: &Path) -> ModelResult<&Level> {
        let id = resource_id(path, LEVEL_EXTENSION)?;
        if let Some(index) = self.level_index(&id) {
            debug!("Level '{}' already loaded", id);
            return Ok(&self.levels[index]);
        }

        let root = LevelRoot::read(path)?;
        for package in &root.packages {
            self.load_package(package)?;
        }

        let scope = LoadScope {
            registry: &self.registry,
            id_generator: &mut self.id_generator,
            class_global: class_chain(&self.packages, &self.class_global),
            instance_global: instance_chain(&self.packages, &self.instance_global),
        };
        let level = Level::load(path, root, scope)?;

        let index = self.levels.len();
        self.levels.push(level);
        Ok(&self.levels[index])
    }

    /// Drop a level and its instances; its packages stay loaded
    pub fn unload_level(&mut self, id: &str) -> bool {
        match self.level_index(id) {
            Some(index) => {
                self.levels.remove(index);
                info!("Unloaded level '{}'", id);
                true
            }
            None => false,
        }
    }

    /// Save a level to `dest`, or back to where it was loaded from
    pub fn save_level(&self, id: &str, dest: Option<&Path>) -> ModelResult<usize> {
        let level = self.level(id).ok_or_else(|| not_loaded("level", id))?;
        let global = save_chain(
            &self.packages,
            None,
            &self.class_global,
            &self.instance_global,
        );
        level.save(
            dest.unwrap_or(level.path()),
            &global,
            self.skip_default_values,
        )
    }

    /// Clone a prototype into a loaded level
    ///
    /// # Arguments
    /// * `level_id` - Level receiving the new instance
    /// * `prototype` - Id of a class object from any loaded package
    /// * `new_id` - Id of the instance, generated from `prototype` if `None`
    pub fn spawn_object(
        &mut self,
        level_id: &str,
        prototype: &str,
        new_id: Option<&str>,
    ) -> ModelResult<ObjectId> {
        let index = self
            .level_index(level_id)
            .ok_or_else(|| not_loaded("level", level_id))?;

        let scope = LoadScope {
            registry: &self.registry,
            id_generator: &mut self.id_generator,
            class_global: class_chain(&self.packages, &self.class_global),
            instance_global: instance_chain(&self.packages, &self.instance_global),
        };
        let id = self.levels[index].spawn(prototype, new_id, scope)?;
        info!("Spawned '{}' from '{}' in level '{}'", id, prototype, level_id);
        Ok(id)
    }

    /// Patch an instance of a loaded level
    ///
    /// Unknown keys are skipped with a warning.
    pub fn update_object(
        &mut self,
        level_id: &str,
        id: &str,
        patch: &ContainerMap,
    ) -> ModelResult<usize> {
        let index = self
            .level_index(level_id)
            .ok_or_else(|| not_loaded("level", level_id))?;

        let scope = LoadScope {
            registry: &self.registry,
            id_generator: &mut self.id_generator,
            class_global: class_chain(&self.packages, &self.class_global),
            instance_global: instance_chain(&self.packages, &self.instance_global),
        };
        self.levels[index].update(id, patch, scope)
    }

    // ========================================================================
    // Global scope
    // ========================================================================

    /// Load a single object file into the global caches
    ///
    /// Global objects outlive package unloads.
    pub fn load_global(&mut self, path: &Path, mode: ConstructionMode) -> ModelResult<ObjectId> {
        let root = path.parent().unwrap_or(Path::new(""));
        let mut ctx = ObjectConstructionContext::new(&self.registry, &mut self.id_generator)
            .with_root(root)
            .with_class_local(&mut self.class_global)
            .with_instance_local(&mut self.instance_global)
            .with_class_global(
                self.packages
                    .iter()
                    .fold(CacheChain::new(), |chain, p| chain.with(p.class_objects())),
            );

        let id = object_load(path, mode, &mut ctx)?;
        ctx.flush()?;
        Ok(id)
    }

    /// Find a prototype in any package or the global scope
    pub fn find_class_object(&self, id: &str) -> Option<&dyn SmartObject> {
        class_chain(&self.packages, &self.class_global).get(id)
    }

    /// Find an object anywhere, level instances first
    pub fn find_object(&self, id: &str) -> Option<&dyn SmartObject> {
        self.levels
            .iter()
            .find_map(|l| l.find(id))
            .or_else(|| instance_chain(&self.packages, &self.instance_global).get(id))
            .or_else(|| self.find_class_object(id))
    }
}

impl ObjectLookup for ModelManager {
    fn find(&self, id: &ObjectId) -> Option<&dyn SmartObject> {
        self.find_object(id)
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("root", &self.locator.root())
            .field("types", &self.registry.len())
            .field("packages", &self.packages)
            .field("levels", &self.levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::constructor::{save_object, SaveContext};
    use crate::objects::MeshComponent;

    const STONE: &str = r#"{
  "type_id": "material",
  "id": "stone",
  "color": "808080FF",
  "roughness": 0.75
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

    const SHINY_CRATE: &str = r#"{
  "class_id": "crate",
  "id": "shiny_crate",
  "components": [
    {
      "class_id": "body",
      "id": "shiny_crate/body",
      "order_idx": 0
    },
    {
      "class_id": "lid",
      "id": "shiny_crate/lid",
      "order_idx": 1,
      "visible": false
    }
  ],
  "layout": [
    -1,
    0
  ]
}
"#;

    const YARD_ROOT: &str = r#"{
  "packages": [
    "props"
  ]
}
"#;

    const CRATE_1: &str = r#"{
  "class_id": "crate",
  "id": "crate_1"
}
"#;

    /// Content root with one package and one level
    fn content() -> TempDir {
        let dir = TempDir::new().unwrap();
        let files = [
            ("packages/props.apkg/class/materials/stone.aobj", STONE),
            ("packages/props.apkg/class/game_objects/crate.aobj", CRATE),
            ("packages/props.apkg/instance/game_objects/shiny_crate.aobj", SHINY_CRATE),
            ("levels/yard.alvl/root.cfg", YARD_ROOT),
            ("levels/yard.alvl/game_objects/crate_1.aobj", CRATE_1),
        ];
        for (rel, text) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    fn manager(root: &Path) -> ModelManager {
        ModelManager::new(ResourceLocator::new(root))
    }

    fn package_file(root: &Path, rel: &str) -> PathBuf {
        root.join("packages/props.apkg").join(rel)
    }

    #[test]
    fn test_load_package() {
        let dir = content();
        let mut manager = manager(dir.path());

        let package = manager.load_package("props").unwrap();
        assert_eq!(package.id(), "props");
        assert_eq!(package.class_objects().len(), 4);
        assert_eq!(package.instances().len(), 3);

        let shiny = manager.find_object("shiny_crate/lid").unwrap();
        assert!(!*shiny.downcast_ref::<MeshComponent>().unwrap().visible());
        assert!(manager.find_class_object("shiny_crate").is_none());
        assert!(manager.find_class_object("crate").is_some());
    }

    #[test]
    fn test_package_resave_is_byte_identical() {
        let dir = content();
        let mut manager = manager(dir.path());
        manager.load_package("props").unwrap();

        let dest = TempDir::new().unwrap();
        assert_eq!(manager.save_package("props", Some(dest.path())).unwrap(), 3);

        for rel in [
            "class/materials/stone.aobj",
            "class/game_objects/crate.aobj",
            "instance/game_objects/shiny_crate.aobj",
        ] {
            let original = fs::read_to_string(package_file(dir.path(), rel)).unwrap();
            let saved = fs::read_to_string(dest.path().join(rel)).unwrap();
            assert_eq!(saved, original, "{}", rel);
        }
        assert!(!dest.path().join("class/components").exists());
    }

    #[test]
    fn test_manager_saves_through_itself() {
        let dir = content();
        let mut manager = manager(dir.path());
        manager.load_level("yard").unwrap();

        let crate_1 = manager.find_object("crate_1").unwrap();
        let container = save_object(crate_1, &SaveContext::new(&manager)).unwrap();
        assert_eq!(container.get("class_id").unwrap(), "crate");
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_missing_package_is_not_found() {
        let dir = content();
        let mut manager = manager(dir.path());

        let err = manager.load_package("nothing").unwrap_err();
        assert!(matches!(err, ModelError::PathNotFound(_)));
    }

    #[test]
    fn test_failed_package_load_keeps_nothing() {
        let dir = content();
        fs::write(
            package_file(dir.path(), "class/game_objects/broken.aobj"),
            r#"{ "type_id": "game_object", "id": "broken" }"#,
        )
        .unwrap();

        let mut manager = manager(dir.path());
        let err = manager.load_package("props").unwrap_err();
        assert!(matches!(err, ModelError::PropertyNotFound { .. }));
        assert!(manager.packages().is_empty());
        assert!(manager.find_class_object("stone").is_none());
    }

    #[test]
    fn test_load_level_loads_dependencies() {
        let dir = content();
        let mut manager = manager(dir.path());

        let level = manager.load_level("yard").unwrap();
        assert_eq!(level.packages(), ["props".to_string()]);
        assert!(manager.package("props").is_some());

        let crate_1 = manager.find_object("crate_1").unwrap();
        assert_eq!(crate_1.class_obj().map(ObjectId::as_str), Some("crate"));
        assert!(manager.find_object("crate_1/lid").is_some());
    }

    #[test]
    fn test_level_resave_is_byte_identical() {
        let dir = content();
        let mut manager = manager(dir.path());
        manager.load_level("yard").unwrap();

        let dest = TempDir::new().unwrap();
        assert_eq!(manager.save_level("yard", Some(dest.path())).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dest.path().join("root.cfg")).unwrap(),
            YARD_ROOT
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("game_objects/crate_1.aobj")).unwrap(),
            CRATE_1
        );
    }

    #[test]
    fn test_spawn_update_and_reload() {
        let dir = content();
        {
            let mut manager = manager(dir.path());
            manager.load_level("yard").unwrap();

            let id = manager.spawn_object("yard", "crate", None).unwrap();
            assert_eq!(id, "crate#2");

            let patch: ContainerMap =
                serde_json::from_str(r#"{ "components": [ {}, { "visible": false } ], "color": 1 }"#)
                    .unwrap();
            manager.update_object("yard", "crate#2", &patch).unwrap();
            manager.save_level("yard", None).unwrap();
        }

        let mut manager = manager(dir.path());
        manager.load_level("yard").unwrap();
        let lid = manager.find_object("crate#2/lid").unwrap();
        assert_eq!(lid.class_obj().map(ObjectId::as_str), Some("lid"));
        assert!(!*lid.downcast_ref::<MeshComponent>().unwrap().visible());
    }

    #[test]
    fn test_spawn_rejects_taken_id() {
        let dir = content();
        let mut manager = manager(dir.path());
        manager.load_level("yard").unwrap();

        let err = manager
            .spawn_object("yard", "crate", Some("crate_1"))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(_)));
    }

    #[test]
    fn test_unload_package_in_use_fails() {
        let dir = content();
        let mut manager = manager(dir.path());
        manager.load_level("yard").unwrap();

        assert!(manager.unload_package("props").is_err());
        assert!(manager.unload_level("yard"));
        assert!(manager.unload_package("props").unwrap());
        assert!(!manager.unload_package("props").unwrap());
        assert!(manager.find_class_object("crate").is_none());
    }

    #[test]
    fn test_global_objects_survive_package_unload() {
        let dir = content();
        let global = dir.path().join("global.aobj");
        fs::write(
            &global,
            "{ \"type_id\": \"material\", \"id\": \"global\", \"roughness\": 0.5 }",
        )
        .unwrap();

        let mut manager = manager(dir.path());
        manager.load_package("props").unwrap();
        manager
            .load_global(&global, ConstructionMode::LoadingClass)
            .unwrap();
        manager.unload_package("props").unwrap();

        assert!(manager.find_class_object("global").is_some());
    }

    #[test]
    fn test_from_config_uses_resource_dirs() {
        let mut config = CoreConfig::default();
        config.resources.root = PathBuf::from("data");
        config.resources.packages_dir = PathBuf::from("pkgs");

        let manager = ModelManager::from_config(&config, Path::new("/opt/pf"));
        assert_eq!(
            manager.locator().resource_dir(Category::Packages),
            Path::new("/opt/pf/data/pkgs")
        );
    }
}
