//! Packages
//!
//! A package is a `<name>.apkg` directory holding class objects and
//! instances, one file per object:
//!
//! ```text
//! props.apkg/
//! ├── class/
//! │   ├── textures/      stone_albedo.aobj
//! │   ├── materials/     stone.aobj
//! │   ├── meshes/        cube.aobj
//! │   ├── components/    lamp_light.acom
//! │   └── game_objects/  crate.aobj
//! └── instance/
//!     └── game_objects/  crate_red.aobj
//! ```
//!
//! Class objects load first, architype by architype, then instances. A
//! reference to an object further down the folder order is loaded on demand
//! through the package mapping. The package only keeps its objects if every
//! file loads.

use std::path::{Path, PathBuf};

use protoforge_sdk::Architype;
use tracing::{debug, info};

use crate::caches::{CacheChain, CacheSet};
use crate::constructor::{object_load, object_save, SaveContext};
use crate::context::{ConstructionMode, ObjectConstructionContext};
use crate::error::{ModelError, ModelResult};
use crate::id_generator::IdGenerator;
use crate::mapping::{ObjectMapping, CLASS_DIR, INSTANCE_DIR, OBJECT_EXTENSION, PACKAGE_EXTENSION};
use crate::object::SmartObject;
use crate::reflection::TypeRegistry;

/// Shared state a package or level load borrows from its owner
pub struct LoadScope<'a> {
    pub registry: &'a TypeRegistry,
    pub id_generator: &'a mut IdGenerator,
    /// Class objects of every other loaded package, then the global set
    pub class_global: CacheChain<'a>,
    /// Instances of every other loaded package, then the global set
    pub instance_global: CacheChain<'a>,
}

impl<'a> LoadScope<'a> {
    pub fn new(registry: &'a TypeRegistry, id_generator: &'a mut IdGenerator) -> Self {
        Self {
            registry,
            id_generator,
            class_global: CacheChain::new(),
            instance_global: CacheChain::new(),
        }
    }

    /// Start a construction context over the given local caches
    pub(crate) fn context(
        self,
        root: &Path,
        mapping: &'a ObjectMapping,
        class_local: Option<&'a mut CacheSet>,
        instance_local: &'a mut CacheSet,
    ) -> ObjectConstructionContext<'a> {
        let mut ctx = ObjectConstructionContext::new(self.registry, self.id_generator)
            .with_root(root)
            .with_mapping(mapping)
            .with_instance_local(instance_local)
            .with_class_global(self.class_global)
            .with_instance_global(self.instance_global);
        if let Some(class_local) = class_local {
            ctx = ctx.with_class_local(class_local);
        }
        ctx
    }
}

/// Load every mapped object of one scope, architype by architype
pub(crate) fn load_mapped(
    mapping: &ObjectMapping,
    root: &Path,
    is_class: bool,
    ctx: &mut ObjectConstructionContext<'_>,
) -> ModelResult<usize> {
    let mode = if is_class {
        ConstructionMode::LoadingClass
    } else {
        ConstructionMode::LoadingInstance
    };

    let mut count = 0;
    for architype in Architype::ALL {
        for entry in mapping.entries_of(is_class, architype) {
            object_load(&root.join(&entry.path), mode, ctx)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Name of a resource directory without its extension
pub(crate) fn resource_id(path: &Path, extension: &str) -> ModelResult<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(extension) {
        return Err(ModelError::InvalidState(format!(
            "{:?} is not a .{} directory",
            path, extension
        )));
    }
    if !path.is_dir() {
        return Err(ModelError::PathNotFound(path.to_path_buf()));
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| ModelError::InvalidState(format!("{:?} has no usable name", path)))
}

/// Loaded package with its class and instance caches
pub struct Package {
    id: String,
    path: PathBuf,
    mapping: ObjectMapping,
    class_local: CacheSet,
    instance_local: CacheSet,
}

impl Package {
    /// Load the package directory at `path`
    ///
    /// # Arguments
    /// * `path` - The `.apkg` directory
    /// * `scope` - Registry, id generator and the global lookup scopes
    ///
    /// # Returns
    /// The loaded package, or the first error. Nothing is cached on error.
    pub fn load(path: &Path, scope: LoadScope<'_>) -> ModelResult<Self> {
        let id = resource_id(path, PACKAGE_EXTENSION)?;
        let mapping = ObjectMapping::scan_package(path)?;
        debug!("Package '{}': {} mapped object(s)", id, mapping.len());

        let mut class_local = CacheSet::new();
        let mut instance_local = CacheSet::new();
        {
            let mut ctx =
                scope.context(path, &mapping, Some(&mut class_local), &mut instance_local);
            load_mapped(&mapping, path, true, &mut ctx)?;
            load_mapped(&mapping, path, false, &mut ctx)?;
            ctx.flush()?;
        }

        info!(
            "Loaded package '{}' ({} class, {} instance objects)",
            id,
            class_local.len(),
            instance_local.len()
        );

        Ok(Self {
            id,
            path: path.to_path_buf(),
            mapping,
            class_local,
            instance_local,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory the package was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mapping(&self) -> &ObjectMapping {
        &self.mapping
    }

    /// Class objects of this package
    pub fn class_objects(&self) -> &CacheSet {
        &self.class_local
    }

    /// Instances of this package
    pub fn instances(&self) -> &CacheSet {
        &self.instance_local
    }

    /// Find an object of this package, class objects first
    pub fn find(&self, id: &str) -> Option<&dyn SmartObject> {
        self.class_local
            .get(id)
            .or_else(|| self.instance_local.get(id))
    }

    /// Path of an object file relative to the package root
    fn relative_path(&self, object: &dyn SmartObject, is_class: bool) -> PathBuf {
        if let Some(entry) = self.mapping.get(object.id()) {
            return entry.path.clone();
        }

        let scope_dir = if is_class { CLASS_DIR } else { INSTANCE_DIR };
        Path::new(scope_dir)
            .join(object.architype().folder_name())
            .join(format!("{}.{}", object.id(), OBJECT_EXTENSION))
    }

    /// Write every top-level object of the package below `dest`
    ///
    /// Components owned by game objects are written inline with their owner.
    ///
    /// # Arguments
    /// * `dest` - Package directory to write; may be the one it was loaded from
    /// * `global` - Scope resolving class objects from other packages
    /// * `skip_default_values` - Leave default-valued properties out of full saves
    ///
    /// # Returns
    /// The number of files written.
    pub fn save(
        &self,
        dest: &Path,
        global: &CacheChain<'_>,
        skip_default_values: bool,
    ) -> ModelResult<usize> {
        let lookup = CacheChain::new()
            .with(&self.class_local)
            .with(&self.instance_local)
            .extend(global);
        let save = SaveContext::new(&lookup)
            .with_save_root(dest)
            .with_skip_default_values(skip_default_values);

        let mut count = 0;
        for (set, is_class) in [(&self.class_local, true), (&self.instance_local, false)] {
            for object in set.iter().filter(|o| !o.header().is_member()) {
                let path = dest.join(self.relative_path(object, is_class));
                object_save(object, &path, &save)?;
                count += 1;
            }
        }

        info!("Saved package '{}' to {:?} ({} files)", self.id, dest, count);
        Ok(count)
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("class_objects", &self.class_local.len())
            .field("instances", &self.instance_local.len())
            .finish()
    }
}
