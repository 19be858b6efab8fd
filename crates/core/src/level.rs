//! Levels
//!
//! A level is a `<name>.alvl` directory of instances plus a `root.cfg`
//! naming the packages its instances derive from:
//!
//! ```text
//! yard.alvl/
//! ├── root.cfg           { "packages": ["props"] }
//! ├── components/        lamp_light.acom
//! └── game_objects/      crate_1.aobj
//! ```
//!
//! Levels have no class scope of their own. Prototypes come from the
//! packages listed in `root.cfg`, which the model manager loads first.

use std::path::{Path, PathBuf};

use protoforge_engine::{read_container, write_container, Container, ContainerMap};
use protoforge_sdk::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::caches::{CacheChain, CacheSet};
use crate::constructor::{self, object_save, SaveContext};
use crate::context::{ConstructionMode, ObjectConstructionContext};
use crate::error::{ModelError, ModelResult};
use crate::mapping::{ObjectMapping, LEVEL_EXTENSION, OBJECT_EXTENSION};
use crate::object::SmartObject;
use crate::package::{load_mapped, resource_id, LoadScope};

/// File holding the level's package list
pub const LEVEL_ROOT_FILE: &str = "root.cfg";

/// Contents of `root.cfg`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRoot {
    /// Ids of the packages the level depends on, in load order
    #[serde(default)]
    pub packages: Vec<String>,
}

impl LevelRoot {
    /// Read `root.cfg` of the level directory `path`
    pub fn read(path: &Path) -> ModelResult<Self> {
        let file = path.join(LEVEL_ROOT_FILE);
        if !file.is_file() {
            return Err(ModelError::PathNotFound(file));
        }

        let container = read_container(&file)?;
        serde_json::from_value(container)
            .map_err(|e| ModelError::MalformedContainer(format!("{:?}: {}", file, e)))
    }

    /// Write `root.cfg` into the level directory `path`
    pub fn write(&self, path: &Path) -> ModelResult<()> {
        let container = serde_json::to_value(self)
            .map_err(|e| ModelError::MalformedContainer(e.to_string()))?;
        write_container(&path.join(LEVEL_ROOT_FILE), &container)?;
        Ok(())
    }
}

/// Loaded level with its instance cache
pub struct Level {
    id: String,
    path: PathBuf,
    root: LevelRoot,
    mapping: ObjectMapping,
    instance_local: CacheSet,
}

impl Level {
    /// Load the instances of the level directory at `path`
    ///
    /// The packages named in `root` must already be part of `scope`.
    pub fn load(path: &Path, root: LevelRoot, scope: LoadScope<'_>) -> ModelResult<Self> {
        let id = resource_id(path, LEVEL_EXTENSION)?;
        let mapping = ObjectMapping::scan_level(path)?;

        let mut instance_local = CacheSet::new();
        {
            let mut ctx = scope.context(path, &mapping, None, &mut instance_local);
            load_mapped(&mapping, path, false, &mut ctx)?;
            ctx.flush()?;
        }

        info!(
            "Loaded level '{}' ({} instances, {} package(s))",
            id,
            instance_local.len(),
            root.packages.len()
        );

        Ok(Self {
            id,
            path: path.to_path_buf(),
            root,
            mapping,
            instance_local,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Packages the level depends on
    pub fn packages(&self) -> &[String] {
        &self.root.packages
    }

    pub fn instances(&self) -> &CacheSet {
        &self.instance_local
    }

    pub fn find(&self, id: &str) -> Option<&dyn SmartObject> {
        self.instance_local.get(id)
    }

    /// Start a context that adds to and updates this level's instances
    fn context<'a>(&'a mut self, scope: LoadScope<'a>) -> ObjectConstructionContext<'a> {
        let mut ctx = scope.context(&self.path, &self.mapping, None, &mut self.instance_local);
        ctx.set_mode(ConstructionMode::LoadingInstance);
        ctx
    }

    /// Clone `prototype` into the level
    ///
    /// # Arguments
    /// * `prototype` - Class object to clone
    /// * `new_id` - Id of the new instance; generated from the prototype id
    ///   when `None`
    ///
    /// # Returns
    /// The id of the new instance.
    pub fn spawn(
        &mut self,
        prototype: &str,
        new_id: Option<&str>,
        scope: LoadScope<'_>,
    ) -> ModelResult<ObjectId> {
        let mut ctx = self.context(scope);
        let id = match new_id {
            Some(id) => ObjectId::from(id),
            None => ctx.generate_id(prototype),
        };
        constructor::clone_create(&ObjectId::from(prototype), id.clone(), &mut ctx)?;
        ctx.flush()?;
        Ok(id)
    }

    /// Apply a patch to one of the level's instances
    ///
    /// # Returns
    /// The number of properties written.
    pub fn update(
        &mut self,
        id: &str,
        patch: &ContainerMap,
        scope: LoadScope<'_>,
    ) -> ModelResult<usize> {
        let mut ctx = self.context(scope);
        let count = constructor::update_properties(&ObjectId::from(id), patch, &mut ctx)?;
        ctx.flush()?;
        Ok(count)
    }

    /// Load an extra object container into the level
    pub fn load_container(
        &mut self,
        container: &Container,
        scope: LoadScope<'_>,
    ) -> ModelResult<ObjectId> {
        let mut ctx = self.context(scope);
        let id = constructor::load_container(container, &mut ctx)?;
        ctx.flush()?;
        Ok(id)
    }

    fn relative_path(&self, object: &dyn SmartObject) -> PathBuf {
        if let Some(entry) = self.mapping.get(object.id()) {
            return entry.path.clone();
        }

        Path::new(object.architype().folder_name())
            .join(format!("{}.{}", object.id(), OBJECT_EXTENSION))
    }

    /// Write `root.cfg` and every top-level instance below `dest`
    ///
    /// # Returns
    /// The number of object files written.
    pub fn save(
        &self,
        dest: &Path,
        global: &CacheChain<'_>,
        skip_default_values: bool,
    ) -> ModelResult<usize> {
        self.root.write(dest)?;

        let lookup = CacheChain::new().with(&self.instance_local).extend(global);
        let save = SaveContext::new(&lookup)
            .with_save_root(dest)
            .with_skip_default_values(skip_default_values);

        let mut count = 0;
        for object in self
            .instance_local
            .iter()
            .filter(|o| !o.header().is_member())
        {
            object_save(object, &dest.join(self.relative_path(object)), &save)?;
            count += 1;
        }

        info!("Saved level '{}' to {:?} ({} files)", self.id, dest, count);
        Ok(count)
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("packages", &self.root.packages)
            .field("instances", &self.instance_local.len())
            .finish()
    }
}
