//! Object mapping: which file holds which object
//!
//! Packages and levels are scanned once when they load. The mapping lets the
//! constructor load a referenced object by id before the folder iteration
//! reaches it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use protoforge_sdk::{Architype, ObjectId};
use tracing::trace;

use crate::error::{ModelError, ModelResult};

/// Extension of single object files
pub const OBJECT_EXTENSION: &str = "aobj";

/// Extension of single component files
pub const COMPONENT_EXTENSION: &str = "acom";

/// Extension of package directories
pub const PACKAGE_EXTENSION: &str = "apkg";

/// Extension of level directories
pub const LEVEL_EXTENSION: &str = "alvl";

/// Directory of class objects inside a package
pub const CLASS_DIR: &str = "class";

/// Directory of instance objects inside a package
pub const INSTANCE_DIR: &str = "instance";

/// Where one object lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub id: ObjectId,
    pub architype: Architype,
    pub is_class: bool,
    /// Path relative to the package or level root
    pub path: PathBuf,
}

/// Id to file mapping of a package or level
#[derive(Debug, Default, Clone)]
pub struct ObjectMapping {
    entries: Vec<MappingEntry>,
    index: HashMap<ObjectId, usize>,
}

impl ObjectMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `class/<architype>/` and `instance/<architype>/` of a package
    pub fn scan_package(root: &Path) -> ModelResult<Self> {
        let mut mapping = Self::new();
        for (dir, is_class) in [(CLASS_DIR, true), (INSTANCE_DIR, false)] {
            for architype in Architype::ALL {
                let rel_dir = Path::new(dir).join(architype.folder_name());
                mapping.scan_dir(root, &rel_dir, architype, is_class)?;
            }
        }
        Ok(mapping)
    }

    /// Scan the `components/` and `game_objects/` folders of a level
    pub fn scan_level(root: &Path) -> ModelResult<Self> {
        let mut mapping = Self::new();
        for architype in [Architype::Component, Architype::GameObject] {
            mapping.scan_dir(root, Path::new(architype.folder_name()), architype, false)?;
        }
        Ok(mapping)
    }

    fn scan_dir(
        &mut self,
        root: &Path,
        rel_dir: &Path,
        architype: Architype,
        is_class: bool,
    ) -> ModelResult<()> {
        let dir = root.join(rel_dir);
        if !dir.is_dir() {
            return Ok(());
        }

        let read_dir = fs::read_dir(&dir).map_err(|e| ModelError::io(&dir, e))?;
        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ModelError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() && is_object_file(&path) {
                names.push(entry.file_name());
            }
        }
        // Directory order is platform dependent
        names.sort();

        for name in names {
            let rel_path = rel_dir.join(&name);
            let Some(stem) = rel_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            self.insert(MappingEntry {
                id: ObjectId::from(stem),
                architype,
                is_class,
                path: rel_path.clone(),
            })?;
        }
        Ok(())
    }

    /// Add an entry
    ///
    /// # Returns
    /// `DuplicateId` if the id is already mapped to another file.
    pub fn insert(&mut self, entry: MappingEntry) -> ModelResult<()> {
        if self.index.contains_key(&entry.id) {
            return Err(ModelError::DuplicateId(entry.id));
        }
        trace!("Mapped '{}' -> {:?}", entry.id, entry.path);
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&MappingEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Entries of one scope and architype, in scan order
    pub fn entries_of(
        &self,
        is_class: bool,
        architype: Architype,
    ) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.is_class == is_class && e.architype == architype)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check if a path names a single object file
pub fn is_object_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(OBJECT_EXTENSION) | Some(COMPONENT_EXTENSION)
    )
}
