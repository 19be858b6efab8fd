//! Folder based resource locator
//!
//! Resources live under one content root, split into a directory per
//! category:
//!
//! ```text
//! <root>/
//! ├── packages/   <id>.apkg/...
//! ├── levels/     <id>.alvl/...
//! └── configs/
//! ```

use std::path::{Path, PathBuf};

use crate::error::LocatorError;

/// Resource categories with their own directory under the content root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Packages,
    Levels,
    Configs,
}

impl Category {
    /// Default directory name under the content root
    pub const fn default_dir(self) -> &'static str {
        match self {
            Category::Packages => "packages",
            Category::Levels => "levels",
            Category::Configs => "configs",
        }
    }
}

/// Resolves resource names to paths under a content root
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
    packages_dir: PathBuf,
    levels_dir: PathBuf,
    configs_dir: PathBuf,
}

impl ResourceLocator {
    /// Create a locator using the default category directory names
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            packages_dir: root.join(Category::Packages.default_dir()),
            levels_dir: root.join(Category::Levels.default_dir()),
            configs_dir: root.join(Category::Configs.default_dir()),
            root,
        }
    }

    /// Override the directory of one category, relative to the root
    pub fn with_category_dir(mut self, category: Category, dir: impl AsRef<Path>) -> Self {
        let path = self.root.join(dir);
        match category {
            Category::Packages => self.packages_dir = path,
            Category::Levels => self.levels_dir = path,
            Category::Configs => self.configs_dir = path,
        }
        self
    }

    /// Content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every resource of a category
    pub fn resource_dir(&self, category: Category) -> &Path {
        match category {
            Category::Packages => &self.packages_dir,
            Category::Levels => &self.levels_dir,
            Category::Configs => &self.configs_dir,
        }
    }

    /// Path of a named resource, whether or not it exists
    pub fn resource(&self, category: Category, name: &str) -> PathBuf {
        self.resource_dir(category).join(name)
    }

    /// Check if a named resource exists
    pub fn exists(&self, category: Category, name: &str) -> bool {
        self.resource(category, name).exists()
    }

    /// Path of a named resource that must exist
    pub fn require(&self, category: Category, name: &str) -> Result<PathBuf, LocatorError> {
        let path = self.resource(category, name);
        if path.exists() {
            Ok(path)
        } else {
            Err(LocatorError::NotFound(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let locator = ResourceLocator::new("/content");
        assert_eq!(
            locator.resource(Category::Packages, "base.apkg"),
            PathBuf::from("/content/packages/base.apkg")
        );
        assert_eq!(
            locator.resource_dir(Category::Levels),
            Path::new("/content/levels")
        );
    }

    #[test]
    fn test_category_override() {
        let locator =
            ResourceLocator::new("/content").with_category_dir(Category::Packages, "pkgs");
        assert_eq!(
            locator.resource_dir(Category::Packages),
            Path::new("/content/pkgs")
        );
    }

    #[test]
    fn test_require() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ResourceLocator::new(dir.path());
        std::fs::create_dir_all(locator.resource(Category::Levels, "intro.alvl")).unwrap();

        assert!(locator.exists(Category::Levels, "intro.alvl"));
        assert!(locator.require(Category::Levels, "intro.alvl").is_ok());
        assert!(matches!(
            locator.require(Category::Levels, "missing.alvl"),
            Err(LocatorError::NotFound(_))
        ));
    }
}
