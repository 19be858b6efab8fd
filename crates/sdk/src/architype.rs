//! Object categories

use std::fmt;

/// The closed set of categories a smart object belongs to
///
/// The declaration order is the order in which packages load and save their
/// folders, so leaves (textures) come before the objects that use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architype {
    Texture,
    Material,
    Mesh,
    Component,
    GameObject,
}

impl Architype {
    /// Number of architypes
    pub const COUNT: usize = 5;

    /// All architypes in load order
    pub const ALL: [Architype; Self::COUNT] = [
        Architype::Texture,
        Architype::Material,
        Architype::Mesh,
        Architype::Component,
        Architype::GameObject,
    ];

    /// Stable index in `0..COUNT`
    pub const fn index(self) -> usize {
        match self {
            Architype::Texture => 0,
            Architype::Material => 1,
            Architype::Mesh => 2,
            Architype::Component => 3,
            Architype::GameObject => 4,
        }
    }

    /// Name used in reflection attributes and log output
    pub const fn as_str(self) -> &'static str {
        match self {
            Architype::Texture => "texture",
            Architype::Material => "material",
            Architype::Mesh => "mesh",
            Architype::Component => "component",
            Architype::GameObject => "game_object",
        }
    }

    /// Folder holding objects of this architype inside a package or level
    pub const fn folder_name(self) -> &'static str {
        match self {
            Architype::Texture => "textures",
            Architype::Material => "materials",
            Architype::Mesh => "meshes",
            Architype::Component => "components",
            Architype::GameObject => "game_objects",
        }
    }

    /// Parse an architype from its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Parse an architype from its folder name
    pub fn from_folder_name(folder: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.folder_name() == folder)
    }
}

impl fmt::Display for Architype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
