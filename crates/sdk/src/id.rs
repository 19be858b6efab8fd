//! Object identifiers

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of a smart object
///
/// Ids are shared between caches, back-references and component lists, so
/// the string is reference counted and clones never allocate.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Arc<str>);

impl ObjectId {
    /// Create a new id from any string-like value
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Build the id of an object nested under `scope`, e.g. `"owner/part"`
    pub fn scoped(scope: &str, base: &str) -> Self {
        Self::new(format!("{}/{}", scope, base))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ObjectId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&String> for ObjectId {
    fn from(id: &String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ObjectId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ObjectId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_scoped_id() {
        let id = ObjectId::scoped("door", "frame");
        assert_eq!(id, "door/frame");
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ObjectId::from("cube"), 1);
        assert_eq!(map.get("cube"), Some(&1));
        assert_eq!(map.get("sphere"), None);
    }

    #[test]
    fn test_debug_and_display() {
        let id = ObjectId::from("mt_red");
        assert_eq!(format!("{}", id), "mt_red");
        assert_eq!(format!("{:?}", id), "\"mt_red\"");
    }
}
