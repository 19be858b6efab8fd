//! Collision-free object id generation
//!
//! Generated ids take the form `<base>#<n>`. Each base keeps its own counter,
//! starting at 2 (the unsuffixed base counts as the first object). An
//! explicit suffix on the requested base is a floor for the counter, and ids
//! that already exist are skipped.
//!
//! ```text
//! generate("bar")   -> bar#2
//! generate("bar")   -> bar#3
//! generate("bar#3") -> bar#4
//! generate("bar#5") -> bar#5
//! ```

use std::collections::HashMap;

use protoforge_sdk::ObjectId;
use tracing::trace;

/// First suffix handed out for a base
const FIRST_SUFFIX: u32 = 2;

/// Per-base suffix counters
#[derive(Debug, Default)]
pub struct IdGenerator {
    counters: HashMap<String, u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh id derived from `base`
    ///
    /// # Arguments
    /// * `base` - Base id, optionally carrying a `#<n>` suffix
    /// * `exists` - Returns true for ids that are already taken
    pub fn generate(&mut self, base: &str, exists: impl Fn(&str) -> bool) -> ObjectId {
        let (stem, floor) = split_suffix(base);
        debug_assert!(!stem.is_empty(), "id base must not be empty");

        let counter = self
            .counters
            .entry(stem.to_string())
            .or_insert(FIRST_SUFFIX);

        let mut candidate = (*counter).max(floor.unwrap_or(0));
        loop {
            let id = format!("{}#{}", stem, candidate);
            candidate += 1;
            if !exists(&id) {
                *counter = candidate;
                trace!("Generated id '{}' from '{}'", id, base);
                return ObjectId::from(id);
            }
        }
    }

    /// Generate a fresh id for an object nested under `scope`
    ///
    /// `generate_scoped("foo", "bar")` yields `foo/bar#2`, `foo/bar#3`, ...
    pub fn generate_scoped(
        &mut self,
        scope: &str,
        base: &str,
        exists: impl Fn(&str) -> bool,
    ) -> ObjectId {
        self.generate(&format!("{}/{}", scope, base), exists)
    }
}

/// Split `bar#5` into `("bar", Some(5))`
///
/// A `#` that is not followed by a number is part of the stem.
fn split_suffix(id: &str) -> (&str, Option<u32>) {
    match id.rsplit_once('#') {
        Some((stem, suffix)) if !stem.is_empty() => match suffix.parse::<u32>() {
            Ok(n) => (stem, Some(n)),
            Err(_) => (id, None),
        },
        _ => (id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_suffix() {
        assert_eq!(split_suffix("bar"), ("bar", None));
        assert_eq!(split_suffix("bar#5"), ("bar", Some(5)));
        assert_eq!(split_suffix("bar#x"), ("bar#x", None));
        assert_eq!(split_suffix("foo/bar#12"), ("foo/bar", Some(12)));
    }

    #[test]
    fn test_generate_sequence() {
        let mut taken: HashSet<String> = HashSet::new();
        let mut generator = IdGenerator::new();

        assert_eq!(generator.generate("bar", |id| taken.contains(id)), "bar#2");
        assert_eq!(generator.generate("bar", |id| taken.contains(id)), "bar#3");
        assert_eq!(generator.generate("bar#3", |id| taken.contains(id)), "bar#4");
        assert_eq!(generator.generate("bar#5", |id| taken.contains(id)), "bar#5");

        taken.insert("bar#6".to_string());
        assert_eq!(generator.generate("bar#5", |id| taken.contains(id)), "bar#7");
    }

    #[test]
    fn test_generate_scoped_sequence() {
        let mut taken: HashSet<String> = HashSet::new();
        let mut generator = IdGenerator::new();

        let mut next = |base: &str, taken: &HashSet<String>| {
            generator.generate_scoped("foo", base, |id| taken.contains(id))
        };

        assert_eq!(next("bar", &taken), "foo/bar#2");
        assert_eq!(next("bar", &taken), "foo/bar#3");
        assert_eq!(next("bar#3", &taken), "foo/bar#4");
        assert_eq!(next("bar#5", &taken), "foo/bar#5");

        taken.insert("foo/bar#6".to_string());
        assert_eq!(next("bar#5", &taken), "foo/bar#7");
    }

    #[test]
    fn test_bases_are_independent() {
        let mut generator = IdGenerator::new();
        assert_eq!(generator.generate("a", |_| false), "a#2");
        assert_eq!(generator.generate("b", |_| false), "b#2");
        assert_eq!(generator.generate("a", |_| false), "a#3");
    }

    #[test]
    fn test_skips_existing_ids() {
        let mut generator = IdGenerator::new();
        let taken = ["cube#2", "cube#3"];
        let id = generator.generate("cube", |id| taken.contains(&id));
        assert_eq!(id, "cube#4");
    }
}
