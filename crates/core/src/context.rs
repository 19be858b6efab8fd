//! Object construction context
//!
//! A context is the session state of one load, clone or update operation.
//! It borrows the caches it reads from and writes to, and collects the
//! objects it constructs on a pending stack. Nothing reaches a cache until
//! [`ObjectConstructionContext::flush`] succeeds; dropping the context
//! discards every pending object.
//!
//! # Lookup Order
//!
//! ```text
//! find_class_object:    pending (class)    → class_local    → class_global chain
//! find_instance_object: pending (instance) → instance_local → instance_global chain
//! find_object:          mode dependent, instances first unless loading classes
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use protoforge_sdk::ObjectId;
use tracing::{debug, trace};

use crate::caches::{CacheChain, CacheSet, ObjectLookup};
use crate::error::{ModelError, ModelResult};
use crate::id_generator::IdGenerator;
use crate::mapping::{ObjectMapping, COMPONENT_EXTENSION, OBJECT_EXTENSION};
use crate::object::{ObjectFlags, SmartObject};
use crate::reflection::TypeRegistry;

/// What the context is currently constructing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructionMode {
    /// No load in progress
    #[default]
    Navigating,
    /// Constructed objects are prototypes
    LoadingClass,
    /// Constructed objects are instances
    LoadingInstance,
}

impl ConstructionMode {
    /// Flags given to objects constructed in this mode
    pub(crate) fn object_flags(self) -> ObjectFlags {
        match self {
            ConstructionMode::LoadingClass => ObjectFlags::CLASS_OBJ,
            ConstructionMode::LoadingInstance | ConstructionMode::Navigating => {
                ObjectFlags::INSTANCE_OBJ
            }
        }
    }
}

struct PendingObject {
    object: Box<dyn SmartObject>,
    source: Option<PathBuf>,
}

/// Session state of a load operation
pub struct ObjectConstructionContext<'a> {
    registry: &'a TypeRegistry,
    id_generator: &'a mut IdGenerator,
    class_local: Option<&'a mut CacheSet>,
    instance_local: Option<&'a mut CacheSet>,
    class_global: CacheChain<'a>,
    instance_global: CacheChain<'a>,
    mapping: Option<&'a ObjectMapping>,
    root: PathBuf,
    mode: ConstructionMode,
    pending: Vec<PendingObject>,
    pending_index: HashMap<ObjectId, usize>,
    loading: Vec<ObjectId>,
    current_paths: Vec<PathBuf>,
}

impl<'a> ObjectConstructionContext<'a> {
    /// Create a context without any cache scopes
    pub fn new(registry: &'a TypeRegistry, id_generator: &'a mut IdGenerator) -> Self {
        Self {
            registry,
            id_generator,
            class_local: None,
            instance_local: None,
            class_global: CacheChain::new(),
            instance_global: CacheChain::new(),
            mapping: None,
            root: PathBuf::new(),
            mode: ConstructionMode::Navigating,
            pending: Vec::new(),
            pending_index: HashMap::new(),
            loading: Vec::new(),
            current_paths: Vec::new(),
        }
    }

    /// Root directory that relative buffer and mapping paths resolve against
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_mapping(mut self, mapping: &'a ObjectMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Cache receiving flushed class objects
    pub fn with_class_local(mut self, cache: &'a mut CacheSet) -> Self {
        self.class_local = Some(cache);
        self
    }

    /// Cache receiving flushed instances
    pub fn with_instance_local(mut self, cache: &'a mut CacheSet) -> Self {
        self.instance_local = Some(cache);
        self
    }

    /// Read-only class scopes searched after the local one
    pub fn with_class_global(mut self, chain: CacheChain<'a>) -> Self {
        self.class_global = chain;
        self
    }

    /// Read-only instance scopes searched after the local one
    pub fn with_instance_global(mut self, chain: CacheChain<'a>) -> Self {
        self.instance_global = chain;
        self
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> ConstructionMode {
        self.mode
    }

    /// Switch the construction mode
    ///
    /// # Returns
    /// The previous mode, to be restored once the nested load finishes.
    pub fn set_mode(&mut self, mode: ConstructionMode) -> ConstructionMode {
        std::mem::replace(&mut self.mode, mode)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn pending_object(&self, id: &str) -> Option<&dyn SmartObject> {
        self.pending_index
            .get(id)
            .map(|&i| &*self.pending[i].object)
    }

    /// Find a prototype: pending, then class-local, then class-global
    pub fn find_class_object(&self, id: &str) -> Option<&dyn SmartObject> {
        if let Some(object) = self.pending_object(id).filter(|o| o.is_class_object()) {
            return Some(object);
        }
        if let Some(object) = self.class_local.as_deref().and_then(|c| c.get(id)) {
            return Some(object);
        }
        self.class_global.get(id)
    }

    /// Find an instance: pending, then instance-local, then instance-global
    pub fn find_instance_object(&self, id: &str) -> Option<&dyn SmartObject> {
        if let Some(object) = self.pending_object(id).filter(|o| !o.is_class_object()) {
            return Some(object);
        }
        if let Some(object) = self.instance_local.as_deref().and_then(|c| c.get(id)) {
            return Some(object);
        }
        self.instance_global.get(id)
    }

    /// Find an object the way references resolve in the current mode
    ///
    /// While loading classes only prototypes are visible. Otherwise instances
    /// shadow prototypes with the same id.
    pub fn find_object(&self, id: &str) -> Option<&dyn SmartObject> {
        match self.mode {
            ConstructionMode::LoadingClass => self.find_class_object(id),
            _ => self
                .find_instance_object(id)
                .or_else(|| self.find_class_object(id)),
        }
    }

    /// Find an object in any scope
    pub fn find_any(&self, id: &str) -> Option<&dyn SmartObject> {
        self.pending_object(id)
            .or_else(|| self.class_local.as_deref().and_then(|c| c.get(id)))
            .or_else(|| self.instance_local.as_deref().and_then(|c| c.get(id)))
            .or_else(|| self.class_global.get(id))
            .or_else(|| self.instance_global.get(id))
    }

    /// Check if an id is taken in any scope
    pub fn exists(&self, id: &str) -> bool {
        self.find_any(id).is_some()
    }

    /// Find an object that may be modified in place: pending or instance-local
    pub fn find_mut(&mut self, id: &str) -> Option<&mut (dyn SmartObject + 'static)> {
        if let Some(&i) = self.pending_index.get(id) {
            return Some(&mut *self.pending[i].object);
        }
        self.instance_local.as_deref_mut().and_then(|c| c.get_mut(id))
    }

    // ========================================================================
    // Pending stack
    // ========================================================================

    /// Push a finished object onto the pending stack
    ///
    /// # Returns
    /// `DuplicateId` if an object with the same id is already pending.
    pub fn add_pending(
        &mut self,
        object: Box<dyn SmartObject>,
        source: Option<PathBuf>,
    ) -> ModelResult<()> {
        let id = object.id().clone();
        if self.pending_index.contains_key(&id) {
            return Err(ModelError::DuplicateId(id));
        }
        trace!("Pending object '{}' ({})", id, object.object_type());
        self.pending_index.insert(id, self.pending.len());
        self.pending.push(PendingObject { object, source });
        Ok(())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Ids of pending objects in construction order
    pub fn pending_ids(&self) -> impl Iterator<Item = &ObjectId> + '_ {
        self.pending.iter().map(|p| p.object.id())
    }

    /// Mark the current top of the pending stack
    pub(crate) fn pending_mark(&self) -> usize {
        self.pending.len()
    }

    /// Drop every object pushed since `mark`
    pub(crate) fn rollback_to(&mut self, mark: usize) {
        if mark >= self.pending.len() {
            return;
        }
        for dropped in self.pending.drain(mark..) {
            self.pending_index.remove(dropped.object.id());
            trace!("Rolled back pending object '{}'", dropped.object.id());
        }
    }

    /// Move pending class objects into the class-local cache
    ///
    /// Every id is checked against the cache before the first insert, so a
    /// failure leaves both the cache and the pending stack untouched.
    pub fn flush_to_class_cache(&mut self) -> ModelResult<usize> {
        self.flush_scope(true)
    }

    /// Move pending instances into the instance-local cache
    pub fn flush_to_instance_cache(&mut self) -> ModelResult<usize> {
        self.flush_scope(false)
    }

    /// Move every pending object into its cache
    ///
    /// Both scopes are validated before anything moves.
    pub fn flush(&mut self) -> ModelResult<()> {
        self.validate_flush(true)?;
        self.validate_flush(false)?;
        self.flush_scope(true)?;
        self.flush_scope(false)?;
        Ok(())
    }

    fn target(&self, class: bool) -> Option<&CacheSet> {
        if class {
            self.class_local.as_deref()
        } else {
            self.instance_local.as_deref()
        }
    }

    fn validate_flush(&self, class: bool) -> ModelResult<()> {
        let mut objects = self
            .pending
            .iter()
            .map(|p| &p.object)
            .filter(|o| o.is_class_object() == class)
            .peekable();

        if objects.peek().is_none() {
            return Ok(());
        }

        let target = self.target(class).ok_or_else(|| {
            ModelError::InvalidState(format!(
                "no {} cache to flush into",
                if class { "class" } else { "instance" }
            ))
        })?;

        for object in objects {
            if target.exists(object.id()) {
                return Err(ModelError::DuplicateId(object.id().clone()));
            }
        }
        Ok(())
    }

    fn flush_scope(&mut self, class: bool) -> ModelResult<usize> {
        self.validate_flush(class)?;

        let (moving, staying): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.object.is_class_object() == class);

        self.pending = staying;
        self.pending_index = self
            .pending
            .iter()
            .enumerate()
            .map(|(i, p)| (p.object.id().clone(), i))
            .collect();

        let count = moving.len();
        if count == 0 {
            return Ok(0);
        }

        let target = if class {
            self.class_local.as_deref_mut()
        } else {
            self.instance_local.as_deref_mut()
        };
        let Some(target) = target else {
            return Err(ModelError::InvalidState("flush target disappeared".into()));
        };

        for pending in moving {
            target.insert(pending.object, pending.source)?;
        }

        debug!(
            "Flushed {} {} object(s)",
            count,
            if class { "class" } else { "instance" }
        );
        Ok(count)
    }

    // ========================================================================
    // Load tracking
    // ========================================================================

    /// Check if an object is somewhere in the current load chain
    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.iter().any(|l| l.as_str() == id)
    }

    /// Enter the construction of `id`
    ///
    /// # Returns
    /// `CyclicReference` with the full chain if `id` is already being
    /// constructed further up the stack.
    pub(crate) fn begin_loading(&mut self, id: &ObjectId) -> ModelResult<()> {
        if self.is_loading(id) {
            let mut chain = self.loading.clone();
            chain.push(id.clone());
            return Err(ModelError::CyclicReference(chain));
        }
        self.loading.push(id.clone());
        Ok(())
    }

    /// Leave the construction of `id`
    pub(crate) fn end_loading(&mut self, id: &ObjectId) {
        let popped = self.loading.pop();
        debug_assert_eq!(popped.as_ref(), Some(id), "unbalanced load tracking");
    }

    /// Build the error for a reference back into the load chain
    pub(crate) fn cycle_error(&self, id: &ObjectId) -> ModelError {
        let mut chain = self.loading.clone();
        chain.push(id.clone());
        ModelError::CyclicReference(chain)
    }

    pub(crate) fn push_path(&mut self, path: &Path) {
        self.current_paths.push(path.to_path_buf());
    }

    pub(crate) fn pop_path(&mut self) {
        self.current_paths.pop();
    }

    /// File of the object currently being parsed
    pub fn current_path(&self) -> Option<&Path> {
        self.current_paths.last().map(PathBuf::as_path)
    }

    /// Locate the file holding `id`
    ///
    /// Consults the object mapping first, then looks for a sibling file next
    /// to the object currently being parsed.
    ///
    /// # Returns
    /// The absolute file path and the mode the object loads in.
    pub fn resolve_source(&self, id: &str) -> Option<(PathBuf, ConstructionMode)> {
        if let Some(entry) = self.mapping.and_then(|m| m.get(id)) {
            let mode = if entry.is_class {
                ConstructionMode::LoadingClass
            } else {
                ConstructionMode::LoadingInstance
            };
            return Some((self.root.join(&entry.path), mode));
        }

        let dir = self.current_path()?.parent()?;
        [OBJECT_EXTENSION, COMPONENT_EXTENSION]
            .iter()
            .map(|ext| dir.join(format!("{}.{}", id, ext)))
            .find(|path| path.is_file())
            .map(|path| (path, ConstructionMode::LoadingClass))
    }

    // ========================================================================
    // Id generation
    // ========================================================================

    /// Generate an id derived from `base` that is free in every scope
    pub fn generate_id(&mut self, base: &str) -> ObjectId {
        let mut generator = std::mem::take(&mut *self.id_generator);
        let id = generator.generate(base, |candidate| self.exists(candidate));
        *self.id_generator = generator;
        id
    }

    /// Generate an id for an object nested under `scope`
    pub fn generate_scoped_id(&mut self, scope: &str, base: &str) -> ObjectId {
        let mut generator = std::mem::take(&mut *self.id_generator);
        let id = generator.generate_scoped(scope, base, |candidate| self.exists(candidate));
        *self.id_generator = generator;
        id
    }
}

impl ObjectLookup for ObjectConstructionContext<'_> {
    fn find(&self, id: &ObjectId) -> Option<&dyn SmartObject> {
        self.find_any(id)
    }
}
