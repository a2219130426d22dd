//! Registry of live spawn handles.
//!
//! `posix_spawnattr_t` and `posix_spawn_file_actions_t` are opaque slots that
//! hold a pointer to a heap object. The ABI layer registers each object it
//! allocates here so that a slot holding garbage, a destroyed object, or an
//! object of the other kind can be rejected instead of dereferenced.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Which builder object a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A `posix_spawnattr_t` payload.
    Attributes,
    /// A `posix_spawn_file_actions_t` payload.
    FileActions,
}

/// Temporal state of a tracked handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Initialized and not yet destroyed.
    Live,
    /// Destroyed; any further use is a caller bug.
    Destroyed,
    /// Never registered.
    Unknown,
}

/// Metadata for a tracked handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMeta {
    pub kind: HandleKind,
    pub state: HandleState,
    /// Bumped on every destroy so address reuse is distinguishable.
    pub generation: u64,
}

/// Concurrent handle registry.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    handles: RwLock<HashMap<usize, HandleMeta>>,
}

impl HandleRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly allocated handle payload.
    pub fn register(&self, addr: usize, kind: HandleKind) {
        let mut handles = self.handles.write();
        let generation = handles.get(&addr).map_or(0, |meta| meta.generation);
        handles.insert(
            addr,
            HandleMeta {
                kind,
                state: HandleState::Live,
                generation,
            },
        );
    }

    /// Mark a handle destroyed. Returns the state it had before the call.
    pub fn retire(&self, addr: usize, kind: HandleKind) -> HandleState {
        let mut handles = self.handles.write();
        match handles.get_mut(&addr) {
            Some(meta) if meta.kind == kind && meta.state == HandleState::Live => {
                meta.state = HandleState::Destroyed;
                meta.generation = meta.generation.saturating_add(1);
                HandleState::Live
            }
            Some(meta) if meta.kind == kind => meta.state,
            _ => HandleState::Unknown,
        }
    }

    /// Classify a handle address for the expected kind.
    #[must_use]
    pub fn classify(&self, addr: usize, kind: HandleKind) -> HandleState {
        match self.handles.read().get(&addr) {
            Some(meta) if meta.kind == kind => meta.state,
            _ => HandleState::Unknown,
        }
    }

    /// Returns true if `addr` is a live handle of `kind`.
    #[must_use]
    pub fn is_live(&self, addr: usize, kind: HandleKind) -> bool {
        self.classify(addr, kind) == HandleState::Live
    }

    /// Number of live handles (diagnostics).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.handles
            .read()
            .values()
            .filter(|meta| meta.state == HandleState::Live)
            .count()
    }
}

static GLOBAL_REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();

/// Global handle registry.
#[must_use]
pub fn global_registry() -> &'static HandleRegistry {
    GLOBAL_REGISTRY.get_or_init(HandleRegistry::new)
}
