//! Registry of live remote sessions
//!
//! Native callbacks (clipboard, resize, cursor) arrive on threads that hold
//! only a session id. They resolve the session here instead of through a
//! process-wide "current session".

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;
use uuid::Uuid;

/// Live sessions indexed by session ID
#[derive(Debug)]
pub struct SessionRegistry<S> {
    sessions: RwLock<HashMap<Uuid, Arc<S>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> SessionRegistry<S> {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and returns its new ID
    pub fn register(&self, session: S) -> Uuid {
        self.insert(Arc::new(session))
    }

    /// Registers an already shared session and returns its new ID
    pub fn insert(&self, session: Arc<S>) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
        debug!("Registered session {id}");
        id
    }

    /// Looks up a session
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<S>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Removes a session, returning it if it was registered
    pub fn remove(&self, id: Uuid) -> Option<Arc<S>> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            debug!("Unregistered session {id}");
        }
        removed
    }

    /// IDs of all registered sessions
    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Number of registered sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no session is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
