//! Session collaborator surface.
//!
//! The handler never owns session storage; it consumes sessions through the
//! narrow [`Session`] interface and expects an upstream layer to associate a
//! session with every request. [`MemorySessionStore`] is an in-process
//! implementation suitable for tests and single-process deployments; any
//! real deployment will typically adapt its own session machinery to these
//! traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

/// A shareable session handle, as inserted into request extensions by the
/// upstream session layer.
pub type SharedSession = Arc<dyn Session>;

/// One user session: an opaque id plus a string key/value bag.
///
/// Implementations must provide read-your-writes consistency within one
/// session id; the flow state written before a redirect must be visible to
/// the callback request that follows it.
pub trait Session: Send + Sync {
    /// The opaque session identifier.
    fn id(&self) -> &str;

    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn put(&self, key: &str, value: &str);

    /// Remove a value, returning it if it was present.
    fn remove(&self, key: &str) -> Option<String>;
}

/// Creates and resolves sessions by id.
pub trait SessionStore: Send + Sync {
    /// Create a fresh session with a random id.
    fn create(&self) -> SharedSession;

    /// Resolve an existing session.
    fn get(&self, id: &str) -> Option<SharedSession>;

    /// Drop a session and everything stored in it.
    fn remove(&self, id: &str);
}

/// In-memory session backed by a `RwLock`ed map.
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    values: RwLock<HashMap<String, String>>,
}

impl MemorySession {
    fn new(id: String) -> Self {
        MemorySession {
            id,
            values: RwLock::new(HashMap::new()),
        }
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("session map lock poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.values
            .write()
            .expect("session map lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .expect("session map lock poisoned")
            .remove(key)
    }
}

/// In-memory session store.
///
/// Cloning is cheap and clones share the same underlying sessions.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<MemorySession>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> SharedSession {
        let id = random_id();
        let session = Arc::new(MemorySession::new(id.clone()));
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .insert(id, session.clone());
        session
    }

    fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions
            .read()
            .expect("session store lock poisoned")
            .get(id)
            .cloned()
            .map(|s| s as SharedSession)
    }

    fn remove(&self, id: &str) {
        self.sessions
            .write()
            .expect("session store lock poisoned")
            .remove(id);
    }
}

/// Random 16-byte base64url session id.
fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
