//! In-memory session store
//!
//! The map lock is held only to look a session up; each session has its own
//! mutex, so a slow batch on one session does not block the others.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::PanelSession;

pub type SessionHandle = Arc<Mutex<PanelSession>>;

pub type SessionStore = Arc<RwLock<HashMap<Uuid, SessionHandle>>>;

pub fn create_session_store() -> SessionStore {
    Arc::new(RwLock::new(HashMap::new()))
}

pub async fn insert_session(store: &SessionStore, session: PanelSession) -> SessionHandle {
    let id = session.id;
    let handle = Arc::new(Mutex::new(session));
    store.write().await.insert(id, Arc::clone(&handle));
    tracing::info!("Created session {}", id);
    handle
}

pub async fn get_session(store: &SessionStore, id: Uuid) -> Option<SessionHandle> {
    store.read().await.get(&id).cloned()
}

/// Tear a session down; its panels, layout and counters go with it
pub async fn remove_session(store: &SessionStore, id: Uuid) -> bool {
    let removed = store.write().await.remove(&id).is_some();
    if removed {
        tracing::info!("Removed session {}", id);
    }
    removed
}
