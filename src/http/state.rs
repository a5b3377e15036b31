use crate::service::SessionFactory;
use crate::session::CallSession;
use crate::turn::TurnState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active call sessions (call_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<CallSession>>>>,

    /// Builds the backends for new calls
    pub factory: Arc<dyn SessionFactory>,
}

impl AppState {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            factory,
        }
    }

    pub async fn session(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.read().await.get(call_id).cloned()
    }

    /// Forget `call_id` if its session already stopped on its own
    pub async fn evict_if_stopped(&self, call_id: &str) -> Option<Arc<CallSession>> {
        let mut sessions = self.sessions.write().await;
        let stopped = sessions
            .get(call_id)
            .is_some_and(|session| session.state() == TurnState::Stopped);

        if stopped {
            sessions.remove(call_id)
        } else {
            None
        }
    }

    /// Shut down and forget every session
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<CallSession>> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        for session in sessions {
            session.shutdown().await;
        }
    }
}
