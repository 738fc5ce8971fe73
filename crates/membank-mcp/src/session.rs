//! Per-connection sessions.
//!
//! A session carries the (project root, repository, branch) triple bound by
//! the `init-memory-bank` tool, a cancel token for in-flight work, and the
//! broadcast channel the SSE endpoint drains. Stdio connections use one
//! implicit session; HTTP connections get a server-generated session id.

use membank_core::{CancelToken, MemBankError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::progress::ProgressEvent;

/// Capacity of each session's progress broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Scope established by `init-memory-bank`.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub project_root: PathBuf,
    pub repository: String,
    pub branch: String,
}

/// One transport connection's state.
pub struct Session {
    pub binding: Option<SessionBinding>,
    pub events: broadcast::Sender<ProgressEvent>,
    pub cancel: CancelToken,
}

impl Session {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            binding: None,
            events,
            cancel: CancelToken::new(),
        }
    }
}

/// Session table keyed by connection id.
#[derive(Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a new connection. Replaces any prior session
    /// under the same key.
    pub fn create(&self, key: &str) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(key.to_string(), Session::new());
    }

    pub fn exists(&self, key: &str) -> bool {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.contains_key(key)
    }

    /// Bind the session's scope. The session must exist.
    pub fn bind(&self, key: &str, binding: SessionBinding) -> Result<(), MemBankError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| MemBankError::SessionUnbound(format!("no session '{key}'")))?;
        session.binding = Some(binding);
        Ok(())
    }

    /// The bound scope, or `SessionUnbound` when the session is missing or
    /// was never initialised.
    pub fn binding(&self, key: &str) -> Result<SessionBinding, MemBankError> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions
            .get(key)
            .and_then(|s| s.binding.clone())
            .ok_or_else(|| {
                MemBankError::SessionUnbound(
                    "call init-memory-bank before any other tool".to_string(),
                )
            })
    }

    /// The progress channel sender for a session.
    pub fn events(&self, key: &str) -> Option<broadcast::Sender<ProgressEvent>> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.get(key).map(|s| s.events.clone())
    }

    /// Subscribe to a session's progress events.
    pub fn subscribe(&self, key: &str) -> Option<broadcast::Receiver<ProgressEvent>> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.get(key).map(|s| s.events.subscribe())
    }

    /// The cancel token for a session's current request.
    pub fn cancel_token(&self, key: &str) -> Option<CancelToken> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.get(key).map(|s| s.cancel.clone())
    }

    /// Install a fresh cancel token for an incoming request and return it.
    /// A prior cancellation must not poison later requests on the session.
    pub fn begin_request(&self, key: &str) -> CancelToken {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        match sessions.get_mut(key) {
            Some(session) => {
                session.cancel = CancelToken::new();
                session.cancel.clone()
            }
            None => CancelToken::new(),
        }
    }

    /// Terminate a session: cancel in-flight work and drop the entry.
    pub fn terminate(&self, key: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        match sessions.remove(key) {
            Some(session) => {
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> SessionBinding {
        SessionBinding {
            project_root: PathBuf::from("/p"),
            repository: "r".into(),
            branch: "main".into(),
        }
    }

    #[test]
    fn unbound_session_is_an_error() {
        let manager = SessionManager::new();
        assert!(manager.binding("s1").is_err());

        manager.create("s1");
        // Created but not initialised.
        assert!(matches!(
            manager.binding("s1"),
            Err(MemBankError::SessionUnbound(_))
        ));
    }

    #[test]
    fn bind_then_read() {
        let manager = SessionManager::new();
        manager.create("s1");
        manager.bind("s1", binding()).unwrap();

        let bound = manager.binding("s1").unwrap();
        assert_eq!(bound.repository, "r");
        assert_eq!(bound.branch, "main");
    }

    #[test]
    fn bind_missing_session_fails() {
        let manager = SessionManager::new();
        assert!(manager.bind("ghost", binding()).is_err());
    }

    #[test]
    fn terminate_cancels_in_flight_work() {
        let manager = SessionManager::new();
        manager.create("s1");
        let token = manager.cancel_token("s1").unwrap();
        assert!(!token.is_cancelled());

        assert!(manager.terminate("s1"));
        assert!(token.is_cancelled());
        assert!(!manager.exists("s1"));
        assert!(!manager.terminate("s1"));
    }

    #[test]
    fn sessions_are_isolated() {
        let manager = SessionManager::new();
        manager.create("a");
        manager.create("b");
        manager.bind("a", binding()).unwrap();

        assert!(manager.binding("a").is_ok());
        assert!(manager.binding("b").is_err());

        // Events published on one session are invisible to the other.
        let tx = manager.events("a").unwrap();
        let mut rx_b = manager.subscribe("b").unwrap();
        let _ = tx.send(ProgressEvent::complete("done"));
        assert!(rx_b.try_recv().is_err());
    }
}
