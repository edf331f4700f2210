//! Maps `(language, workspace_root)` to a [`Session`], protected by a lock
//! (§4.C Session manager). On each acquisition, sessions idle longer than
//! the TTL are evicted; if the session count exceeds the cap, the
//! least-recently-used session is evicted too.

use std::collections::HashMap;
use std::path::PathBuf;

use blastradius_core::{Language, LspConfig};
use parking_lot::Mutex;

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    language: Language,
    workspace_root: PathBuf,
}

pub struct SessionManager {
    cfg: LspConfig,
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl SessionManager {
    pub fn new(cfg: LspConfig) -> Self {
        Self {
            cfg,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the session for `(language, workspace_root)`, evicting
    /// idle/excess sessions first.
    pub fn acquire(&self, language: Language, workspace_root: &std::path::Path) -> Session {
        let mut sessions = self.sessions.lock();
        self.evict_idle(&mut sessions);

        let key = SessionKey {
            language,
            workspace_root: workspace_root.to_path_buf(),
        };
        if let Some(existing) = sessions.get(&key) {
            existing.touch();
            return existing.clone();
        }

        if sessions.len() >= self.cfg.session_cap {
            self.evict_lru(&mut sessions);
        }

        let session = Session::new(language, workspace_root.to_path_buf(), self.cfg.clone());
        sessions.insert(key, session.clone());
        session
    }

    fn evict_idle(&self, sessions: &mut HashMap<SessionKey, Session>) {
        sessions.retain(|_, s| s.idle_for() < self.cfg.session_idle_ttl);
    }

    fn evict_lru(&self, sessions: &mut HashMap<SessionKey, Session>) {
        if let Some(oldest_key) = sessions
            .iter()
            .max_by_key(|(_, s)| s.idle_for())
            .map(|(k, _)| k.clone())
        {
            sessions.remove(&oldest_key);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn acquire_reuses_the_same_session_for_the_same_key() {
        let mgr = SessionManager::new(LspConfig::default());
        let root = Path::new("/tmp/proj");
        let _s1 = mgr.acquire(Language::Python, root);
        let _s2 = mgr.acquire(Language::Python, root);
        assert_eq!(mgr.session_count(), 1);
    }

    #[test]
    fn acquire_distinguishes_by_language_and_root() {
        let mgr = SessionManager::new(LspConfig::default());
        mgr.acquire(Language::Python, Path::new("/tmp/a"));
        mgr.acquire(Language::TypeScript, Path::new("/tmp/a"));
        mgr.acquire(Language::Python, Path::new("/tmp/b"));
        assert_eq!(mgr.session_count(), 3);
    }

    #[test]
    fn evicts_lru_once_cap_is_exceeded() {
        let mut cfg = LspConfig::default();
        cfg.session_cap = 2;
        let mgr = SessionManager::new(cfg);
        mgr.acquire(Language::Python, Path::new("/tmp/a"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        mgr.acquire(Language::Python, Path::new("/tmp/b"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        mgr.acquire(Language::Python, Path::new("/tmp/c"));
        assert_eq!(mgr.session_count(), 2);
    }
}
