use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::constants::DEFAULT_STORE_CAPACITY_BYTES;
use crate::core::session::Session;

/// Errors that can occur when persisting the session registry.
#[derive(Debug)]
pub enum StoreError {
    /// The registry could not be serialized.
    Serialize(serde_json::Error),

    /// The registry file could not be written.
    Write {
        /// Path of the registry file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The serialized registry exceeds the storage budget.
    CapacityExceeded { size: usize, limit: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Serialize(source) => {
                write!(f, "Failed to serialize session registry: {source}")
            }
            StoreError::Write { path, source } => {
                write!(f, "Failed to write sessions to {}: {source}", path.display())
            }
            StoreError::CapacityExceeded { size, limit } => {
                write!(
                    f,
                    "Session registry is {size} bytes, over the {limit} byte budget"
                )
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Serialize(source) => Some(source),
            StoreError::Write { source, .. } => Some(source),
            StoreError::CapacityExceeded { .. } => None,
        }
    }
}

/// In-memory session registry synchronized to one JSON file.
///
/// The registry is the single source of truth for every conversation; the
/// file holds a JSON array of sessions and nothing else. Which session is
/// active is runtime state and is not persisted.
pub struct SessionStore {
    path: PathBuf,
    capacity: usize,
    sessions: Vec<Session>,
    active_id: Option<String>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self::with_capacity(path, DEFAULT_STORE_CAPACITY_BYTES)
    }

    pub fn with_capacity(path: PathBuf, capacity: usize) -> Self {
        let sessions = load_registry(&path);
        let active_id = sessions.first().map(|s| s.id.clone());
        Self {
            path,
            capacity,
            sessions,
            active_id,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn active(&self) -> Option<&Session> {
        let id = self.active_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        let id = self.active_id.clone()?;
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Create a fresh session, append it to the registry, persist, and mark
    /// it active. Persistence failure is logged only.
    pub fn create(&mut self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        self.sessions.push(session);
        self.active_id = Some(id.clone());
        if let Err(e) = self.persist() {
            warn!("failed to persist sessions after create: {e}");
        }
        id
    }

    /// Upsert by id, then persist the whole registry.
    pub fn save(&mut self, session: Session) -> Result<(), StoreError> {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => *slot = session,
            None => self.sessions.push(session),
        }
        self.persist()
    }

    /// Remove by id and persist. Clears the active pointer when it pointed
    /// at the removed session; the caller re-selects via [`ensure_active`].
    ///
    /// [`ensure_active`]: SessionStore::ensure_active
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        let removed = self.sessions.len() != before;
        if removed {
            if self.active_id.as_deref() == Some(id) {
                self.active_id = None;
            }
            if let Err(e) = self.persist() {
                warn!("failed to persist sessions after delete: {e}");
            }
        }
        removed
    }

    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    /// Switch to another session, writing the current in-memory registry
    /// back first (last-writer-wins, no merge).
    pub fn switch_to(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.active_id.as_deref() != Some(id) {
            if let Err(e) = self.persist() {
                warn!("failed to persist sessions before switch: {e}");
            }
        }
        self.set_active(id)
    }

    /// Self-healing read of the active session: an empty registry grows a
    /// fresh session, a cleared pointer falls back to the first entry.
    pub fn ensure_active(&mut self) {
        if self.sessions.is_empty() {
            self.create();
            return;
        }
        let valid = self
            .active_id
            .as_deref()
            .is_some_and(|id| self.sessions.iter().any(|s| s.id == id));
        if !valid {
            self.active_id = self.sessions.first().map(|s| s.id.clone());
        }
    }

    /// Write the registry to disk atomically, refusing writes over the
    /// capacity budget before touching the file.
    pub fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec(&self.sessions).map_err(StoreError::Serialize)?;
        if json.len() > self.capacity {
            return Err(StoreError::CapacityExceeded {
                size: json.len(),
                limit: self.capacity,
            });
        }

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = self.path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;

        temp_file.write_all(&json).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Deserialize the persisted registry, dropping entries that do not parse as
/// a session (missing id or title, history not an array of messages).
/// Malformed state degrades; it never crashes the client.
fn load_registry(path: &Path) -> Vec<Session> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return Vec::new(),
    };
    let entries: Vec<Value> = match serde_json::from_slice(&bytes) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("session registry at {} is unreadable: {e}", path.display());
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Session>(entry) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("dropping malformed session entry: {e}");
                None
            }
        })
        .collect()
}

/// Registry location under the platform data directory.
pub fn default_store_path() -> PathBuf {
    let proj_dirs =
        ProjectDirs::from("io", "chinwag", "chinwag").expect("Failed to determine data directory");
    proj_dirs.data_dir().join("sessions.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::WELCOME_MESSAGE;
    use crate::core::message::Message;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("sessions.json"))
    }

    #[test]
    fn create_on_empty_registry_seeds_and_activates() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(store.sessions().is_empty());

        let id = store.create();
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.active_id(), Some(id.as_str()));
        assert_eq!(store.active().unwrap().history[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn create_and_delete_sequences_leave_exactly_one_active() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let a = store.create();
        let b = store.create();
        let c = store.create();

        store.delete(&b);
        store.ensure_active();
        assert_eq!(store.active_id(), Some(c.as_str()));

        store.delete(&c);
        store.ensure_active();
        assert_eq!(store.active_id(), Some(a.as_str()));

        let actives = store
            .sessions()
            .iter()
            .filter(|s| Some(s.id.as_str()) == store.active_id())
            .count();
        assert_eq!(actives, 1);
    }

    #[test]
    fn deleting_the_last_session_triggers_auto_creation() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let id = store.create();

        assert!(store.delete(&id));
        assert!(store.active_id().is_none());

        store.ensure_active();
        let active = store.active().expect("a fresh session exists");
        assert_ne!(active.id, id);
        assert_eq!(active.history[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let id = store.create();
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
    }

    #[test]
    fn set_active_rejects_unknown_ids() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let id = store.create();
        assert!(!store.set_active("nope"));
        assert_eq!(store.active_id(), Some(id.as_str()));
    }

    #[test]
    fn save_then_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        let mut store = SessionStore::new(path.clone());
        store.create();
        store
            .active_mut()
            .unwrap()
            .push(Message::user("first question"));
        store.persist().unwrap();

        let first = fs::read(&path).unwrap();
        let reloaded = SessionStore::new(path.clone());
        reloaded.persist().unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(reloaded.sessions().len(), 1);
        assert_eq!(reloaded.sessions()[0].history.len(), 2);
    }

    #[test]
    fn load_activates_the_first_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        let mut store = SessionStore::new(path.clone());
        let first = store.create();
        let second = store.create();
        store.persist().unwrap();

        let reloaded = SessionStore::new(path);
        assert_eq!(reloaded.active_id(), Some(first.as_str()));
        assert!(reloaded.contains(&second));
    }

    #[test]
    fn malformed_entries_are_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(
            &path,
            r#"[
                {"id":"good","title":"New Chat","history":[{"role":"assistant","content":"hi"}]},
                {"title":"missing id","history":[]},
                {"id":"bad-history","title":"New Chat","history":"nope"},
                42
            ]"#,
        )
        .unwrap();

        let store = SessionStore::new(path);
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, "good");
    }

    #[test]
    fn an_unreadable_registry_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(SessionStore::new(path).sessions().is_empty());
    }

    #[test]
    fn save_upserts_by_id() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let id = store.create();

        let mut changed = store.active().unwrap().clone();
        changed.push(Message::user("hello"));
        store.save(changed).unwrap();

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.get_mut(&id).unwrap().history.len(), 2);
    }

    #[test]
    fn writes_over_capacity_surface_an_error_and_leave_disk_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        let mut store = SessionStore::with_capacity(path.clone(), 32);

        let err = store.save(Session::new()).unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn switch_to_persists_the_outgoing_registry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        let mut store = SessionStore::new(path.clone());

        let a = store.create();
        let b = store.create();
        store.set_active(&a);
        store
            .active_mut()
            .unwrap()
            .push(Message::user("unsaved so far"));

        assert!(store.switch_to(&b));
        assert_eq!(store.active_id(), Some(b.as_str()));

        let reloaded = SessionStore::new(path);
        let saved_a = reloaded.sessions().iter().find(|s| s.id == a).unwrap();
        assert_eq!(saved_a.history.len(), 2);
        assert_eq!(saved_a.history[1].content, "unsaved so far");
    }
}
