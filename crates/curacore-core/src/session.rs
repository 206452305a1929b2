//! Session store
//!
//! Holds the signed-in [`Identity`] for the whole process and keeps a durable
//! copy of it under a fixed storage key, so a restart resumes the session.
//! The store is created once at startup and handed by reference to whatever
//! needs to read it (route guard, navigation filter, views).

use crate::identity::Identity;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Storage key of the persisted identity record
pub const SESSION_KEY: &str = "curacore_user";

/// Durable key/value storage for the session record
pub trait SessionStorage {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// In-process storage, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a raw record, e.g. to simulate a previous run
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(Option<&Identity>)>;

pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: Option<Identity>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl SessionStore {
    /// Restore the session from storage.
    ///
    /// A missing, unreadable or corrupt record yields a signed-out store.
    pub fn load(storage: impl SessionStorage + 'static) -> Self {
        let current = match storage.read(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => {
                    info!(user_id = identity.subject_id, "Restored session");
                    Some(identity)
                }
                Err(e) => {
                    warn!("Ignoring corrupt session record: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read session record: {:#}", e);
                None
            }
        };

        Self {
            storage: Box::new(storage),
            current,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Replace the active identity.
    ///
    /// The in-memory session always changes and listeners are always
    /// notified; an error only means the durable copy could not be written.
    pub fn set(&mut self, identity: Identity) -> Result<()> {
        let persisted = serde_json::to_string(&identity)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.storage.write(SESSION_KEY, &raw));

        info!(user_id = identity.subject_id, role = %identity.role, "Signed in");
        self.current = Some(identity);
        self.notify();
        persisted
    }

    /// Drop the active identity and its durable copy
    pub fn clear(&mut self) -> Result<()> {
        let removed = self.storage.remove(SESSION_KEY);

        if let Some(identity) = self.current.take() {
            info!(user_id = identity.subject_id, "Signed out");
        }
        self.notify();
        removed
    }

    /// Register a listener called synchronously after every `set`/`clear`
    pub fn subscribe(&mut self, listener: impl Fn(Option<&Identity>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(self.current.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use std::rc::Rc;

    fn patient() -> Identity {
        Identity {
            subject_id: 1,
            display_name: "Pugazh Mani".to_string(),
            role: Role::Patient,
            email: "pugazh@example.com".to_string(),
        }
    }

    #[test]
    fn test_load_without_record_is_signed_out() {
        let store = SessionStore::load(MemoryStorage::new());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_corrupt_record_fails_open() {
        let store = SessionStore::load(MemoryStorage::with_entry(SESSION_KEY, "{not json"));
        assert!(store.current().is_none());

        let store = SessionStore::load(MemoryStorage::with_entry(
            SESSION_KEY,
            r#"{"user_id": 1, "full_name": "A", "email": "a@b", "role": "admin"}"#,
        ));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_set_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = SessionStore::load(FileStorage::new(dir.path()));
        store.set(patient()).unwrap();
        assert!(dir.path().join("curacore_user.json").exists());

        let reloaded = SessionStore::load(FileStorage::new(dir.path()));
        assert_eq!(reloaded.current(), Some(&patient()));
    }

    #[test]
    fn test_clear_removes_durable_copy() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = SessionStore::load(FileStorage::new(dir.path()));
        store.set(patient()).unwrap();
        store.clear().unwrap();
        assert!(store.current().is_none());
        assert!(!dir.path().join("curacore_user.json").exists());

        let reloaded = SessionStore::load(FileStorage::new(dir.path()));
        assert!(reloaded.current().is_none());
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("curacore_user.json"), "garbage").unwrap();

        let store = SessionStore::load(FileStorage::new(dir.path()));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_listeners_are_notified_synchronously() {
        let seen: Rc<RefCell<Vec<Option<i64>>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = SessionStore::load(MemoryStorage::new());

        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |identity| {
            sink.borrow_mut().push(identity.map(|i| i.subject_id));
        });

        store.set(patient()).unwrap();
        assert_eq!(*seen.borrow(), vec![Some(1)]);

        store.clear().unwrap();
        assert_eq!(*seen.borrow(), vec![Some(1), None]);

        store.unsubscribe(id);
        store.set(patient()).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }
}
