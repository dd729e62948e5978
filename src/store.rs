//! Local key-value store.
//!
//! Single persistence layer for everything the app keeps on this machine:
//! local-origin tasks, the suppressed remote id set, the chat transcript, and
//! the user profile. Consumers receive a handle instead of reading storage ad
//! hoc, so every record has exactly one owner for its layout.
//!
//! Records are JSON, one file per key under the platform data directory. An
//! in-memory backend backs tests and systems without a data dir. Keys are
//! initialized lazily: a missing file reads as the record's default.
//!
//! Read-modify-write sequences are serialized within one process only.
//! Concurrent writers from separate processes may race; accepted limitation.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::TaskError;
use crate::types::{ChatMessage, Priority, Task, TaskId, UserProfile};

const KEY_LOCAL_TODOS: &str = "local_todos";
const KEY_DELETED_REMOTE_IDS: &str = "deleted_remote_ids";
const KEY_CHAT_MESSAGES: &str = "chat_messages";
const KEY_USER_PROFILE: &str = "user_profile";
const KEY_NEXT_LOCAL_ID: &str = "next_local_id";

enum Backend {
    Disk(PathBuf),
    Memory(Mutex<HashMap<String, String>>),
}

pub struct LocalStore {
    backend: Backend,
    /// Serializes read-modify-write sequences against the disk backend.
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Open the store at the platform-default location.
    pub fn open_default() -> Result<Self, TaskError> {
        let root = match dirs::data_local_dir() {
            Some(data_dir) => data_dir.join("doeet").join("store"),
            None => PathBuf::from("cache").join("store"),
        };
        Self::open(root)
    }

    /// Open the store rooted at an explicit directory.
    pub fn open(root: PathBuf) -> Result<Self, TaskError> {
        fs::create_dir_all(&root)
            .map_err(|e| TaskError::Storage(format!("failed to create store dir: {}", e)))?;
        Ok(Self {
            backend: Backend::Disk(root),
            write_lock: Mutex::new(()),
        })
    }

    /// Volatile store for tests and environments without a data directory.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
            write_lock: Mutex::new(()),
        }
    }

    // ============================================
    // Raw access
    // ============================================

    fn get_raw(&self, key: &str) -> Result<Option<String>, TaskError> {
        match &self.backend {
            Backend::Disk(root) => {
                let path = root.join(format!("{}.json", key));
                match fs::read_to_string(&path) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(TaskError::Storage(format!(
                        "failed to read {}: {}",
                        path.display(),
                        e
                    ))),
                }
            }
            Backend::Memory(map) => {
                let map = map
                    .lock()
                    .map_err(|_| TaskError::Storage("store poisoned".into()))?;
                Ok(map.get(key).cloned())
            }
        }
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), TaskError> {
        debug!(key, bytes = value.len(), "store write");
        match &self.backend {
            Backend::Disk(root) => {
                let path = root.join(format!("{}.json", key));
                fs::write(&path, value).map_err(|e| {
                    TaskError::Storage(format!("failed to write {}: {}", path.display(), e))
                })
            }
            Backend::Memory(map) => {
                let mut map = map
                    .lock()
                    .map_err(|_| TaskError::Storage("store poisoned".into()))?;
                map.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    fn remove_raw(&self, key: &str) -> Result<(), TaskError> {
        match &self.backend {
            Backend::Disk(root) => {
                let path = root.join(format!("{}.json", key));
                match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(TaskError::Storage(format!(
                        "failed to delete {}: {}",
                        path.display(),
                        e
                    ))),
                }
            }
            Backend::Memory(map) => {
                let mut map = map
                    .lock()
                    .map_err(|_| TaskError::Storage("store poisoned".into()))?;
                map.remove(key);
                Ok(())
            }
        }
    }

    fn get_json<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, TaskError> {
        match self.get_raw(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(T::default()),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), TaskError> {
        self.set_raw(key, serde_json::to_string(value)?)
    }

    // ============================================
    // Local tasks
    // ============================================

    pub fn local_tasks(&self) -> Result<Vec<Task>, TaskError> {
        self.get_json(KEY_LOCAL_TODOS)
    }

    pub fn set_local_tasks(&self, tasks: &[Task]) -> Result<(), TaskError> {
        self.set_json(KEY_LOCAL_TODOS, &tasks)
    }

    /// Create a local-origin task with a freshly allocated id.
    pub fn add_local_task(
        &self,
        todo: impl Into<String>,
        priority: Option<Priority>,
    ) -> Result<Task, TaskError> {
        let _guard = self.write_lock.lock();
        let next: u64 = self.get_json(KEY_NEXT_LOCAL_ID)?;
        let id = next.max(1);
        self.set_json(KEY_NEXT_LOCAL_ID, &(id + 1))?;

        let task = Task {
            id: TaskId::Local(id),
            todo: todo.into(),
            completed: false,
            priority,
            created_at: Some(time::OffsetDateTime::now_utc().unix_timestamp()),
        };
        let mut tasks = self.local_tasks()?;
        tasks.push(task.clone());
        self.set_local_tasks(&tasks)?;
        Ok(task)
    }

    /// Set the completion flag on a local task in place. Returns false when
    /// no task with that id exists.
    pub fn update_local_task(&self, id: u64, completed: bool) -> Result<bool, TaskError> {
        let _guard = self.write_lock.lock();
        let mut tasks = self.local_tasks()?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == TaskId::Local(id)) else {
            return Ok(false);
        };
        task.completed = completed;
        self.set_local_tasks(&tasks)?;
        Ok(true)
    }

    pub fn remove_local_tasks(&self, ids: &[u64]) -> Result<(), TaskError> {
        let _guard = self.write_lock.lock();
        let mut tasks = self.local_tasks()?;
        tasks.retain(|t| !ids.iter().any(|&id| t.id == TaskId::Local(id)));
        self.set_local_tasks(&tasks)
    }

    // ============================================
    // Suppressed remote ids
    // ============================================

    pub fn deleted_remote_ids(&self) -> Result<BTreeSet<u32>, TaskError> {
        self.get_json(KEY_DELETED_REMOTE_IDS)
    }

    /// Record remote ids as deleted. The set only grows.
    pub fn suppress_remote_ids(&self, ids: &[u32]) -> Result<(), TaskError> {
        let _guard = self.write_lock.lock();
        let mut deleted = self.deleted_remote_ids()?;
        deleted.extend(ids.iter().copied());
        self.set_json(KEY_DELETED_REMOTE_IDS, &deleted)
    }

    // ============================================
    // Chat transcript
    // ============================================

    pub fn chat_messages(&self) -> Result<Vec<ChatMessage>, TaskError> {
        self.get_json(KEY_CHAT_MESSAGES)
    }

    pub fn push_chat_message(&self, message: ChatMessage) -> Result<(), TaskError> {
        let _guard = self.write_lock.lock();
        let mut messages = self.chat_messages()?;
        messages.push(message);
        self.set_json(KEY_CHAT_MESSAGES, &messages)
    }

    pub fn clear_chat(&self) -> Result<(), TaskError> {
        self.remove_raw(KEY_CHAT_MESSAGES)
    }

    // ============================================
    // User profile
    // ============================================

    pub fn user_profile(&self) -> Result<Option<UserProfile>, TaskError> {
        self.get_json(KEY_USER_PROFILE)
    }

    pub fn set_user_profile(&self, profile: &UserProfile) -> Result<(), TaskError> {
        self.set_json(KEY_USER_PROFILE, &Some(profile))
    }

    pub fn clear_user_profile(&self) -> Result<(), TaskError> {
        self.remove_raw(KEY_USER_PROFILE)
    }
}
