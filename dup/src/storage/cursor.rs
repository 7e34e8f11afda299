use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::vfs::ROOT_ID;

const STATE_FILE_NAME: &str = "state.json";
const FOLDER_ID_KEY: &str = "current_folder_id";
const PATH_KEY: &str = "current_path";

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("failed to write cursor state: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode cursor state: {0}")]
    Json(#[from] serde_json::Error),
}

/// The session's current folder and its cached absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub current_folder_id: String,
    pub current_path: String,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            current_folder_id: ROOT_ID.to_string(),
            current_path: "/".to_string(),
        }
    }
}

/// Persisted cursor. Both fields are only ever written together.
pub trait CursorStore {
    /// Current cursor, or the root default when nothing usable is stored.
    fn load(&self) -> Cursor;

    fn set_current_folder(&self, id: &str, path: &str) -> Result<(), CursorError>;
}

/// Cursor kept in `state.json`. Other keys in the file are preserved.
///
/// Reads and writes are not locked; concurrent invocations race and the last
/// writer wins.
pub struct JsonCursorStore {
    path: PathBuf,
}

impl JsonCursorStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(STATE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&self) -> Option<Map<String, Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cursor state unreadable, using root");
                return None;
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "cursor state is not an object, using root");
                None
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cursor state is corrupt, using root");
                None
            }
        }
    }
}

impl CursorStore for JsonCursorStore {
    fn load(&self) -> Cursor {
        let Some(record) = self.read_record() else {
            return Cursor::default();
        };
        let defaults = Cursor::default();
        let field = |key: &str, default: String| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(default)
        };
        Cursor {
            current_folder_id: field(FOLDER_ID_KEY, defaults.current_folder_id),
            current_path: field(PATH_KEY, defaults.current_path),
        }
    }

    fn set_current_folder(&self, id: &str, path: &str) -> Result<(), CursorError> {
        let mut record = self.read_record().unwrap_or_default();
        record.insert(FOLDER_ID_KEY.to_string(), Value::String(id.to_string()));
        record.insert(PATH_KEY.to_string(), Value::String(path.to_string()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&Value::Object(record))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(id, path, "cursor updated");
        Ok(())
    }
}

/// Cursor held in memory, for tests and embedding.
#[derive(Default)]
pub struct MemoryCursorStore {
    cursor: Mutex<Option<Cursor>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Cursor {
        self.cursor
            .lock()
            .ok()
            .and_then(|cursor| cursor.clone())
            .unwrap_or_default()
    }

    fn set_current_folder(&self, id: &str, path: &str) -> Result<(), CursorError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| io::Error::other("cursor lock poisoned"))?;
        *cursor = Some(Cursor {
            current_folder_id: id.to_string(),
            current_path: path.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_record_defaults_to_root() {
        let dir = tempdir().unwrap();
        let store = JsonCursorStore::new(dir.path());
        assert_eq!(store.load(), Cursor::default());
        assert_eq!(store.load().current_path, "/");
    }

    #[test]
    fn writes_both_fields_and_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let store = JsonCursorStore::new(dir.path());
        std::fs::write(store.path(), r#"{"theme": "dark", "current_path": "/stale"}"#).unwrap();

        store.set_current_folder("f1", "/Docs").unwrap();

        let loaded = store.load();
        assert_eq!(loaded.current_folder_id, "f1");
        assert_eq!(loaded.current_path, "/Docs");
        let raw: Value = serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
    }

    #[test]
    fn corrupt_record_falls_back_to_root() {
        let dir = tempdir().unwrap();
        let store = JsonCursorStore::new(dir.path());
        std::fs::write(store.path(), b"{\"current_folder_id\": ").unwrap();

        assert_eq!(store.load(), Cursor::default());

        store.set_current_folder("f2", "/Work").unwrap();
        assert_eq!(store.load().current_folder_id, "f2");
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCursorStore::new();
        assert_eq!(store.load(), Cursor::default());
        store.set_current_folder("f1", "/Docs").unwrap();
        assert_eq!(
            store.load(),
            Cursor {
                current_folder_id: "f1".into(),
                current_path: "/Docs".into(),
            }
        );
    }
}
