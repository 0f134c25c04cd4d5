//! Persisted conversation history
//!
//! A session is a single JSON file holding every turn exchanged so far. It is
//! read once at the start of a run and replaced wholesale at the end. Concurrent
//! runs against the same file are not coordinated: the last writer wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Who produced a turn.
///
/// Stored on disk as a plain string. Roles this version does not recognise are
/// carried through verbatim so saving never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Model,
    /// Anything else found on disk; kept but never rendered
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Model => "model",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "user" => Self::User,
            "model" | "assistant" => Self::Model,
            _ => Self::Other(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(
        rename = "model",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model_id: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            model_id: None,
        }
    }

    pub fn model(model_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            model_id: Some(model_id.into()),
        }
    }
}

/// Ordered, append-only list of turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop all history. The only operation that removes turns.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Reads and writes the session file at a fixed, injected location
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session. Missing, unreadable or malformed files yield an empty session.
    pub fn load(&self) -> Session {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return Session::new();
            }
            Err(e) => {
                warn!(
                    "Could not read session file {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return Session::new();
            }
        };

        if content.trim().is_empty() {
            debug!("Session file {} is empty", self.path.display());
            return Session::new();
        }

        match serde_json::from_str::<Session>(&content) {
            Ok(session) => {
                debug!(
                    "Loaded session with {} turns from {}",
                    session.len(),
                    self.path.display()
                );
                session
            }
            Err(e) => {
                warn!(
                    "Session file {} is not valid JSON ({}); starting fresh",
                    self.path.display(),
                    e
                );
                Session::new()
            }
        }
    }

    /// Replace the session file with `session`.
    ///
    /// The new content goes to a temporary file next to the target and is then
    /// renamed over it, so a crash mid-write leaves the previous file intact.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| SessionError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(session)?;

        let write_err = |source: std::io::Error| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(
            "Saved session with {} turns to {}",
            session.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_turn_serialization_uses_model_key() {
        let turn = Turn::model("gpt-5.2", "hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "model", "content": "hello", "model": "gpt-5.2"})
        );

        let user = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(user, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_unknown_role_is_tolerated() {
        let s: Session = serde_json::from_str(
            r#"{"turns": [
                {"role": "system", "content": "x"},
                {"role": "assistant", "content": "y", "model": "m"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(s.turns[0].role, Role::Other("system".to_string()));
        assert_eq!(s.turns[1].role, Role::Model);
    }

    #[test]
    fn test_unknown_role_survives_append_and_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"turns": [{"role": "system", "content": "keep me"}]}"#,
        )
        .unwrap();
        let store = SessionStore::new(&path);

        let mut session = store.load();
        session.push(Turn::user("next"));
        store.save(&session).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw["turns"][0],
            serde_json::json!({"role": "system", "content": "keep me"})
        );
        assert_eq!(raw["turns"][1]["role"], "user");
        assert_eq!(store.load().turns[0].role, Role::Other("system".to_string()));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("nope").join("session.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(SessionStore::new(&path).load().is_empty());

        std::fs::write(&path, "").unwrap();
        assert!(SessionStore::new(&path).load().is_empty());

        std::fs::write(&path, r#"{"turns": 42}"#).unwrap();
        assert!(SessionStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_save_creates_parents_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache").join("multichat").join("session.json");
        let store = SessionStore::new(&path);

        let mut session = Session::new();
        session.push(Turn::user("hi"));
        session.push(Turn::model("claude-opus-4-5", "hello there"));
        store.save(&session).unwrap();

        assert!(path.exists());
        assert_eq!(store.load(), session);
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.json"));

        let mut first = Session::new();
        first.push(Turn::user("one"));
        first.push(Turn::user("two"));
        store.save(&first).unwrap();

        let mut second = Session::new();
        second.push(Turn::user("three"));
        store.save(&second).unwrap();

        assert_eq!(store.load().turns, vec![Turn::user("three")]);
        let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary files should not be left behind");
    }

    #[test]
    fn test_save_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // Parent "directory" is a regular file
        let store = SessionStore::new(blocker.join("session.json"));
        let mut session = Session::new();
        session.push(Turn::user("kept"));
        assert!(store.save(&session).is_err());
        assert_eq!(session.len(), 1);
    }
}
