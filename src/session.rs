use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;

use crate::models::Identity;

const KEY_IDENTITY: &str = "identity";
const KEY_RESUME_ID: &str = "current_resume_id";
const KEY_SKILLS: &str = "skills";

/// Who is using the client and which uploaded resume their matches come
/// from. Built once at startup and handed to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub resume_id: Option<String>,
    pub skills: Vec<String>,
}

impl Session {
    pub fn with_resume(resume_id: &str) -> Self {
        Self {
            resume_id: Some(resume_id.to_string()),
            ..Default::default()
        }
    }

    /// The resume reference, treating a blank value the same as none.
    pub fn resume_ref(&self) -> Option<&str> {
        self.resume_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

/// Small key/value table in the user's data directory holding the session.
pub struct SessionStore {
    conn: Connection,
    path: PathBuf,
}

impl SessionStore {
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open session store at {}", path.display()))?;
        let store = Self { conn, path };
        store.init()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        data_dir().join("session.db")
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn load(&self) -> Result<Session> {
        let identity = match self.get(KEY_IDENTITY)? {
            Some(raw) => Some(
                serde_json::from_str::<Identity>(&raw).context("Stored identity is corrupt")?,
            ),
            None => None,
        };

        // A corrupt skills list is not worth failing over.
        let skills = self
            .get(KEY_SKILLS)?
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .unwrap_or_default();

        Ok(Session {
            identity,
            resume_id: self.get(KEY_RESUME_ID)?,
            skills,
        })
    }

    pub fn set_identity(&self, identity: &Identity) -> Result<()> {
        self.set(KEY_IDENTITY, &serde_json::to_string(identity)?)
    }

    pub fn set_resume(&self, resume_id: &str, skills: &[String]) -> Result<()> {
        self.set(KEY_RESUME_ID, resume_id)?;
        self.set(KEY_SKILLS, &serde_json::to_string(skills)?)
    }

    pub fn clear_resume(&self) -> Result<()> {
        self.delete(KEY_RESUME_ID)?;
        self.delete(KEY_SKILLS)
    }

    /// Logging out forgets the resume as well; the next user must upload their own.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM session WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO session (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM session WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// XDG data directory, or the working directory when there is none.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "matchdeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "651a2b3c".to_string(),
            full_name: "Sam Rivera".to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    #[test]
    fn test_empty_store_loads_default_session() {
        let store = SessionStore::open_in_memory().unwrap();
        let session = store.load().unwrap();
        assert_eq!(session, Session::default());
        assert!(session.resume_ref().is_none());
    }

    #[test]
    fn test_identity_and_resume_round_trip() {
        let store = SessionStore::open_in_memory().unwrap();
        store.set_identity(&identity()).unwrap();
        store.set_resume("abc123", &["rust".to_string(), "sql".to_string()]).unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.identity, Some(identity()));
        assert_eq!(session.resume_ref(), Some("abc123"));
        assert_eq!(session.skills, vec!["rust", "sql"]);
    }

    #[test]
    fn test_set_resume_replaces_previous() {
        let store = SessionStore::open_in_memory().unwrap();
        store.set_resume("first", &[]).unwrap();
        store.set_resume("second", &["go".to_string()]).unwrap();
        let session = store.load().unwrap();
        assert_eq!(session.resume_ref(), Some("second"));
        assert_eq!(session.skills, vec!["go"]);
    }

    #[test]
    fn test_clear_resume_keeps_identity() {
        let store = SessionStore::open_in_memory().unwrap();
        store.set_identity(&identity()).unwrap();
        store.set_resume("abc123", &["rust".to_string()]).unwrap();
        store.clear_resume().unwrap();

        let session = store.load().unwrap();
        assert!(session.identity.is_some());
        assert!(session.resume_id.is_none());
        assert!(session.skills.is_empty());
    }

    #[test]
    fn test_clear_forgets_everything() {
        let store = SessionStore::open_in_memory().unwrap();
        store.set_identity(&identity()).unwrap();
        store.set_resume("abc123", &[]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn test_blank_resume_reference_counts_as_absent() {
        let session = Session::with_resume("   ");
        assert!(session.resume_ref().is_none());
    }
}
