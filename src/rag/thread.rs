//! Conversation threads.
//!
//! Threads live in memory for the lifetime of the process; durable storage
//! is left to callers.

use crate::error::{Result, VidragError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Title given to every new thread.
pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// An append-only sequence of turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

impl Thread {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            title: DEFAULT_THREAD_TITLE.to_string(),
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id,
            title: self.title.clone(),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The most recent `n` turns, oldest first.
    pub fn last_turns(&self, n: usize) -> &[ConversationTurn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Id and title of a thread, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: String,
}

/// Threads keyed by id.
#[derive(Default)]
pub struct ThreadStore {
    threads: RwLock<HashMap<Uuid, Thread>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Thread>>> {
        self.threads
            .read()
            .map_err(|e| VidragError::Thread(format!("Thread store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Thread>>> {
        self.threads
            .write()
            .map_err(|e| VidragError::Thread(format!("Thread store lock poisoned: {}", e)))
    }

    /// Create an empty thread and return its summary.
    pub fn create(&self) -> Result<ThreadSummary> {
        let thread = Thread::new();
        let summary = thread.summary();
        self.write()?.insert(thread.id, thread);
        debug!("Created thread {}", summary.id);
        Ok(summary)
    }

    /// Return the thread to talk on, creating it on first use.
    ///
    /// A known `id` is returned as is; an unknown one gets a new empty thread
    /// under that id; `None` gets a fresh id.
    pub fn resolve(&self, id: Option<Uuid>) -> Result<Uuid> {
        let Some(id) = id else {
            return Ok(self.create()?.id);
        };

        let mut threads = self.write()?;
        if !threads.contains_key(&id) {
            threads.insert(id, Thread::with_id(id));
            debug!("Created thread {} on first use", id);
        }
        Ok(id)
    }

    /// All threads, newest first.
    pub fn list(&self) -> Result<Vec<ThreadSummary>> {
        let threads = self.read()?;
        let mut ordered: Vec<&Thread> = threads.values().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(ordered.into_iter().map(Thread::summary).collect())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Thread>> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// Turns of thread `id`, oldest first.
    pub fn history(&self, id: Uuid) -> Result<Vec<ConversationTurn>> {
        self.read()?
            .get(&id)
            .map(|t| t.turns().to_vec())
            .ok_or_else(|| VidragError::Thread(format!("Unknown thread: {}", id)))
    }

    pub fn append(&self, id: Uuid, turn: ConversationTurn) -> Result<()> {
        let mut threads = self.write()?;
        let thread = threads
            .get_mut(&id)
            .ok_or_else(|| VidragError::Thread(format!("Unknown thread: {}", id)))?;
        thread.push(turn);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_turns_keeps_order() {
        let mut thread = Thread::new();
        for i in 0..5 {
            thread.push(ConversationTurn::user(format!("q{}", i)));
        }

        let recent: Vec<&str> = thread.last_turns(3).iter().map(|t| t.content.as_str()).collect();
        assert_eq!(recent, vec!["q2", "q3", "q4"]);
        assert_eq!(thread.last_turns(10).len(), 5);
    }

    #[test]
    fn test_store_append_and_history() {
        let store = ThreadStore::new();
        let id = store.create().unwrap().id;

        store.append(id, ConversationTurn::user("hi")).unwrap();
        store.append(id, ConversationTurn::assistant("hello")).unwrap();

        let history = store.history(id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_resolve_creates_on_first_use() {
        let store = ThreadStore::new();
        let created = store.resolve(None).unwrap();
        assert_eq!(store.resolve(Some(created)).unwrap(), created);
        assert_eq!(store.len().unwrap(), 1);

        let chosen = Uuid::new_v4();
        assert_eq!(store.resolve(Some(chosen)).unwrap(), chosen);
        assert_eq!(store.len().unwrap(), 2);
        assert!(store.history(chosen).unwrap().is_empty());
        assert_eq!(store.get(chosen).unwrap().unwrap().title, DEFAULT_THREAD_TITLE);
    }

    #[test]
    fn test_list_holds_every_thread() {
        let store = ThreadStore::new();
        assert!(store.list().unwrap().is_empty());

        let first = store.create().unwrap();
        let second = store.create().unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first));
        assert!(listed.contains(&second));
        assert!(listed.iter().all(|t| t.title == "New Chat"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationTurn::user("x")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"x"}"#);
    }
}
