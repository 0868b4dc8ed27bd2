//! Todo persistence.
//!
//! [`TodoStore`] is the seam every consumer goes through. [`Storage`] keeps
//! records in sled as JSON values keyed by id; [`crate::memory::MemoryStore`]
//! is the process-local variant.

use crate::todo::{summary_order, NewTodo, Todo, TodoPatch};
use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Inclusive bounds on a todo's due date. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueDateRange {
    pub gte: Option<NaiveDate>,
    pub lte: Option<NaiveDate>,
}

impl DueDateRange {
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    /// A todo without a due date only matches an unbounded range.
    pub fn contains(&self, due: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(due) = due else {
            return false;
        };
        self.gte.is_none_or(|start| due >= start) && self.lte.is_none_or(|end| due <= end)
    }
}

/// Query filter understood by every [`TodoStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub due_date: DueDateRange,
}

impl TodoFilter {
    pub fn due_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            due_date: DueDateRange {
                gte: start,
                lte: end,
            },
        }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        self.due_date.contains(todo.due_date)
    }
}

/// Repository of todo records.
///
/// `find` returns matches ordered by priority descending, then due date
/// ascending; equal keys keep creation order.
pub trait TodoStore: Send + Sync {
    fn find(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StorageError>;
    fn get(&self, id: &str) -> Result<Option<Todo>, StorageError>;
    fn create(&self, new: NewTodo) -> Result<Todo, StorageError>;
    /// Returns `None` when no todo has this id.
    fn update(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>, StorageError>;
    /// Returns whether a todo was removed.
    fn delete(&self, id: &str) -> Result<bool, StorageError>;
}

/// Filter then order a snapshot the way `TodoStore::find` promises.
pub(crate) fn select(mut todos: Vec<Todo>, filter: &TodoFilter) -> Vec<Todo> {
    todos.retain(|todo| filter.matches(todo));
    todos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    todos.sort_by(summary_order);
    todos
}

/// Sled-based storage for todos.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn put(&self, todo: &Todo) -> Result<(), StorageError> {
        let value = serde_json::to_vec(todo)?;
        self.db.insert(todo.id.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Todo>, StorageError> {
        let mut results = Vec::new();
        for item in self.db.iter() {
            let (_key, value) = item?;
            results.push(serde_json::from_slice(&value)?);
        }
        Ok(results)
    }

    /// Get the number of stored todos
    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.db.len()
    }
}

impl TodoStore for Storage {
    fn find(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StorageError> {
        Ok(select(self.list_all()?, filter))
    }

    fn get(&self, id: &str) -> Result<Option<Todo>, StorageError> {
        match self.db.get(id.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn create(&self, new: NewTodo) -> Result<Todo, StorageError> {
        let todo = Todo::from_new(new);
        self.put(&todo)?;
        Ok(todo)
    }

    fn update(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>, StorageError> {
        let Some(mut todo) = self.get(id)? else {
            return Ok(None);
        };
        todo.apply(patch);
        self.put(&todo)?;
        Ok(Some(todo))
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let existed = self.db.remove(id.as_bytes())?.is_some();
        self.db.flush()?;
        Ok(existed)
    }
}
