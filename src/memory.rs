//! Process-local todo store, used by `--memory` and by tests.

use crate::storage::{select, StorageError, TodoFilter, TodoStore};
use crate::todo::{NewTodo, Todo, TodoPatch};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Todo>>,
}

impl MemoryStore {
    pub fn with_seed(seed: impl IntoIterator<Item = NewTodo>) -> Self {
        let items = seed.into_iter().map(Todo::from_new).collect();
        Self {
            items: RwLock::new(items),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Todo>>, StorageError> {
        self.items
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Todo>>, StorageError> {
        self.items
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))
    }
}

impl TodoStore for MemoryStore {
    fn find(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StorageError> {
        Ok(select(self.read()?.clone(), filter))
    }

    fn get(&self, id: &str) -> Result<Option<Todo>, StorageError> {
        Ok(self.read()?.iter().find(|t| t.id == id).cloned())
    }

    fn create(&self, new: NewTodo) -> Result<Todo, StorageError> {
        let todo = Todo::from_new(new);
        self.write()?.push(todo.clone());
        Ok(todo)
    }

    fn update(&self, id: &str, patch: TodoPatch) -> Result<Option<Todo>, StorageError> {
        let mut items = self.write()?;
        let Some(todo) = items.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        todo.apply(patch);
        Ok(Some(todo.clone()))
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut items = self.write()?;
        let before = items.len();
        items.retain(|t| t.id != id);
        Ok(items.len() != before)
    }
}
