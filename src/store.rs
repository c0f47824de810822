// store.rs

use crate::backend::{TodoRepository, User};
use crate::error::{BackendError, Error};
use crate::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use std::sync::Arc;

/// The signed-in user's todos, changed only after the repository confirms.
///
/// A failed call leaves the list exactly as it was.
pub struct TodoStore {
    repo: Arc<dyn TodoRepository>,
    todos: Vec<Todo>,
}

impl TodoStore {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self {
            repo,
            todos: Vec::new(),
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn clear(&mut self) {
        self.todos.clear();
    }

    /// Replaces the whole list with what the repository holds.
    pub async fn load(&mut self, user: &User) -> Result<(), Error> {
        let todos = self.repo.list(user).await.map_err(|e| {
            tracing::warn!(error = %e, "loading todos failed");
            Error::Load(e.to_string())
        })?;
        tracing::info!(count = todos.len(), "loaded todos");
        self.todos = todos;
        Ok(())
    }

    /// Creates a todo and puts it first.
    pub async fn add(&mut self, user: &User, draft: &TodoDraft) -> Result<&Todo, Error> {
        let fields = draft.normalize()?;
        let todo = self
            .repo
            .create(user, &fields)
            .await
            .map_err(|e| mutation_error("create", e))?;
        tracing::debug!(id = todo.id, "created todo");
        // a backend that reuses ids would break uniqueness; the newer record wins
        self.todos.retain(|t| t.id != todo.id);
        self.todos.insert(0, todo);
        Ok(&self.todos[0])
    }

    pub async fn toggle(&mut self, user: &User, id: TodoId, completed: bool) -> Result<(), Error> {
        self.patch(user, id, TodoPatch::completed(completed)).await
    }

    pub async fn update(&mut self, user: &User, id: TodoId, patch: TodoPatch) -> Result<(), Error> {
        let patch = patch.normalized()?;
        if patch.is_empty() {
            return Ok(());
        }
        self.patch(user, id, patch).await
    }

    pub async fn remove(&mut self, user: &User, id: TodoId) -> Result<(), Error> {
        self.repo
            .delete(user, id)
            .await
            .map_err(|e| mutation_error("delete", e))?;
        self.todos.retain(|t| t.id != id);
        tracing::debug!(id, "deleted todo");
        Ok(())
    }

    async fn patch(&mut self, user: &User, id: TodoId, patch: TodoPatch) -> Result<(), Error> {
        let updated = self
            .repo
            .update(user, id, &patch)
            .await
            .map_err(|e| mutation_error("update", e))?;
        match self.todos.iter_mut().find(|t| t.id == id) {
            Some(slot) => *slot = updated,
            None => tracing::warn!(id, "updated todo is not in the local list"),
        }
        Ok(())
    }
}

fn mutation_error(op: &str, e: BackendError) -> Error {
    tracing::warn!(error = %e, op, "todo mutation failed");
    match e {
        BackendError::NotFound(_) => Error::Mutation(format!("Failed to {} todo: it no longer exists", op)),
        other => Error::Mutation(format!("Failed to {} todo: {}", op, other)),
    }
}
