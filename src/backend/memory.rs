// backend/memory.rs
//
// In-memory ports for tests. Both can be told to fail their next call so
// error paths can be exercised without a server.

use super::{AuthProvider, TodoRepository, User};
use crate::error::BackendError;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, BackendError> {
    m.lock()
        .map_err(|_| BackendError::Decode("mock state poisoned".to_string()))
}

#[derive(Default)]
struct RepoState {
    next_id: TodoId,
    rows: Vec<(String, Todo)>,
    fail_next: Option<BackendError>,
    calls: usize,
}

impl RepoState {
    fn enter(&mut self) -> Result<(), BackendError> {
        self.calls += 1;
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Todo rows kept per user id, with ids counting up from 1.
#[derive(Clone, Default)]
pub struct MemoryTodoRepository {
    state: Arc<Mutex<RepoState>>,
}

impl MemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `todo` for `user_id` as-is, keeping its id.
    pub fn seed(&self, user_id: &str, todo: Todo) {
        if let Ok(mut state) = self.state.lock() {
            state.next_id = state.next_id.max(todo.id);
            state.rows.push((user_id.to_string(), todo));
        }
    }

    /// Makes the next call return `err`.
    pub fn fail_next(&self, err: BackendError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(err);
        }
    }

    /// Number of port calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().map(|s| s.calls).unwrap_or_default()
    }

    pub fn rows_for(&self, user_id: &str) -> Vec<Todo> {
        self.state
            .lock()
            .map(|s| {
                s.rows
                    .iter()
                    .filter(|(owner, _)| owner == user_id)
                    .map(|(_, t)| t.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TodoRepository for MemoryTodoRepository {
    async fn list(&self, user: &User) -> Result<Vec<Todo>, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        Ok(state
            .rows
            .iter()
            .filter(|(owner, _)| *owner == user.id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn create(&self, user: &User, fields: &NewTodo) -> Result<Todo, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        state.next_id += 1;
        let todo = Todo {
            id: state.next_id,
            title: fields.title.clone(),
            completed: fields.completed,
            priority: fields.priority,
            category: fields.category.clone(),
            due_date: fields.due_date,
        };
        state.rows.push((user.id.clone(), todo.clone()));
        Ok(todo)
    }

    async fn update(
        &self,
        user: &User,
        id: TodoId,
        fields: &TodoPatch,
    ) -> Result<Todo, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        let row = state
            .rows
            .iter_mut()
            .find(|(owner, t)| *owner == user.id && t.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("todo {}", id)))?;
        row.1 = fields.apply(&row.1);
        Ok(row.1.clone())
    }

    async fn delete(&self, user: &User, id: TodoId) -> Result<(), BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        let before = state.rows.len();
        state.rows.retain(|(owner, t)| !(*owner == user.id && t.id == id));
        if state.rows.len() == before {
            return Err(BackendError::NotFound(format!("todo {}", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
struct AuthState {
    // email -> (password, user id)
    accounts: HashMap<String, (String, String)>,
    current: Option<User>,
    fail_next: Option<BackendError>,
    calls: usize,
}

impl AuthState {
    fn enter(&mut self) -> Result<(), BackendError> {
        self.calls += 1;
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn user_for(email: &str, id: &str) -> User {
        User::new(id, Some(email.to_string())).with_token(format!("token-for-{}", id))
    }
}

/// Password accounts held in memory; user ids are `user-1`, `user-2`, ...
#[derive(Clone, Default)]
pub struct MemoryAuth {
    state: Arc<Mutex<AuthState>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account; ids are handed out in registration order.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let id = format!("user-{}", state.accounts.len() + 1);
            state
                .accounts
                .insert(email.to_string(), (password.to_string(), id));
        }
        self
    }

    /// Pretends `email` signed in during a previous run.
    pub fn remembering(self, email: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let current = state
                .accounts
                .get(email)
                .map(|(_, id)| AuthState::user_for(email, id));
            state.current = current;
        }
        self
    }

    pub fn fail_next(&self, err: BackendError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(err);
        }
    }

    pub fn calls(&self) -> usize {
        self.state.lock().map(|s| s.calls).unwrap_or_default()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        if state.accounts.contains_key(email) {
            return Err(BackendError::Status {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let id = format!("user-{}", state.accounts.len() + 1);
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), id.clone()));
        let user = AuthState::user_for(email, &id);
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        let user = match state.accounts.get(email) {
            Some((stored, id)) if stored == password => AuthState::user_for(email, id),
            _ => {
                return Err(BackendError::Status {
                    status: 400,
                    message: "Invalid login credentials".to_string(),
                });
            }
        };
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self, _user: &User) -> Result<(), BackendError> {
        let mut state = lock(&self.state)?;
        state.current = None;
        state.enter()
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        let mut state = lock(&self.state)?;
        state.enter()?;
        Ok(state.current.clone())
    }
}
