// client.rs
//
// The surface the view talks to: session plus todo list plus the derived
// view data. Every todo operation needs a signed-in user and fails before
// touching the backend without one.

use crate::backend::{AuthProvider, TodoRepository, User};
use crate::error::Error;
use crate::query::{self, Selection, Stats};
use crate::session::Session;
use crate::store::TodoStore;
use crate::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use std::sync::Arc;

/// What the view renders for one selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot<'a> {
    pub visible: Vec<&'a Todo>,
    pub stats: Stats,
    pub categories: Vec<String>,
}

pub struct TaskClient {
    session: Session,
    store: TodoStore,
}

impl TaskClient {
    pub fn new(auth: Arc<dyn AuthProvider>, repo: Arc<dyn TodoRepository>) -> Self {
        Self {
            session: Session::new(auth),
            store: TodoStore::new(repo),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    pub fn todos(&self) -> &[Todo] {
        self.store.todos()
    }

    pub fn todo(&self, id: TodoId) -> Option<&Todo> {
        self.store.get(id)
    }

    /// Restores a previous session and, when that works, loads its todos.
    pub async fn check_auth(&mut self) -> Result<(), Error> {
        self.session.check_auth().await;
        if self.session.is_authenticated() {
            self.load().await?;
        }
        Ok(())
    }

    /// Signs in, then loads. A load failure is returned but the session stays.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), Error> {
        self.session.sign_in(email, password).await?;
        self.store.clear();
        self.load().await
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), Error> {
        self.session.sign_up(email, password).await?;
        self.store.clear();
        self.load().await
    }

    pub async fn sign_out(&mut self) -> Result<(), Error> {
        self.store.clear();
        self.session.sign_out().await
    }

    pub async fn load(&mut self) -> Result<(), Error> {
        let user = self.session.require_user()?;
        self.store.load(user).await
    }

    pub async fn add(&mut self, draft: &TodoDraft) -> Result<&Todo, Error> {
        let user = self.session.require_user()?;
        self.store.add(user, draft).await
    }

    pub async fn toggle(&mut self, id: TodoId, completed: bool) -> Result<(), Error> {
        let user = self.session.require_user()?;
        self.store.toggle(user, id, completed).await
    }

    pub async fn update(&mut self, id: TodoId, patch: TodoPatch) -> Result<(), Error> {
        let user = self.session.require_user()?;
        self.store.update(user, id, patch).await
    }

    pub async fn remove(&mut self, id: TodoId) -> Result<(), Error> {
        let user = self.session.require_user()?;
        self.store.remove(user, id).await
    }

    pub fn snapshot(&self, selection: &Selection) -> Snapshot<'_> {
        let todos = self.store.todos();
        let view = query::derive(todos, selection);
        Snapshot {
            visible: view.visible,
            stats: view.stats,
            categories: query::available_categories(todos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryAuth, MemoryTodoRepository};

    #[tokio::test]
    async fn check_auth_loads_remembered_users_todos() {
        let auth = MemoryAuth::new()
            .with_account("me@example.com", "pw")
            .remembering("me@example.com");
        let repo = MemoryTodoRepository::new();
        repo.seed("user-1", Todo::new(1, "Stretch"));

        let mut client = TaskClient::new(Arc::new(auth), Arc::new(repo));
        client.check_auth().await.unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.todos().len(), 1);
    }

    #[tokio::test]
    async fn check_auth_without_session_loads_nothing() {
        let repo = MemoryTodoRepository::new();
        let mut client = TaskClient::new(Arc::new(MemoryAuth::new()), Arc::new(repo.clone()));

        client.check_auth().await.unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn sign_out_empties_the_list() {
        let auth = MemoryAuth::new().with_account("me@example.com", "pw");
        let repo = MemoryTodoRepository::new();
        repo.seed("user-1", Todo::new(1, "Stretch"));
        let mut client = TaskClient::new(Arc::new(auth), Arc::new(repo));

        client.sign_in("me@example.com", "pw").await.unwrap();
        assert_eq!(client.todos().len(), 1);

        client.sign_out().await.unwrap();
        assert!(!client.is_authenticated());
        assert!(client.todos().is_empty());
        assert!(client.snapshot(&Selection::default()).visible.is_empty());
    }
}
