// backend/mod.rs
//
// Ports the client talks to, and the factory that picks the concrete
// implementation from configuration.

pub mod hosted;
mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rest;

use crate::config::{BackendKind, Config};
use crate::error::{BackendError, Error};
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use hosted::{HostedAuth, HostedTodoRepository};
pub use rest::RestTodoRepository;

/// Identity handed out by an [`AuthProvider`].
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    /// Bearer token for user-scoped backends.
    pub access_token: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Email when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field(
                "access_token",
                &self.access_token.as_deref().map(http::mask_token),
            )
            .finish()
    }
}

/// CRUD against wherever todos are stored.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn list(&self, user: &User) -> Result<Vec<Todo>, BackendError>;

    /// Returns the stored record, carrying the id the backend assigned.
    async fn create(&self, user: &User, fields: &NewTodo) -> Result<Todo, BackendError>;

    async fn update(
        &self,
        user: &User,
        id: TodoId,
        fields: &TodoPatch,
    ) -> Result<Todo, BackendError>;

    async fn delete(&self, user: &User, id: TodoId) -> Result<(), BackendError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError>;

    async fn sign_out(&self, user: &User) -> Result<(), BackendError>;

    /// The signed-in user from a previous run, if any.
    async fn current_user(&self) -> Result<Option<User>, BackendError>;
}

/// Builds the repository selected by `config.backend`.
pub fn build_repository(config: &Config) -> Result<Arc<dyn TodoRepository>, Error> {
    let client = http::client(config)?;
    let repo: Arc<dyn TodoRepository> = match config.backend {
        BackendKind::Rest => Arc::new(RestTodoRepository::new(client, &config.rest)),
        BackendKind::Hosted => Arc::new(HostedTodoRepository::new(client, &config.hosted)),
    };
    tracing::info!(backend = ?config.backend, "todo repository ready");
    Ok(repo)
}

/// Builds the hosted auth provider; `session_file` keeps the token between runs.
pub fn build_auth(
    config: &Config,
    session_file: Option<PathBuf>,
) -> Result<Arc<dyn AuthProvider>, Error> {
    let client = http::client(config)?;
    Ok(Arc::new(HostedAuth::new(client, &config.hosted, session_file)))
}
