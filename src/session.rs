// session.rs

use crate::backend::{AuthProvider, User};
use crate::error::{BackendError, Error};
use std::sync::Arc;

/// Who is signed in. Authenticated exactly when a user is held.
pub struct Session {
    auth: Arc<dyn AuthProvider>,
    user: Option<User>,
}

impl Session {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth, user: None }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_user(&self) -> Result<&User, Error> {
        self.user.as_ref().ok_or_else(Error::not_authenticated)
    }

    /// Restores a previous session. Failures are logged and leave the
    /// session signed out.
    pub async fn check_auth(&mut self) {
        match self.auth.current_user().await {
            Ok(user) => {
                if let Some(u) = &user {
                    tracing::info!(user = %u.display_name(), "restored session");
                }
                self.user = user;
            }
            Err(e) => {
                tracing::warn!(error = %e, "auth check failed");
                self.user = None;
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), Error> {
        check_credentials(email, password)?;
        let user = self.auth.sign_in(email.trim(), password).await.map_err(auth_error)?;
        tracing::info!(user = %user.display_name(), "signed in");
        self.user = Some(user);
        Ok(())
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), Error> {
        check_credentials(email, password)?;
        let user = self.auth.sign_up(email.trim(), password).await.map_err(auth_error)?;
        tracing::info!(user = %user.display_name(), "signed up");
        self.user = Some(user);
        Ok(())
    }

    /// Always ends signed out; a backend failure is still reported.
    pub async fn sign_out(&mut self) -> Result<(), Error> {
        let Some(user) = self.user.take() else {
            return Ok(());
        };
        tracing::info!(user = %user.display_name(), "signing out");
        self.auth.sign_out(&user).await.map_err(auth_error)
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), Error> {
    if email.trim().is_empty() {
        return Err(Error::Validation("Email is required.".to_string()));
    }
    if password.is_empty() {
        return Err(Error::Validation("Password is required.".to_string()));
    }
    Ok(())
}

fn auth_error(e: BackendError) -> Error {
    tracing::warn!(error = %e, "auth request failed");
    match e {
        BackendError::Unauthorized(msg)
        | BackendError::NotFound(msg)
        | BackendError::Status { message: msg, .. } => Error::Auth(msg),
        other => Error::Auth(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryAuth;

    fn session(auth: &MemoryAuth) -> Session {
        Session::new(Arc::new(auth.clone()))
    }

    #[tokio::test]
    async fn starts_signed_out() {
        let s = session(&MemoryAuth::new());
        assert!(!s.is_authenticated());
        assert_eq!(s.require_user().unwrap_err(), Error::Auth("Not authenticated".into()));
    }

    #[tokio::test]
    async fn check_auth_restores_remembered_user() {
        let auth = MemoryAuth::new()
            .with_account("me@example.com", "pw")
            .remembering("me@example.com");
        let mut s = session(&auth);

        s.check_auth().await;
        assert!(s.is_authenticated());
        assert_eq!(s.user().unwrap().email.as_deref(), Some("me@example.com"));
    }

    #[tokio::test]
    async fn check_auth_failure_stays_signed_out() {
        let auth = MemoryAuth::new();
        auth.fail_next(BackendError::Status {
            status: 503,
            message: "down".into(),
        });
        let mut s = session(&auth);

        s.check_auth().await;
        assert!(!s.is_authenticated());
    }

    #[tokio::test]
    async fn sign_in_success_and_failure() {
        let auth = MemoryAuth::new().with_account("me@example.com", "pw");
        let mut s = session(&auth);

        let err = s.sign_in("me@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, Error::Auth("Invalid login credentials".into()));
        assert!(!s.is_authenticated());

        s.sign_in(" me@example.com ", "pw").await.unwrap();
        assert!(s.is_authenticated());
        assert_eq!(s.user().unwrap().id, "user-1");
    }

    #[tokio::test]
    async fn sign_up_authenticates() {
        let auth = MemoryAuth::new();
        let mut s = session(&auth);

        s.sign_up("new@example.com", "pw").await.unwrap();
        assert!(s.is_authenticated());

        let mut other = session(&auth);
        let err = other.sign_up("new@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_backend() {
        let auth = MemoryAuth::new();
        let mut s = session(&auth);

        assert!(matches!(s.sign_in("  ", "pw").await, Err(Error::Validation(_))));
        assert!(matches!(s.sign_up("a@b.c", "").await, Err(Error::Validation(_))));
        assert_eq!(auth.calls(), 0);
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_backend_fails() {
        let auth = MemoryAuth::new().with_account("me@example.com", "pw");
        let mut s = session(&auth);
        s.sign_in("me@example.com", "pw").await.unwrap();

        auth.fail_next(BackendError::Status {
            status: 500,
            message: "logout failed".into(),
        });
        let err = s.sign_out().await.unwrap_err();
        assert_eq!(err, Error::Auth("logout failed".into()));
        assert!(!s.is_authenticated());
    }
}
