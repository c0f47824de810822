// backend/hosted.rs
//
// Hosted backend-as-a-service: password auth under `/auth/v1`, user-scoped
// rows under `/rest/v1/{table}`.

use super::http::{decode, send};
use super::{AuthProvider, TodoRepository, User};
use crate::config::HostedConfig;
use crate::error::BackendError;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{self, File, create_dir_all};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::PathBuf;

fn base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

pub struct HostedTodoRepository {
    client: Client,
    url: String,
    anon_key: String,
    table: String,
}

#[derive(Serialize)]
struct Insert<'a> {
    #[serde(flatten)]
    fields: &'a NewTodo,
    user_id: &'a str,
}

impl HostedTodoRepository {
    pub fn new(client: Client, cfg: &HostedConfig) -> Self {
        Self {
            client,
            url: base(&cfg.url),
            anon_key: cfg.anon_key.clone(),
            table: cfg.table.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn authed(&self, req: RequestBuilder, user: &User) -> Result<RequestBuilder, BackendError> {
        let token = user
            .access_token
            .as_deref()
            .ok_or_else(|| BackendError::Unauthorized("No access token for this session".to_string()))?;
        Ok(req
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json"))
    }

    // Row filter shared by update and delete: the id, within the user's rows.
    fn row_filter(id: TodoId, user: &User) -> [(&'static str, String); 2] {
        [("id", format!("eq.{}", id)), ("user_id", format!("eq.{}", user.id))]
    }

    fn first_row(rows: Vec<Todo>, id: TodoId) -> Result<Todo, BackendError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("todo {}", id)))
    }
}

#[async_trait]
impl TodoRepository for HostedTodoRepository {
    async fn list(&self, user: &User) -> Result<Vec<Todo>, BackendError> {
        let req = self
            .client
            .get(self.table_url())
            .query(&[("select", "*".to_string()), ("user_id", format!("eq.{}", user.id))]);
        let req = self.authed(req, user)?;
        decode(&send(&self.client, req).await?)
    }

    async fn create(&self, user: &User, fields: &NewTodo) -> Result<Todo, BackendError> {
        let body = Insert {
            fields,
            user_id: &user.id,
        };
        let req = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .json(&body);
        let req = self.authed(req, user)?;
        let rows: Vec<Todo> = decode(&send(&self.client, req).await?)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".to_string()))
    }

    async fn update(
        &self,
        user: &User,
        id: TodoId,
        fields: &TodoPatch,
    ) -> Result<Todo, BackendError> {
        let req = self
            .client
            .patch(self.table_url())
            .query(&Self::row_filter(id, user))
            .header("Prefer", "return=representation")
            .json(fields);
        let req = self.authed(req, user)?;
        Self::first_row(decode(&send(&self.client, req).await?)?, id)
    }

    async fn delete(&self, user: &User, id: TodoId) -> Result<(), BackendError> {
        let req = self
            .client
            .delete(self.table_url())
            .query(&Self::row_filter(id, user))
            .header("Prefer", "return=representation");
        let req = self.authed(req, user)?;
        Self::first_row(decode(&send(&self.client, req).await?)?, id).map(|_| ())
    }
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

// Token responses nest the user; a sign-up awaiting email confirmation
// returns the bare user instead.
#[derive(Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
    id: Option<String>,
    email: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    user_id: String,
    email: Option<String>,
}

pub struct HostedAuth {
    client: Client,
    url: String,
    anon_key: String,
    session_file: Option<PathBuf>,
}

impl HostedAuth {
    pub fn new(client: Client, cfg: &HostedConfig, session_file: Option<PathBuf>) -> Self {
        Self {
            client,
            url: base(&cfg.url),
            anon_key: cfg.anon_key.clone(),
            session_file,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    async fn password_request(
        &self,
        req: RequestBuilder,
        email: &str,
        password: &str,
    ) -> Result<User, BackendError> {
        let req = req
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));
        let resp: AuthResponse = decode(&send(&self.client, req).await?)?;

        let Some(token) = resp.access_token else {
            return Err(BackendError::Unauthorized(
                "Check your inbox to confirm the account, then sign in".to_string(),
            ));
        };
        let (id, email) = match resp.user {
            Some(u) => (u.id, u.email),
            None => (
                resp.id
                    .ok_or_else(|| BackendError::Decode("auth response has no user".to_string()))?,
                resp.email,
            ),
        };
        let user = User::new(id, email).with_token(token);
        self.save_session(&user)?;
        Ok(user)
    }

    fn save_session(&self, user: &User) -> Result<(), BackendError> {
        let (Some(path), Some(token)) = (&self.session_file, &user.access_token) else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            create_dir_all(dir)?;
        }
        let stored = StoredSession {
            access_token: token.clone(),
            user_id: user.id.clone(),
            email: user.email.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &stored)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn load_session(&self) -> Result<Option<StoredSession>, BackendError> {
        let Some(path) = &self.session_file else {
            return Ok(None);
        };
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn clear_session(&self) {
        if let Some(path) = &self.session_file {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(error = %e, "failed to remove session file");
                }
            }
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError> {
        self.password_request(self.client.post(self.endpoint("signup")), email, password)
            .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let req = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")]);
        self.password_request(req, email, password).await
    }

    async fn sign_out(&self, user: &User) -> Result<(), BackendError> {
        self.clear_session();
        let Some(token) = user.access_token.as_deref() else {
            return Ok(());
        };
        let req = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", token));
        send(&self.client, req).await.map(|_| ())
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        let Some(stored) = self.load_session()? else {
            return Ok(None);
        };
        let req = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {}", stored.access_token));
        let user: AuthUser = match send(&self.client, req).await {
            Ok(text) => decode(&text)?,
            Err(BackendError::Unauthorized(msg)) => {
                self.clear_session();
                return Err(BackendError::Unauthorized(msg));
            }
            Err(e) => return Err(e),
        };
        Ok(Some(
            User::new(user.id, user.email.or(stored.email)).with_token(stored.access_token),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::{Priority, TodoDraft};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg(server: &MockServer) -> HostedConfig {
        HostedConfig {
            url: server.uri(),
            anon_key: "anon-key".into(),
            table: "todos".into(),
        }
    }

    fn signed_in() -> User {
        User::new("user-1", Some("me@example.com".into())).with_token("token-abcdefghijkl")
    }

    fn token_response() -> serde_json::Value {
        json!({
            "access_token": "token-abcdefghijkl",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": { "id": "user-1", "email": "me@example.com" }
        })
    }

    #[tokio::test]
    async fn list_filters_by_user_and_sends_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(query_param("user_id", "eq.user-1"))
            .and(query_param("select", "*"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer token-abcdefghijkl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 4, "title": "Mine", "completed": false, "priority": "low",
                  "category": "Home", "due_date": "2025-04-01", "user_id": "user-1" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let repo = HostedTodoRepository::new(Client::new(), &cfg(&server));
        let todos = repo.list(&signed_in()).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].priority, Priority::Low);
        assert_eq!(todos[0].category.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn create_sets_owner_and_reads_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/todos"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({
                "title": "Buy milk",
                "completed": false,
                "priority": "high",
                "category": null,
                "due_date": null,
                "user_id": "user-1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": 12, "title": "Buy milk", "completed": false, "priority": "high",
                  "category": null, "due_date": null, "user_id": "user-1" }
            ])))
            .mount(&server)
            .await;

        let repo = HostedTodoRepository::new(Client::new(), &cfg(&server));
        let fields = TodoDraft::new("Buy milk")
            .priority(Priority::High)
            .normalize()
            .unwrap();
        let todo = repo.create(&signed_in(), &fields).await.unwrap();
        assert_eq!(todo.id, 12);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.9"))
            .and(query_param("user_id", "eq.user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let repo = HostedTodoRepository::new(Client::new(), &cfg(&server));
        let err = repo
            .update(&signed_in(), 9, &TodoPatch::completed(true))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_returns_ok_when_row_removed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 3, "title": "gone" }
            ])))
            .mount(&server)
            .await;

        let repo = HostedTodoRepository::new(Client::new(), &cfg(&server));
        repo.delete(&signed_in(), 3).await.unwrap();
    }

    #[tokio::test]
    async fn repository_requires_token() {
        let server = MockServer::start().await;
        let repo = HostedTodoRepository::new(Client::new(), &cfg(&server));
        let err = repo.list(&User::new("user-1", None)).await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sign_in_persists_session_and_current_user_restores_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({ "email": "me@example.com", "password": "hunter22" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_response()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer token-abcdefghijkl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1", "email": "me@example.com"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session.json");
        let auth = HostedAuth::new(Client::new(), &cfg(&server), Some(session.clone()));

        let user = auth.sign_in("me@example.com", "hunter22").await.unwrap();
        assert_eq!(user.id, "user-1");
        assert!(session.exists());

        let restored = auth.current_user().await.unwrap().unwrap();
        assert_eq!(restored, user);
    }

    #[tokio::test]
    async fn current_user_without_session_is_none() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let auth = HostedAuth::new(
            Client::new(),
            &cfg(&server),
            Some(dir.path().join("session.json")),
        );
        assert!(auth.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_credentials_surface_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = HostedAuth::new(Client::new(), &cfg(&server), None);
        let err = auth.sign_in("me@example.com", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 400: Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_up_awaiting_confirmation_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-2", "email": "new@example.com"
            })))
            .mount(&server)
            .await;

        let auth = HostedAuth::new(Client::new(), &cfg(&server), None);
        let err = auth.sign_up("new@example.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sign_out_removes_session_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session.json");
        let auth = HostedAuth::new(Client::new(), &cfg(&server), Some(session.clone()));
        auth.save_session(&signed_in()).unwrap();
        assert!(session.exists());

        auth.sign_out(&signed_in()).await.unwrap();
        assert!(!session.exists());
    }

    #[tokio::test]
    async fn expired_session_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session.json");
        let auth = HostedAuth::new(Client::new(), &cfg(&server), Some(session.clone()));
        auth.save_session(&signed_in()).unwrap();

        assert!(auth.current_user().await.is_err());
        assert!(!session.exists());
    }
}
