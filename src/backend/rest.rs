// backend/rest.rs
//
// Plain REST resource: GET/POST on `/todos`, PATCH/DELETE on `/todos/{id}`.
// Records are not scoped to the signed-in user.

use super::http::{decode, send};
use super::{TodoRepository, User};
use crate::config::RestConfig;
use crate::error::BackendError;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;

pub struct RestTodoRepository {
    client: Client,
    base_url: String,
    limit: Option<usize>,
}

impl RestTodoRepository {
    pub fn new(client: Client, cfg: &RestConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            limit: cfg.limit,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn item_url(&self, id: TodoId) -> String {
        format!("{}/todos/{}", self.base_url, id)
    }
}

#[async_trait]
impl TodoRepository for RestTodoRepository {
    async fn list(&self, _user: &User) -> Result<Vec<Todo>, BackendError> {
        let req = self.client.get(self.collection_url()).header(ACCEPT, "application/json");
        let mut todos: Vec<Todo> = decode(&send(&self.client, req).await?)?;
        if let Some(limit) = self.limit {
            todos.truncate(limit);
        }
        Ok(todos)
    }

    async fn create(&self, _user: &User, fields: &NewTodo) -> Result<Todo, BackendError> {
        let req = self.client.post(self.collection_url()).json(fields);
        decode(&send(&self.client, req).await?)
    }

    async fn update(
        &self,
        _user: &User,
        id: TodoId,
        fields: &TodoPatch,
    ) -> Result<Todo, BackendError> {
        let req = self.client.patch(self.item_url(id)).json(fields);
        decode(&send(&self.client, req).await?)
    }

    async fn delete(&self, _user: &User, id: TodoId) -> Result<(), BackendError> {
        send(&self.client, self.client.delete(self.item_url(id))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::{Priority, TodoDraft};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(server: &MockServer, limit: Option<usize>) -> RestTodoRepository {
        RestTodoRepository::new(
            Client::new(),
            &RestConfig {
                base_url: format!("{}/", server.uri()),
                limit,
            },
        )
    }

    fn user() -> User {
        User::new("u-1", None)
    }

    #[tokio::test]
    async fn list_truncates_and_keeps_stored_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "userId": 1, "id": 1, "title": "one", "completed": false, "priority": "high", "category": "Work" },
                { "userId": 1, "id": 2, "title": "two", "completed": true },
                { "userId": 1, "id": 3, "title": "three", "completed": false }
            ])))
            .mount(&server)
            .await;

        let todos = repo(&server, Some(2)).list(&user()).await.unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].priority, Priority::High);
        assert_eq!(todos[0].category.as_deref(), Some("Work"));
        assert_eq!(todos[1].priority, Priority::Medium);
        assert_eq!(todos[1].category, None);
    }

    #[tokio::test]
    async fn list_survives_one_bad_due_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "title": "one", "due_date": "not a date" },
                { "id": 2, "title": "two", "due_date": "2025-09-01" }
            ])))
            .mount(&server)
            .await;

        let todos = repo(&server, None).list(&user()).await.unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].due_date, None);
        assert!(todos[1].due_date.is_some());
    }

    #[tokio::test]
    async fn create_posts_every_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/todos"))
            .and(body_json(json!({
                "title": "Buy milk",
                "completed": false,
                "priority": "high",
                "category": null,
                "due_date": null
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 201,
                "title": "Buy milk",
                "completed": false,
                "priority": "high",
                "category": null,
                "due_date": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fields = TodoDraft::new("Buy milk")
            .priority(Priority::High)
            .normalize()
            .unwrap();
        let todo = repo(&server, None).create(&user(), &fields).await.unwrap();
        assert_eq!(todo.id, 201);
        assert_eq!(todo.priority, Priority::High);
    }

    #[tokio::test]
    async fn update_patches_item_and_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/todos/1"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "title": "one", "completed": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/todos/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
            .mount(&server)
            .await;

        let repo = repo(&server, None);
        let todo = repo
            .update(&user(), 1, &TodoPatch::completed(true))
            .await
            .unwrap();
        assert!(todo.completed);

        let err = repo
            .update(&user(), 99, &TodoPatch::completed(true))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_hits_item_url() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/todos/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        repo(&server, None).delete(&user(), 4).await.unwrap();
    }

    #[tokio::test]
    async fn server_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = repo(&server, None).list(&user()).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
    }
}
