// todo.rs

use crate::error::Error;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend-assigned record id.
pub type TodoId = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank: high first, low last.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Next value in form order low -> medium -> high -> low.
    pub fn cycle(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::Validation(format!("Unknown priority '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
}

impl Todo {
    pub fn new(id: TodoId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
            priority: Priority::default(),
            category: None,
            due_date: None,
        }
    }

    /// Open and strictly past its due date; a todo due today is not overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }
}

/// Form input for a new todo, before defaults are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub completed: bool,
    pub priority: Option<Priority>,
    pub category: String,
    /// `YYYY-MM-DD`, or empty for no due date.
    pub due_date: String,
}

impl TodoDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = due_date.into();
        self
    }

    /// Validates the title and applies the defaults for absent fields.
    pub fn normalize(&self) -> Result<NewTodo, Error> {
        Ok(NewTodo {
            title: normalize_title(&self.title)?,
            completed: self.completed,
            priority: self.priority.unwrap_or_default(),
            category: normalize_category(&self.category),
            due_date: normalize_due_date(&self.due_date)?,
        })
    }
}

/// Fields submitted to a repository on create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update. `Some(None)` on the nullable fields clears them (sent as `null`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Builds the patch an edit form submits: every editable field, with
    /// empty category and due date inputs turned into `null`.
    pub fn from_form(
        title: &str,
        priority: Priority,
        category: &str,
        due_date: &str,
    ) -> Result<Self, Error> {
        Ok(Self {
            title: Some(normalize_title(title)?),
            completed: None,
            priority: Some(priority),
            category: Some(normalize_category(category)),
            due_date: Some(normalize_due_date(due_date)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rejects a present-but-blank title and trims the one that is kept.
    pub fn normalized(mut self) -> Result<Self, Error> {
        if let Some(title) = self.title.take() {
            self.title = Some(normalize_title(&title)?);
        }
        self.category = self
            .category
            .take()
            .map(|category| category.and_then(|c| normalize_category(&c)));
        Ok(self)
    }

    /// Returns `todo` with this patch applied.
    pub fn apply(&self, todo: &Todo) -> Todo {
        let mut out = todo.clone();
        if let Some(title) = &self.title {
            out.title = title.clone();
        }
        if let Some(completed) = self.completed {
            out.completed = completed;
        }
        if let Some(priority) = self.priority {
            out.priority = priority;
        }
        if let Some(category) = &self.category {
            out.category = category.clone();
        }
        if let Some(due_date) = self.due_date {
            out.due_date = due_date;
        }
        out
    }
}

fn normalize_title(title: &str) -> Result<String, Error> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title cannot be empty.".to_string()));
    }
    Ok(title.to_string())
}

fn normalize_category(category: &str) -> Option<String> {
    let category = category.trim();
    (!category.is_empty()).then(|| category.to_string())
}

fn normalize_due_date(input: &str) -> Result<Option<NaiveDate>, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::Validation(format!("Invalid due date '{}'. Use YYYY-MM-DD", input)))
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.parse::<Priority>().ok())
        .unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

// Accepts `null`, "", a calendar date, or a timestamp whose first ten
// characters are a calendar date. Anything else is logged and dropped so one
// bad row does not fail a whole listing.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let day = raw.trim().get(..10).unwrap_or(raw.trim());
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => Ok(Some(date)),
        Err(e) => {
            tracing::warn!(due_date = %raw, error = %e, "ignoring unreadable due_date");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn decodes_bare_rest_record_with_defaults() {
        let todo: Todo = serde_json::from_value(json!({
            "userId": 1,
            "id": 3,
            "title": "fugiat veniam minus",
            "completed": false
        }))
        .unwrap();

        assert_eq!(todo.id, 3);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.category, None);
        assert_eq!(todo.due_date, None);
    }

    #[test]
    fn decodes_nulls_blanks_and_timestamps() {
        let todo: Todo = serde_json::from_value(json!({
            "id": 7,
            "title": "Pay rent",
            "completed": true,
            "priority": null,
            "category": "",
            "due_date": "2025-03-01T00:00:00+00:00",
            "user_id": "8d0c0b0e"
        }))
        .unwrap();

        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.category, None);
        assert_eq!(todo.due_date, Some(date("2025-03-01")));
    }

    #[test]
    fn keeps_stored_priority_and_category() {
        let todo: Todo = serde_json::from_value(json!({
            "id": 1,
            "title": "Ship",
            "priority": "high",
            "category": "Work",
            "due_date": "2025-01-02"
        }))
        .unwrap();

        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.category.as_deref(), Some("Work"));
    }

    #[test]
    fn unreadable_due_date_becomes_none() {
        let todos: Vec<Todo> = serde_json::from_value(json!([
            { "id": 1, "title": "x", "due_date": "someday" },
            { "id": 2, "title": "y", "due_date": "2025-02-30" },
            { "id": 3, "title": "z", "due_date": "2025-04-01" }
        ]))
        .unwrap();

        assert_eq!(todos.len(), 3);
        assert_eq!(todos[0].due_date, None);
        assert_eq!(todos[1].due_date, None);
        assert_eq!(todos[2].due_date, Some(date("2025-04-01")));
    }

    #[test]
    fn draft_applies_defaults() {
        let new = TodoDraft::new("  Buy milk  ")
            .priority(Priority::High)
            .category("")
            .due_date("")
            .normalize()
            .unwrap();

        assert_eq!(new.title, "Buy milk");
        assert_eq!(new.priority, Priority::High);
        assert_eq!(new.category, None);
        assert_eq!(new.due_date, None);
        assert!(!new.completed);

        let plain = TodoDraft::new("Walk").normalize().unwrap();
        assert_eq!(plain.priority, Priority::Medium);
    }

    #[test]
    fn draft_rejects_blank_title_and_bad_date() {
        assert!(matches!(
            TodoDraft::new("   ").normalize(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            TodoDraft::new("x").due_date("31/12/2025").normalize(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn form_patch_serializes_cleared_fields_as_null() {
        let patch = TodoPatch::from_form("Read", Priority::Low, " ", "").unwrap();
        let body = serde_json::to_value(&patch).unwrap();

        assert_eq!(
            body,
            json!({
                "title": "Read",
                "priority": "low",
                "category": null,
                "due_date": null
            })
        );
    }

    #[test]
    fn completed_patch_only_sends_flag() {
        let body = serde_json::to_value(TodoPatch::completed(true)).unwrap();
        assert_eq!(body, json!({ "completed": true }));
    }

    #[test]
    fn normalized_patch_trims_and_validates_title() {
        let patch = TodoPatch {
            title: Some("  Tidy  ".into()),
            category: Some(Some("  ".into())),
            ..TodoPatch::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Tidy"));
        assert_eq!(patch.category, Some(None));

        let blank = TodoPatch {
            title: Some(" ".into()),
            ..TodoPatch::default()
        };
        assert!(blank.normalized().is_err());
    }

    #[test]
    fn patch_apply_touches_only_present_fields() {
        let mut todo = Todo::new(1, "Old");
        todo.category = Some("Home".into());
        todo.due_date = Some(date("2025-05-05"));

        let patched = TodoPatch {
            title: Some("New".into()),
            due_date: Some(None),
            ..TodoPatch::default()
        }
        .apply(&todo);

        assert_eq!(patched.title, "New");
        assert_eq!(patched.category.as_deref(), Some("Home"));
        assert_eq!(patched.due_date, None);
    }

    #[test]
    fn overdue_only_when_open_and_past() {
        let today = date("2025-06-10");
        let mut todo = Todo::new(1, "x");
        assert!(!todo.is_overdue(today));

        todo.due_date = Some(date("2025-06-09"));
        assert!(todo.is_overdue(today));

        todo.completed = true;
        assert!(!todo.is_overdue(today));

        todo.completed = false;
        todo.due_date = Some(today);
        assert!(!todo.is_overdue(today));
    }

    #[test]
    fn priority_parse_and_cycle() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::High.cycle(), Priority::Low);
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }
}
