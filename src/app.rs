// app.rs
use chrono::{Local, NaiveDate};
use tasklane::due::{format_due_date, parse_due_date};
use tasklane::{Priority, Selection, TaskClient, Todo, TodoDraft, TodoId, TodoPatch};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    // auth screen
    EditingEmail,
    EditingPassword,
    // todo screen
    Normal,
    Searching,
    EditingTitle,
    EditingPriority,
    EditingCategory,
    EditingDueDate,
    ConfirmDelete,
}

impl InputMode {
    pub fn is_auth(self) -> bool {
        matches!(self, InputMode::EditingEmail | InputMode::EditingPassword)
    }

    pub fn is_form(self) -> bool {
        matches!(
            self,
            InputMode::EditingTitle
                | InputMode::EditingPriority
                | InputMode::EditingCategory
                | InputMode::EditingDueDate
        )
    }

    /// Next form field, wrapping around.
    pub fn next_field(self) -> Self {
        match self {
            InputMode::EditingTitle => InputMode::EditingPriority,
            InputMode::EditingPriority => InputMode::EditingCategory,
            InputMode::EditingCategory => InputMode::EditingDueDate,
            InputMode::EditingDueDate => InputMode::EditingTitle,
            InputMode::EditingEmail => InputMode::EditingPassword,
            InputMode::EditingPassword => InputMode::EditingEmail,
            other => other,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
}

impl AuthAction {
    pub fn label(self) -> &'static str {
        match self {
            AuthAction::SignIn => "Sign in",
            AuthAction::SignUp => "Sign up",
        }
    }
}

pub struct App {
    pub client: TaskClient,
    pub selection: Selection,
    pub input_mode: InputMode,
    pub selected: usize,
    pub error_message: Option<String>,

    pub auth_action: AuthAction,
    pub input_email: String,
    pub input_password: String,
    pub show_password: bool,

    /// Todo being edited; `None` while adding.
    pub editing: Option<TodoId>,
    pub input_title: String,
    pub input_priority: Priority,
    pub input_category: String,
    pub input_due_date: String,
}

impl App {
    pub fn new(client: TaskClient) -> Self {
        let input_mode = if client.is_authenticated() {
            InputMode::Normal
        } else {
            InputMode::EditingEmail
        };
        Self {
            client,
            selection: Selection::default(),
            input_mode,
            selected: 0,
            error_message: None,
            auth_action: AuthAction::SignIn,
            input_email: String::new(),
            input_password: String::new(),
            show_password: false,
            editing: None,
            input_title: String::new(),
            input_priority: Priority::default(),
            input_category: String::new(),
            input_due_date: String::new(),
        }
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Todos as currently shown, in display order.
    pub fn visible(&self) -> Vec<&Todo> {
        self.client.snapshot(&self.selection).visible
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        self.visible().get(self.selected).copied()
    }

    pub fn clamp_selected(&mut self) {
        let len = self.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if self.selected < self.visible().len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn toggle_auth_action(&mut self) {
        self.auth_action = match self.auth_action {
            AuthAction::SignIn => AuthAction::SignUp,
            AuthAction::SignUp => AuthAction::SignIn,
        };
        self.error_message = None;
    }

    pub async fn submit_auth(&mut self) {
        let res = match self.auth_action {
            AuthAction::SignIn => self.client.sign_in(&self.input_email, &self.input_password).await,
            AuthAction::SignUp => self.client.sign_up(&self.input_email, &self.input_password).await,
        };
        // a failed initial load still leaves us signed in
        if self.client.is_authenticated() {
            self.input_password.clear();
            self.show_password = false;
            self.input_mode = InputMode::Normal;
            self.selection = Selection::default();
            self.selected = 0;
        }
        self.error_message = res.err().map(|e| e.to_string());
    }

    pub async fn sign_out(&mut self) {
        let res = self.client.sign_out().await;
        self.input_mode = InputMode::EditingEmail;
        self.auth_action = AuthAction::SignIn;
        self.selected = 0;
        self.error_message = res.err().map(|e| format!("Signed out, but: {}", e));
    }

    pub async fn reload(&mut self) {
        match self.client.load().await {
            Ok(()) => self.error_message = None,
            Err(e) => self.error_message = Some(e.to_string()),
        }
        self.clamp_selected();
    }

    pub fn begin_add(&mut self) {
        self.editing = None;
        self.input_title.clear();
        self.input_priority = Priority::default();
        self.input_category.clear();
        self.input_due_date.clear();
        self.error_message = None;
        self.input_mode = InputMode::EditingTitle;
    }

    pub fn begin_edit_selected(&mut self) {
        let Some(todo) = self.selected_todo().cloned() else {
            return;
        };
        self.editing = Some(todo.id);
        self.input_title = todo.title;
        self.input_priority = todo.priority;
        self.input_category = todo.category.unwrap_or_default();
        self.input_due_date = format_due_date(todo.due_date);
        self.error_message = None;
        self.input_mode = InputMode::EditingTitle;
    }

    pub fn cancel_input(&mut self) {
        self.editing = None;
        self.error_message = None;
        self.input_mode = InputMode::Normal;
    }

    /// Submits the add/edit form. On failure the form stays open.
    pub async fn submit_form(&mut self, today: NaiveDate) {
        let due = match parse_due_date(&self.input_due_date, today) {
            Ok(due) => format_due_date(due),
            Err(e) => {
                self.error_message = Some(e.to_string());
                self.input_mode = InputMode::EditingDueDate;
                return;
            }
        };

        let res = match self.editing {
            None => {
                let draft = TodoDraft::new(self.input_title.as_str())
                    .priority(self.input_priority)
                    .category(self.input_category.as_str())
                    .due_date(due);
                self.client.add(&draft).await.map(|_| ())
            }
            Some(id) => {
                match TodoPatch::from_form(&self.input_title, self.input_priority, &self.input_category, &due) {
                    Ok(patch) => self.client.update(id, patch).await,
                    Err(e) => Err(e),
                }
            }
        };

        match res {
            Ok(()) => {
                if self.editing.is_none() {
                    // new todos go first in the collection; show them under the cursor when possible
                    self.selected = 0;
                }
                self.cancel_input();
                self.clamp_selected();
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    pub async fn mark_done(&mut self) {
        let Some((id, completed)) = self.selected_todo().map(|t| (t.id, t.completed)) else {
            return;
        };
        match self.client.toggle(id, !completed).await {
            Ok(()) => self.error_message = None,
            Err(e) => self.error_message = Some(e.to_string()),
        }
        self.clamp_selected();
    }

    pub fn confirm_delete(&mut self) {
        if self.selected_todo().is_some() {
            self.input_mode = InputMode::ConfirmDelete;
        }
    }

    pub async fn delete_todo(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(id) = self.selected_todo().map(|t| t.id) else {
            return;
        };
        match self.client.remove(id).await {
            Ok(()) => self.error_message = None,
            Err(e) => self.error_message = Some(e.to_string()),
        }
        self.clamp_selected();
    }

    pub fn cycle_status(&mut self) {
        self.selection.status = self.selection.status.cycle();
        self.clamp_selected();
    }

    pub fn cycle_sort(&mut self) {
        self.selection.sort = self.selection.sort.cycle();
    }

    pub fn cycle_category(&mut self) {
        let categories = self.client.snapshot(&self.selection).categories;
        self.selection.cycle_category(&categories);
        self.clamp_selected();
    }

    pub fn clear_filters(&mut self) {
        self.selection = Selection {
            sort: self.selection.sort,
            ..Selection::default()
        };
        self.clamp_selected();
    }
}
