// tui.rs

use crate::app::{App, AuthAction, InputMode};
use chrono::NaiveDate;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{io, time::Duration};
use tasklane::{Priority, Todo};
use textwrap::wrap;

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()>
where
    std::io::Error: From<<B as Backend>::Error>,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(());
        }

        if app.input_mode.is_auth() {
            if handle_auth_key(app, key).await {
                return Ok(());
            }
            continue;
        }

        match app.input_mode {
            InputMode::Normal => {
                if handle_normal_key(app, key).await {
                    return Ok(());
                }
            }
            InputMode::Searching => match key.code {
                KeyCode::Enter => app.input_mode = InputMode::Normal,
                KeyCode::Esc => {
                    app.selection.search_query.clear();
                    app.input_mode = InputMode::Normal;
                    app.clamp_selected();
                }
                KeyCode::Backspace => {
                    app.selection.search_query.pop();
                    app.clamp_selected();
                }
                KeyCode::Char(c) => {
                    app.selection.search_query.push(c);
                    app.clamp_selected();
                }
                _ => {}
            },
            InputMode::ConfirmDelete => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.delete_todo().await,
                _ => app.input_mode = InputMode::Normal,
            },
            mode if mode.is_form() => handle_form_key(app, key).await,
            _ => {}
        }
    }
}

// Returns true when the user asked to quit.
async fn handle_auth_key(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('n') if ctrl => app.toggle_auth_action(),
        KeyCode::Char('r') if ctrl => app.show_password = !app.show_password,
        KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
            app.input_mode = app.input_mode.next_field();
        }
        KeyCode::Enter => {
            if app.input_mode == InputMode::EditingEmail && app.input_password.is_empty() {
                app.input_mode = InputMode::EditingPassword;
            } else {
                app.submit_auth().await;
            }
        }
        KeyCode::Backspace => {
            input_for_auth(app).pop();
        }
        KeyCode::Char(c) if !ctrl => input_for_auth(app).push(c),
        _ => {}
    }
    false
}

fn input_for_auth(app: &mut App) -> &mut String {
    if app.input_mode == InputMode::EditingPassword {
        &mut app.input_password
    } else {
        &mut app.input_email
    }
}

async fn handle_normal_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('a') => app.begin_add(),
        KeyCode::Char('e') | KeyCode::Enter => app.begin_edit_selected(),
        KeyCode::Char(' ') | KeyCode::Char('d') => app.mark_done().await,
        KeyCode::Char('x') | KeyCode::Delete => app.confirm_delete(),
        KeyCode::Char('/') | KeyCode::Char('?') => {
            app.input_mode = InputMode::Searching;
        }
        KeyCode::Char('f') => app.cycle_status(),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('c') => app.cycle_category(),
        KeyCode::Char('r') => app.reload().await,
        KeyCode::Char('S') => app.sign_out().await,
        KeyCode::Esc => {
            app.clear_filters();
            app.error_message = None;
        }
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        _ => {}
    }
    false
}

async fn handle_form_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Tab | KeyCode::Down => app.input_mode = app.input_mode.next_field(),
        KeyCode::Enter => app.submit_form(App::today()).await,
        _ if app.input_mode == InputMode::EditingPriority => match key.code {
            KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left => {
                app.input_priority = app.input_priority.cycle();
            }
            KeyCode::Char('h') => app.input_priority = Priority::High,
            KeyCode::Char('m') => app.input_priority = Priority::Medium,
            KeyCode::Char('l') => app.input_priority = Priority::Low,
            _ => {}
        },
        KeyCode::Backspace => {
            if let Some(input) = form_input(app) {
                input.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(input) = form_input(app) {
                input.push(c);
            }
        }
        _ => {}
    }
}

fn form_input(app: &mut App) -> Option<&mut String> {
    match app.input_mode {
        InputMode::EditingTitle => Some(&mut app.input_title),
        InputMode::EditingCategory => Some(&mut app.input_category),
        InputMode::EditingDueDate => Some(&mut app.input_due_date),
        _ => None,
    }
}

fn ui(f: &mut Frame<'_>, app: &App) {
    if app.input_mode.is_auth() {
        auth_ui(f, app);
    } else {
        todos_ui(f, app);
    }

    // Show error message if any
    if let Some(ref msg) = app.error_message {
        let size = f.area();
        let error = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        let area = Rect {
            x: size.x,
            y: size.height.saturating_sub(2),
            width: size.width,
            height: 1,
        };
        f.render_widget(error, area);
    }
}

fn input_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn input_text(value: &str, active: bool) -> String {
    if active {
        format!("{}|", value)
    } else {
        value.to_string()
    }
}

fn auth_ui(f: &mut Frame<'_>, app: &App) {
    let area = centered(f.area(), 60, 14);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(3), // email
            Constraint::Length(3), // password
            Constraint::Length(3), // help
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        format!("tasklane - {}", app.auth_action.label()),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let email_active = app.input_mode == InputMode::EditingEmail;
    let email = Paragraph::new(input_text(&app.input_email, email_active))
        .block(Block::default().borders(Borders::ALL).title("Email"))
        .style(input_style(email_active));
    f.render_widget(email, chunks[1]);

    let password_active = app.input_mode == InputMode::EditingPassword;
    let shown = if app.show_password {
        app.input_password.clone()
    } else {
        "*".repeat(app.input_password.chars().count())
    };
    let password = Paragraph::new(input_text(&shown, password_active))
        .block(Block::default().borders(Borders::ALL).title("Password"))
        .style(input_style(password_active));
    f.render_widget(password, chunks[2]);

    let other = match app.auth_action {
        AuthAction::SignIn => "sign up instead",
        AuthAction::SignUp => "sign in instead",
    };
    let b = Style::default().add_modifier(Modifier::BOLD);
    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Enter", b),
            Span::raw(format!(" {}, ", app.auth_action.label().to_lowercase())),
            Span::styled("Tab", b),
            Span::raw(" switch field, "),
            Span::styled("Esc", b),
            Span::raw(" quit"),
        ]),
        Line::from(vec![
            Span::styled("Ctrl+N", b),
            Span::raw(format!(" {}, ", other)),
            Span::styled("Ctrl+R", b),
            Span::raw(if app.show_password { " hide password" } else { " show password" }),
        ]),
    ])
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[3]);
}

fn todos_ui(f: &mut Frame<'_>, app: &App) {
    let size = f.area();
    let snapshot = app.client.snapshot(&app.selection);
    let today = App::today();

    let mut constraints = vec![
        Constraint::Length(3), // title + stats
        Constraint::Length(1), // filter bar
        Constraint::Length(2), // help
        Constraint::Min(1),    // todo list
    ];
    let searching = app.input_mode == InputMode::Searching;
    if searching {
        constraints.push(Constraint::Length(3));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(size);

    let who = app.client.user().map(|u| u.display_name()).unwrap_or("");
    let stats = snapshot.stats;
    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("tasklane - {}", who),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw(format!("{} total  ", stats.total)),
            Span::styled(format!("{} active  ", stats.active), Style::default().fg(Color::Yellow)),
            Span::styled(format!("{} completed", stats.completed), Style::default().fg(Color::Green)),
        ]),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let category = if app.selection.category.is_empty() {
        "all"
    } else {
        app.selection.category.as_str()
    };
    let dim = Style::default().fg(Color::Gray);
    let filters = Paragraph::new(Line::from(vec![
        Span::styled("search: ", dim),
        Span::raw(if app.selection.search_query.is_empty() {
            "-".to_string()
        } else {
            format!("\"{}\"", app.selection.search_query)
        }),
        Span::styled("  status: ", dim),
        Span::raw(app.selection.status.as_str()),
        Span::styled("  sort: ", dim),
        Span::raw(app.selection.sort.as_str()),
        Span::styled("  category: ", dim),
        Span::raw(category),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(filters, chunks[1]);

    let b = Style::default().add_modifier(Modifier::BOLD);
    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("a", b), Span::raw(" add, "),
            Span::styled("e", b), Span::raw(" edit, "),
            Span::styled("Space", b), Span::raw(" done, "),
            Span::styled("x", b), Span::raw(" delete, "),
            Span::styled("r", b), Span::raw(" reload, "),
            Span::styled("S", b), Span::raw(" sign out, "),
            Span::styled("q", b), Span::raw(" quit"),
        ]),
        Line::from(vec![
            Span::styled("/", b), Span::raw(" search, "),
            Span::styled("f", b), Span::raw(" status, "),
            Span::styled("s", b), Span::raw(" sort, "),
            Span::styled("c", b), Span::raw(" category, "),
            Span::styled("Esc", b), Span::raw(" clear filters"),
        ]),
    ])
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);

    let inner_width = chunks[3].width.saturating_sub(5) as usize; // borders + highlight symbol
    let items: Vec<ListItem> = snapshot
        .visible
        .iter()
        .map(|t| todo_item(t, today, inner_width))
        .collect();

    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(app.selected.min(items.len() - 1)));
    }
    let list_title = if items.is_empty() && stats.total > 0 {
        "Todos (nothing matches the filters)"
    } else {
        "Todos"
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, chunks[3], &mut list_state);

    if searching {
        let widget = Paragraph::new(input_text(&app.selection.search_query, true))
            .block(Block::default().borders(Borders::ALL).title("Search"))
            .style(input_style(true))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, chunks[4]);
    }

    if app.input_mode.is_form() {
        form_ui(f, app);
    } else if app.input_mode == InputMode::ConfirmDelete {
        let title = app.selected_todo().map(|t| t.title.as_str()).unwrap_or("");
        let area = centered(size, 50, 5);
        let confirm = Paragraph::new(vec![
            Line::from(format!("Delete \"{}\"?", title)),
            Line::from(Span::styled("y to confirm, any other key to cancel", Style::default().fg(Color::Gray))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Confirm"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(confirm, area);
    }
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Gray),
    }
}

fn todo_item(t: &Todo, today: NaiveDate, width: usize) -> ListItem<'static> {
    let status = if t.completed { "[x]" } else { "[ ]" };
    let title_color = if t.completed {
        Color::Green
    } else if t.is_overdue(today) {
        Color::Red
    } else {
        Color::White
    };

    let mut first = vec![
        Span::raw(format!("{} ", status)),
        Span::styled(format!("{:<6} ", t.priority.as_str()), priority_style(t.priority)),
    ];
    let mut rest = Vec::new();
    // wrap long titles onto following lines, indented under the title
    let mut wrapped = wrap(&t.title, width.saturating_sub(11).max(10)).into_iter();
    if let Some(head) = wrapped.next() {
        first.push(Span::styled(head.to_string(), Style::default().fg(title_color)));
    }
    for line in wrapped {
        rest.push(Line::from(Span::styled(
            format!("{:11}{}", "", line),
            Style::default().fg(title_color),
        )));
    }

    let mut meta = Vec::new();
    if let Some(category) = &t.category {
        meta.push(Span::styled(format!("#{}", category), Style::default().fg(Color::Cyan)));
    }
    if let Some(due) = t.due_date {
        let style = if t.is_overdue(today) {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let label = if t.is_overdue(today) {
            format!("due {} (overdue)", due.format("%Y-%m-%d"))
        } else {
            format!("due {}", due.format("%Y-%m-%d"))
        };
        if !meta.is_empty() {
            meta.push(Span::raw("  "));
        }
        meta.push(Span::styled(label, style));
    }

    let mut lines = vec![Line::from(first)];
    lines.extend(rest);
    if !meta.is_empty() {
        let mut indented = vec![Span::raw(format!("{:11}", ""))];
        indented.extend(meta);
        lines.push(Line::from(indented));
    }
    ListItem::new(lines)
}

fn form_ui(f: &mut Frame<'_>, app: &App) {
    let area = centered(f.area(), 64, 15);
    let title = if app.editing.is_some() { "Edit todo" } else { "New todo" };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    let field = |label: &str, value: &str, mode: InputMode| {
        let active = app.input_mode == mode;
        Paragraph::new(input_text(value, active))
            .block(Block::default().borders(Borders::ALL).title(label.to_string()))
            .style(input_style(active))
    };

    f.render_widget(field("Title", &app.input_title, InputMode::EditingTitle), rows[0]);

    let priority_active = app.input_mode == InputMode::EditingPriority;
    let priority = Paragraph::new(Line::from(vec![
        Span::styled(app.input_priority.as_str(), priority_style(app.input_priority)),
        Span::styled(
            if priority_active { "  (Space to change, h/m/l)" } else { "" },
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Priority"))
    .style(input_style(priority_active));
    f.render_widget(priority, rows[1]);

    f.render_widget(
        field("Category (empty for none)", &app.input_category, InputMode::EditingCategory),
        rows[2],
    );
    f.render_widget(
        field("Due (YYYY-MM-DD, tomorrow, fri, in 3 days)", &app.input_due_date, InputMode::EditingDueDate),
        rows[3],
    );

    let help = Paragraph::new("Tab next field, Enter save, Esc cancel")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, rows[4]);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
