// query.rs
//
// Filtering, sorting and counting over a snapshot of the collection. Nothing
// here mutates or keeps state; the view re-runs it on every render.

use crate::error::Error;
use crate::todo::Todo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }

    fn keeps(self, todo: &Todo) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !todo.completed,
            StatusFilter::Completed => todo.completed,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Priority,
    DueDate,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Priority => "priority",
            SortOrder::DueDate => "dueDate",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            SortOrder::Newest => SortOrder::Oldest,
            SortOrder::Oldest => SortOrder::Priority,
            SortOrder::Priority => SortOrder::DueDate,
            SortOrder::DueDate => SortOrder::Newest,
        }
    }

    fn compare(self, a: &Todo, b: &Todo) -> Ordering {
        match self {
            SortOrder::Newest => b.id.cmp(&a.id),
            SortOrder::Oldest => a.id.cmp(&b.id),
            SortOrder::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortOrder::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

macro_rules! wire_name_impls {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$ty| v.as_str() == s.trim())
                    .ok_or_else(|| Error::Validation(format!("Unknown {} '{}'", stringify!($ty), s)))
            }
        }
    };
}

wire_name_impls!(StatusFilter, [StatusFilter::All, StatusFilter::Active, StatusFilter::Completed]);
wire_name_impls!(
    SortOrder,
    [SortOrder::Newest, SortOrder::Oldest, SortOrder::Priority, SortOrder::DueDate]
);

/// The current search/filter/sort choice of the view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub search_query: String,
    pub status: StatusFilter,
    pub sort: SortOrder,
    /// Exact category to keep; empty keeps every record.
    pub category: String,
}

impl Selection {
    /// Moves the category filter to the next entry of `categories`, going
    /// back to "all categories" after the last one.
    pub fn cycle_category(&mut self, categories: &[String]) {
        let next = match categories.iter().position(|c| *c == self.category) {
            _ if self.category.is_empty() => categories.first(),
            Some(i) => categories.get(i + 1),
            None => None,
        };
        self.category = next.cloned().unwrap_or_default();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Visible records in display order, plus counts over the whole collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View<'a> {
    pub visible: Vec<&'a Todo>,
    pub stats: Stats,
}

pub fn derive<'a>(todos: &'a [Todo], selection: &Selection) -> View<'a> {
    View {
        visible: visible(todos, selection),
        stats: stats(todos),
    }
}

pub fn visible<'a>(todos: &'a [Todo], selection: &Selection) -> Vec<&'a Todo> {
    let query = selection.search_query.to_lowercase();
    let mut out: Vec<&Todo> = todos
        .iter()
        .filter(|t| query.is_empty() || t.title.to_lowercase().contains(&query))
        .filter(|t| selection.status.keeps(t))
        .filter(|t| {
            selection.category.is_empty()
                || t.category.as_deref() == Some(selection.category.as_str())
        })
        .collect();
    // stable: equal keys keep collection order
    out.sort_by(|a, b| selection.sort.compare(a, b));
    out
}

pub fn stats(todos: &[Todo]) -> Stats {
    let total = todos.len();
    let completed = todos.iter().filter(|t| t.completed).count();
    Stats {
        total,
        active: total - completed,
        completed,
    }
}

/// Distinct non-blank categories, sorted, for the category filter control.
pub fn available_categories(todos: &[Todo]) -> Vec<String> {
    todos
        .iter()
        .filter_map(|t| t.category.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
