// lib.rs
//
// Todo client core: session, todo list, filter/sort/stats, and the backend
// ports they talk to. The terminal UI lives in the binary.

pub mod backend;
pub mod client;
pub mod config;
pub mod due;
pub mod error;
pub mod query;
pub mod session;
pub mod store;
pub mod todo;

pub use client::{Snapshot, TaskClient};
pub use config::Config;
pub use error::{BackendError, Error};
pub use query::{Selection, SortOrder, Stats, StatusFilter};
pub use todo::{Priority, Todo, TodoDraft, TodoId, TodoPatch};
