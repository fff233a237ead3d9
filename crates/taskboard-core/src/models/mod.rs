//! Data models for Taskboard entities.
//!
//! - `Identity`, `Role`, `Capability`: who is signed in and what they may do
//! - `Task`, `TaskStatus`: board entries as returned by the backend
//! - `TaskQuery`, `TaskPage`: pagination and filtering of the task list
//! - `TaskDraft`, `TaskUpdate`: request bodies for task mutations

pub mod task;
pub mod user;

pub use task::{Task, TaskDraft, TaskPage, TaskQuery, TaskStatus, TaskUpdate, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use user::{Capability, Identity, Role};
