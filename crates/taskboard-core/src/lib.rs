//! Core library for Taskboard.
//!
//! Provides everything the client needs apart from rendering:
//!
//! - `auth`: the session store, its persisted slots, form validation and
//!   the access gate that guards protected routes
//! - `api`: the HTTP client for the Task Store backend
//! - `models`: identities, roles, capabilities and tasks
//! - `config`: on-disk configuration and base URL resolution

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AccessGate, AuthError, Decision, Route, SessionEvent, SessionState, SessionStore};
pub use config::{Config, StorageBackend, ThemeMode};
pub use models::{Capability, Identity, Role, Task, TaskDraft, TaskPage, TaskQuery, TaskStatus, TaskUpdate};
