//! REST API client module for the Task Store backend.
//!
//! This module provides the `ApiClient` for the auth and task endpoints.
//! Authenticated calls carry the session's bearer token; an unauthorized
//! response tears the session down and surfaces as `ApiError::Unauthorized`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
