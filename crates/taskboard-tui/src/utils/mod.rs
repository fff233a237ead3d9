//! Utility functions for the Taskboard terminal client.
//!
//! - `format`: text formatting helpers for the board and forms

pub mod format;

pub use format::*;
