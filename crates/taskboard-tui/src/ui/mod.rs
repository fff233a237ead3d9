//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `render`: screen rendering for each route, plus overlays
//! - `input`: keyboard event handling
//! - `styles`: light and dark palettes

pub mod input;
pub mod render;
pub mod styles;
