//! Authentication: who is signed in and what they may see.
//!
//! This module provides:
//! - `SessionStore`: token + identity, persisted in named slots and restored
//!   at startup
//! - `storage`: slot backends (file, OS keychain, memory)
//! - `forms`: sign-in/sign-up validation run before any request
//! - `AccessGate`: route guard consulted on every navigation

pub mod error;
pub mod forms;
pub mod gate;
pub mod session;
pub mod storage;

pub use error::AuthError;
pub use forms::{SignInForm, SignInRequest, SignUpForm, SignUpRequest};
pub use gate::{AccessGate, Decision, Route};
pub use session::{AuthBackend, AuthResponse, Session, SessionEvent, SessionState, SessionStore};
pub use storage::{FileSlotStore, KeyringSlotStore, MemorySlotStore, SlotStore};
