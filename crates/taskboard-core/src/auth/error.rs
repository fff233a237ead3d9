use thiserror::Error;

/// Why a sign-in or sign-up did not establish a session.
///
/// Every variant carries a message meant for the user; the session state is
/// unchanged whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The form was rejected before anything was sent
    #[error("{0}")]
    Invalid(String),

    /// The backend refused the credentials or registration
    #[error("{0}")]
    Rejected(String),

    /// The session could not be persisted
    #[error("Could not save session: {0}")]
    Storage(String),
}

impl AuthError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}
