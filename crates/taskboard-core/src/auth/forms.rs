//! Sign-in and sign-up form validation.
//!
//! Forms are checked before any request is issued; a form that fails here
//! never reaches the backend.

use serde::Serialize;

use crate::models::Role;

use super::AuthError;

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LENGTH: usize = 6;

const MISSING_FIELDS: &str = "Please fill in all fields";

/// Sign-in form as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::Invalid(MISSING_FIELDS.to_string()));
        }
        Ok(())
    }

    /// Body sent to `POST /auth/signin`
    pub fn request(&self) -> SignInRequest {
        SignInRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

/// Wire body for `POST /auth/signin`.
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Registration form. `confirm_password` never leaves the client.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::Invalid(MISSING_FIELDS.to_string()));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Invalid("Passwords do not match".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Invalid(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    /// Body sent to `POST /auth/signup`
    pub fn request(&self) -> SignUpRequest {
        SignUpRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
        }
    }
}

/// Wire body for `POST /auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}
