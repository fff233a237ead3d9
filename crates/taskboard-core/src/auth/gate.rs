//! Client-side route guard.
//!
//! The gate only decides what to show; it trusts local session state and
//! makes no request. The backend re-validates the token on every call.

use super::SessionState;

/// Views the client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SignIn,
    SignUp,
    Dashboard,
}

impl Route {
    /// Map a path to a route. The root and unknown paths land on the board.
    pub fn parse(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/signin" => Route::SignIn,
            "/signup" => Route::SignUp,
            _ => Route::Dashboard,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/signin",
            Route::SignUp => "/signup",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Routes that require a signed-in user
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { redirect: Route },
}

pub struct AccessGate;

impl AccessGate {
    /// Decide access to a protected view. Evaluated fresh on every call.
    pub fn authorize(state: &SessionState) -> Decision {
        if state.is_authenticated() {
            Decision::Allow
        } else {
            Decision::Deny {
                redirect: Route::SignIn,
            }
        }
    }

    /// The route to actually display when navigating to `route`.
    pub fn resolve(route: Route, state: &SessionState) -> Route {
        if !route.is_protected() {
            return route;
        }
        match Self::authorize(state) {
            Decision::Allow => route,
            Decision::Deny { redirect } => redirect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Role};

    fn signed_in() -> SessionState {
        SessionState::Authenticated(Identity {
            id: "u1".to_string(),
            name: "Ann".to_string(),
            email: "a@b.com".to_string(),
            role: Role::User,
        })
    }

    #[test]
    fn test_authorize_follows_state() {
        assert_eq!(AccessGate::authorize(&signed_in()), Decision::Allow);
        assert_eq!(
            AccessGate::authorize(&SessionState::Unauthenticated),
            Decision::Deny { redirect: Route::SignIn }
        );
    }

    #[test]
    fn test_resolve_protected_route() {
        assert_eq!(AccessGate::resolve(Route::Dashboard, &signed_in()), Route::Dashboard);
        assert_eq!(
            AccessGate::resolve(Route::Dashboard, &SessionState::Unauthenticated),
            Route::SignIn
        );
    }

    #[test]
    fn test_public_routes_always_shown() {
        for state in [signed_in(), SessionState::Unauthenticated] {
            assert_eq!(AccessGate::resolve(Route::SignIn, &state), Route::SignIn);
            assert_eq!(AccessGate::resolve(Route::SignUp, &state), Route::SignUp);
        }
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/signin"), Route::SignIn);
        assert_eq!(Route::parse("/signup/"), Route::SignUp);
        assert_eq!(Route::parse("/dashboard"), Route::Dashboard);
        assert_eq!(Route::parse("/"), Route::Dashboard);
        assert_eq!(Route::parse("/nowhere"), Route::Dashboard);
        assert_eq!(Route::parse(Route::SignUp.path()), Route::SignUp);
    }
}
