use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::{Capability, Identity, Role};

use super::forms::{SignInForm, SignInRequest, SignUpForm, SignUpRequest};
use super::storage::{SlotStore, TOKEN_SLOT, USER_SLOT};
use super::AuthError;

/// Capacity of the session event channel.
/// Events are rare (one per transition), 16 leaves room for slow observers.
const EVENT_CHANNEL_CAPACITY: usize = 16;

const SIGN_IN_FAILED: &str = "Sign in failed";
const SIGN_UP_FAILED: &str = "Sign up failed";

/// Successful response of `/auth/signin` and `/auth/signup`:
/// the token plus the identity fields at the top level.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub identity: Identity,
}

/// Backend endpoints the session store authenticates against.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse, ApiError>;
    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse, ApiError>;
}

/// Token and identity, always held together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Identity),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Transitions published to observers (the view subscribes to these).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Established(Identity),
    SignedOut,
    /// The backend rejected the token; the session was torn down
    Invalidated,
}

/// Single source of truth for who is signed in.
///
/// Owned explicitly and shared by handle (`Arc<SessionStore>`) with the API
/// client and the view. Memory and the persisted record are always written
/// under the same lock so observers never see one without the other.
pub struct SessionStore {
    storage: Box<dyn SlotStore>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn SlotStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            session: RwLock::new(None),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> SessionState {
        match self.read().as_ref() {
            Some(session) => SessionState::Authenticated(session.identity.clone()),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().as_ref().map(|s| s.identity.clone())
    }

    /// True iff someone is signed in with the admin role
    pub fn is_admin(&self) -> bool {
        self.read()
            .as_ref()
            .map(|s| s.identity.is_admin())
            .unwrap_or(false)
    }

    pub fn can(&self, capability: Capability) -> bool {
        capability.permitted(self.read().as_ref().map(|s| &s.identity))
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Load the persisted record. Anything partial or unparseable is treated
    /// as no session and wiped.
    pub fn restore_on_startup(&self) -> SessionState {
        let token = self.storage.get(TOKEN_SLOT);
        let user = self.storage.get(USER_SLOT);

        let restored = match (token, user) {
            (Ok(None), Ok(None)) => {
                debug!("No persisted session");
                return SessionState::Unauthenticated;
            }
            (Ok(Some(token)), Ok(Some(user))) => Self::parse_record(token, &user),
            (token, user) => {
                if let Err(e) = token.as_ref().and(user.as_ref()) {
                    warn!(error = %e, "Failed to read persisted session");
                }
                None
            }
        };

        let mut guard = self.write();
        match restored {
            Some(session) => {
                info!(user_id = %session.identity.id, "Session restored");
                let state = SessionState::Authenticated(session.identity.clone());
                *guard = Some(session);
                state
            }
            None => {
                warn!("Persisted session is incomplete or malformed, clearing it");
                self.clear_persisted();
                *guard = None;
                SessionState::Unauthenticated
            }
        }
    }

    fn parse_record(token: String, user: &str) -> Option<Session> {
        if token.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Identity>(user) {
            Ok(identity) if identity.is_well_formed() => Some(Session { token, identity }),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Persisted identity did not parse");
                None
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn sign_in<B: AuthBackend + ?Sized>(
        &self,
        backend: &B,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        self.sign_in_with(backend, &SignInForm::new(email, password))
            .await
    }

    /// Validate the form, then authenticate. A form that fails validation
    /// issues no request.
    pub async fn sign_in_with<B: AuthBackend + ?Sized>(
        &self,
        backend: &B,
        form: &SignInForm,
    ) -> Result<Identity, AuthError> {
        form.validate()?;
        match backend.sign_in(&form.request()).await {
            Ok(response) => self.establish(response),
            Err(e) => Err(Self::rejection(e, SIGN_IN_FAILED)),
        }
    }

    /// Register and sign in. `role` defaults to `user`.
    pub async fn sign_up<B: AuthBackend + ?Sized>(
        &self,
        backend: &B,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<Identity, AuthError> {
        let form = SignUpForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
            role: role.unwrap_or_default(),
        };
        self.sign_up_with(backend, &form).await
    }

    pub async fn sign_up_with<B: AuthBackend + ?Sized>(
        &self,
        backend: &B,
        form: &SignUpForm,
    ) -> Result<Identity, AuthError> {
        form.validate()?;
        match backend.sign_up(&form.request()).await {
            Ok(response) => self.establish(response),
            Err(e) => Err(Self::rejection(e, SIGN_UP_FAILED)),
        }
    }

    fn rejection(error: ApiError, fallback: &str) -> AuthError {
        warn!(error = %error, "Authentication rejected");
        let message = error
            .backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());
        AuthError::Rejected(message)
    }

    /// Store a fresh session in the persisted record and in memory.
    /// Replaces any current session.
    fn establish(&self, response: AuthResponse) -> Result<Identity, AuthError> {
        let AuthResponse { token, identity } = response;
        if token.trim().is_empty() {
            return Err(AuthError::Rejected("Server returned an empty token".to_string()));
        }
        let user_json =
            serde_json::to_string(&identity).map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut guard = self.write();
        if let Err(e) = self
            .storage
            .set(TOKEN_SLOT, &token)
            .and_then(|_| self.storage.set(USER_SLOT, &user_json))
        {
            warn!(error = %e, "Failed to persist session");
            self.rewrite_persisted(guard.as_ref());
            return Err(AuthError::Storage(e.to_string()));
        }

        if guard.is_some() {
            info!("Replacing the current session");
        }
        *guard = Some(Session {
            token,
            identity: identity.clone(),
        });
        drop(guard);

        info!(user_id = %identity.id, role = identity.role.as_str(), "Signed in");
        self.publish(SessionEvent::Established(identity.clone()));
        Ok(identity)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Clear the session. Never fails; calling it while signed out is a no-op
    /// apart from wiping any stray persisted slots.
    pub fn sign_out(&self) {
        let mut guard = self.write();
        let previous = guard.take();
        self.clear_persisted();
        drop(guard);

        if previous.is_some() {
            info!("Signed out");
            self.publish(SessionEvent::SignedOut);
        }
    }

    /// Tear down the session after the backend rejected `presented_token`.
    ///
    /// Only the session that presented the token is removed: if a newer
    /// sign-in replaced it while the request was in flight, the newer
    /// session stays. Returns true if a session was torn down, so concurrent
    /// rejections of the same token clear it exactly once.
    pub fn invalidate(&self, presented_token: Option<&str>) -> bool {
        let mut guard = self.write();
        let matches = match (guard.as_ref(), presented_token) {
            (Some(session), Some(token)) => session.token == token,
            _ => false,
        };

        if !matches {
            if guard.is_none() {
                self.clear_persisted();
            } else {
                debug!("Ignoring rejection of a token that is no longer current");
            }
            return false;
        }

        *guard = None;
        self.clear_persisted();
        drop(guard);

        warn!("Session token rejected by server, session cleared");
        self.publish(SessionEvent::Invalidated);
        true
    }

    fn clear_persisted(&self) {
        for slot in [TOKEN_SLOT, USER_SLOT] {
            if let Err(e) = self.storage.remove(slot) {
                warn!(slot, error = %e, "Failed to clear persisted slot");
            }
        }
    }

    /// Put the persisted record back in line with `session` after a failed write.
    fn rewrite_persisted(&self, session: Option<&Session>) {
        let restored = session.and_then(|s| {
            let user = serde_json::to_string(&s.identity).ok()?;
            self.storage
                .set(TOKEN_SLOT, &s.token)
                .and_then(|_| self.storage.set(USER_SLOT, &user))
                .ok()
        });
        if restored.is_none() {
            self.clear_persisted();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::Result;

    use super::*;
    use crate::auth::storage::MemorySlotStore;

    /// Backend double that counts calls and answers with a fixed result.
    struct FakeBackend {
        calls: AtomicUsize,
        response: std::result::Result<(String, Identity), (u16, String)>,
    }

    impl FakeBackend {
        fn accepting(token: &str, identity: Identity) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Ok((token.to_string(), identity)),
            }
        }

        fn rejecting(status: u16, body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Err((status, body.to_string())),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn answer(&self) -> std::result::Result<AuthResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok((token, identity)) => Ok(AuthResponse {
                    token: token.clone(),
                    identity: identity.clone(),
                }),
                Err((status, body)) => Err(ApiError::from_auth_status(
                    reqwest::StatusCode::from_u16(*status).unwrap(),
                    body,
                )),
            }
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn sign_in(
            &self,
            _request: &SignInRequest,
        ) -> std::result::Result<AuthResponse, ApiError> {
            self.answer()
        }

        async fn sign_up(
            &self,
            _request: &SignUpRequest,
        ) -> std::result::Result<AuthResponse, ApiError> {
            self.answer()
        }
    }

    /// Shares one memory store between the session store and the test.
    struct SharedSlots(Arc<MemorySlotStore>);

    impl SlotStore for SharedSlots {
        fn get(&self, slot: &str) -> Result<Option<String>> {
            self.0.get(slot)
        }
        fn set(&self, slot: &str, value: &str) -> Result<()> {
            self.0.set(slot, value)
        }
        fn remove(&self, slot: &str) -> Result<()> {
            self.0.remove(slot)
        }
    }

    /// Storage whose writes always fail.
    struct ReadOnlySlots;

    impl SlotStore for ReadOnlySlots {
        fn get(&self, _slot: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _slot: &str, _value: &str) -> Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
        fn remove(&self, _slot: &str) -> Result<()> {
            Ok(())
        }
    }

    fn ann(role: Role) -> Identity {
        Identity {
            id: "u1".to_string(),
            name: "Ann".to_string(),
            email: "a@b.com".to_string(),
            role,
        }
    }

    fn store_with(slots: &Arc<MemorySlotStore>) -> SessionStore {
        SessionStore::new(Box::new(SharedSlots(Arc::clone(slots))))
    }

    /// Token and identity are both present or both absent, in memory and on disk.
    fn assert_coupled(store: &SessionStore, slots: &MemorySlotStore) {
        assert_eq!(store.token().is_some(), store.identity().is_some());
        let token = slots.get(TOKEN_SLOT).unwrap();
        let user = slots.get(USER_SLOT).unwrap();
        assert_eq!(token.is_some(), user.is_some());
        assert_eq!(token.is_some(), store.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_in_establishes_session() {
        let slots = Arc::new(MemorySlotStore::new());
        let store = store_with(&slots);
        let backend = FakeBackend::accepting("tok123", ann(Role::User));

        let identity = store.sign_in(&backend, "a@b.com", "secret1").await.unwrap();

        assert_eq!(identity.name, "Ann");
        assert!(store.is_authenticated());
        assert!(!store.is_admin());
        assert_eq!(store.token().as_deref(), Some("tok123"));
        assert_eq!(slots.get(TOKEN_SLOT).unwrap().as_deref(), Some("tok123"));
        let persisted: Identity =
            serde_json::from_str(&slots.get(USER_SLOT).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, identity);
        assert_coupled(&store, &slots);
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_prior_session() {
        let slots = Arc::new(MemorySlotStore::new());
        let store = store_with(&slots);
        store
            .sign_in(&FakeBackend::accepting("tok1", ann(Role::Admin)), "a@b.com", "secret1")
            .await
            .unwrap();

        let backend = FakeBackend::rejecting(401, r#"{"message":"Invalid credentials"}"#);
        let err = store.sign_in(&backend, "a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err, AuthError::Rejected("Invalid credentials".to_string()));
        assert_eq!(store.token().as_deref(), Some("tok1"));
        assert!(store.is_admin());
        assert_coupled(&store, &slots);
    }

    #[tokio::test]
    async fn test_rejection_without_message_uses_fallback() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));

        let err = store
            .sign_in(&FakeBackend::rejecting(500, "<html>oops</html>"), "a@b.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Sign in failed");

        let err = store
            .sign_up(&FakeBackend::rejecting(400, ""), "Ann", "a@b.com", "secret1", None)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Sign up failed");
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalid_form_issues_no_request() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        let backend = FakeBackend::accepting("tok", ann(Role::User));

        let form = SignUpForm {
            name: "Ann".to_string(),
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret2".to_string(),
            role: Role::User,
        };
        let err = store.sign_up_with(&backend, &form).await.unwrap_err();
        assert_eq!(err, AuthError::Invalid("Passwords do not match".to_string()));

        let err = store.sign_in(&backend, "", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));

        assert_eq!(backend.calls(), 0);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_up_defaults_to_user_role() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        let backend = FakeBackend::accepting("tok", ann(Role::User));

        store
            .sign_up(&backend, "Ann", "a@b.com", "secret1", None)
            .await
            .unwrap();
        assert_eq!(backend.calls(), 1);
        assert!(store.is_authenticated());
        assert!(!store.can(Capability::DeleteTask));
        assert!(store.can(Capability::CreateTask));
    }

    #[tokio::test]
    async fn test_sign_in_replaces_existing_session() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        store
            .sign_in(&FakeBackend::accepting("t1", ann(Role::User)), "a@b.com", "secret1")
            .await
            .unwrap();

        let mut bob = ann(Role::Admin);
        bob.id = "u2".to_string();
        bob.name = "Bob".to_string();
        store
            .sign_in(&FakeBackend::accepting("t2", bob.clone()), "bob@b.com", "secret2")
            .await
            .unwrap();

        assert_eq!(store.identity(), Some(bob));
        assert_eq!(store.token().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_state_untouched() {
        let store = SessionStore::new(Box::new(ReadOnlySlots));
        let err = store
            .sign_in(&FakeBackend::accepting("tok", ann(Role::User)), "a@b.com", "secret1")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Storage(_)));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let slots = Arc::new(MemorySlotStore::new());
        let store = store_with(&slots);
        let mut events = store.subscribe();

        store.sign_out();
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert!(events.try_recv().is_err());

        store
            .sign_in(&FakeBackend::accepting("tok", ann(Role::User)), "a@b.com", "secret1")
            .await
            .unwrap();
        store.sign_out();
        store.sign_out();

        assert!(!store.is_authenticated());
        assert!(slots.is_empty());
        assert!(matches!(events.try_recv(), Ok(SessionEvent::Established(_))));
        assert_eq!(events.try_recv().ok(), Some(SessionEvent::SignedOut));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_is_admin_when_signed_out() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        assert!(!store.is_admin());
        assert!(!store.can(Capability::ViewBoard));
    }

    #[test]
    fn test_restore_well_formed_record() {
        let user = r#"{"id":"u1","name":"Ann","email":"a@b.com","role":"user"}"#;
        let slots = Arc::new(MemorySlotStore::with_slots([(TOKEN_SLOT, "t1"), (USER_SLOT, user)]));
        let store = store_with(&slots);

        let state = store.restore_on_startup();

        assert_eq!(state, SessionState::Authenticated(ann(Role::User)));
        assert_eq!(store.token().as_deref(), Some("t1"));
        assert!(!store.is_admin());
    }

    #[test]
    fn test_restore_missing_token_clears_storage() {
        let user = r#"{"id":"u1","name":"Ann","email":"a@b.com","role":"user"}"#;
        let slots = Arc::new(MemorySlotStore::with_slots([(USER_SLOT, user)]));
        let store = store_with(&slots);

        assert_eq!(store.restore_on_startup(), SessionState::Unauthenticated);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_restore_malformed_identity_clears_storage() {
        for user in [
            "not json",
            r#"{"id":"u1","name":"Ann","email":"a@b.com","role":"root"}"#,
            r#"{"id":"","name":"Ann","email":"a@b.com","role":"user"}"#,
        ] {
            let slots = Arc::new(MemorySlotStore::with_slots([(TOKEN_SLOT, "t1"), (USER_SLOT, user)]));
            let store = store_with(&slots);

            assert_eq!(store.restore_on_startup(), SessionState::Unauthenticated);
            assert!(slots.is_empty(), "record {user} should have been cleared");
            assert_coupled(&store, &slots);
        }
    }

    #[test]
    fn test_restore_empty_token_clears_storage() {
        let user = r#"{"id":"u1","name":"Ann","email":"a@b.com","role":"user"}"#;
        let slots = Arc::new(MemorySlotStore::with_slots([(TOKEN_SLOT, " "), (USER_SLOT, user)]));
        let store = store_with(&slots);

        assert_eq!(store.restore_on_startup(), SessionState::Unauthenticated);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_restore_nothing_persisted() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        assert_eq!(store.restore_on_startup(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_invalidate_clears_once() {
        let slots = Arc::new(MemorySlotStore::new());
        let store = store_with(&slots);
        store
            .sign_in(&FakeBackend::accepting("tok", ann(Role::User)), "a@b.com", "secret1")
            .await
            .unwrap();
        let mut events = store.subscribe();

        assert!(store.invalidate(Some("tok")));
        assert!(!store.invalidate(Some("tok")));

        assert!(!store.is_authenticated());
        assert!(slots.is_empty());
        assert_eq!(events.try_recv().ok(), Some(SessionEvent::Invalidated));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_rejection_keeps_newer_session() {
        let store = SessionStore::new(Box::new(MemorySlotStore::new()));
        store
            .sign_in(&FakeBackend::accepting("new", ann(Role::User)), "a@b.com", "secret1")
            .await
            .unwrap();

        assert!(!store.invalidate(Some("old")));
        assert!(!store.invalidate(None));
        assert_eq!(store.token().as_deref(), Some("new"));
    }
}
