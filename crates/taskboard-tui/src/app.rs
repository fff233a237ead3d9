//! Application state management for the Taskboard terminal client.
//!
//! This module contains the core `App` struct: which screen is showing, the
//! sign-in/sign-up/task forms, the board's query and current page, and the
//! background fetch channel. Every screen change is resolved through the
//! access gate, and session events from the store drive the view back to
//! Sign In when the backend rejects the token.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use taskboard_core::api::{ApiClient, ApiError};
use taskboard_core::auth::{SignInForm, SignUpForm};
use taskboard_core::config::{Config, ThemeMode};
use taskboard_core::{
    AccessGate, Capability, Route, SessionEvent, SessionStore, Task, TaskDraft, TaskPage,
    TaskQuery, TaskUpdate,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the board fetch channel.
/// Only the newest fetch matters, a handful of slots absorbs rapid paging.
const CHANNEL_BUFFER_SIZE: usize = 8;

const MAX_NAME_LENGTH: usize = 50;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

pub const SESSION_EXPIRED: &str = "Session expired. Please sign in again.";

// ============================================================================
// UI State Types
// ============================================================================

/// Overlay state on top of the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    EditingTask,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Sign-in form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFocus {
    Email,
    Password,
    Submit,
    SignUpLink,
}

impl SignInFocus {
    pub fn next(&self) -> Self {
        match self {
            SignInFocus::Email => SignInFocus::Password,
            SignInFocus::Password => SignInFocus::Submit,
            SignInFocus::Submit => SignInFocus::SignUpLink,
            SignInFocus::SignUpLink => SignInFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            SignInFocus::Email => SignInFocus::SignUpLink,
            SignInFocus::Password => SignInFocus::Email,
            SignInFocus::Submit => SignInFocus::Password,
            SignInFocus::SignUpLink => SignInFocus::Submit,
        }
    }
}

/// Sign-up form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpFocus {
    Name,
    Email,
    Password,
    Confirm,
    Role,
    Submit,
    SignInLink,
}

impl SignUpFocus {
    pub fn next(&self) -> Self {
        match self {
            SignUpFocus::Name => SignUpFocus::Email,
            SignUpFocus::Email => SignUpFocus::Password,
            SignUpFocus::Password => SignUpFocus::Confirm,
            SignUpFocus::Confirm => SignUpFocus::Role,
            SignUpFocus::Role => SignUpFocus::Submit,
            SignUpFocus::Submit => SignUpFocus::SignInLink,
            SignUpFocus::SignInLink => SignUpFocus::Name,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            SignUpFocus::Name => SignUpFocus::SignInLink,
            SignUpFocus::Email => SignUpFocus::Name,
            SignUpFocus::Password => SignUpFocus::Email,
            SignUpFocus::Confirm => SignUpFocus::Password,
            SignUpFocus::Role => SignUpFocus::Confirm,
            SignUpFocus::Submit => SignUpFocus::Role,
            SignUpFocus::SignInLink => SignUpFocus::Submit,
        }
    }
}

/// Task dialog focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFocus {
    Title,
    Description,
    Status,
    Save,
}

impl TaskFocus {
    pub fn next(&self) -> Self {
        match self {
            TaskFocus::Title => TaskFocus::Description,
            TaskFocus::Description => TaskFocus::Status,
            TaskFocus::Status => TaskFocus::Save,
            TaskFocus::Save => TaskFocus::Title,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            TaskFocus::Title => TaskFocus::Save,
            TaskFocus::Description => TaskFocus::Title,
            TaskFocus::Status => TaskFocus::Description,
            TaskFocus::Save => TaskFocus::Status,
        }
    }
}

/// Feedback line shown in the status bar after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub error: bool,
}

/// Whether the dialog creates a task or updates an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(String),
}

#[derive(Debug, Clone)]
pub struct TaskDialog {
    pub mode: DialogMode,
    pub draft: TaskDraft,
    pub focus: TaskFocus,
    pub error: Option<String>,
}

impl TaskDialog {
    pub fn create() -> Self {
        Self {
            mode: DialogMode::Create,
            draft: TaskDraft::default(),
            focus: TaskFocus::Title,
            error: None,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            mode: DialogMode::Edit(task.id.clone()),
            draft: TaskDraft::from_task(task),
            focus: TaskFocus::Title,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            DialogMode::Create => "Create New Task",
            DialogMode::Edit(_) => "Edit Task",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            DialogMode::Create => "Create",
            DialogMode::Edit(_) => "Update",
        }
    }
}

/// Task list shown on the dashboard
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub query: TaskQuery,
    pub page: TaskPage,
    pub selection: usize,
    pub loading: bool,
    /// Bumped on every fetch; completions for an older generation are dropped
    generation: u64,
}

impl BoardState {
    pub fn new(page_size: u32) -> Self {
        Self {
            query: TaskQuery::with_limit(page_size),
            ..Self::default()
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.page.tasks.get(self.selection)
    }

    pub fn select_next(&mut self) {
        if self.selection + 1 < self.page.tasks.len() {
            self.selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selection = self.selection.saturating_sub(1);
    }

    /// Total pages as shown, never less than one
    pub fn total_pages(&self) -> u32 {
        self.page.total_pages.max(1)
    }

    fn clamp_selection(&mut self) {
        self.selection = self
            .selection
            .min(self.page.tasks.len().saturating_sub(1));
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Completion of a background `GET /tasks`, tagged with the board
/// generation that requested it.
struct BoardResult {
    generation: u64,
    result: Result<TaskPage, ApiError>,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    events: broadcast::Receiver<SessionEvent>,

    // UI State
    pub state: AppState,
    pub route: Route,
    pub notice: Option<Notice>,

    // Auth forms
    pub sign_in: SignInForm,
    pub sign_in_focus: SignInFocus,
    pub sign_up: SignUpForm,
    pub sign_up_focus: SignUpFocus,
    pub auth_error: Option<String>,

    // Dashboard
    pub board: BoardState,
    pub dialog: Option<TaskDialog>,

    board_rx: mpsc::Receiver<BoardResult>,
    board_tx: mpsc::Sender<BoardResult>,
}

impl App {
    /// Build the app from configuration: open the slot store, create the
    /// session store and the API client that shares it.
    pub fn new(config: Config) -> Result<Self> {
        let storage = config.open_storage()?;
        let session = Arc::new(SessionStore::new(storage));
        let api = ApiClient::with_timeout(
            &config.api_url(),
            Arc::clone(&session),
            config.request_timeout(),
        )?;
        Ok(Self::with_parts(config, session, api))
    }

    pub fn with_parts(config: Config, session: Arc<SessionStore>, api: ApiClient) -> Self {
        let (board_tx, board_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let events = session.subscribe();
        let sign_in = SignInForm {
            email: config.last_email.clone().unwrap_or_default(),
            ..SignInForm::default()
        };
        let board = BoardState::new(config.page_size());

        Self {
            config,
            session,
            api,
            events,
            state: AppState::Normal,
            route: Route::SignIn,
            notice: None,
            sign_in,
            sign_in_focus: SignInFocus::Email,
            sign_up: SignUpForm::default(),
            sign_up_focus: SignUpFocus::Name,
            auth_error: None,
            board,
            dialog: None,
            board_rx,
            board_tx,
        }
    }

    /// Restore any persisted session and open the initial route.
    pub fn startup(&mut self, initial: Route) {
        let state = self.session.restore_on_startup();
        info!(authenticated = state.is_authenticated(), "Startup session state");
        self.navigate(initial);
    }

    fn notify(&mut self, text: &str) {
        self.notice = Some(Notice {
            text: text.to_string(),
            error: false,
        });
    }

    fn notify_error(&mut self, text: &str) {
        self.notice = Some(Notice {
            text: text.to_string(),
            error: true,
        });
    }

    pub fn theme(&self) -> ThemeMode {
        self.config.theme
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Move to `route`, or wherever the access gate redirects it.
    pub fn navigate(&mut self, route: Route) {
        let target = AccessGate::resolve(route, &self.session.state());
        if target != route {
            debug!(requested = route.path(), resolved = target.path(), "Navigation redirected");
        }
        let changed = target != self.route;
        self.route = target;

        match target {
            Route::Dashboard => {
                self.auth_error = None;
                if changed || self.board.page.tasks.is_empty() {
                    self.refresh_board();
                }
            }
            Route::SignIn => {
                self.state = AppState::Normal;
                self.dialog = None;
                self.sign_in_focus = if self.sign_in.email.is_empty() {
                    SignInFocus::Email
                } else {
                    SignInFocus::Password
                };
            }
            Route::SignUp => {
                self.state = AppState::Normal;
                self.sign_up_focus = SignUpFocus::Name;
            }
        }
    }

    /// Drain session events published by the store.
    pub fn check_session_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Invalidated) => {
                    info!("Session invalidated, returning to sign in");
                    self.reset_board();
                    self.navigate(self.route);
                    self.auth_error = Some(SESSION_EXPIRED.to_string());
                }
                Ok(SessionEvent::SignedOut) => {
                    self.reset_board();
                    self.navigate(self.route);
                }
                Ok(SessionEvent::Established(identity)) => {
                    debug!(user_id = %identity.id, "Session established");
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events, re-checking route");
                    self.navigate(self.route);
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    fn reset_board(&mut self) {
        // Keep counting so fetches still in flight become stale
        let generation = self.board.generation + 1;
        self.board = BoardState::new(self.config.page_size());
        self.board.generation = generation;
        self.dialog = None;
        if matches!(self.state, AppState::EditingTask | AppState::ConfirmingDelete) {
            self.state = AppState::Normal;
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn submit_sign_in(&mut self) {
        self.auth_error = None;
        let form = SignInForm::new(self.sign_in.email.trim(), self.sign_in.password.clone());
        match self.session.sign_in_with(&self.api, &form).await {
            Ok(identity) => {
                info!(user_id = %identity.id, "Sign in successful");
                self.remember_email(form.email);
                self.sign_in.password.clear();
                self.navigate(Route::Dashboard);
            }
            Err(e) => {
                debug!(error = %e, "Sign in failed");
                self.auth_error = Some(e.message());
            }
        }
    }

    pub async fn submit_sign_up(&mut self) {
        self.auth_error = None;
        match self.session.sign_up_with(&self.api, &self.sign_up).await {
            Ok(identity) => {
                info!(user_id = %identity.id, role = identity.role.as_str(), "Sign up successful");
                self.remember_email(identity.email.clone());
                self.sign_up = SignUpForm::default();
                self.navigate(Route::Dashboard);
            }
            Err(e) => {
                debug!(error = %e, "Sign up failed");
                self.auth_error = Some(e.message());
            }
        }
    }

    fn remember_email(&mut self, email: String) {
        self.sign_in.email = email.clone();
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    pub fn sign_out(&mut self) {
        self.session.sign_out();
        self.notice = None;
        self.reset_board();
        self.navigate(Route::SignIn);
    }

    pub fn toggle_theme(&mut self) {
        self.config.theme = self.config.theme.toggled();
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save theme preference");
        }
    }

    // =========================================================================
    // Board
    // =========================================================================

    /// Spawn a background fetch of the current page.
    pub fn refresh_board(&mut self) {
        self.board.generation += 1;
        self.board.loading = true;

        let api = self.api.clone();
        let query = self.board.query;
        let generation = self.board.generation;
        let tx = self.board_tx.clone();
        debug!(generation, page = query.page, "Fetching tasks");

        tokio::spawn(async move {
            let result = api.list_tasks(&query).await;
            if tx.send(BoardResult { generation, result }).await.is_err() {
                debug!("Board channel closed before fetch completed");
            }
        });
    }

    /// Apply completed background fetches.
    pub fn check_background_tasks(&mut self) {
        while let Ok(BoardResult { generation, result }) = self.board_rx.try_recv() {
            self.apply_board_result(generation, result);
        }
    }

    fn apply_board_result(&mut self, generation: u64, result: Result<TaskPage, ApiError>) {
        if generation != self.board.generation {
            debug!(generation, current = self.board.generation, "Dropping stale task list");
            return;
        }
        self.board.loading = false;

        match result {
            Ok(page) => {
                self.board.page = page;
                self.board.clamp_selection();

                // A delete can leave us past the last page
                let total = self.board.page.total_pages;
                if self.board.page.tasks.is_empty() && self.board.query.page > total.max(1) {
                    self.board.query.page = total.max(1);
                    self.refresh_board();
                }
            }
            // The session event takes the view back to sign in
            Err(e) if e.is_unauthorized() => {}
            Err(e) => {
                warn!(error = %e, "Failed to fetch tasks");
                self.notify_error("Failed to fetch tasks");
            }
        }
    }

    pub fn cycle_filter(&mut self) {
        self.board.query.cycle_status();
        self.board.selection = 0;
        self.refresh_board();
    }

    pub fn next_page(&mut self) {
        if self.board.query.next_page(self.board.page.total_pages) {
            self.board.selection = 0;
            self.refresh_board();
        }
    }

    pub fn prev_page(&mut self) {
        if self.board.query.prev_page() {
            self.board.selection = 0;
            self.refresh_board();
        }
    }

    // =========================================================================
    // Task mutations
    // =========================================================================

    pub fn open_create_dialog(&mut self) {
        if !self.session.can(Capability::CreateTask) {
            return;
        }
        self.dialog = Some(TaskDialog::create());
        self.state = AppState::EditingTask;
    }

    pub fn open_edit_dialog(&mut self) {
        if !self.session.can(Capability::EditTask) {
            return;
        }
        if let Some(task) = self.board.selected_task() {
            self.dialog = Some(TaskDialog::edit(task));
            self.state = AppState::EditingTask;
        }
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
        self.state = AppState::Normal;
    }

    pub async fn submit_dialog(&mut self) {
        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };
        if let Err(message) = dialog.draft.validate() {
            dialog.error = Some(message);
            return;
        }
        dialog.error = None;

        let draft = dialog.draft.clone();
        let mode = dialog.mode.clone();
        let result = match &mode {
            DialogMode::Create => self.api.create_task(&draft).await,
            DialogMode::Edit(id) => self.api.update_task(id, &TaskUpdate::from(draft)).await,
        };

        match result {
            Ok(()) => {
                let message = match mode {
                    DialogMode::Create => "Task created successfully",
                    DialogMode::Edit(_) => "Task updated successfully",
                };
                self.notify(message);
                self.close_dialog();
                self.refresh_board();
            }
            Err(e) if e.is_unauthorized() => {}
            Err(e) => {
                warn!(error = %e, "Task save failed");
                let message = e.user_message("Operation failed");
                self.notify_error(&message);
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.error = Some(message);
                }
            }
        }
    }

    pub async fn toggle_selected_status(&mut self) {
        if !self.session.can(Capability::ToggleStatus) {
            return;
        }
        let Some(task) = self.board.selected_task() else {
            return;
        };
        let id = task.id.clone();
        let status = task.status.toggled();

        match self.api.set_task_status(&id, status).await {
            Ok(()) => {
                self.notify("Task status updated");
                self.refresh_board();
            }
            Err(e) if e.is_unauthorized() => {}
            Err(e) => {
                warn!(error = %e, task_id = %id, "Status update failed");
                self.notify_error("Failed to update task status");
            }
        }
    }

    /// Ask for confirmation before deleting. Only offered to roles with
    /// the delete capability.
    /// Whether the signed-in user may delete tasks
    pub fn can_delete(&self) -> bool {
        self.session.can(Capability::DeleteTask)
    }

    pub fn request_delete(&mut self) {
        if !self.can_delete() {
            self.notify_error("Only admins can delete tasks");
            return;
        }
        if self.board.selected_task().is_some() {
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub async fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        if !self.can_delete() {
            return;
        }
        let Some(id) = self.board.selected_task().map(|t| t.id.clone()) else {
            return;
        };

        match self.api.delete_task(&id).await {
            Ok(()) => {
                self.notify("Task deleted successfully");
                self.refresh_board();
            }
            Err(e) if e.is_unauthorized() => {}
            Err(e) => {
                warn!(error = %e, task_id = %id, "Delete failed");
                self.notify_error(&e.user_message("Failed to delete task"));
            }
        }
    }
}

// ============================================================================
// Input Validation Helpers
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

fn can_add_char(current: &str, max_len: usize, c: char) -> bool {
    current.chars().count() < max_len && is_valid_input_char(c)
}

pub fn can_add_name_char(current: &str, c: char) -> bool {
    can_add_char(current, MAX_NAME_LENGTH, c)
}

pub fn can_add_email_char(current: &str, c: char) -> bool {
    can_add_char(current, MAX_EMAIL_LENGTH, c)
}

pub fn can_add_password_char(current: &str, c: char) -> bool {
    can_add_char(current, MAX_PASSWORD_LENGTH, c)
}

pub fn can_add_title_char(current: &str, c: char) -> bool {
    can_add_char(current, MAX_TITLE_LENGTH, c)
}

pub fn can_add_description_char(current: &str, c: char) -> bool {
    can_add_char(current, MAX_DESCRIPTION_LENGTH, c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::auth::storage::{TOKEN_SLOT, USER_SLOT};
    use taskboard_core::auth::MemorySlotStore;
    use taskboard_core::{StorageBackend, TaskStatus};

    const ANN: &str = r#"{"_id":"u1","name":"Ann","email":"ann@example.com","role":"user"}"#;
    const ROOT: &str = r#"{"_id":"u2","name":"Root","email":"root@example.com","role":"admin"}"#;

    fn app_with(slots: MemorySlotStore) -> App {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let session = Arc::new(SessionStore::new(Box::new(slots)));
        // Nothing listens here; requests fail fast if a test ever sends one
        let api = ApiClient::new("http://127.0.0.1:9/api", Arc::clone(&session)).unwrap();
        App::with_parts(config, session, api)
    }

    fn signed_in(user: &str) -> App {
        let mut app = app_with(MemorySlotStore::with_slots([(TOKEN_SLOT, "tok"), (USER_SLOT, user)]));
        app.session.restore_on_startup();
        app
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: "Body".to_string(),
            status,
            created_at: None,
            updated_at: None,
        }
    }

    fn page_of(tasks: Vec<Task>, total_pages: u32) -> TaskPage {
        TaskPage {
            total_tasks: tasks.len() as u64,
            tasks,
            total_pages,
        }
    }

    #[test]
    fn test_unauthenticated_start_lands_on_sign_in() {
        let mut app = app_with(MemorySlotStore::new());
        app.startup(Route::Dashboard);
        assert_eq!(app.route, Route::SignIn);
        assert_eq!(app.sign_in_focus, SignInFocus::Email);
    }

    #[tokio::test]
    async fn test_restored_session_opens_dashboard() {
        let mut app = app_with(MemorySlotStore::with_slots([(TOKEN_SLOT, "tok"), (USER_SLOT, ANN)]));
        app.startup(Route::parse("/"));
        assert_eq!(app.route, Route::Dashboard);
        assert!(app.board.loading);
    }

    #[tokio::test]
    async fn test_signed_in_user_may_open_sign_in() {
        let mut app = signed_in(ANN);
        app.navigate(Route::SignIn);
        assert_eq!(app.route, Route::SignIn);
        assert!(app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_invalidated_session_returns_to_sign_in() {
        let mut app = signed_in(ANN);
        app.navigate(Route::Dashboard);
        app.dialog = Some(TaskDialog::create());
        app.state = AppState::EditingTask;

        assert!(app.session.invalidate(Some("tok")));
        app.check_session_events();

        assert_eq!(app.route, Route::SignIn);
        assert_eq!(app.state, AppState::Normal);
        assert!(app.dialog.is_none());
        assert_eq!(app.auth_error.as_deref(), Some(SESSION_EXPIRED));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let mut app = signed_in(ANN);
        app.navigate(Route::Dashboard);
        app.sign_out();
        app.check_session_events();

        assert_eq!(app.route, Route::SignIn);
        assert!(!app.session.is_authenticated());
        assert!(app.session.token().is_none());
        assert!(app.board.page.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_sign_in_form_sends_nothing() {
        let mut app = app_with(MemorySlotStore::new());
        app.sign_in.email = "ann@example.com".to_string();

        app.submit_sign_in().await;
        assert_eq!(app.auth_error.as_deref(), Some("Please fill in all fields"));
        assert_eq!(app.route, Route::SignIn);
    }

    #[test]
    fn test_stale_board_result_is_dropped() {
        let mut app = app_with(MemorySlotStore::new());
        app.board.generation = 2;
        app.board.loading = true;

        app.apply_board_result(1, Ok(page_of(vec![task("old", TaskStatus::Pending)], 1)));
        assert!(app.board.page.tasks.is_empty());
        assert!(app.board.loading);

        app.apply_board_result(2, Ok(page_of(vec![task("new", TaskStatus::Pending)], 1)));
        assert_eq!(app.board.page.tasks[0].id, "new");
        assert!(!app.board.loading);
    }

    #[test]
    fn test_failed_fetch_sets_message() {
        let mut app = app_with(MemorySlotStore::new());
        app.apply_board_result(0, Err(ApiError::ServerError(None)));
        let notice = app.notice.take().unwrap();
        assert_eq!(notice.text, "Failed to fetch tasks");
        assert!(notice.error);

        app.apply_board_result(0, Err(ApiError::Unauthorized));
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_selection_clamped_to_page() {
        let mut app = app_with(MemorySlotStore::new());
        app.board.selection = 5;
        app.apply_board_result(
            0,
            Ok(page_of(
                vec![task("a", TaskStatus::Pending), task("b", TaskStatus::Completed)],
                1,
            )),
        );
        assert_eq!(app.board.selection, 1);
        app.board.select_next();
        assert_eq!(app.board.selection, 1);
        app.board.select_prev();
        app.board.select_prev();
        assert_eq!(app.board.selection, 0);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let mut app = signed_in(ANN);
        assert!(!app.can_delete());
        app.board.page = page_of(vec![task("a", TaskStatus::Pending)], 1);
        app.request_delete();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(
            app.notice.as_ref().map(|n| n.text.as_str()),
            Some("Only admins can delete tasks")
        );

        let mut admin = signed_in(ROOT);
        assert!(admin.can_delete());
        admin.board.page = page_of(vec![task("a", TaskStatus::Pending)], 1);
        admin.request_delete();
        assert_eq!(admin.state, AppState::ConfirmingDelete);
    }

    #[tokio::test]
    async fn test_dialog_validation_blocks_submit() {
        let mut app = signed_in(ANN);
        app.open_create_dialog();
        assert_eq!(app.state, AppState::EditingTask);

        app.submit_dialog().await;
        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.error.as_deref(), Some("Title is required"));
        assert_eq!(dialog.submit_label(), "Create");
    }

    #[tokio::test]
    async fn test_edit_dialog_prefills() {
        let mut app = signed_in(ANN);
        app.board.page = page_of(vec![task("a", TaskStatus::Completed)], 1);
        app.open_edit_dialog();

        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.mode, DialogMode::Edit("a".to_string()));
        assert_eq!(dialog.draft.title, "Task a");
        assert_eq!(dialog.draft.status, TaskStatus::Completed);
        assert_eq!(dialog.title(), "Edit Task");
    }

    #[test]
    fn test_focus_cycles() {
        assert_eq!(SignInFocus::SignUpLink.next(), SignInFocus::Email);
        assert_eq!(SignInFocus::Email.prev(), SignInFocus::SignUpLink);
        assert_eq!(SignUpFocus::Confirm.next(), SignUpFocus::Role);
        assert_eq!(TaskFocus::Title.prev(), TaskFocus::Save);
    }

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char("", 'a'));
        assert!(can_add_email_char(&"a".repeat(99), 'z'));
        assert!(!can_add_email_char(&"a".repeat(100), 'a'));
        assert!(!can_add_email_char("", '\n'));
        assert!(!can_add_email_char("", '\t'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(&"x".repeat(127), '!'));
        assert!(!can_add_password_char(&"x".repeat(128), 'a'));
        assert!(!can_add_password_char("", '\x00'));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let title = "é".repeat(99);
        assert!(can_add_title_char(&title, 'é'));
        assert!(can_add_name_char("", 'Z'));
        assert!(!can_add_description_char(&"d".repeat(500), 'd'));
    }
}
