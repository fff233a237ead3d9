//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Overlays take input first, then the screen
//! for the current route.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use taskboard_core::Route;

use crate::app::{
    can_add_description_char, can_add_email_char, can_add_name_char, can_add_password_char,
    can_add_title_char, App, AppState, SignInFocus, SignUpFocus, TaskFocus,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.confirm_delete().await;
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::EditingTask => {
            handle_dialog_input(app, key).await;
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    match app.route {
        Route::SignIn => handle_sign_in_input(app, key).await,
        Route::SignUp => handle_sign_up_input(app, key).await,
        Route::Dashboard => handle_board_input(app, key).await,
    }
}

async fn handle_sign_in_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on the sign-in screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.sign_in_focus = app.sign_in_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.sign_in_focus = app.sign_in_focus.prev();
        }
        KeyCode::Enter => match app.sign_in_focus {
            SignInFocus::Email => app.sign_in_focus = SignInFocus::Password,
            SignInFocus::Password | SignInFocus::Submit => {
                app.submit_sign_in().await;
            }
            SignInFocus::SignUpLink => {
                app.auth_error = None;
                app.navigate(Route::SignUp);
            }
        },
        KeyCode::Backspace => match app.sign_in_focus {
            SignInFocus::Email => {
                app.sign_in.email.pop();
            }
            SignInFocus::Password => {
                app.sign_in.password.pop();
            }
            SignInFocus::Submit | SignInFocus::SignUpLink => {}
        },
        KeyCode::Char(c) => match app.sign_in_focus {
            SignInFocus::Email => {
                if can_add_email_char(&app.sign_in.email, c) {
                    app.sign_in.email.push(c);
                }
            }
            SignInFocus::Password => {
                if can_add_password_char(&app.sign_in.password, c) {
                    app.sign_in.password.push(c);
                }
            }
            // Ignore character input on buttons
            SignInFocus::Submit | SignInFocus::SignUpLink => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_sign_up_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let focus = app.sign_up_focus;
    match key.code {
        KeyCode::Esc => {
            app.auth_error = None;
            app.navigate(Route::SignIn);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.sign_up_focus = focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.sign_up_focus = focus.prev();
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if focus == SignUpFocus::Role => {
            app.sign_up.role = app.sign_up.role.toggled();
        }
        KeyCode::Enter => match focus {
            SignUpFocus::Submit => app.submit_sign_up().await,
            SignUpFocus::SignInLink => {
                app.auth_error = None;
                app.navigate(Route::SignIn);
            }
            _ => app.sign_up_focus = focus.next(),
        },
        KeyCode::Backspace => {
            let form = &mut app.sign_up;
            match focus {
                SignUpFocus::Name => {
                    form.name.pop();
                }
                SignUpFocus::Email => {
                    form.email.pop();
                }
                SignUpFocus::Password => {
                    form.password.pop();
                }
                SignUpFocus::Confirm => {
                    form.confirm_password.pop();
                }
                SignUpFocus::Role | SignUpFocus::Submit | SignUpFocus::SignInLink => {}
            }
        }
        KeyCode::Char(c) => {
            let form = &mut app.sign_up;
            let (field, accept): (&mut String, fn(&str, char) -> bool) = match focus {
                SignUpFocus::Name => (&mut form.name, can_add_name_char),
                SignUpFocus::Email => (&mut form.email, can_add_email_char),
                SignUpFocus::Password => (&mut form.password, can_add_password_char),
                SignUpFocus::Confirm => (&mut form.confirm_password, can_add_password_char),
                SignUpFocus::Role | SignUpFocus::Submit | SignUpFocus::SignInLink => {
                    return Ok(false)
                }
            };
            if accept(field, c) {
                field.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_board_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Up | KeyCode::Char('k') => app.board.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.board.select_next(),
        KeyCode::Left => app.prev_page(),
        KeyCode::Right => app.next_page(),
        KeyCode::Char('a') => app.open_create_dialog(),
        KeyCode::Char('e') | KeyCode::Enter => app.open_edit_dialog(),
        KeyCode::Char(' ') => app.toggle_selected_status().await,
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('f') => app.cycle_filter(),
        KeyCode::Char('r') => app.refresh_board(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('o') => app.sign_out(),
        KeyCode::Esc => app.notice = None,
        _ => {}
    }
    Ok(false)
}

async fn handle_dialog_input(app: &mut App, key: KeyEvent) {
    let Some(dialog) = app.dialog.as_mut() else {
        app.state = AppState::Normal;
        return;
    };
    let focus = dialog.focus;

    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Down | KeyCode::Tab => dialog.focus = focus.next(),
        KeyCode::Up | KeyCode::BackTab => dialog.focus = focus.prev(),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if focus == TaskFocus::Status => {
            dialog.draft.status = dialog.draft.status.toggled();
        }
        KeyCode::Enter => match focus {
            TaskFocus::Save => app.submit_dialog().await,
            _ => dialog.focus = focus.next(),
        },
        KeyCode::Backspace => match focus {
            TaskFocus::Title => {
                dialog.draft.title.pop();
            }
            TaskFocus::Description => {
                dialog.draft.description.pop();
            }
            TaskFocus::Status | TaskFocus::Save => {}
        },
        KeyCode::Char(c) => match focus {
            TaskFocus::Title => {
                if can_add_title_char(&dialog.draft.title, c) {
                    dialog.draft.title.push(c);
                }
            }
            TaskFocus::Description => {
                if can_add_description_char(&dialog.draft.description, c) {
                    dialog.draft.description.push(c);
                }
            }
            TaskFocus::Status | TaskFocus::Save => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crossterm::event::KeyModifiers;
    use taskboard_core::auth::MemorySlotStore;
    use taskboard_core::{ApiClient, Config, Role, SessionStore, StorageBackend, TaskStatus};

    fn app() -> App {
        let config = Config {
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let session = Arc::new(SessionStore::new(Box::new(MemorySlotStore::new())));
        let api = ApiClient::new("http://127.0.0.1:9/api", Arc::clone(&session)).unwrap();
        App::with_parts(config, session, api)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_input(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_sign_in_typing_and_focus() {
        let mut app = app();
        type_text(&mut app, "ann@example.com").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        type_text(&mut app, "secret1").await;
        handle_input(&mut app, key(KeyCode::Backspace)).await.unwrap();

        assert_eq!(app.sign_in.email, "ann@example.com");
        assert_eq!(app.sign_in.password, "secret");
        assert_eq!(app.sign_in_focus, SignInFocus::Password);
    }

    #[tokio::test]
    async fn test_sign_up_link_and_back() {
        let mut app = app();
        handle_input(&mut app, key(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.sign_in_focus, SignInFocus::SignUpLink);
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.route, Route::SignUp);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.route, Route::SignIn);
    }

    #[tokio::test]
    async fn test_sign_up_role_selector() {
        let mut app = app();
        app.navigate(Route::SignUp);
        for _ in 0..4 {
            handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        }
        assert_eq!(app.sign_up_focus, SignUpFocus::Role);
        handle_input(&mut app, key(KeyCode::Char(' '))).await.unwrap();
        assert_eq!(app.sign_up.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_sign_up_mismatch_shown() {
        let mut app = app();
        app.navigate(Route::SignUp);
        type_text(&mut app, "Ann").await;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_text(&mut app, "ann@example.com").await;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_text(&mut app, "secret1").await;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_text(&mut app, "secret2").await;
        app.sign_up_focus = SignUpFocus::Submit;
        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert_eq!(app.auth_error.as_deref(), Some("Passwords do not match"));
        assert_eq!(app.route, Route::SignUp);
    }

    #[tokio::test]
    async fn test_dialog_typing() {
        let mut app = app();
        app.dialog = Some(crate::app::TaskDialog::create());
        app.state = AppState::EditingTask;

        type_text(&mut app, "Write").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        type_text(&mut app, "Report").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        handle_input(&mut app, key(KeyCode::Char(' '))).await.unwrap();

        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.draft.title, "Write");
        assert_eq!(dialog.draft.description, "Report");
        assert_eq!(dialog.draft.status, TaskStatus::Completed);

        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.dialog.is_none());
        assert_eq!(app.state, AppState::Normal);
    }

    #[tokio::test]
    async fn test_quit_confirmation() {
        let mut app = app();
        app.state = AppState::ConfirmingQuit;
        assert!(!handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);

        app.state = AppState::ConfirmingQuit;
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
    }
}
