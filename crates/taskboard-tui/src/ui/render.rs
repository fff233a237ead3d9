use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use taskboard_core::{Route, TaskStatus};

use crate::app::{App, AppState, Notice, SignInFocus, SignUpFocus, TaskDialog, TaskFocus};
use crate::utils::{mask, tail, tasks_found, truncate_string};

use super::styles::{self, Palette};

/// Visible width of a text field
const FIELD_WIDTH: usize = 24;

/// Lines used by one task on the board
const TASK_HEIGHT: usize = 3;

pub fn render(frame: &mut Frame, app: &App) {
    let p = styles::palette(app.theme());
    frame.render_widget(Block::default().style(p.base_style()), frame.area());

    match app.route {
        Route::SignIn => render_sign_in(frame, app, p),
        Route::SignUp => render_sign_up(frame, app, p),
        Route::Dashboard => render_dashboard(frame, app, p),
    }

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame, p),
        AppState::ConfirmingQuit => render_confirm_overlay(
            frame,
            p,
            "Are you sure you want to quit?",
            "quit",
        ),
        AppState::ConfirmingDelete => render_confirm_overlay(
            frame,
            p,
            "Are you sure you want to delete this task?",
            "delete",
        ),
        AppState::EditingTask => {
            if let Some(ref dialog) = app.dialog {
                render_task_dialog(frame, dialog, p);
            }
        }
        AppState::Normal | AppState::Quitting => {}
    }
}

// ============================================================================
// Auth screens
// ============================================================================

fn field_line(p: &Palette, label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        p.selected_style()
    } else {
        p.text_style()
    };
    let cursor = if focused { "▌" } else { " " };
    Line::from(vec![
        Span::styled(format!("  {:<10}", label), p.muted_style()),
        Span::styled("[", p.muted_style()),
        Span::styled(
            format!("{:<width$}{}", tail(value, FIELD_WIDTH), cursor, width = FIELD_WIDTH),
            style,
        ),
        Span::styled("]", p.muted_style()),
    ])
}

fn choice_line(p: &Palette, label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        p.selected_style()
    } else {
        p.text_style()
    };
    Line::from(vec![
        Span::styled(format!("  {:<10}", label), p.muted_style()),
        Span::styled(format!(" < {} > ", value), style),
        Span::styled(
            if focused { "  space to change" } else { "" },
            p.muted_style(),
        ),
    ])
}

fn button_line(p: &Palette, label: &str, focused: bool) -> Line<'static> {
    let text = if focused {
        format!(" ▶ {} ◀ ", label)
    } else {
        format!("   {}   ", label)
    };
    let style = if focused {
        p.selected_style()
    } else {
        p.text_style()
    };
    Line::from(vec![
        Span::styled("[", p.muted_style()),
        Span::styled(text, style),
        Span::styled("]", p.muted_style()),
    ])
    .centered()
}

fn link_line(p: &Palette, prompt: &str, link: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        p.selected_style()
    } else {
        p.highlight_style()
    };
    Line::from(vec![
        Span::styled(format!("{} ", prompt), p.muted_style()),
        Span::styled(link.to_string(), style),
    ])
    .centered()
}

fn render_form(frame: &mut Frame, p: &Palette, title: &str, mut lines: Vec<Line<'static>>, error: Option<&str>) {
    if let Some(error) = error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), p.error_style())));
    }

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(52, height, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(p.border_style(true))
        .title(Span::styled(format!(" {} ", title), p.title_style()))
        .style(p.base_style());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_sign_in(frame: &mut Frame, app: &App, p: &Palette) {
    let focus = app.sign_in_focus;
    let lines = vec![
        Line::from(Span::styled("Taskboard", p.title_style())).centered(),
        Line::from(Span::styled("Sign in to your account", p.muted_style())).centered(),
        Line::from(""),
        field_line(p, "Email", &app.sign_in.email, focus == SignInFocus::Email),
        field_line(
            p,
            "Password",
            &mask(&app.sign_in.password, FIELD_WIDTH),
            focus == SignInFocus::Password,
        ),
        Line::from(""),
        button_line(p, "Sign In", focus == SignInFocus::Submit),
        Line::from(""),
        link_line(p, "Don't have an account?", "Sign Up", focus == SignInFocus::SignUpLink),
    ];

    render_form(frame, p, "Sign In", lines, app.auth_error.as_deref());
}

fn render_sign_up(frame: &mut Frame, app: &App, p: &Palette) {
    let focus = app.sign_up_focus;
    let form = &app.sign_up;
    let role = form.role.display_name();
    let lines = vec![
        Line::from(Span::styled("Taskboard", p.title_style())).centered(),
        Line::from(Span::styled("Create your account", p.muted_style())).centered(),
        Line::from(""),
        field_line(p, "Name", &form.name, focus == SignUpFocus::Name),
        field_line(p, "Email", &form.email, focus == SignUpFocus::Email),
        field_line(
            p,
            "Password",
            &mask(&form.password, FIELD_WIDTH),
            focus == SignUpFocus::Password,
        ),
        field_line(
            p,
            "Confirm",
            &mask(&form.confirm_password, FIELD_WIDTH),
            focus == SignUpFocus::Confirm,
        ),
        choice_line(p, "Role", role, focus == SignUpFocus::Role),
        Line::from(""),
        button_line(p, "Sign Up", focus == SignUpFocus::Submit),
        Line::from(""),
        link_line(p, "Already have an account?", "Sign In", focus == SignUpFocus::SignInLink),
    ];

    render_form(frame, p, "Sign Up", lines, app.auth_error.as_deref());
}

// ============================================================================
// Dashboard
// ============================================================================

fn render_dashboard(frame: &mut Frame, app: &App, p: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Navbar
            Constraint::Length(3), // Board header
            Constraint::Min(6),    // Task list
            Constraint::Length(1), // Pagination
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_navbar(frame, app, p, chunks[0]);
    render_board_header(frame, app, p, chunks[1]);
    render_task_list(frame, app, p, chunks[2]);
    render_pagination(frame, app, p, chunks[3]);
    render_status_bar(frame, app, p, chunks[4]);
}

fn render_navbar(frame: &mut Frame, app: &App, p: &Palette, area: Rect) {
    let title = "  Taskboard";
    let identity = app.session.identity();
    let name = identity.as_ref().map(|i| i.name.as_str()).unwrap_or("");
    let admin = identity.as_ref().map(|i| i.is_admin()).unwrap_or(false);
    let badge = format!(" {} ", if admin { "Admin" } else { "User" });
    let theme = format!(" | {} theme | [?] Help ", app.theme().label());

    let used = title.chars().count() + name.chars().count() + badge.chars().count() + theme.chars().count() + 1;
    let padding = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(title, p.title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(format!("{} ", name), p.text_style()),
        Span::styled(badge, p.badge_style(admin)),
        Span::styled(theme, p.muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(p.muted_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn filter_label(status: Option<TaskStatus>) -> &'static str {
    match status {
        None => "All",
        Some(TaskStatus::Pending) => "Pending",
        Some(TaskStatus::Completed) => "Completed",
    }
}

fn render_board_header(frame: &mut Frame, app: &App, p: &Palette, area: Rect) {
    let board = &app.board;
    let filter = format!("Filter: {} [f]", filter_label(board.query.status));
    let title = "  My Tasks";
    let padding = (area.width as usize).saturating_sub(title.len() + filter.chars().count() + 2);

    let lines = vec![
        Line::from(vec![
            Span::styled(title, p.title_style()),
            Span::raw(" ".repeat(padding)),
            Span::styled(filter, p.highlight_style()),
        ]),
        Line::from(Span::styled(
            format!("  {}", tasks_found(board.page.total_tasks)),
            p.muted_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(p.muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_task_list(frame: &mut Frame, app: &App, p: &Palette, area: Rect) {
    let board = &app.board;

    if board.page.tasks.is_empty() {
        let lines = if board.loading {
            vec![Line::from(Span::styled("Loading tasks...", p.muted_style())).centered()]
        } else {
            let hint = if board.query.status.is_some() {
                "Try changing the filter"
            } else {
                "Get started by creating your first task"
            };
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled("No tasks found", p.title_style())).centered(),
                Line::from(Span::styled(hint, p.muted_style())).centered(),
            ];
            if board.query.status.is_none() {
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled("Press ", p.muted_style()),
                    Span::styled("a", p.help_key_style()),
                    Span::styled(" to create a task", p.muted_style()),
                ]).centered());
            }
            lines
        };
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    // Keep the selection in view when the page is taller than the area
    let visible = (area.height as usize / TASK_HEIGHT).max(1);
    let first = board.selection.saturating_sub(visible - 1);
    let text_width = (area.width as usize).saturating_sub(8);

    let mut lines = Vec::new();
    for (index, task) in board.page.tasks.iter().enumerate().skip(first).take(visible) {
        let selected = index == board.selection;
        let marker = if selected { "▶ " } else { "  " };
        let checkbox = if task.status.is_completed() { "[x] " } else { "[ ] " };
        let title_style = if selected {
            p.selected_style()
        } else if task.status.is_completed() {
            p.completed_style()
        } else {
            p.text_style()
        };
        let status_style = if task.status.is_completed() {
            p.success_style()
        } else {
            p.highlight_style()
        };

        let mut head = vec![
            Span::styled(marker, p.highlight_style()),
            Span::styled(checkbox, status_style),
            Span::styled(truncate_string(&task.title, text_width.saturating_sub(24)), title_style),
            Span::styled(format!("  {}", task.status.as_str()), status_style),
        ];
        if let Some(created) = task.created_display() {
            head.push(Span::styled(format!("  {}", created), p.muted_style()));
        }
        lines.push(Line::from(head));
        lines.push(Line::from(Span::styled(
            format!("      {}", truncate_string(&task.description, text_width)),
            p.muted_style(),
        )));
        lines.push(Line::from(""));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_pagination(frame: &mut Frame, app: &App, p: &Palette, area: Rect) {
    let board = &app.board;
    if board.page.total_pages <= 1 {
        return;
    }
    let page = board.query.page;
    let total = board.total_pages();
    let prev = if page > 1 { "◀ " } else { "  " };
    let next = if page < total { " ▶" } else { "  " };

    let line = Line::from(vec![
        Span::styled(prev, p.highlight_style()),
        Span::styled(format!("Page {} of {}", page, total), p.text_style()),
        Span::styled(next, p.highlight_style()),
    ])
    .centered();
    frame.render_widget(Paragraph::new(line), area);
}

fn board_shortcuts(can_delete: bool) -> &'static str {
    if can_delete {
        "[a]dd [e]dit [space] toggle [d]elete [r]efresh [t]heme [o] sign out [q]uit"
    } else {
        "[a]dd [e]dit [space] toggle [r]efresh [t]heme [o] sign out [q]uit"
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, p: &Palette, area: Rect) {
    let shortcuts = board_shortcuts(app.can_delete());

    let left_text = match app.notice {
        Some(ref notice) => format!(" {} ", notice.text),
        None => String::from(" "),
    };
    let right_text = format!(" {} ", shortcuts);
    let padding = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let left_style = match app.notice {
        Some(Notice { error: true, .. }) => p.error_style(),
        _ => p.success_style(),
    };

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, p.muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(p.status_bar_style());
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Overlays
// ============================================================================

fn render_task_dialog(frame: &mut Frame, dialog: &TaskDialog, p: &Palette) {
    let focus = dialog.focus;
    let status = match dialog.draft.status {
        TaskStatus::Pending => "Pending",
        TaskStatus::Completed => "Completed",
    };

    let mut lines = vec![
        Line::from(""),
        field_line(p, "Title", &dialog.draft.title, focus == TaskFocus::Title),
        field_line(p, "Details", &dialog.draft.description, focus == TaskFocus::Description),
        choice_line(p, "Status", status, focus == TaskFocus::Status),
        Line::from(""),
        button_line(p, dialog.submit_label(), focus == TaskFocus::Save),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", p.muted_style()),
            Span::styled("Esc", p.help_key_style()),
            Span::styled(" to cancel", p.muted_style()),
        ])
        .centered(),
    ];
    if let Some(ref error) = dialog.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), p.error_style())));
    }

    let area = centered_rect_fixed(52, lines.len() as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(p.border_style(true))
        .title(Span::styled(format!(" {} ", dialog.title()), p.title_style()))
        .style(p.base_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame, p: &Palette) {
    let area = centered_rect_fixed(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let keys = [
        ("↑/↓", "Select task"),
        ("←/→", "Previous/next page"),
        ("a", "Add task"),
        ("e, Enter", "Edit task"),
        ("space", "Toggle pending/completed"),
        ("d", "Delete task (admin)"),
        ("f", "Cycle status filter"),
        ("r", "Refresh"),
        ("t", "Toggle light/dark theme"),
        ("o", "Sign out"),
        ("q", "Quit"),
    ];

    let mut lines = vec![
        Line::from(Span::styled("Taskboard", p.title_style())).centered(),
        Line::from(Span::styled(format!("version {}", version), p.muted_style())).centered(),
        Line::from(""),
    ];
    for (key, desc) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}", key), p.help_key_style()),
            Span::styled(desc, p.text_style()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(
        Line::from(vec![
            Span::styled("Press ", p.muted_style()),
            Span::styled("?", p.help_key_style()),
            Span::styled(" or ", p.muted_style()),
            Span::styled("Esc", p.help_key_style()),
            Span::styled(" to close", p.muted_style()),
        ])
        .centered(),
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(p.border_style(true))
        .style(p.base_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm_overlay(frame: &mut Frame, p: &Palette, question: &str, action: &str) {
    let area = centered_rect_fixed(52, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(question.to_string(), p.highlight_style())).centered(),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", p.muted_style()),
            Span::styled("[Y]", p.help_key_style()),
            Span::styled(format!(" to {}, ", action), p.muted_style()),
            Span::styled("[N]", p.help_key_style()),
            Span::styled(" to cancel", p.muted_style()),
        ])
        .centered(),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(p.border_style(true))
        .style(p.base_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
