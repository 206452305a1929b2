use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use curacore_core::Route;

use crate::app::{App, Focus, InputMode, LoginField, SignupField};
use crate::field::{self, TextField};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        other => app.handle_app_event(other),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Any key dismisses a notice
    if app.notice.is_some() {
        app.notice = None;
        return;
    }

    if app.audio_prompt.is_some() {
        handle_audio_prompt(app, key);
        return;
    }

    if app.booking.is_some() {
        handle_booking(app, key);
        return;
    }

    match app.focus {
        Focus::Sidebar => handle_sidebar(app, key),
        Focus::Content => match app.input_mode {
            InputMode::Normal => handle_content_normal(app, key),
            InputMode::Editing => handle_content_editing(app, key),
        },
    }
}

fn handle_sidebar(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Enter => app.nav_activate(),
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => focus_content(app),
        _ => {}
    }
}

/// Move focus into the main view, editing straight away where the view is a form
fn focus_content(app: &mut App) {
    app.focus = Focus::Content;
    if matches!(app.route, Route::Login | Route::Signup | Route::Chat) {
        app.input_mode = InputMode::Editing;
    }
}

fn focus_sidebar(app: &mut App) {
    app.focus = Focus::Sidebar;
    app.input_mode = InputMode::Normal;
}

fn handle_content_normal(app: &mut App, key: KeyEvent) {
    // Keys shared by every view
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab | KeyCode::Esc => {
            focus_sidebar(app);
            return;
        }
        _ => {}
    }

    match app.route {
        Route::Home => match key.code {
            KeyCode::Char('c') | KeyCode::Enter => app.navigate(Route::Chat),
            KeyCode::Char('d') => app.navigate(Route::Doctors),
            KeyCode::Char('l') if !app.session.is_signed_in() => app.navigate(Route::Login),
            _ => {}
        },
        Route::Login => match key.code {
            KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
            KeyCode::Char('s') => app.navigate(Route::Signup),
            _ => {}
        },
        Route::Signup => match key.code {
            KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
            KeyCode::Char('l') => app.navigate(Route::Login),
            _ => {}
        },
        Route::Chat => match key.code {
            KeyCode::Char('i') | KeyCode::Enter => {
                app.input_mode = InputMode::Editing;
                app.chat_cursor = field::end(app.chat.input());
            }
            KeyCode::Char('v') => app.open_audio_prompt(),
            KeyCode::Char('j') | KeyCode::Down => app.chat_scroll = app.chat_scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => app.chat_scroll = app.chat_scroll.saturating_sub(1),
            KeyCode::Char('G') => app.scroll_chat_to_bottom(),
            _ => {}
        },
        Route::Doctors => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.doctors_nav(true),
            KeyCode::Char('k') | KeyCode::Up => app.doctors_nav(false),
            KeyCode::Char('/') => app.input_mode = InputMode::Editing,
            KeyCode::Char('r') => app.load_doctors(),
            KeyCode::Enter | KeyCode::Char('b') => app.open_booking(),
            _ => {}
        },
        Route::DoctorDashboard => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.queue_nav(true),
            KeyCode::Char('k') | KeyCode::Up => app.queue_nav(false),
            KeyCode::Char('r') => app.refresh_queue(),
            KeyCode::Char('c') | KeyCode::Enter => app.complete_selected(),
            _ => {}
        },
        Route::PatientDashboard => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.history_nav(true),
            KeyCode::Char('k') | KeyCode::Up => app.history_nav(false),
            KeyCode::Char('r') => app.refresh_history(),
            KeyCode::Char('b') => app.navigate(Route::Doctors),
            _ => {}
        },
        Route::Profile => {
            if key.code == KeyCode::Char('o') {
                app.sign_out();
            }
        }
    }
}

fn handle_content_editing(app: &mut App, key: KeyEvent) {
    match app.route {
        Route::Login => handle_login_editing(app, key),
        Route::Signup => handle_signup_editing(app, key),
        Route::Chat => handle_chat_editing(app, key),
        Route::Doctors => handle_search_editing(app, key),
        _ => app.input_mode = InputMode::Normal,
    }
}

/// Apply a cursor/editing key to a text field; false if the key was not an edit
fn edit_field(field: &mut TextField, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) => field.insert(c),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.left(),
        KeyCode::Right => field.right(),
        KeyCode::Home => field.home(),
        KeyCode::End => field.end(),
        _ => return false,
    }
    true
}

fn handle_login_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => focus_sidebar(app),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
            app.login.field = app.login.field.next();
        }
        KeyCode::Enter => match app.login.field {
            LoginField::Email => app.login.field = LoginField::Password,
            LoginField::Password => app.submit_login(),
        },
        _ => {
            edit_field(app.login.active_mut(), key);
        }
    }
}

fn handle_signup_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => focus_sidebar(app),
        KeyCode::Tab | KeyCode::Down => app.signup.field = app.signup.field.next(),
        KeyCode::BackTab | KeyCode::Up => app.signup.field = app.signup.field.prev(),
        KeyCode::Enter => match app.signup.field {
            SignupField::Role => app.submit_signup(),
            other => app.signup.field = other.next(),
        },
        _ => match app.signup.active_mut() {
            Some(field) => {
                edit_field(field, key);
            }
            // Role toggle
            None => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                    app.signup.role = app.signup.role.toggled();
                }
            }
        },
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => focus_sidebar(app),
        KeyCode::Enter => app.submit_chat(),
        KeyCode::Char(c) => app.chat_insert(c),
        KeyCode::Backspace => app.chat_backspace(),
        KeyCode::Delete => field::delete(app.chat.input_mut(), app.chat_cursor),
        KeyCode::Left => field::move_left(&mut app.chat_cursor),
        KeyCode::Right => field::move_right(app.chat.input(), &mut app.chat_cursor),
        KeyCode::Home => app.chat_cursor = 0,
        KeyCode::End => app.chat_cursor = field::end(app.chat.input()),
        KeyCode::PageUp => app.chat_scroll = app.chat_scroll.saturating_sub(5),
        KeyCode::PageDown => app.chat_scroll = app.chat_scroll.saturating_add(5),
        _ => {}
    }
}

fn handle_search_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => app.input_mode = InputMode::Normal,
        _ => {
            if edit_field(&mut app.doctor_search, key) {
                app.clamp_doctor_selection();
            }
        }
    }
}

fn handle_audio_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.audio_prompt = None,
        KeyCode::Enter => app.submit_audio_prompt(),
        _ => {
            if let Some(prompt) = app.audio_prompt.as_mut() {
                edit_field(prompt, key);
            }
        }
    }
}

fn handle_booking(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.booking = None,
        KeyCode::Enter => app.submit_booking(),
        _ => {
            let Some(draft) = app.booking.as_mut() else {
                return;
            };
            let cursor = &mut app.booking_cursor;
            match key.code {
                KeyCode::Char(c) => field::insert_char(&mut draft.symptoms, cursor, c),
                KeyCode::Backspace => field::backspace(&mut draft.symptoms, cursor),
                KeyCode::Delete => field::delete(&mut draft.symptoms, *cursor),
                KeyCode::Left => field::move_left(cursor),
                KeyCode::Right => field::move_right(&draft.symptoms, cursor),
                KeyCode::Home => *cursor = 0,
                KeyCode::End => *cursor = field::end(&draft.symptoms),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::AppEvent;
    use curacore_core::{ApiClient, Identity, MemoryStorage, Role, SessionStore};
    use tokio::sync::mpsc;

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))).unwrap();
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with(identity: Option<Identity>) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = SessionStore::load(MemoryStorage::new());
        if let Some(identity) = identity {
            session.set(identity).unwrap();
        }
        App::new(session, ApiClient::new("http://127.0.0.1:9/api"), tx)
    }

    fn patient() -> Identity {
        Identity {
            subject_id: 3,
            display_name: "Asha Rao".to_string(),
            role: Role::Patient,
            email: "asha@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_while_editing() {
        let mut app = app_with(Some(patient()));
        app.navigate(Route::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);

        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_event(&mut app, AppEvent::Key(key)).unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_q_is_text_while_editing() {
        let mut app = app_with(Some(patient()));
        app.navigate(Route::Chat);
        type_str(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.chat.input(), "q");
    }

    #[tokio::test]
    async fn test_notice_swallows_next_key() {
        let mut app = app_with(None);
        app.notify_info("hello");
        press(&mut app, KeyCode::Char('q'));
        assert!(app.notice.is_none());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_login_form_moves_between_fields() {
        let mut app = app_with(None);
        app.navigate(Route::Login);
        type_str(&mut app, "a@b.c");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "pw");

        assert_eq!(app.login.email.value, "a@b.c");
        assert_eq!(app.login.password.value, "pw");
        assert_eq!(app.login.field, LoginField::Password);
    }

    #[tokio::test]
    async fn test_signup_role_toggle() {
        let mut app = app_with(None);
        app.navigate(Route::Signup);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.signup.field, SignupField::Role);

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.signup.role, Role::Doctor);
    }

    #[tokio::test]
    async fn test_sidebar_sign_out_returns_home() {
        let mut app = app_with(Some(patient()));
        app.navigate(Route::Chat);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Sidebar);

        let sign_out = app.menu().items.len() - 1;
        app.nav_state.select(Some(sign_out));
        press(&mut app, KeyCode::Enter);

        assert!(app.identity().is_none());
        assert_eq!(app.route, Route::Home);
    }

    #[tokio::test]
    async fn test_blank_booking_reason_cancels() {
        let mut app = app_with(Some(patient()));
        app.booking = Some(curacore_core::BookingDraft {
            doctor_id: 1,
            doctor_name: "Meera".to_string(),
            symptoms: "x".to_string(),
        });
        app.booking_cursor = 1;

        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);
        assert!(app.booking.is_none());
        assert!(!app.booking_in_flight);
    }

    #[tokio::test]
    async fn test_resize_keeps_view_and_notice() {
        let mut app = app_with(Some(patient()));
        app.navigate(Route::Chat);
        app.notify_info("hello");

        handle_event(&mut app, AppEvent::Resize).unwrap();
        assert_eq!(app.route, Route::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.notice.as_ref().map(|n| n.message.as_str()), Some("hello"));
    }
}
