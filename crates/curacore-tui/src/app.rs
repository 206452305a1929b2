use std::future::Future;
use std::path::PathBuf;

use curacore_core::models::{filter_doctors, LoginRequest, SignupRequest};
use curacore_core::route::{self, DenyReason, NavigationDecision};
use curacore_core::{
    ApiClient, Appointment, BookingDraft, ChatSession, Doctor, Identity, NavAction, NavigationMenu,
    Profile, Role, Route, SessionStore,
};
use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use crate::field::{self, TextField};
use crate::tui::{AppEvent, BackendEvent, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Modal message, dismissed with any key
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

impl LoginField {
    pub fn next(self) -> Self {
        match self {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: TextField,
    pub password: TextField,
    pub field: LoginField,
    pub submitting: bool,
}

impl LoginForm {
    pub fn active_mut(&mut self) -> &mut TextField {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignupField {
    #[default]
    FullName,
    Email,
    Password,
    Role,
}

impl SignupField {
    pub fn next(self) -> Self {
        match self {
            SignupField::FullName => SignupField::Email,
            SignupField::Email => SignupField::Password,
            SignupField::Password => SignupField::Role,
            SignupField::Role => SignupField::FullName,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SignupField::FullName => SignupField::Role,
            SignupField::Email => SignupField::FullName,
            SignupField::Password => SignupField::Email,
            SignupField::Role => SignupField::Password,
        }
    }
}

#[derive(Debug, Default)]
pub struct SignupForm {
    pub full_name: TextField,
    pub email: TextField,
    pub password: TextField,
    pub role: Role,
    pub field: SignupField,
    pub submitting: bool,
}

impl SignupForm {
    /// The text field under the cursor; `None` on the role toggle
    pub fn active_mut(&mut self) -> Option<&mut TextField> {
        match self.field {
            SignupField::FullName => Some(&mut self.full_name),
            SignupField::Email => Some(&mut self.email),
            SignupField::Password => Some(&mut self.password),
            SignupField::Role => None,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub route: Route,
    pub focus: Focus,
    pub input_mode: InputMode,
    pub nav_state: ListState,
    pub notice: Option<Notice>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Session and backend
    pub session: SessionStore,
    pub api: ApiClient,
    events: EventSender,
    loaded_for: Option<i64>,

    // Auth forms
    pub login: LoginForm,
    pub signup: SignupForm,

    // Chat state
    pub chat: ChatSession,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub audio_prompt: Option<TextField>,
    pub transcribing: bool,

    // Doctor search and booking
    pub doctors: Vec<Doctor>,
    pub doctors_loading: bool,
    pub doctor_search: TextField,
    pub doctor_state: ListState,
    pub booking: Option<BookingDraft>,
    pub booking_cursor: usize,
    pub booking_in_flight: bool,

    // Doctor dashboard
    pub queue: Vec<Appointment>,
    pub queue_loading: bool,
    pub queue_state: ListState,

    // Patient dashboard
    pub history: Vec<Appointment>,
    pub history_loading: bool,
    pub history_state: ListState,

    // Profile
    pub profile: Option<Profile>,
    pub profile_loading: bool,
}

impl App {
    pub fn new(mut session: SessionStore, api: ApiClient, events: EventSender) -> Self {
        let tx = events.clone();
        session.subscribe(move |identity| {
            let _ = tx.send(AppEvent::SessionChanged(identity.map(|i| i.subject_id)));
        });

        let loaded_for = session.current().map(|i| i.subject_id);

        let mut nav_state = ListState::default();
        nav_state.select(Some(0));

        Self {
            should_quit: false,
            route: Route::Home,
            focus: Focus::Sidebar,
            input_mode: InputMode::Normal,
            nav_state,
            notice: None,
            animation_frame: 0,

            session,
            api,
            events,
            loaded_for,

            login: LoginForm::default(),
            signup: SignupForm::default(),

            chat: ChatSession::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            audio_prompt: None,
            transcribing: false,

            doctors: Vec::new(),
            doctors_loading: false,
            doctor_search: TextField::default(),
            doctor_state: ListState::default(),
            booking: None,
            booking_cursor: 0,
            booking_in_flight: false,

            queue: Vec::new(),
            queue_loading: false,
            queue_state: ListState::default(),

            history: Vec::new(),
            history_loading: false,
            history_state: ListState::default(),

            profile: None,
            profile_loading: false,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.current()
    }

    pub fn menu(&self) -> NavigationMenu {
        NavigationMenu::for_identity(self.identity())
    }

    // Navigation

    /// Go to `target`, or wherever the route guard redirects it
    pub fn navigate(&mut self, target: Route) {
        let (landed, decision) = route::resolve(target, self.session.current());
        if let NavigationDecision::Redirect { reason, .. } = decision {
            info!(requested = target.path(), landed = landed.path(), ?reason, "Navigation denied");
            if reason == DenyReason::Unauthenticated && target != self.route {
                self.notify_info(format!("Please log in to open {}.", target.title()));
            }
        }

        let fresh = landed != self.route;
        self.route = landed;
        if let Some(idx) = self.menu().position_of(landed) {
            self.nav_state.select(Some(idx));
        }
        self.enter(landed, fresh);
    }

    /// Re-check the current view against the current identity.
    ///
    /// Called before every frame so that a session change takes effect on the
    /// next render without any explicit navigation.
    pub fn enforce_guard(&mut self) {
        let decision = route::evaluate(&self.route.descriptor(), self.session.current());
        if !decision.is_allowed() {
            debug!(route = self.route.path(), "Mounted view no longer allowed");
            self.navigate(self.route);
        }
    }

    fn enter(&mut self, route: Route, fresh: bool) {
        self.input_mode = InputMode::Normal;
        match route {
            Route::Home => {}
            Route::Login => {
                self.login.password.clear();
                self.login.submitting = false;
                self.focus = Focus::Content;
                self.input_mode = InputMode::Editing;
            }
            Route::Signup => {
                if fresh {
                    self.signup = SignupForm::default();
                }
                self.focus = Focus::Content;
                self.input_mode = InputMode::Editing;
            }
            Route::Chat => {
                if fresh {
                    self.chat.reset();
                    self.chat_cursor = 0;
                    self.chat_scroll = 0;
                    self.audio_prompt = None;
                    self.transcribing = false;
                }
                self.focus = Focus::Content;
                self.input_mode = InputMode::Editing;
            }
            Route::Doctors => {
                if fresh {
                    self.booking = None;
                    self.load_doctors();
                }
            }
            Route::PatientDashboard => self.refresh_history(),
            Route::DoctorDashboard => self.refresh_queue(),
            Route::Profile => self.load_profile(),
        }
    }

    pub fn nav_down(&mut self) {
        let len = self.menu().items.len();
        let i = match self.nav_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.nav_state.select(Some(i));
    }

    pub fn nav_up(&mut self) {
        let i = self.nav_state.selected().unwrap_or(0).saturating_sub(1);
        self.nav_state.select(Some(i));
    }

    /// Run the sidebar entry under the cursor
    pub fn nav_activate(&mut self) {
        let menu = self.menu();
        let Some(item) = self.nav_state.selected().and_then(|i| menu.items.get(i)) else {
            return;
        };
        match item.action {
            NavAction::Go(route) => self.navigate(route),
            NavAction::SignOut => self.sign_out(),
        }
    }

    // Session

    pub fn sign_out(&mut self) {
        if let Err(e) = self.session.clear() {
            warn!("Could not remove stored session: {:#}", e);
        }
        self.login = LoginForm::default();
        self.enforce_guard();
        self.notify_info("You have been signed out.");
    }

    pub fn submit_login(&mut self) {
        if self.login.submitting {
            return;
        }
        let request = LoginRequest {
            email: self.login.email.value.trim().to_string(),
            password: self.login.password.value.clone(),
        };
        if request.email.is_empty() || request.password.is_empty() {
            self.notify_error("Please enter your email and password.");
            return;
        }

        self.login.submitting = true;
        let api = self.api.clone();
        self.spawn(async move { BackendEvent::LoggedIn(api.login(&request).await) });
    }

    pub fn submit_signup(&mut self) {
        if self.signup.submitting {
            return;
        }
        let request = SignupRequest {
            full_name: self.signup.full_name.value.trim().to_string(),
            email: self.signup.email.value.trim().to_string(),
            password: self.signup.password.value.clone(),
            role: self.signup.role,
        };
        if request.full_name.is_empty() || request.email.is_empty() || request.password.is_empty() {
            self.notify_error("Please fill in every field.");
            return;
        }

        self.signup.submitting = true;
        let api = self.api.clone();
        let email = request.email.clone();
        self.spawn(async move {
            BackendEvent::SignedUp {
                email,
                result: api.signup(&request).await,
            }
        });
    }

    fn on_session_changed(&mut self, user_id: Option<i64>) {
        if user_id != self.loaded_for {
            self.profile = None;
            self.queue.clear();
            self.history.clear();
            self.booking = None;
            self.loaded_for = user_id;
        }
        self.enforce_guard();
    }

    // Chat

    pub fn submit_chat(&mut self) {
        let Some(pending) = self.chat.submit_input() else {
            return;
        };
        self.chat_cursor = 0;
        self.scroll_chat_to_bottom();

        let api = self.api.clone();
        self.spawn(async move {
            BackendEvent::ChatReply {
                ticket: pending.ticket,
                result: api.send_chat(&pending.message).await,
            }
        });
    }

    pub fn open_audio_prompt(&mut self) {
        if !self.transcribing {
            self.audio_prompt = Some(TextField::default());
        }
    }

    pub fn submit_audio_prompt(&mut self) {
        let Some(prompt) = self.audio_prompt.take() else {
            return;
        };
        let path = prompt.value.trim();
        if path.is_empty() {
            return;
        }

        let path = PathBuf::from(path);
        self.transcribing = true;
        let ticket = self.chat.current_ticket();
        let api = self.api.clone();
        self.spawn(async move {
            BackendEvent::Transcribed {
                ticket,
                result: api.transcribe_file(&path).await,
            }
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_in_flight() || self.transcribing {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the newest message and "Thinking..." are visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.chat.transcript() {
            total_lines += 1; // Speaker line ("You:" or "CuraCore:")
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat.is_in_flight() {
            total_lines += 2;
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn chat_insert(&mut self, c: char) {
        field::insert_char(self.chat.input_mut(), &mut self.chat_cursor, c);
    }

    pub fn chat_backspace(&mut self) {
        field::backspace(self.chat.input_mut(), &mut self.chat_cursor);
    }

    // Doctors

    pub fn load_doctors(&mut self) {
        self.doctors_loading = true;
        let api = self.api.clone();
        self.spawn(async move { BackendEvent::Doctors(api.doctors().await) });
    }

    pub fn filtered_doctors(&self) -> Vec<&Doctor> {
        filter_doctors(&self.doctors, &self.doctor_search.value)
    }

    pub fn selected_doctor(&self) -> Option<&Doctor> {
        let filtered = self.filtered_doctors();
        self.doctor_state.selected().and_then(|i| filtered.get(i).copied())
    }

    /// Keep the selection inside the filtered list after the search changes
    pub fn clamp_doctor_selection(&mut self) {
        let len = self.filtered_doctors().len();
        let selected = match (len, self.doctor_state.selected()) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(i)) => Some(i.min(len - 1)),
        };
        self.doctor_state.select(selected);
    }

    pub fn doctors_nav(&mut self, down: bool) {
        let len = self.filtered_doctors().len();
        list_step(&mut self.doctor_state, len, down);
    }

    pub fn open_booking(&mut self) {
        if self.booking_in_flight {
            return;
        }
        if let Some(doctor) = self.selected_doctor() {
            let draft = BookingDraft::new(doctor);
            self.booking_cursor = field::end(&draft.symptoms);
            self.booking = Some(draft);
        }
    }

    pub fn submit_booking(&mut self) {
        if self.booking_in_flight {
            return;
        }
        let Some(draft) = self.booking.take() else {
            return;
        };
        let Some(identity) = self.session.current() else {
            return;
        };
        // Blank reason means the user backed out
        let Some(request) = draft.to_request(identity) else {
            debug!("Booking cancelled");
            return;
        };

        self.booking_in_flight = true;
        let api = self.api.clone();
        let doctor_name = draft.doctor_name.clone();
        self.spawn(async move {
            BackendEvent::Booked {
                doctor_name,
                result: api.book_appointment(&request).await,
            }
        });
    }

    // Doctor dashboard

    pub fn refresh_queue(&mut self) {
        let Some(doctor) = self.session.current().filter(|i| i.is_doctor()) else {
            return;
        };
        let doctor_id = doctor.subject_id;
        self.queue_loading = true;
        let api = self.api.clone();
        self.spawn(async move {
            BackendEvent::Queue {
                doctor_id,
                result: api.doctor_queue(doctor_id).await,
            }
        });
    }

    pub fn queue_nav(&mut self, down: bool) {
        list_step(&mut self.queue_state, self.queue.len(), down);
    }

    pub fn complete_selected(&mut self) {
        let Some(appointment) = self.queue_state.selected().and_then(|i| self.queue.get(i)) else {
            return;
        };
        let id = appointment.id;
        let api = self.api.clone();
        self.spawn(async move { BackendEvent::Completed(api.complete_appointment(id).await) });
    }

    // Patient dashboard

    pub fn refresh_history(&mut self) {
        let Some(patient) = self.session.current() else {
            return;
        };
        let patient_id = patient.subject_id;
        self.history_loading = true;
        let api = self.api.clone();
        self.spawn(async move {
            BackendEvent::History {
                patient_id,
                result: api.patient_history(patient_id).await,
            }
        });
    }

    pub fn history_nav(&mut self, down: bool) {
        list_step(&mut self.history_state, self.history.len(), down);
    }

    // Profile

    pub fn load_profile(&mut self) {
        let Some(identity) = self.session.current() else {
            return;
        };
        let user_id = identity.subject_id;
        self.profile_loading = true;
        let api = self.api.clone();
        self.spawn(async move {
            BackendEvent::Profile {
                user_id,
                result: api.profile(user_id).await,
            }
        });
    }

    // Events

    /// Everything except key presses, which the handler routes by focus
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChanged(user_id) => self.on_session_changed(user_id),
            AppEvent::Backend(event) => self.apply_backend(event),
            AppEvent::Tick => self.tick_animation(),
            AppEvent::Resize | AppEvent::Key(_) => {}
        }
    }

    /// Fold a finished request back into the state
    pub fn apply_backend(&mut self, event: BackendEvent) {
        let current_user = self.session.current().map(|i| i.subject_id);

        match event {
            BackendEvent::ChatReply { ticket, result } => {
                if self.chat.complete(ticket, result) {
                    self.scroll_chat_to_bottom();
                }
            }
            BackendEvent::Transcribed { ticket, result } => {
                if !self.chat.is_current(ticket) {
                    debug!("Dropping transcription for a closed conversation");
                    return;
                }
                self.transcribing = false;
                match result {
                    Ok(text) => {
                        self.chat.append_transcription(&text);
                        self.chat_cursor = field::end(self.chat.input());
                    }
                    Err(e) => {
                        warn!("Transcription failed: {}", e);
                        self.notify_error("Could not transcribe audio. Is the backend running?");
                    }
                }
            }
            BackendEvent::LoggedIn(result) => {
                self.login.submitting = false;
                match result {
                    Ok(identity) => {
                        let welcome = format!("Welcome back, {}!", identity.display_name);
                        let role = identity.role;
                        if let Err(e) = self.session.set(identity) {
                            warn!("Could not persist session: {:#}", e);
                        }
                        self.login = LoginForm::default();
                        self.navigate(match role {
                            Role::Doctor => Route::DoctorDashboard,
                            Role::Patient => Route::Home,
                        });
                        self.notify_info(welcome);
                    }
                    Err(e) => {
                        warn!("Login failed: {}", e);
                        self.notify_error(format!("Login failed: {}", e.user_message()));
                    }
                }
            }
            BackendEvent::SignedUp { email, result } => {
                self.signup.submitting = false;
                match result {
                    Ok(confirmation) => {
                        info!(user_id = confirmation.user_id, role = %confirmation.role, "Account created");
                        self.signup = SignupForm::default();
                        self.login = LoginForm {
                            email: TextField::with_value(email),
                            field: LoginField::Password,
                            ..LoginForm::default()
                        };
                        self.navigate(Route::Login);
                        self.notify_info("Account created! Please log in.");
                    }
                    Err(e) => {
                        warn!("Signup failed: {}", e);
                        self.notify_error(format!("Signup failed: {}", e.user_message()));
                    }
                }
            }
            BackendEvent::Profile { user_id, result } => {
                if current_user != Some(user_id) {
                    return;
                }
                self.profile_loading = false;
                match result {
                    Ok(profile) => self.profile = Some(profile),
                    Err(e) => warn!("Failed to load profile: {}", e),
                }
            }
            BackendEvent::Doctors(result) => {
                self.doctors_loading = false;
                match result {
                    Ok(doctors) => {
                        self.doctors = doctors;
                        self.clamp_doctor_selection();
                    }
                    Err(e) => warn!("Failed to load doctors: {}", e),
                }
            }
            BackendEvent::Booked { doctor_name, result } => {
                self.booking_in_flight = false;
                match result {
                    Ok(confirmation) => {
                        info!(appointment_id = confirmation.id, "Appointment booked");
                        self.notify_info(format!("Appointment booked with Dr. {}!", doctor_name));
                    }
                    Err(e) => {
                        warn!("Booking failed: {}", e);
                        self.notify_error("Booking failed. Is the backend running?");
                    }
                }
            }
            BackendEvent::Queue { doctor_id, result } => {
                if current_user != Some(doctor_id) {
                    return;
                }
                self.queue_loading = false;
                match result {
                    Ok(queue) => {
                        self.queue = queue;
                        clamp_list(&mut self.queue_state, self.queue.len());
                    }
                    Err(e) => warn!("Failed to fetch queue: {}", e),
                }
            }
            BackendEvent::Completed(result) => match result {
                Ok(()) => self.refresh_queue(),
                Err(e) => {
                    warn!("Completing appointment failed: {}", e);
                    self.notify_error("Error marking appointment as complete");
                }
            },
            BackendEvent::History { patient_id, result } => {
                if current_user != Some(patient_id) {
                    return;
                }
                self.history_loading = false;
                match result {
                    Ok(history) => {
                        self.history = history;
                        clamp_list(&mut self.history_state, self.history.len());
                    }
                    Err(e) => warn!("Failed to load history: {}", e),
                }
            }
        }
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Info,
            message: message.into(),
        });
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    fn spawn<F>(&self, request: F)
    where
        F: Future<Output = BackendEvent> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppEvent::Backend(request.await));
        });
    }
}

fn list_step(state: &mut ListState, len: usize, down: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let i = match (state.selected(), down) {
        (Some(i), true) => (i + 1).min(len - 1),
        (Some(i), false) => i.saturating_sub(1),
        (None, _) => 0,
    };
    state.select(Some(i));
}

fn clamp_list(state: &mut ListState, len: usize) {
    let selected = match (len, state.selected()) {
        (0, _) => None,
        (_, None) => Some(0),
        (len, Some(i)) => Some(i.min(len - 1)),
    };
    state.select(selected);
}

#[cfg(test)]
mod tests {
    use super::*;
    use curacore_core::chat::FALLBACK_REPLY;
    use curacore_core::models::{BookingConfirmation, SignupConfirmation};
    use curacore_core::{ApiError, MemoryStorage, Message};
    use tokio::sync::mpsc;

    fn identity(role: Role) -> Identity {
        Identity {
            subject_id: 5,
            display_name: "Pugazh Mani".to_string(),
            role,
            email: "pugazh@example.com".to_string(),
        }
    }

    fn app_with(identity: Option<Identity>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = SessionStore::load(MemoryStorage::new());
        if let Some(identity) = identity {
            session.set(identity).unwrap();
        }
        let api = ApiClient::new("http://127.0.0.1:9/api");
        (App::new(session, api, tx), rx)
    }

    #[tokio::test]
    async fn test_guest_chat_navigation_lands_home() {
        let (mut app, _rx) = app_with(None);
        app.navigate(Route::Chat);
        assert_eq!(app.route, Route::Home);

        app.navigate(Route::Profile);
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_patient_cannot_open_doctor_console() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::DoctorDashboard);
        assert_eq!(app.route, Route::Home);
    }

    #[tokio::test]
    async fn test_sign_out_unmounts_protected_view() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::Chat);
        assert_eq!(app.route, Route::Chat);

        app.sign_out();
        assert_eq!(app.route, Route::Home);
        assert!(app.identity().is_none());
    }

    #[tokio::test]
    async fn test_guard_reacts_to_session_cleared_elsewhere() {
        let (mut app, _rx) = app_with(Some(identity(Role::Doctor)));
        app.navigate(Route::DoctorDashboard);
        assert_eq!(app.route, Route::DoctorDashboard);

        app.session.clear().unwrap();
        app.enforce_guard();
        assert_eq!(app.route, Route::Home);
    }

    #[tokio::test]
    async fn test_doctor_login_opens_console() {
        let (mut app, mut rx) = app_with(None);
        app.apply_backend(BackendEvent::LoggedIn(Ok(identity(Role::Doctor))));

        assert_eq!(app.route, Route::DoctorDashboard);
        assert!(app.identity().is_some());
        assert!(matches!(app.notice, Some(Notice { kind: NoticeKind::Info, .. })));
        assert!(matches!(rx.recv().await, Some(AppEvent::SessionChanged(Some(5)))));
    }

    #[tokio::test]
    async fn test_failed_login_shows_detail() {
        let (mut app, _rx) = app_with(None);
        let err = ApiError::from_status(reqwest_status(404), r#"{"detail": "User not found"}"#);
        app.apply_backend(BackendEvent::LoggedIn(Err(err)));

        let notice = app.notice.clone().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Login failed: User not found");
        assert!(app.identity().is_none());
    }

    #[tokio::test]
    async fn test_chat_reply_flow() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::Chat);

        for c in "I have a headache".chars() {
            app.chat_insert(c);
        }
        let pending = app.chat.submit_input().unwrap();
        assert!(app.chat.submit_input().is_none());

        app.apply_backend(BackendEvent::ChatReply {
            ticket: pending.ticket,
            result: Ok("Try hydration.".to_string()),
        });
        assert_eq!(app.chat.transcript().last(), Some(&Message::assistant("Try hydration.")));
        assert!(!app.chat.is_in_flight());
        assert_eq!(app.chat.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_chat_failure_and_stale_reply() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::Chat);

        let pending = app.chat.submit("ouch").unwrap();
        app.apply_backend(BackendEvent::ChatReply {
            ticket: pending.ticket,
            result: Err(ApiError::from_status(reqwest_status(500), "")),
        });
        assert_eq!(app.chat.transcript().last(), Some(&Message::assistant(FALLBACK_REPLY)));

        // Leave and come back: a late reply must not land in the new conversation
        let stale = app.chat.submit("again").unwrap();
        app.navigate(Route::Home);
        app.navigate(Route::Chat);
        app.apply_backend(BackendEvent::ChatReply {
            ticket: stale.ticket,
            result: Ok("late".to_string()),
        });
        assert_eq!(app.chat.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_transcription_fills_input() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::Chat);
        for c in "I have".chars() {
            app.chat_insert(c);
        }

        let ticket = app.chat.current_ticket();
        app.apply_backend(BackendEvent::Transcribed {
            ticket,
            result: Ok("fever".to_string()),
        });
        assert_eq!(app.chat.input(), "I have fever");
        assert_eq!(app.chat_cursor, 12);
        assert!(!app.chat.is_in_flight());
    }

    #[tokio::test]
    async fn test_queue_for_other_doctor_is_ignored() {
        let (mut app, _rx) = app_with(Some(identity(Role::Doctor)));
        app.apply_backend(BackendEvent::Queue {
            doctor_id: 99,
            result: Ok(Vec::new()),
        });
        assert!(app.queue.is_empty());
        assert!(app.queue_state.selected().is_none());
    }

    #[tokio::test]
    async fn test_transcription_for_closed_conversation_keeps_new_request() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.navigate(Route::Chat);
        let old = app.chat.current_ticket();

        app.navigate(Route::Home);
        app.navigate(Route::Chat);
        app.transcribing = true;

        app.apply_backend(BackendEvent::Transcribed {
            ticket: old,
            result: Ok("late words".to_string()),
        });
        assert!(app.transcribing);
        assert_eq!(app.chat.input(), "");
    }

    #[tokio::test]
    async fn test_booking_waits_for_previous_request() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.doctors = vec![Doctor {
            id: 2,
            full_name: "Sarah Lee".to_string(),
            specialization: "Cardiology".to_string(),
            qualification: None,
            experience_years: None,
            location: None,
            consultation_fee: None,
            image_url: None,
        }];
        app.clamp_doctor_selection();
        app.booking_in_flight = true;

        app.open_booking();
        assert!(app.booking.is_none());

        app.booking = Some(BookingDraft::new(&app.doctors[0]));
        app.submit_booking();
        assert!(app.booking.is_some());
    }

    #[tokio::test]
    async fn test_signup_success_prefills_login() {
        let (mut app, _rx) = app_with(None);
        app.navigate(Route::Signup);
        app.signup.submitting = true;

        app.apply_backend(BackendEvent::SignedUp {
            email: "new@example.com".to_string(),
            result: Ok(SignupConfirmation {
                user_id: 11,
                role: Role::Patient,
            }),
        });

        assert_eq!(app.route, Route::Login);
        assert_eq!(app.login.email.value, "new@example.com");
        assert_eq!(app.login.field, LoginField::Password);
        assert!(!app.signup.submitting);
        let notice = app.notice.clone().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(notice.message, "Account created! Please log in.");
    }

    #[tokio::test]
    async fn test_booking_result_notices() {
        let (mut app, _rx) = app_with(Some(identity(Role::Patient)));
        app.booking_in_flight = true;
        app.apply_backend(BackendEvent::Booked {
            doctor_name: "Sarah Lee".to_string(),
            result: Ok(BookingConfirmation { id: 9, summary: None }),
        });
        assert!(!app.booking_in_flight);
        let notice = app.notice.clone().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(notice.message, "Appointment booked with Dr. Sarah Lee!");

        app.booking_in_flight = true;
        app.apply_backend(BackendEvent::Booked {
            doctor_name: "Sarah Lee".to_string(),
            result: Err(ApiError::from_status(reqwest_status(500), "")),
        });
        assert!(!app.booking_in_flight);
        let notice = app.notice.clone().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Booking failed. Is the backend running?");
    }

    #[tokio::test]
    async fn test_completed_appointment_refreshes_queue() {
        let (mut app, _rx) = app_with(Some(identity(Role::Doctor)));
        app.queue_loading = false;
        app.apply_backend(BackendEvent::Completed(Ok(())));
        assert!(app.queue_loading);

        app.queue_loading = false;
        app.apply_backend(BackendEvent::Completed(Err(ApiError::from_status(reqwest_status(404), ""))));
        assert!(!app.queue_loading);
        let notice = app.notice.clone().expect("notice");
        assert_eq!(notice.message, "Error marking appointment as complete");
    }

    fn reqwest_status(code: u16) -> reqwest::StatusCode {
        reqwest::StatusCode::from_u16(code).unwrap()
    }
}
