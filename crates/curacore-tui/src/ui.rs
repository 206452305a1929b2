use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use curacore_core::{
    Appointment, AppointmentStatus, Doctor, IdentityBlock, NavSection, Role, Route, Speaker,
};

use crate::app::{App, Focus, InputMode, LoginField, NoticeKind, SignupField};
use crate::field::{self, TextField};

const SIDEBAR_WIDTH: u16 = 28;

/// Characters of the AI note shown per row on the patient dashboard
const NOTE_PREVIEW_CHARS: usize = 60;

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
/// This clamps the offset to a valid range where the selected item is always visible.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Render **bold** runs in assistant text; everything else is literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [sidebar_area, content_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_sidebar(app, frame, sidebar_area);

    match app.route {
        Route::Home => render_home(app, frame, content_area),
        Route::Login => render_login(app, frame, content_area),
        Route::Signup => render_signup(app, frame, content_area),
        Route::Chat => render_chat(app, frame, content_area),
        Route::Doctors => render_doctors(app, frame, content_area),
        Route::DoctorDashboard => render_doctor_dashboard(app, frame, content_area),
        Route::PatientDashboard => render_patient_dashboard(app, frame, content_area),
        Route::Profile => render_profile(app, frame, content_area),
    }

    render_footer(app, frame, footer_area);

    // Popups, highest priority last
    if app.booking.is_some() {
        render_booking_popup(app, frame, area);
    }
    if app.audio_prompt.is_some() {
        render_audio_prompt(app, frame, area);
    }
    if app.notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" CuraCore ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("{} ", app.route.title()), Style::default().fg(Color::White)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let menu = app.menu();
    let focused = app.focus == Focus::Sidebar;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Menu ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [items_area, identity_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);

    let inner_width = items_area.width as usize;
    let selected = app.nav_state.selected().unwrap_or(0);
    let mut lines: Vec<Line> = Vec::new();
    let mut section: Option<NavSection> = None;

    for (i, item) in menu.items.iter().enumerate() {
        if section != Some(item.section) {
            if let Some(heading) = item.section.heading() {
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
                lines.push(Line::styled(
                    heading.to_uppercase(),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                ));
            }
            section = Some(item.section);
        }

        let active = menu.position_of(app.route) == Some(i);
        if i == selected && focused {
            let text = format!("> {} ", item.label);
            // Pad to full width so background color fills the line
            let padded = format!("{:<width$}", text, width = inner_width);
            lines.push(Line::styled(
                padded,
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
        } else if active {
            lines.push(Line::styled(
                format!("  {} ", item.label),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        } else {
            lines.push(Line::raw(format!("  {} ", item.label)));
        }
    }

    frame.render_widget(Paragraph::new(lines), items_area);

    let identity = match &menu.identity {
        IdentityBlock::SignedIn { display_name, role } => vec![
            Line::styled(
                display_name.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Line::styled(role.display_name(), role_style(*role)),
        ],
        IdentityBlock::SignedOut => vec![
            Line::styled("Not signed in", Style::default().fg(Color::DarkGray)),
        ],
    };
    let identity = Paragraph::new(identity).block(Block::default().borders(Borders::TOP));
    frame.render_widget(identity, identity_area);
}

fn role_style(role: Role) -> Style {
    match role {
        Role::Patient => Style::default().fg(Color::Green),
        Role::Doctor => Style::default().fg(Color::Magenta),
    }
}

fn render_home(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == Focus::Content)))
        .title(" Home ");

    let mut lines = vec![
        Line::default(),
        Line::styled(
            "Your health, understood.",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Line::default(),
        Line::raw("Describe your symptoms to the AI assistant, get a triage summary,"),
        Line::raw("and book the right specialist in a few keystrokes."),
        Line::default(),
    ];

    match app.identity() {
        Some(user) if user.is_doctor() => {
            lines.push(Line::raw(format!("Signed in as Dr. {}.", user.display_name)));
            lines.push(Line::raw("Open the Patient Queue from the menu to review pending cases."));
        }
        Some(user) => {
            lines.push(Line::raw(format!("Hello, {}.", user.display_name)));
            lines.push(Line::from(vec![
                Span::styled(" c ", Style::default().fg(Color::Yellow).bold()),
                Span::raw("start a consultation   "),
                Span::styled(" d ", Style::default().fg(Color::Yellow).bold()),
                Span::raw("find a doctor"),
            ]));
        }
        None => {
            lines.push(Line::from(vec![
                Span::styled(" l ", Style::default().fg(Color::Yellow).bold()),
                Span::raw("log in to start a consultation"),
            ]));
        }
    }

    let home = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(home, area);
}

/// A single-line input box; the cursor is placed when `editing`
fn render_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    field: &TextField,
    editing: bool,
    masked: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(format!(" {} ", title));

    let shown = if masked {
        "•".repeat(field.value.chars().count())
    } else {
        field.value.clone()
    };

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_col) = field::visible_window(&shown, field.cursor, inner_width);

    let input = Paragraph::new(visible)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((area.x + cursor_col as u16 + 1, area.y + 1));
    }
}

fn form_area(area: Rect, rows: u16) -> Rect {
    let width = 60.min(area.width);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    Rect::new(x, area.y + 1, width, rows.min(area.height.saturating_sub(1)))
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == Focus::Content)))
        .title(" Log In ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = form_area(inner, 10);
    let [email_area, password_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(form);

    let editing = app.focus == Focus::Content && app.input_mode == InputMode::Editing;
    render_input(
        frame,
        email_area,
        "Email",
        &app.login.email,
        editing && app.login.field == LoginField::Email,
        false,
    );
    render_input(
        frame,
        password_area,
        "Password",
        &app.login.password,
        editing && app.login.field == LoginField::Password,
        true,
    );

    let status = if app.login.submitting {
        Line::styled("Signing in...", Style::default().fg(Color::Yellow))
    } else {
        Line::styled(
            "New here? Press Esc, then s to create an account.",
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_signup(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == Focus::Content)))
        .title(" Create Account ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = form_area(inner, 15);
    let [name_area, email_area, password_area, role_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(form);

    let editing = app.focus == Focus::Content && app.input_mode == InputMode::Editing;
    let form_state = &app.signup;
    render_input(
        frame,
        name_area,
        "Full name",
        &form_state.full_name,
        editing && form_state.field == SignupField::FullName,
        false,
    );
    render_input(
        frame,
        email_area,
        "Email",
        &form_state.email,
        editing && form_state.field == SignupField::Email,
        false,
    );
    render_input(
        frame,
        password_area,
        "Password",
        &form_state.password,
        editing && form_state.field == SignupField::Password,
        true,
    );

    let role_focused = editing && form_state.field == SignupField::Role;
    let mut spans = vec![Span::raw(" ")];
    for role in Role::all() {
        let label = format!(" {} ", role.display_name());
        if role == form_state.role {
            spans.push(Span::styled(label, role_style(role).add_modifier(Modifier::REVERSED)));
        } else {
            spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::raw(" "));
    }
    let role_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if role_focused { Color::Yellow } else { Color::DarkGray }))
        .title(" I am a (Space to switch) ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(role_block), role_area);

    let status = if form_state.submitting {
        Line::styled("Creating account...", Style::default().fg(Color::Yellow))
    } else {
        Line::styled("Enter on the role row to submit.", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let focused = app.focus == Focus::Content;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused && app.input_mode == InputMode::Normal)))
        .title(" AI Consultation ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.chat.transcript() {
        match msg.speaker {
            Speaker::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.text.clone()));
            }
            Speaker::Assistant => {
                lines.push(Line::from(Span::styled(
                    "CuraCore:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.chat.is_in_flight() {
        lines.push(Line::from(Span::styled(
            "CuraCore:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    // Message input at the bottom
    let editing = focused && app.input_mode == InputMode::Editing;
    let title = if app.transcribing {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!(" Transcribing{} ", dots)
    } else {
        " Describe your symptoms ".to_string()
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(title);

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) =
        field::visible_window(app.chat.input(), app.chat_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing && app.audio_prompt.is_none() {
        frame.set_cursor_position((input_area.x + cursor_col as u16 + 1, input_area.y + 1));
    }
}

fn doctor_detail_lines(doctor: &Doctor) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::styled(
            format!("Dr. {}", doctor.full_name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Line::styled(doctor.specialization.clone(), Style::default().fg(Color::Yellow)),
        Line::default(),
    ];

    if let Some(qualification) = &doctor.qualification {
        lines.push(Line::from(vec![
            Span::styled("Qualification  ", label),
            Span::raw(qualification.clone()),
        ]));
    }
    if let Some(years) = doctor.experience_years {
        lines.push(Line::from(vec![
            Span::styled("Experience     ", label),
            Span::raw(format!("{} years", years)),
        ]));
    }
    if let Some(location) = &doctor.location {
        lines.push(Line::from(vec![
            Span::styled("Location       ", label),
            Span::raw(location.clone()),
        ]));
    }
    if let Some(fee) = doctor.consultation_fee {
        lines.push(Line::from(vec![
            Span::styled("Fee            ", label),
            Span::raw(format!("₹{}", fee)),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::styled(
        "Press Enter to book an appointment.",
        Style::default().fg(Color::DarkGray),
    ));
    lines
}

fn render_doctors(app: &mut App, frame: &mut Frame, area: Rect) {
    let [search_area, body_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let searching = app.focus == Focus::Content && app.input_mode == InputMode::Editing;
    render_input(
        frame,
        search_area,
        "Search by name or specialization (/)",
        &app.doctor_search,
        searching,
        false,
    );

    let [list_area, detail_area] = Layout::horizontal([
        Constraint::Percentage(45),
        Constraint::Percentage(55),
    ])
    .areas(body_area);

    let focused = app.focus == Focus::Content && !searching;
    let filtered = app.filtered_doctors();
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(if app.booking_in_flight {
            " Booking... ".to_string()
        } else {
            format!(" Doctors ({}) ", filtered.len())
        });

    if app.doctors_loading && app.doctors.is_empty() {
        let loading = Paragraph::new(Span::styled("Loading doctors...", Style::default().fg(Color::DarkGray)))
            .block(list_block);
        frame.render_widget(loading, list_area);
    } else if filtered.is_empty() {
        let message = if app.doctors.is_empty() {
            "No doctors available. Is the backend running?".to_string()
        } else {
            format!("No doctors found matching \"{}\"", app.doctor_search.value.trim())
        };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(Color::DarkGray)))
            .block(list_block)
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = filtered
            .iter()
            .map(|d| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("Dr. {} ", d.full_name)),
                    Span::styled(d.specialization.clone(), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();
        let detail = app.selected_doctor().map(doctor_detail_lines);

        let list = List::new(items)
            .block(list_block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let visible_height = list_area.height.saturating_sub(2) as usize;
        ensure_selected_visible(&mut app.doctor_state, visible_height);
        frame.render_stateful_widget(list, list_area, &mut app.doctor_state);

        if let Some(lines) = detail {
            let detail_block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Details ");
            let detail = Paragraph::new(lines).block(detail_block).wrap(Wrap { trim: true });
            frame.render_widget(detail, detail_area);
            return;
        }
    }

    let empty_detail = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Details ");
    frame.render_widget(empty_detail, detail_area);
}

fn status_style(status: AppointmentStatus) -> Style {
    match status {
        AppointmentStatus::Pending => Style::default().fg(Color::Yellow),
        AppointmentStatus::Completed => Style::default().fg(Color::Green),
        AppointmentStatus::Cancelled => Style::default().fg(Color::Red),
        AppointmentStatus::Unknown => Style::default().fg(Color::DarkGray),
    }
}

fn render_doctor_dashboard(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, summary_area] = Layout::horizontal([
        Constraint::Percentage(45),
        Constraint::Percentage(55),
    ])
    .areas(area);

    let focused = app.focus == Focus::Content;
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(format!(" Pending Appointments ({}) ", app.queue.len()));

    if app.queue.is_empty() {
        let dim = Style::default().fg(Color::DarkGray);
        let lines = if app.queue_loading {
            vec![Line::styled("Loading queue...", dim)]
        } else {
            // The queue is keyed by the signed-in account id
            let account = app.identity().map(|i| i.subject_id).unwrap_or_default();
            vec![
                Line::styled("No pending appointments.", dim),
                Line::raw(""),
                Line::styled(format!("Looked up for doctor #{} (your account id).", account), dim),
            ]
        };
        let empty = Paragraph::new(lines).block(list_block);
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = app
            .queue
            .iter()
            .map(|a| {
                let patient = a
                    .patient_id
                    .map(|id| format!("Patient #{}", id))
                    .unwrap_or_else(|| "Patient".to_string());
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(format!("#{} ", a.id), Style::default().fg(Color::DarkGray)),
                        Span::raw(patient),
                        Span::styled(
                            format!("  {}", a.booked_on().unwrap_or("")),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]),
                    Line::styled(
                        format!("  {}", a.symptoms.as_deref().unwrap_or("")),
                        Style::default().fg(Color::Gray),
                    ),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(list_block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let visible_rows = (list_area.height.saturating_sub(2) / 2) as usize;
        ensure_selected_visible(&mut app.queue_state, visible_rows);
        frame.render_stateful_widget(list, list_area, &mut app.queue_state);
    }

    let selected = app.queue_state.selected().and_then(|i| app.queue.get(i));
    render_appointment_summary(selected, frame, summary_area, " AI Triage Summary ");
}

fn render_appointment_summary(appointment: Option<&Appointment>, frame: &mut Frame, area: Rect, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title.to_string());

    let lines: Vec<Line> = match appointment {
        Some(a) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Status    ", Style::default().fg(Color::DarkGray)),
                    Span::styled(a.status.label(), status_style(a.status)),
                ]),
                Line::from(vec![
                    Span::styled("Symptoms  ", Style::default().fg(Color::DarkGray)),
                    Span::raw(a.symptoms.clone().unwrap_or_default()),
                ]),
                Line::default(),
            ];
            match &a.ai_summary {
                Some(summary) => lines.extend(summary.lines().map(parse_markdown_line)),
                None => lines.push(Line::styled(
                    "AI summary pending...",
                    Style::default().fg(Color::DarkGray),
                )),
            }
            lines
        }
        None => vec![Line::styled(
            "Select an appointment to read its summary.",
            Style::default().fg(Color::DarkGray),
        )],
    };

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn render_patient_dashboard(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, summary_area] = Layout::vertical([
        Constraint::Percentage(60),
        Constraint::Percentage(40),
    ])
    .areas(area);

    let focused = app.focus == Focus::Content;
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" My Appointments ");

    if app.history.is_empty() {
        let message = if app.history_loading {
            "Loading appointments..."
        } else {
            "No appointments yet. Press b to book one."
        };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(Color::DarkGray)))
            .block(list_block);
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = app
            .history
            .iter()
            .map(|a| {
                let doctor = a
                    .doctor_id
                    .map(|id| format!("Doctor #{}", id))
                    .unwrap_or_else(|| "Doctor".to_string());
                let note = a
                    .summary_preview(NOTE_PREVIEW_CHARS)
                    .unwrap_or_else(|| "No AI note".to_string());
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(format!("{:<10}", a.status.label()), status_style(a.status)),
                        Span::raw(format!("{}  ", a.booked_on().unwrap_or("-"))),
                        Span::raw(doctor),
                    ]),
                    Line::styled(format!("  {}", note), Style::default().fg(Color::DarkGray)),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(list_block)
            .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
            .highlight_symbol("> ");

        let visible_rows = (list_area.height.saturating_sub(2) / 2) as usize;
        ensure_selected_visible(&mut app.history_state, visible_rows);
        frame.render_stateful_widget(list, list_area, &mut app.history_state);
    }

    let selected = app.history_state.selected().and_then(|i| app.history.get(i));
    render_appointment_summary(selected, frame, summary_area, " AI Note ");
}

fn render_profile(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == Focus::Content)))
        .title(" Profile ");

    let Some(identity) = app.identity() else {
        frame.render_widget(block, area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let row = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("{:<14}", name), label), Span::raw(value)])
    };

    let mut lines = vec![
        Line::default(),
        Line::from(vec![
            Span::styled(
                format!(" {} ", identity.initials()),
                role_style(identity.role).add_modifier(Modifier::REVERSED | Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(identity.display_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::default(),
        row("Email", identity.email.clone()),
        row("Role", identity.role.display_name().to_string()),
    ];

    match &app.profile {
        Some(profile) => {
            if let Some(age) = profile.age {
                lines.push(row("Age", age.to_string()));
            }
            if let Some(gender) = &profile.gender {
                lines.push(row("Gender", gender.clone()));
            }
            if let Some(blood_group) = &profile.blood_group {
                lines.push(row("Blood group", blood_group.clone()));
            }
        }
        None if app.profile_loading => {
            lines.push(Line::styled("Loading profile...", label));
        }
        None => {}
    }

    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled(" o ", Style::default().fg(Color::Yellow).bold()),
        Span::raw("sign out"),
    ]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INPUT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let pairs: Vec<(&'static str, &'static str)> = if app.notice.is_some() {
        vec![("any key", "dismiss")]
    } else if app.audio_prompt.is_some() {
        vec![("Enter", "transcribe"), ("Esc", "cancel")]
    } else if app.booking.is_some() {
        vec![("Enter", "book"), ("Esc", "cancel")]
    } else if app.focus == Focus::Sidebar {
        vec![("j/k", "nav"), ("Enter", "open"), ("Tab", "focus"), ("q", "quit")]
    } else {
        match (app.route, app.input_mode) {
            (Route::Login, InputMode::Editing) => vec![("Tab", "field"), ("Enter", "next/submit"), ("Esc", "menu")],
            (Route::Signup, InputMode::Editing) => {
                vec![("Tab", "field"), ("Space", "role"), ("Enter", "next/submit"), ("Esc", "menu")]
            }
            (Route::Chat, InputMode::Editing) => vec![("Enter", "send"), ("Esc", "stop editing"), ("Tab", "menu")],
            (Route::Doctors, InputMode::Editing) => vec![("Enter", "done"), ("Esc", "done")],
            (Route::Home, _) => vec![("c", "consult"), ("d", "doctors"), ("Tab", "menu"), ("q", "quit")],
            (Route::Login, _) => vec![("i", "edit"), ("s", "sign up"), ("Tab", "menu"), ("q", "quit")],
            (Route::Signup, _) => vec![("i", "edit"), ("l", "log in"), ("Tab", "menu"), ("q", "quit")],
            (Route::Chat, _) => vec![("i", "type"), ("v", "voice"), ("j/k", "scroll"), ("Tab", "menu")],
            (Route::Doctors, _) => {
                vec![("j/k", "nav"), ("/", "search"), ("Enter", "book"), ("r", "reload"), ("Tab", "menu")]
            }
            (Route::DoctorDashboard, _) => {
                vec![("j/k", "nav"), ("c", "complete"), ("r", "refresh"), ("Tab", "menu")]
            }
            (Route::PatientDashboard, _) => {
                vec![("j/k", "nav"), ("b", "book"), ("r", "refresh"), ("Tab", "menu")]
            }
            (Route::Profile, _) => vec![("o", "sign out"), ("Tab", "menu"), ("q", "quit")],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    for (key, label) in pairs {
        spans.extend(hint(key, label));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.notice else {
        return;
    };

    let (title, color) = match notice.kind {
        NoticeKind::Info => (" CuraCore ", Color::Cyan),
        NoticeKind::Error => (" Error ", Color::Red),
    };

    let width = (notice.message.chars().count() as u16 + 6).clamp(30, 70);
    let popup_area = centered_rect(area, width, 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let body = Paragraph::new(notice.message.clone())
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, popup_area);
}

fn render_booking_popup(app: &App, frame: &mut Frame, area: Rect) {
    let Some(draft) = &app.booking else {
        return;
    };

    let popup_area = centered_rect(area, 64, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Book Appointment ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let prompt = Paragraph::new(draft.prompt()).style(Style::default().fg(Color::White));
    frame.render_widget(prompt, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (visible, cursor_col) =
        field::visible_window(&draft.symptoms, app.booking_cursor, inner.width as usize);
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_col as u16, input_area.y));

    let status = Paragraph::new("Enter to book. Clear the reason or press Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

fn render_audio_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let Some(prompt) = &app.audio_prompt else {
        return;
    };

    let popup_area = centered_rect(area, 64, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Voice Input ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to a recorded audio file (WAV):")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (visible, cursor_col) =
        field::visible_window(&prompt.value, prompt.cursor, inner.width as usize);
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_col as u16, input_area.y));

    let status = Paragraph::new("The transcript is added to your message; nothing is sent yet.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use curacore_core::{ApiClient, Identity, MemoryStorage, SessionStore};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app_with(identity: Option<Identity>) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = SessionStore::load(MemoryStorage::new());
        if let Some(identity) = identity {
            session.set(identity).unwrap();
        }
        App::new(session, ApiClient::new("http://127.0.0.1:9/api"), tx)
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Take **rest** today");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "rest");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let line = parse_markdown_line("a ** b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a ** b");
    }

    #[tokio::test]
    async fn test_guest_sidebar() {
        let mut app = app_with(None);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Log In"));
        assert!(text.contains("Not signed in"));
        assert!(!text.contains("Sign Out"));
    }

    #[tokio::test]
    async fn test_doctor_sidebar_hides_patient_views() {
        let mut app = app_with(Some(Identity {
            subject_id: 1,
            display_name: "Meera Iyer".to_string(),
            role: Role::Doctor,
            email: "meera@example.com".to_string(),
        }));
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Patient Queue"));
        assert!(text.contains("Sign Out"));
        assert!(text.contains("Meera Iyer"));
        assert!(!text.contains("Find Doctors"));
    }

    #[tokio::test]
    async fn test_empty_queue_names_account_id() {
        let mut app = app_with(Some(Identity {
            subject_id: 4,
            display_name: "Meera Iyer".to_string(),
            role: Role::Doctor,
            email: "meera@example.com".to_string(),
        }));
        app.route = Route::DoctorDashboard;
        app.queue_loading = false;

        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("No pending appointments."));
        assert!(text.contains("doctor #4 (your account id)"));
    }

    #[tokio::test]
    async fn test_chat_shows_thinking_indicator() {
        let mut app = app_with(Some(Identity {
            subject_id: 2,
            display_name: "Asha Rao".to_string(),
            role: Role::Patient,
            email: "asha@example.com".to_string(),
        }));
        app.navigate(Route::Chat);
        app.chat.submit("I feel dizzy").unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("I feel dizzy"));
        assert!(text.contains("Thinking."));
    }
}
