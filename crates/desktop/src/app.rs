//! KG Chat Desktop — egui app state and UI.
//!
//! All network calls run on background threads that block on a tokio runtime
//! and report back over mpsc channels polled each frame. Every kind of call
//! holds at most one in-flight slot; a history load for a different session
//! supersedes the previous one by dropping its receiver.

use eframe::egui;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

use lib::api::{ApiClient, ApiError, ApiMessage, ChatReply, Health, Session, Source};
use lib::chat::ChatState;
use lib::session::SessionIdStore;
use lib::timeline::{Role, TimelineMessage};

const CHAT_INPUT_HEIGHT: f32 = 90.0;
const CHAT_MESSAGES_MIN_HEIGHT: f32 = 80.0;
const LOG_BUFFER_MAX_LINES: usize = 2000;

/// Frames between health probes (~0.5 Hz if 60 fps).
const HEALTH_INTERVAL_FRAMES: u32 = 120;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!(
            "{} [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );
        push_log_line(line);
    }

    fn flush(&self) {}
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    Info,
    #[default]
    Chat,
    Logs,
}

/// Delete failures that need distinct dialogs.
enum DeleteError {
    /// HTTP 404: the backend does not expose the delete route yet.
    EndpointMissing,
    Other(String),
}

/// Receiver for one in-flight history fetch. Which fetch may start and
/// whether a result still applies is decided by [`ChatState`]; replacing this
/// struct drops a superseded receiver.
struct MessagesLoad {
    session_id: String,
    rx: mpsc::Receiver<Result<Vec<ApiMessage>, String>>,
}

pub struct KgChatApp {
    /// Resolved backend base URL (config + KGCHAT_API_URL), fixed at startup.
    api_base: String,
    /// Active session, timeline, sessions list, and persisted session id.
    state: ChatState,
    current_screen: Screen,

    /// Send general LLM responses flag with each message ("AI-enhanced" vs "KB only").
    enable_llm: bool,

    chat_input: String,
    /// Last error from a chat turn, shown under the input.
    chat_error: Option<String>,
    /// When Some, a send is in flight; input is disabled until it resolves.
    send_receiver: Option<mpsc::Receiver<Result<ChatReply, String>>>,

    sessions_receiver: Option<mpsc::Receiver<Result<Vec<Session>, String>>>,

    /// Single-slot history load; see [`MessagesLoad`].
    messages_load: Option<MessagesLoad>,

    /// Session id awaiting delete confirmation.
    confirm_delete: Option<String>,
    delete_receiver: Option<(String, mpsc::Receiver<Result<(), DeleteError>>)>,
    /// Blocking dialog text for a failed delete.
    delete_error: Option<String>,

    /// Last health probe result (None until the first probe resolves).
    health: Option<Result<Health, String>>,
    health_receiver: Option<mpsc::Receiver<Result<Health, String>>>,
    frames_since_health: u32,
}

impl KgChatApp {
    /// Space between the main screen title and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 48.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let (config, config_path) =
            lib::config::load_config(None).unwrap_or_else(|e| {
                log::warn!("config load failed, using defaults: {}", e);
                (lib::config::Config::default(), lib::config::default_config_path())
            });
        let api_base = lib::config::resolve_base_url(&config);
        let store = SessionIdStore::new(lib::config::session_id_path(&config_path));

        let mut app = Self {
            api_base,
            state: ChatState::new(store),
            current_screen: Screen::default(),
            enable_llm: config.chat.enable_llm,
            chat_input: String::new(),
            chat_error: None,
            send_receiver: None,
            sessions_receiver: None,
            messages_load: None,
            confirm_delete: None,
            delete_receiver: None,
            delete_error: None,
            health: None,
            health_receiver: None,
            frames_since_health: HEALTH_INTERVAL_FRAMES,
        };

        // Restore the persisted session and reconcile its history.
        if let Some(id) = app.state.restore() {
            log::info!("restoring session {}", id);
            app.spawn_messages_fetch(id);
        }
        app.request_sessions_refresh();
        app
    }

    /// Kick off a sessions-list fetch unless one is already in flight.
    fn request_sessions_refresh(&mut self) {
        if self.sessions_receiver.is_some() {
            return;
        }
        let base = self.api_base.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(fetch_sessions(base));
        });
        self.sessions_receiver = Some(rx);
    }

    fn poll_sessions(&mut self) {
        if let Some(rx) = &self.sessions_receiver {
            if let Ok(result) = rx.try_recv() {
                self.sessions_receiver = None;
                self.state.apply_sessions(result);
            }
        }
    }

    /// Spawn the history fetch for a session whose load slot was just claimed.
    /// Replacing the slot drops any superseded receiver.
    fn spawn_messages_fetch(&mut self, session_id: String) {
        let base = self.api_base.clone();
        let id = session_id.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(fetch_messages(base, id));
        });
        self.messages_load = Some(MessagesLoad { session_id, rx });
    }

    fn poll_messages_load(&mut self) {
        let Some(load) = &self.messages_load else { return };
        let Ok(result) = load.rx.try_recv() else { return };
        let Some(load) = self.messages_load.take() else { return };
        self.state.finish_load(&load.session_id, result);
    }

    /// Start a chat turn in a background thread if possible.
    fn start_send(&mut self) {
        if self.send_receiver.is_some() {
            return;
        }
        let message = self.chat_input.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.chat_error = None;
        self.chat_input.clear();
        self.state.push_user_message(message.clone());

        let base = self.api_base.clone();
        let session_id = self.state.current_session().map(str::to_string);
        let enable_llm = self.enable_llm;
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(run_send(base, session_id, message, enable_llm));
        });
        self.send_receiver = Some(rx);
    }

    fn poll_send(&mut self) {
        let Some(rx) = &self.send_receiver else { return };
        let Ok(result) = rx.try_recv() else { return };
        self.send_receiver = None;
        match result {
            Ok(reply) => {
                // Reconcile against the server-confirmed history; merge keeps
                // anything still pending without double-rendering.
                if let Some(id) = self.state.complete_send(reply) {
                    self.spawn_messages_fetch(id);
                }
                self.request_sessions_refresh();
            }
            Err(e) => {
                log::error!("send failed: {}", e);
                self.state.record_send_failure();
                self.chat_error = Some(e);
            }
        }
    }

    /// Switch the active session (None = new conversation). Selecting a
    /// session installs its history in Replace mode.
    fn select_session(&mut self, id: Option<String>) {
        self.chat_error = None;
        if let Some(id) = self.state.select_session(id) {
            self.spawn_messages_fetch(id);
        }
    }

    fn request_delete(&mut self, id: String) {
        if self.delete_receiver.is_some() {
            return;
        }
        let base = self.api_base.clone();
        let session_id = id.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(run_delete(base, session_id));
        });
        self.delete_receiver = Some((id, rx));
    }

    fn poll_delete(&mut self) {
        let Some((_, rx)) = &self.delete_receiver else { return };
        let Ok(result) = rx.try_recv() else { return };
        let Some((id, _)) = self.delete_receiver.take() else { return };
        match result {
            Ok(()) => {
                log::info!("deleted session {}", id);
                self.state.complete_delete(&id);
                self.request_sessions_refresh();
            }
            Err(DeleteError::EndpointMissing) => {
                self.delete_error = Some(
                    "Delete endpoint not available. Please ensure the backend is updated and deployed."
                        .to_string(),
                );
            }
            Err(DeleteError::Other(e)) => {
                self.delete_error = Some(format!("Failed to delete session: {}", e));
            }
        }
    }

    /// Poll for the health probe result and start a new probe on schedule.
    fn poll_health(&mut self) {
        if let Some(rx) = &self.health_receiver {
            if let Ok(result) = rx.try_recv() {
                self.health = Some(result);
                self.health_receiver = None;
            }
        }
        if self.health_receiver.is_some() {
            return;
        }
        self.frames_since_health = self.frames_since_health.saturating_add(1);
        if self.frames_since_health >= HEALTH_INTERVAL_FRAMES {
            self.frames_since_health = 0;
            let base = self.api_base.clone();
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(fetch_health(base));
            });
            self.health_receiver = Some(rx);
        }
    }

    /// Renders a single timeline message (frame, role-based fill, badge, time).
    fn render_chat_message(ui: &mut egui::Ui, m: &TimelineMessage) {
        let is_user = m.role == Role::User;
        let frame = egui::Frame::none()
            .fill(if is_user {
                ui.style().visuals.extreme_bg_color
            } else {
                ui.style().visuals.panel_fill
            })
            .stroke(egui::Stroke::new(
                1.0,
                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
            ))
            .rounding(egui::Rounding::same(8.0))
            .inner_margin(egui::Margin::same(8.0));

        frame.show(ui, |ui| {
            if is_user {
                ui.label(egui::RichText::new(&m.content).strong());
            } else if m.source == Some(Source::Error) {
                ui.colored_label(egui::Color32::RED, &m.content);
            } else {
                ui.label(&m.content);
                if let Some(badge) = m.source.and_then(lib::format::source_badge) {
                    ui.add_space(4.0);
                    ui.label(egui::RichText::new(badge).small().weak());
                }
            }
            ui.label(
                egui::RichText::new(m.created_at.format("%H:%M").to_string())
                    .small()
                    .weak(),
            );
        });
    }

    /// Render the chat UI (messages + input). Messages area fills the space
    /// with stick-to-bottom; input and controls are fixed at the bottom.
    fn ui_chat(&mut self, ui: &mut egui::Ui) {
        let sending = self.send_receiver.is_some();
        let can_send = !sending;

        let row_height = ui.spacing().interact_size.y + 8.0;
        let bottom_section_height =
            CHAT_INPUT_HEIGHT + 8.0 + row_height + Self::SCREEN_FOOTER_SPACING;
        let available = ui.available_height();
        let messages_height = (available - bottom_section_height).max(CHAT_MESSAGES_MIN_HEIGHT);

        let messages_width = ui.available_width();
        let messages_rect = ui
            .allocate_exact_size(
                egui::vec2(messages_width, messages_height),
                egui::Sense::hover(),
            )
            .0;
        let mut messages_ui =
            ui.child_ui(messages_rect, egui::Layout::top_down(egui::Align::Min));
        let loading_history = self.messages_load.is_some() && self.state.timeline().is_empty();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .show(&mut messages_ui, |ui| {
                let content_width = ui.available_width();
                ui.allocate_exact_size(egui::vec2(content_width, 0.0), egui::Sense::hover());
                if loading_history {
                    ui.label("Loading conversation...");
                } else if self.state.timeline().is_empty() {
                    ui.label(egui::RichText::new("Start a conversation").strong());
                    ui.label("Ask me anything about the knowledge base.");
                } else {
                    for m in self.state.timeline().messages() {
                        Self::render_chat_message(ui, m);
                        ui.add_space(8.0);
                    }
                    if sending {
                        ui.label(egui::RichText::new("…").weak());
                    }
                }
            });

        ui.add_space(8.0);

        let text_response = ui.add_enabled_ui(can_send, |ui| {
            ui.add_sized(
                [ui.available_width(), CHAT_INPUT_HEIGHT],
                egui::TextEdit::multiline(&mut self.chat_input),
            )
        });
        let response = text_response.inner;
        ui.add_space(8.0);

        let row_width = ui.available_width();
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(row_width, row_height), egui::Sense::hover());
        let mut row_ui = ui.child_ui(rect, egui::Layout::right_to_left(egui::Align::Center));
        egui::Frame::none()
            .inner_margin(egui::Margin {
                left: 0.0,
                right: 8.0,
                top: 4.0,
                bottom: 4.0,
            })
            .show(&mut row_ui, |ui| {
                let mut send_now = false;

                let send_button = ui.add_enabled(can_send, egui::Button::new("Send"));

                ui.add_space(8.0);
                ui.label(
                    egui::RichText::new(if self.enable_llm { "AI-enhanced" } else { "KB only" })
                        .small()
                        .weak(),
                );
                ui.add_space(4.0);
                ui.add_enabled_ui(can_send, |ui| {
                    ui.checkbox(&mut self.enable_llm, "Enable General LLM Responses");
                });

                if send_button.clicked() {
                    send_now = true;
                }
                if can_send && response.has_focus() {
                    let modifiers = ui.input(|i| i.modifiers);
                    if (modifiers.command || modifiers.ctrl)
                        && ui.input(|i| i.key_pressed(egui::Key::Enter))
                    {
                        send_now = true;
                    }
                }
                if send_now {
                    self.start_send();
                }
            });

        if let Some(ref err) = self.chat_error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, err);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_sessions_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Chat History");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        if ui.button("New Chat").clicked() {
            self.select_session(None);
        }
        ui.add_space(8.0);

        if self.state.sessions().is_empty() {
            if self.sessions_receiver.is_some() {
                ui.label("Loading sessions...");
            } else {
                ui.label("No conversations yet");
            }
            ui.add_space(Self::SCREEN_FOOTER_SPACING);
            return;
        }

        let now = chrono::Utc::now();
        // One delete at a time: every delete button is disabled while one is
        // in flight, so a second confirmation can never be silently dropped.
        let delete_busy = self.delete_receiver.is_some();
        let mut clicked_select: Option<String> = None;
        let mut clicked_delete: Option<String> = None;
        egui::ScrollArea::vertical()
            .id_source("sessions_scroll")
            .show(ui, |ui| {
                for session in self.state.sessions() {
                    let is_selected =
                        self.state.current_session() == Some(session.id.as_str());
                    let label = format!(
                        "{}\n{} · {} messages",
                        lib::format::session_preview(session),
                        lib::format::recency_label(session.last_active, now),
                        session.messages.len()
                    );
                    ui.horizontal(|ui| {
                        if ui.selectable_label(is_selected, label).clicked() {
                            clicked_select = Some(session.id.clone());
                        }
                        if ui
                            .add_enabled(!delete_busy, egui::Button::new("🗑").small())
                            .clicked()
                        {
                            clicked_delete = Some(session.id.clone());
                        }
                    });
                    ui.add_space(4.0);
                }
            });
        if let Some(id) = clicked_select {
            self.select_session(Some(id));
        }
        if let Some(id) = clicked_delete {
            self.confirm_delete = Some(id);
        }
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_info_screen(&self, ui: &mut egui::Ui) {
        const INFO_LINE_SPACING: f32 = 6.0;
        const INFO_SUBSECTION_SPACING: f32 = 18.0;
        ui.add_space(24.0);
        ui.heading("Info");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        ui.label(egui::RichText::new("Backend").strong());
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!("Endpoint: {}", self.api_base));
        ui.add_space(INFO_LINE_SPACING);
        match &self.health {
            Some(Ok(h)) => {
                ui.label(format!("Status: {}", h.status));
                ui.add_space(INFO_LINE_SPACING);
                if let Some(ref db) = h.database {
                    ui.label(format!("Database: {}", db));
                    ui.add_space(INFO_LINE_SPACING);
                }
                if let Some(ref err) = h.error {
                    ui.colored_label(egui::Color32::RED, format!("Error: {}", err));
                    ui.add_space(INFO_LINE_SPACING);
                }
            }
            Some(Err(e)) => {
                ui.colored_label(egui::Color32::RED, format!("Unreachable: {}", e));
                ui.add_space(INFO_LINE_SPACING);
            }
            None => {
                ui.label("Status: (probing)");
                ui.add_space(INFO_LINE_SPACING);
            }
        }
        ui.add_space(INFO_SUBSECTION_SPACING);

        ui.label(egui::RichText::new("Session").strong());
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!(
            "Current: {}",
            self.state.current_session().unwrap_or("(none)")
        ));
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!("Persisted at: {}", self.state.store().path().display()));
        ui.add_space(INFO_LINE_SPACING);
        ui.label(format!(
            "Mode: {}",
            if self.enable_llm { "AI-enhanced" } else { "KB only" }
        ));
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    /// Modal confirmation before deleting a session, and the blocking dialog
    /// for a failed delete.
    fn ui_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(id) = self.confirm_delete.clone() {
            egui::Window::new("Delete conversation")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(
                        "Are you sure you want to delete this conversation? This action cannot be undone.",
                    );
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Cancel").clicked() {
                            self.confirm_delete = None;
                        }
                        if ui.button("Delete").clicked() {
                            self.confirm_delete = None;
                            self.request_delete(id.clone());
                        }
                    });
                });
        }

        if let Some(message) = self.delete_error.clone() {
            egui::Window::new("Delete failed")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        self.delete_error = None;
                    }
                });
        }
    }
}

impl eframe::App for KgChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_health();
        self.poll_sessions();
        self.poll_messages_load();
        self.poll_send();
        self.poll_delete();

        // Header with title and backend status.
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.heading("KG Chatbot");
                        ui.label(egui::RichText::new("Knowledge Base Assistant").weak());
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            match &self.health {
                                Some(Ok(h)) => {
                                    ui.label(format!("backend: {}", h.status));
                                }
                                Some(Err(_)) => {
                                    ui.colored_label(egui::Color32::RED, "backend: unreachable");
                                }
                                None => {
                                    ui.label(egui::RichText::new("backend: …").weak());
                                }
                            }
                        });
                    });
                    ui.add_space(16.0);
                });
        });

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(140.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Chat, "Chat")
                            .clicked()
                        {
                            *current_screen = Screen::Chat;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Info, "Info")
                            .clicked()
                        {
                            *current_screen = Screen::Info;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Logs, "Logs")
                            .clicked()
                        {
                            *current_screen = Screen::Logs;
                        }
                    });
            });

        // Right sidebar: past sessions when on Chat.
        if self.current_screen == Screen::Chat {
            egui::SidePanel::right("sessions_panel")
                .resizable(false)
                .exact_width(260.0)
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(16.0, 0.0))
                        .show(ui, |ui| {
                            self.ui_sessions_panel(ui);
                        });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| match self.current_screen {
                    Screen::Chat => {
                        ui.add_space(24.0);
                        ui.heading("Chat");
                        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
                        self.ui_chat(ui);
                    }
                    Screen::Info => {
                        self.ui_info_screen(ui);
                    }
                    Screen::Logs => {
                        self.ui_logs_screen(ui);
                    }
                });
        });

        self.ui_dialogs(ctx);

        // Keep polling receivers even when the window is idle.
        if self.send_receiver.is_some()
            || self.messages_load.is_some()
            || self.sessions_receiver.is_some()
            || self.delete_receiver.is_some()
            || self.health_receiver.is_some()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

fn blocking_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| e.to_string())
}

/// Fetch the sessions list. Runs in a thread; use blocking.
fn fetch_sessions(base: String) -> Result<Vec<Session>, String> {
    let rt = blocking_runtime()?;
    let client = ApiClient::new(Some(base));
    rt.block_on(client.list_sessions()).map_err(|e| e.to_string())
}

/// Fetch confirmed history for one session. Runs in a thread; use blocking.
fn fetch_messages(base: String, session_id: String) -> Result<Vec<ApiMessage>, String> {
    let rt = blocking_runtime()?;
    let client = ApiClient::new(Some(base));
    rt.block_on(client.session_messages(&session_id))
        .map_err(|e| e.to_string())
}

/// Run one chat turn. Runs in a thread; use blocking.
fn run_send(
    base: String,
    session_id: Option<String>,
    message: String,
    enable_llm: bool,
) -> Result<ChatReply, String> {
    let rt = blocking_runtime()?;
    let client = ApiClient::new(Some(base));
    rt.block_on(client.send_message(session_id.as_deref(), &message, enable_llm))
        .map_err(|e| e.to_string())
}

/// Delete a session, keeping the missing-endpoint case distinct.
fn run_delete(base: String, session_id: String) -> Result<(), DeleteError> {
    let rt = blocking_runtime().map_err(DeleteError::Other)?;
    let client = ApiClient::new(Some(base));
    rt.block_on(client.delete_session(&session_id))
        .map_err(|e| match e {
            ApiError::EndpointMissing(_) => DeleteError::EndpointMissing,
            other => DeleteError::Other(other.to_string()),
        })
}

/// Probe backend health. Runs in a thread; use blocking.
fn fetch_health(base: String) -> Result<Health, String> {
    let rt = blocking_runtime()?;
    let client = ApiClient::new(Some(base));
    rt.block_on(client.health()).map_err(|e| e.to_string())
}
