use abacus_core::auth::{role_label, AuthError, AuthFlow, Principal};
use abacus_core::client::{RequestOptions, SessionClient};
use abacus_core::tier::{FacadePage, SessionState, Tier};
use egui::{self, RichText};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// Application path polled for the notifications modal.
const ENTRIES_PATH: &str = "/api/codex/entries/";

/// How long a transient status message stays on screen.
const MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Panels reachable from the authenticated side navigation. These map to
/// the server's application areas.
const ABACUS_PAGES: &[&str] = &["Lineage", "Scales", "Codex", "Loom", "Audit"];

enum UiEvent {
    LoginFinished(Result<Principal, AuthError>),
    EntriesFetched(String),
}

struct StatusMessage {
    text: String,
    raised_at: Instant,
    error: bool,
}

pub struct AbacusEguiApp {
    session: SessionState,
    auth: Arc<AuthFlow>,
    client: Arc<SessionClient>,
    runtime: Arc<Runtime>,
    username: String,
    passphrase: String,
    login_error: Option<String>,
    login_pending: bool,
    abacus_page: &'static str,
    notifications: Option<String>,
    messages: Vec<StatusMessage>,
    tx: UnboundedSender<UiEvent>,
    rx: UnboundedReceiver<UiEvent>,
}

impl AbacusEguiApp {
    pub fn new(
        session: SessionState,
        auth: Arc<AuthFlow>,
        client: Arc<SessionClient>,
        runtime: Arc<Runtime>,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            session,
            auth,
            client,
            runtime,
            username: String::new(),
            passphrase: String::new(),
            login_error: None,
            login_pending: false,
            abacus_page: ABACUS_PAGES[0],
            notifications: None,
            messages: Vec::new(),
            tx,
            rx,
        }
    }

    fn submit_login(&mut self) {
        let username = self.username.trim().to_owned();
        let passphrase = self.passphrase.trim().to_owned();
        if username.is_empty() || passphrase.is_empty() {
            self.login_error = Some("Please enter username and passphrase.".to_string());
            return;
        }
        self.login_error = None;
        self.login_pending = true;

        let auth = self.auth.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let outcome = auth
                .login(&username, &passphrase)
                .await
                .map(|payload| payload.principal(&username));
            if tx.send(UiEvent::LoginFinished(outcome)).is_err() {
                warn!("UI dropped before login completion");
            }
        });
    }

    fn open_notifications(&mut self) {
        self.notifications = Some("Loading…".to_string());
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let summary = fetch_entry_summary(&client).await;
            tx.send(UiEvent::EntriesFetched(summary)).ok();
        });
    }

    fn perform_logout(&mut self) {
        self.auth.logout();
        self.session.logout();
        self.notifications = None;
        self.push_message("Logged out.", false);
    }

    fn push_message(&mut self, text: impl Into<String>, error: bool) {
        self.messages.push(StatusMessage {
            text: text.into(),
            raised_at: Instant::now(),
            error,
        });
    }

    fn process_background_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                UiEvent::LoginFinished(Ok(principal)) => {
                    self.login_pending = false;
                    self.passphrase.clear();
                    let welcome = format!(
                        "Welcome, {} ({}).",
                        principal.display_name,
                        role_label(&principal.role)
                    );
                    self.session.complete_login(principal);
                    self.push_message(welcome, false);
                }
                UiEvent::LoginFinished(Err(err)) => {
                    self.login_pending = false;
                    self.login_error = Some(match err {
                        AuthError::Rejected(message) => message,
                        other => other.to_string(),
                    });
                }
                UiEvent::EntriesFetched(summary) => {
                    if self.notifications.is_some() {
                        self.notifications = Some(summary);
                    }
                }
            }
        }
        self.messages
            .retain(|message| message.raised_at.elapsed() < MESSAGE_TTL);
    }

    fn show_facade(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("facade-nav").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Abacus Imports & Exports");
                ui.separator();
                for (label, page) in [
                    ("Home", FacadePage::Home),
                    ("About", FacadePage::About),
                    ("Contact", FacadePage::Contact),
                ] {
                    let selected = self.session.facade_page() == page;
                    if ui.selectable_label(selected, label).clicked() {
                        self.session.show_facade_page(page);
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.session.facade_page() {
                FacadePage::Home => {
                    ui.heading("Trusted trade since 1987");
                    ui.label("Import and export brokerage for discerning clients.");
                }
                FacadePage::About => {
                    ui.heading("About us");
                    ui.label("A family business with a long memory.");
                }
                FacadePage::Contact => {
                    ui.heading("Contact");
                    ui.label("Reach us through the usual channels.");
                }
            }

            // The keyhole: a deliberately unlabeled trigger that reveals
            // the login tier.
            ui.with_layout(egui::Layout::bottom_up(egui::Align::Min), |ui| {
                if ui
                    .add(egui::Button::new("·").frame(false))
                    .on_hover_text("")
                    .clicked()
                {
                    self.session.reveal_login();
                }
            });
        });
    }

    fn show_login(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.heading("Identify yourself");
                ui.add_space(12.0);

                let username =
                    egui::TextEdit::singleline(&mut self.username).hint_text("Username");
                ui.add(username);
                let passphrase = egui::TextEdit::singleline(&mut self.passphrase)
                    .hint_text("Passphrase")
                    .password(true);
                let passphrase_response = ui.add(passphrase);

                if let Some(error) = &self.login_error {
                    ui.colored_label(egui::Color32::RED, error);
                }

                ui.add_space(8.0);
                let submit_clicked = ui
                    .add_enabled(!self.login_pending, egui::Button::new("Enter"))
                    .clicked();
                let submit_by_key = passphrase_response.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if submit_clicked || submit_by_key {
                    self.submit_login();
                }
                if self.login_pending {
                    ui.spinner();
                }

                ui.add_space(16.0);
                if ui.button("Back").clicked() {
                    self.login_error = None;
                    self.session.return_to_facade();
                }
            });
        });
    }

    fn show_abacus(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("abacus-top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Abacus");
                if let Some(principal) = self.session.principal() {
                    ui.label(format!(
                        "{} — {}",
                        principal.display_name,
                        role_label(&principal.role)
                    ));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Logout").clicked() {
                        self.perform_logout();
                    }
                    if ui
                        .button(RichText::new("Panic").color(egui::Color32::RED))
                        .clicked()
                    {
                        self.session.raise_overlay();
                    }
                    if ui.button("Notifications").clicked() {
                        self.open_notifications();
                    }
                });
            });
        });

        egui::SidePanel::left("abacus-nav").show(ctx, |ui| {
            for page in ABACUS_PAGES {
                if ui
                    .selectable_label(self.abacus_page == *page, *page)
                    .clicked()
                {
                    self.abacus_page = *page;
                }
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(self.abacus_page);
            ui.label(format!("Content for \"{}\" goes here.", self.abacus_page));
        });

        let mut close_notifications = false;
        if let Some(text) = self.notifications.clone() {
            egui::Window::new("Notifications")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(text);
                    if ui.button("Close").clicked() {
                        close_notifications = true;
                    }
                });
        }
        if close_notifications {
            self.notifications = None;
        }

        if self.session.overlay_raised() {
            self.show_shutdown_overlay(ctx);
        }
    }

    fn show_shutdown_overlay(&self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("shutdown-overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(230));
                ui.allocate_ui_at_rect(screen, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            RichText::new("SHUTDOWN")
                                .size(40.0)
                                .color(egui::Color32::RED),
                        );
                    });
                });
            });
    }

    fn show_status_messages(&mut self, ctx: &egui::Context) {
        if self.messages.is_empty() {
            return;
        }
        egui::TopBottomPanel::bottom("status-messages").show(ctx, |ui| {
            for message in &self.messages {
                let color = if message.error {
                    egui::Color32::RED
                } else {
                    egui::Color32::GRAY
                };
                ui.colored_label(color, &message.text);
            }
        });
        // Keep repainting so expired messages disappear without input.
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

impl eframe::App for AbacusEguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_background_events();

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.lower_overlay();
            self.notifications = None;
        }

        match self.session.tier() {
            Tier::Facade => self.show_facade(ctx),
            Tier::Login => self.show_login(ctx),
            Tier::Authenticated => self.show_abacus(ctx),
        }

        self.show_status_messages(ctx);
    }
}

async fn fetch_entry_summary(client: &SessionClient) -> String {
    const FALLBACK: &str = "No new notifications.";

    let response = match client.request(ENTRIES_PATH, RequestOptions::get()).await {
        Ok(response) => response,
        Err(err) => {
            warn!(%err, "codex entries fetch failed");
            return FALLBACK.to_string();
        }
    };
    if !response.status().is_success() {
        return FALLBACK.to_string();
    }
    match response.json::<serde_json::Value>().await {
        Ok(serde_json::Value::Array(entries)) if !entries.is_empty() => {
            format!("{} new item(s) in the codex.", entries.len())
        }
        _ => FALLBACK.to_string(),
    }
}
