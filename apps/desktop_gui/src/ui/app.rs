//! Main window: server sidebar, guild content area, onboarding sheet.

use std::collections::HashSet;
use std::time::Duration;

use client_core::GatewayCache;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{Snowflake, UserSummary, DM_GUILD_ID};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{
        events::{UiErrorCategory, UiEvent},
        orchestration::dispatch_backend_command,
        server_list::{derive_server_list, restore_selection, ServerListItem},
    },
};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build identifier persisted by the onboarding flow. The crate version is
/// the closest thing a cargo build has to a bundle build number.
fn current_build() -> String {
    APP_VERSION.to_string()
}

fn should_present_onboarding(
    seen_onboarding: bool,
    previous_build: Option<&str>,
    current_build: &str,
) -> bool {
    !seen_onboarding || previous_build != Some(current_build)
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Authentication",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadingPhase {
    Initial,
    GatewayConn,
    MessageLoad,
}

pub struct MainWindowApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    phase: LoadingPhase,
    cache: GatewayCache,
    server_list: Vec<ServerListItem>,
    current_user: Option<UserSummary>,

    selected_guild: Option<Snowflake>,
    loading_guild: Option<Snowflake>,
    stored_selection: Option<Snowflake>,

    self_mute: bool,
    self_deaf: bool,

    seen_onboarding: bool,
    previous_build: Option<String>,
    presenting_onboarding: bool,
    presenting_add_server: bool,
    skip_whats_new: bool,
    whats_new_markdown: Option<String>,
    onboarding_checked: bool,

    expanded_folders: HashSet<Snowflake>,
    status: String,
}

impl MainWindowApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        gateway_url: String,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            phase: LoadingPhase::Initial,
            cache: GatewayCache::default(),
            server_list: Vec::new(),
            current_user: None,
            selected_guild: None,
            loading_guild: None,
            stored_selection: None,
            self_mute: false,
            self_deaf: false,
            seen_onboarding: false,
            previous_build: None,
            presenting_onboarding: false,
            presenting_add_server: false,
            skip_whats_new: false,
            whats_new_markdown: None,
            onboarding_checked: false,
            expanded_folders: HashSet::new(),
            status: String::new(),
        };
        dispatch_backend_command(
            &app.cmd_tx,
            BackendCommand::LoadStoredSession,
            &mut app.status,
        );
        dispatch_backend_command(
            &app.cmd_tx,
            BackendCommand::Connect { gateway_url },
            &mut app.status,
        );
        app
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.apply_ui_event(event);
        }
    }

    fn apply_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::StoredSessionLoaded {
                last_selected_guild,
                previous_build,
                seen_onboarding,
            } => {
                self.stored_selection = last_selected_guild;
                self.previous_build = previous_build;
                self.seen_onboarding = seen_onboarding;
                if self.phase != LoadingPhase::Initial && self.selected_guild.is_none() {
                    self.restore_last_selected();
                }
            }
            UiEvent::CurrentUserReady { user, cache } => {
                self.current_user = Some(user);
                self.replace_cache(cache);
                self.phase = LoadingPhase::GatewayConn;
                self.restore_last_selected();
                self.announce_voice_state();
            }
            UiEvent::SessionResumed => {
                self.announce_voice_state();
            }
            UiEvent::SessionInvalidated { resumable } => {
                self.phase = LoadingPhase::Initial;
                self.status = if resumable {
                    "Session dropped; reconnecting".to_string()
                } else {
                    "Session invalidated; sign-in required".to_string()
                };
            }
            UiEvent::CacheUpdated(cache) => {
                self.replace_cache(cache);
                if self.phase == LoadingPhase::GatewayConn {
                    self.phase = LoadingPhase::MessageLoad;
                    self.maybe_run_onboarding_check();
                }
            }
            UiEvent::ReleaseNotesLoaded { body } => {
                self.whats_new_markdown = Some(body);
                self.presenting_onboarding = true;
            }
            UiEvent::ReleaseNotesUnavailable => {
                self.skip_whats_new = true;
            }
            UiEvent::Error(err) => {
                self.status = format!("{}: {}", err_label(err.category()), err.message());
            }
        }
    }

    fn replace_cache(&mut self, cache: GatewayCache) {
        self.cache = cache;
        self.server_list = derive_server_list(&self.cache);
    }

    fn restore_last_selected(&mut self) {
        self.selected_guild = Some(restore_selection(
            self.stored_selection.clone(),
            &self.cache,
        ));
    }

    fn select_guild(&mut self, guild_id: Snowflake) {
        if self.selected_guild.as_ref() == Some(&guild_id) {
            return;
        }
        if !guild_id.is_dm() {
            self.loading_guild = Some(guild_id.clone());
        }
        self.selected_guild = Some(guild_id.clone());
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::PersistSelectedGuild { guild_id },
            &mut self.status,
        );
    }

    fn announce_voice_state(&mut self) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SendVoiceState {
                self_mute: self.self_mute,
                self_deaf: self.self_deaf,
            },
            &mut self.status,
        );
    }

    fn maybe_run_onboarding_check(&mut self) {
        if self.onboarding_checked {
            return;
        }
        self.onboarding_checked = true;

        let build = current_build();
        if !should_present_onboarding(self.seen_onboarding, self.previous_build.as_deref(), &build)
        {
            return;
        }
        if !self.seen_onboarding {
            self.presenting_onboarding = true;
        }
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::FetchReleaseNotes {
                tag: format!("v{APP_VERSION}"),
            },
            &mut self.status,
        );
    }

    fn dismiss_onboarding(&mut self) {
        self.presenting_onboarding = false;
        self.seen_onboarding = true;
        let build = current_build();
        self.previous_build = Some(build.clone());
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::MarkOnboardingSeen { build },
            &mut self.status,
        );
    }

    fn phase_label(&self) -> &'static str {
        match self.phase {
            LoadingPhase::Initial => "Connecting to gateway",
            LoadingPhase::GatewayConn => "Loading guilds",
            LoadingPhase::MessageLoad => "Connected",
        }
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("server_sidebar")
            .default_width(200.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("server_sidebar_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        let home_selected =
                            matches!(&self.selected_guild, Some(id) if id.is_dm());
                        if ui.selectable_label(home_selected, "Home").clicked() {
                            self.select_guild(Snowflake::new(DM_GUILD_ID));
                        }
                        ui.separator();

                        let items = self.server_list.clone();
                        for item in &items {
                            match item {
                                ServerListItem::Guild(guild) => {
                                    self.render_guild_row(ui, &guild.id, &guild.name);
                                }
                                ServerListItem::Folder(folder) => {
                                    let expanded = self.expanded_folders.contains(&folder.id);
                                    let header = egui::CollapsingHeader::new(&folder.name)
                                        .id_salt(folder.id.as_str())
                                        .open(Some(expanded))
                                        .show(ui, |ui| {
                                            for guild in &folder.guilds {
                                                self.render_guild_row(
                                                    ui, &guild.id, &guild.name,
                                                );
                                            }
                                        });
                                    if header.header_response.clicked() {
                                        if expanded {
                                            self.expanded_folders.remove(&folder.id);
                                        } else {
                                            self.expanded_folders.insert(folder.id.clone());
                                        }
                                    }
                                }
                            }
                            ui.add_space(2.0);
                        }

                        ui.separator();
                        if ui.button("Add a Server").clicked() {
                            self.presenting_add_server = true;
                        }
                    });
            });
    }

    fn render_guild_row(&mut self, ui: &mut egui::Ui, guild_id: &Snowflake, name: &str) {
        let selected = self.selected_guild.as_ref() == Some(guild_id)
            || self.loading_guild.as_ref() == Some(guild_id);
        ui.horizontal(|ui| {
            if ui.selectable_label(selected, name).clicked() {
                self.select_guild(guild_id.clone());
            }
            if self.loading_guild.as_ref() == Some(guild_id) {
                ui.spinner();
            }
        });
    }

    fn render_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            match self.selected_guild.clone() {
                None => {
                    ui.centered_and_justified(|ui| {
                        ui.label(self.phase_label());
                    });
                }
                Some(id) if id.is_dm() => {
                    ui.heading("Direct Messages");
                    ui.add_space(8.0);
                    if self.cache.dms.is_empty() {
                        ui.label("No conversations yet.");
                    }
                    for dm in &self.cache.dms {
                        ui.label(dm.recipients.join(", "));
                    }
                }
                Some(id) => {
                    match self.cache.guild(&id) {
                        Some(guild) => {
                            ui.heading(&guild.name);
                            ui.label(format!(
                                "Joined {}",
                                guild.joined_at.format("%Y-%m-%d")
                            ));
                            if !guild.features.is_empty() {
                                ui.label(guild.features.join(" · "));
                            }
                        }
                        None => {
                            ui.label("This server is no longer available.");
                        }
                    }
                    // Content for the frame is on screen, the per-button
                    // spinner can stop.
                    if self.loading_guild.as_ref() == Some(&id) {
                        self.loading_guild = None;
                    }
                }
            }
        });
    }

    fn render_onboarding_sheet(&mut self, ctx: &egui::Context) {
        if !self.presenting_onboarding {
            return;
        }
        let mut dismissed = false;
        egui::Window::new("Welcome")
            .collapsible(false)
            .resizable(true)
            .show(ctx, |ui| {
                if !self.seen_onboarding {
                    ui.label("Welcome to Accord. Pick a server on the left to get started.");
                    ui.add_space(8.0);
                }
                if !self.skip_whats_new {
                    if let Some(markdown) = &self.whats_new_markdown {
                        ui.heading(format!("What's new in v{APP_VERSION}"));
                        egui::ScrollArea::vertical()
                            .id_salt("whats_new_scroll")
                            .max_height(320.0)
                            .show(ui, |ui| {
                                ui.label(markdown);
                            });
                        ui.add_space(8.0);
                    }
                }
                if ui.button("Continue").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.dismiss_onboarding();
        }
    }

    fn render_add_server_sheet(&mut self, ctx: &egui::Context) {
        if !self.presenting_add_server {
            return;
        }
        let mut close = false;
        egui::Window::new("Add a Server")
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label("Open an invite link to join a server.");
                if ui.button("Close").clicked() {
                    close = true;
                }
            });
        if close {
            self.presenting_add_server = false;
        }
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.phase_label());
                if let Some(user) = &self.current_user {
                    ui.separator();
                    ui.label(&user.username);
                }
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });
    }
}

impl eframe::App for MainWindowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.render_status_bar(ctx);
        self.render_sidebar(ctx);
        self.render_content(ctx);
        self.render_onboarding_sheet(ctx);
        self.render_add_server_sheet(ctx);
        // The backend bridge has no waker; poll it.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
