//! Backend worker thread: owns the tokio runtime, the gateway client and
//! preference storage, and translates between the crossbeam bridges.

use std::thread;

use client_core::{ClientEvent, GatewayClient, GatewayHandle, ReleaseNotesClient};
use crossbeam_channel::{Receiver, Sender};
use shared::protocol::VoiceStateUpdate;
use storage::Preferences;
use tracing::warn;

use crate::controller::events::{classify_connect_failure, UiError, UiErrorContext, UiEvent};

use super::commands::BackendCommand;

const RELEASES_OWNER: &str = "accord-client";
const RELEASES_REPO: &str = "accord";

pub fn spawn_backend_thread(
    preferences_url: String,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let prefs = match Preferences::open(&preferences_url).await {
                Ok(prefs) => prefs,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!(
                            "backend worker startup failure: could not open preference storage '{preferences_url}': {err}"
                        ),
                    )));
                    tracing::error!("failed to open preference storage '{preferences_url}': {err}");
                    return;
                }
            };
            if let Err(err) = prefs.health_check().await {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: preference storage unhealthy: {err}"),
                )));
                tracing::error!("preference storage failed health check: {err}");
                return;
            }

            let client = GatewayClient::new();
            let release_notes = ReleaseNotesClient::new();

            let mut events = client.subscribe_events();
            let event_ui_tx = ui_tx.clone();
            let event_client = client.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let ui_event = match event {
                        ClientEvent::CurrentUserReady(user) => UiEvent::CurrentUserReady {
                            user,
                            cache: event_client.cache_snapshot().await,
                        },
                        ClientEvent::SessionResumed => UiEvent::SessionResumed,
                        ClientEvent::SessionInvalidated { resumable } => {
                            UiEvent::SessionInvalidated { resumable }
                        }
                        ClientEvent::CacheUpdated => {
                            UiEvent::CacheUpdated(event_client.cache_snapshot().await)
                        }
                        ClientEvent::Error(message) => UiEvent::Error(UiError::from_message(
                            UiErrorContext::General,
                            message,
                        )),
                    };
                    if event_ui_tx.try_send(ui_event).is_err() {
                        warn!("ui event queue full or disconnected; dropping gateway event");
                    }
                }
            });

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    BackendCommand::Connect { gateway_url } => {
                        if let Err(err) = client.connect(&gateway_url).await {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::Connect,
                                classify_connect_failure(&err.to_string()),
                            )));
                        }
                    }
                    BackendCommand::SendVoiceState {
                        self_mute,
                        self_deaf,
                    } => {
                        if let Err(err) = client
                            .send_voice_state(VoiceStateUpdate::idle(self_mute, self_deaf))
                            .await
                        {
                            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                UiErrorContext::General,
                                format!("failed to announce voice state: {err}"),
                            )));
                        }
                    }
                    BackendCommand::LoadStoredSession => {
                        let last_selected_guild = prefs.last_selected_guild().await;
                        let previous_build = prefs.previous_build().await;
                        let seen_onboarding = prefs.seen_onboarding().await;
                        match (last_selected_guild, previous_build, seen_onboarding) {
                            (Ok(last_selected_guild), Ok(previous_build), Ok(seen_onboarding)) => {
                                let _ = ui_tx.try_send(UiEvent::StoredSessionLoaded {
                                    last_selected_guild,
                                    previous_build,
                                    seen_onboarding,
                                });
                            }
                            (last, build, seen) => {
                                let err = [
                                    last.err().map(|e| e.to_string()),
                                    build.err().map(|e| e.to_string()),
                                    seen.err().map(|e| e.to_string()),
                                ]
                                .into_iter()
                                .flatten()
                                .collect::<Vec<_>>()
                                .join("; ");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::Persistence,
                                    format!("failed to load stored session: {err}"),
                                )));
                            }
                        }
                    }
                    BackendCommand::PersistSelectedGuild { guild_id } => {
                        // Best-effort, mirrors plain key-value storage: a
                        // failed write only loses the restore hint.
                        if let Err(err) = prefs.set_last_selected_guild(&guild_id).await {
                            warn!(guild_id = %guild_id, "failed to persist selected guild: {err}");
                        }
                    }
                    BackendCommand::MarkOnboardingSeen { build } => {
                        if let Err(err) = prefs.set_seen_onboarding(true).await {
                            warn!("failed to persist onboarding flag: {err}");
                        }
                        if let Err(err) = prefs.set_previous_build(&build).await {
                            warn!(build = %build, "failed to persist build id: {err}");
                        }
                    }
                    BackendCommand::FetchReleaseNotes { tag } => {
                        match release_notes
                            .fetch_release_by_tag(RELEASES_OWNER, RELEASES_REPO, &tag)
                            .await
                        {
                            Ok(notes) => {
                                let _ = ui_tx.try_send(UiEvent::ReleaseNotesLoaded {
                                    body: notes.body,
                                });
                            }
                            Err(err) => {
                                // Silent skip: the what's-new panel is
                                // best-effort by contract.
                                warn!(tag = %tag, "release notes unavailable: {err}");
                                let _ = ui_tx.try_send(UiEvent::ReleaseNotesUnavailable);
                            }
                        }
                    }
                }
            }
        });
    });
}
