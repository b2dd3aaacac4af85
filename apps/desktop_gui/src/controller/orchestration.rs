//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = match &cmd {
        BackendCommand::Connect { .. } => "connect",
        BackendCommand::SendVoiceState { .. } => "send_voice_state",
        BackendCommand::LoadStoredSession => "load_stored_session",
        BackendCommand::PersistSelectedGuild { .. } => "persist_selected_guild",
        BackendCommand::MarkOnboardingSeen { .. } => "mark_onboarding_seen",
        BackendCommand::FetchReleaseNotes { .. } => "fetch_release_notes",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
        }
    }
}
