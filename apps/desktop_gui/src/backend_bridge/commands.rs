//! Commands queued from the UI thread to the backend worker.

use shared::domain::Snowflake;

pub enum BackendCommand {
    Connect {
        gateway_url: String,
    },
    SendVoiceState {
        self_mute: bool,
        self_deaf: bool,
    },
    LoadStoredSession,
    PersistSelectedGuild {
        guild_id: Snowflake,
    },
    MarkOnboardingSeen {
        build: String,
    },
    FetchReleaseNotes {
        tag: String,
    },
}
