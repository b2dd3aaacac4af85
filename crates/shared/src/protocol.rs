use serde::{Deserialize, Serialize};

use crate::{
    domain::{DmChannel, Guild, GuildFolder, Snowflake, UserSummary},
    error::ApiError,
};

/// Events read off the gateway socket. Tagged the same way the server frames
/// them: `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GatewayEvent {
    Ready {
        user: UserSummary,
        guilds: Vec<Guild>,
        #[serde(default)]
        folders: Vec<GuildFolder>,
        #[serde(default)]
        dms: Vec<DmChannel>,
    },
    Resumed,
    InvalidSession {
        resumable: bool,
    },
    GuildCreate {
        guild: Guild,
    },
    GuildDelete {
        guild_id: Snowflake,
    },
    GuildFoldersUpdate {
        folders: Vec<GuildFolder>,
    },
    Error(ApiError),
}

/// Commands written onto the gateway socket by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GatewayCommand {
    VoiceStateUpdate(VoiceStateUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub self_video: bool,
}

impl VoiceStateUpdate {
    /// The idle announcement sent right after ready/resumed: no voice channel
    /// occupied, current mute/deafen toggles, video off.
    pub fn idle(self_mute: bool, self_deaf: bool) -> Self {
        Self {
            guild_id: None,
            channel_id: None,
            self_mute,
            self_deaf,
            self_video: false,
        }
    }
}

/// Subset of a release object returned by the releases REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseNotes {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_event_round_trips_tagged_frames() {
        let frame = r#"{"type":"invalid_session","payload":{"resumable":false}}"#;
        let event: GatewayEvent = serde_json::from_str(frame).expect("frame parses");
        match event {
            GatewayEvent::InvalidSession { resumable } => assert!(!resumable),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn resumed_frame_has_no_payload_requirement() {
        let event: GatewayEvent =
            serde_json::from_str(r#"{"type":"resumed"}"#).expect("frame parses");
        assert!(matches!(event, GatewayEvent::Resumed));
    }

    #[test]
    fn idle_voice_state_targets_no_channel() {
        let update = VoiceStateUpdate::idle(true, false);
        assert_eq!(update.guild_id, None);
        assert_eq!(update.channel_id, None);
        assert!(update.self_mute);
        assert!(!update.self_deaf);
        assert!(!update.self_video);

        let json = serde_json::to_value(GatewayCommand::VoiceStateUpdate(update))
            .expect("command serializes");
        assert_eq!(json["type"], "voice_state_update");
        assert!(json["payload"].get("guild_id").is_none());
    }
}
