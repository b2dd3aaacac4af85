//! Gateway client consumed by the desktop main window.
//!
//! Owns the websocket connection, a read-only cache of guilds, DM channels
//! and sidebar folders, and a broadcast channel fanning session lifecycle
//! events out to the UI. The cache is replaced wholesale on `Ready` and
//! patched incrementally afterwards; consumers only ever see snapshots.

use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{
    domain::{DmChannel, Guild, GuildFolder, Snowflake, UserSummary},
    protocol::{GatewayCommand, GatewayEvent, VoiceStateUpdate},
};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

mod release_notes;
pub use release_notes::ReleaseNotesClient;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Session lifecycle and cache notifications delivered to subscribers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    CurrentUserReady(UserSummary),
    SessionResumed,
    SessionInvalidated { resumable: bool },
    CacheUpdated,
    Error(String),
}

/// Read-only view of gateway-provided state. Cloneable so the UI can hold a
/// snapshot without touching client locks while rendering.
#[derive(Debug, Clone, Default)]
pub struct GatewayCache {
    pub guilds: HashMap<Snowflake, Guild>,
    pub folders: Vec<GuildFolder>,
    pub dms: Vec<DmChannel>,
}

impl GatewayCache {
    pub fn guild(&self, id: &Snowflake) -> Option<&Guild> {
        self.guilds.get(id)
    }

    pub fn contains_guild(&self, id: &Snowflake) -> bool {
        self.guilds.contains_key(id)
    }
}

/// The seam the GUI backend worker consumes; tests substitute their own.
#[async_trait]
pub trait GatewayHandle: Send + Sync {
    async fn connect(&self, gateway_url: &str) -> Result<()>;
    async fn send_voice_state(&self, update: VoiceStateUpdate) -> Result<()>;
    async fn cache_snapshot(&self) -> GatewayCache;
    async fn current_user(&self) -> Option<UserSummary>;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

pub struct GatewayClient {
    inner: Mutex<GatewayClientState>,
    cache: RwLock<GatewayCache>,
    events: broadcast::Sender<ClientEvent>,
}

struct GatewayClientState {
    command_tx: Option<mpsc::Sender<GatewayCommand>>,
    current_user: Option<UserSummary>,
}

impl GatewayClient {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            inner: Mutex::new(GatewayClientState {
                command_tx: None,
                current_user: None,
            }),
            cache: RwLock::new(GatewayCache::default()),
            events,
        })
    }

    pub async fn connect(self: &Arc<Self>, gateway_url: &str) -> Result<()> {
        let ws_url = websocket_url(gateway_url)?;
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect gateway websocket: {ws_url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (command_tx, mut command_rx) = mpsc::channel::<GatewayCommand>(COMMAND_CHANNEL_CAPACITY);
        {
            let mut guard = self.inner.lock().await;
            guard.command_tx = Some(command_tx);
        }

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let frame = match serde_json::to_string(&command) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize gateway command");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(Message::Text(frame)).await {
                    warn!(error = %err, "gateway write failed; stopping writer");
                    break;
                }
            }
        });

        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<GatewayEvent>(&text) {
                        Ok(event) => client.handle_gateway_event(event).await,
                        Err(err) => warn!(error = %err, "dropping unparseable gateway frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        let _ = client
                            .events
                            .send(ClientEvent::Error(format!("gateway read failed: {err}")));
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    async fn handle_gateway_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready {
                user,
                guilds,
                folders,
                dms,
            } => {
                {
                    let mut cache = self.cache.write().await;
                    cache.guilds = guilds
                        .into_iter()
                        .map(|guild| (guild.id.clone(), guild))
                        .collect();
                    cache.folders = folders;
                    cache.dms = dms;
                }
                {
                    let mut guard = self.inner.lock().await;
                    guard.current_user = Some(user.clone());
                }
                info!(user = %user.username, "gateway session ready");
                let _ = self.events.send(ClientEvent::CurrentUserReady(user));
                let _ = self.events.send(ClientEvent::CacheUpdated);
            }
            GatewayEvent::Resumed => {
                info!("gateway session resumed");
                let _ = self.events.send(ClientEvent::SessionResumed);
            }
            GatewayEvent::InvalidSession { resumable } => {
                warn!(resumable, "gateway session invalidated");
                let _ = self
                    .events
                    .send(ClientEvent::SessionInvalidated { resumable });
            }
            GatewayEvent::GuildCreate { guild } => {
                {
                    let mut cache = self.cache.write().await;
                    cache.guilds.insert(guild.id.clone(), guild);
                }
                let _ = self.events.send(ClientEvent::CacheUpdated);
            }
            GatewayEvent::GuildDelete { guild_id } => {
                {
                    let mut cache = self.cache.write().await;
                    cache.guilds.remove(&guild_id);
                }
                let _ = self.events.send(ClientEvent::CacheUpdated);
            }
            GatewayEvent::GuildFoldersUpdate { folders } => {
                {
                    let mut cache = self.cache.write().await;
                    cache.folders = folders;
                }
                let _ = self.events.send(ClientEvent::CacheUpdated);
            }
            GatewayEvent::Error(err) => {
                let _ = self.events.send(ClientEvent::Error(err.to_string()));
            }
        }
    }
}

#[async_trait]
impl GatewayHandle for Arc<GatewayClient> {
    async fn connect(&self, gateway_url: &str) -> Result<()> {
        GatewayClient::connect(self, gateway_url).await
    }

    async fn send_voice_state(&self, update: VoiceStateUpdate) -> Result<()> {
        let command_tx = {
            let guard = self.inner.lock().await;
            guard
                .command_tx
                .clone()
                .ok_or_else(|| anyhow!("gateway not connected"))?
        };
        command_tx
            .send(GatewayCommand::VoiceStateUpdate(update))
            .await
            .context("gateway writer is gone")?;
        Ok(())
    }

    async fn cache_snapshot(&self) -> GatewayCache {
        self.cache.read().await.clone()
    }

    async fn current_user(&self) -> Option<UserSummary> {
        self.inner.lock().await.current_user.clone()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

fn websocket_url(gateway_url: &str) -> Result<String> {
    if let Some(rest) = gateway_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = gateway_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else if gateway_url.starts_with("ws://") || gateway_url.starts_with("wss://") {
        Ok(gateway_url.to_string())
    } else {
        Err(anyhow!(
            "gateway url must start with http://, https://, ws:// or wss://"
        ))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
