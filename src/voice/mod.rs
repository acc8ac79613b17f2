//! Voice-side collaborators: the transport that carries audio into a channel
//! and the presence lookups used by the idle watchdog.

use std::sync::Arc;

use async_trait::async_trait;

use crate::common::types::{AnyResult, ChannelId, GuildId};

/// Joins voice channels on behalf of a session.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join(
        &self,
        guild_id: &GuildId,
        channel_id: &ChannelId,
    ) -> AnyResult<Arc<dyn VoiceConnection>>;
}

/// A live voice connection. Owned by the voice worker while it runs.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// False once the underlying session dropped and a rejoin is needed.
    fn is_ready(&self) -> bool;

    async fn set_speaking(&self, speaking: bool) -> AnyResult<()>;

    async fn disconnect(&self) -> AnyResult<()>;
}

#[async_trait]
pub trait PresenceProvider: Send + Sync {
    /// Whether any human (non-bot) member is currently in the channel.
    async fn has_non_bot_members(&self, guild_id: &GuildId, channel_id: &ChannelId)
    -> AnyResult<bool>;
}
