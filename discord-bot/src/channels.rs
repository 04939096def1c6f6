use async_trait::async_trait;
use feed_core::{ChannelId, CoreError, GuildId};
use serenity::http::Http;
use serenity::model::channel::Channel;
use std::sync::Arc;
use tracing::debug;

/// Resolves which guild owns a channel.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// `None` when the channel is unknown, not visible to the bot, or not a
    /// guild channel.
    async fn guild_of(&self, channel: ChannelId) -> Result<Option<GuildId>, CoreError>;
}

/// Looks channels up over the REST API.
pub struct DiscordChannels {
    http: Arc<Http>,
}

impl DiscordChannels {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelDirectory for DiscordChannels {
    async fn guild_of(&self, channel: ChannelId) -> Result<Option<GuildId>, CoreError> {
        if channel.0 == 0 {
            return Ok(None);
        }

        match self
            .http
            .get_channel(serenity::all::ChannelId::new(channel.0))
            .await
        {
            Ok(Channel::Guild(found)) => Ok(Some(GuildId(found.guild_id.get()))),
            Ok(_) => Ok(None),
            Err(serenity::Error::Http(e))
                if matches!(e.status_code().map(|s| s.as_u16()), Some(403) | Some(404)) =>
            {
                debug!("Channel {} is not visible: {}", channel, e);
                Ok(None)
            }
            Err(e) => Err(CoreError::Internal {
                message: format!("looking up channel {}: {}", channel, e),
            }),
        }
    }
}
