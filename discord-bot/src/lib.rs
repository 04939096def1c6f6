pub mod channels;
pub mod commands;
pub mod embed;
pub mod error;
pub mod handler;
pub mod sink;

pub use channels::{ChannelDirectory, DiscordChannels};
pub use commands::{parse_command, Command, CommandExecutor};
pub use error::BotError;
pub use handler::Handler;
pub use sink::DiscordSink;

use feed_core::DiscordConfig;
use serenity::model::gateway::GatewayIntents;
use serenity::Client;

pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Builds the gateway client. Run it with `client.start()`.
pub async fn build_client(config: &DiscordConfig, handler: Handler) -> Result<Client, BotError> {
    let token = config
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(BotError::NoToken)?;

    let client = Client::builder(token, intents())
        .event_handler(handler)
        .await?;
    Ok(client)
}
