use crate::commands::{parse_command, CommandExecutor};
use background_service::BackgroundService;
use feed_core::{ErrorReporter, GuildId};
use serenity::all::{ConnectionStage, ResumedEvent, ShardStageUpdateEvent};
use serenity::async_trait;
use serenity::builder::CreateMessage;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::{Context, EventHandler};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Serenity event handler: runs the poller while connected and answers
/// commands.
pub struct Handler {
    service: Arc<BackgroundService>,
    executor: CommandExecutor,
    prefix: String,
    reporter: ErrorReporter,
}

impl Handler {
    pub fn new(service: Arc<BackgroundService>, executor: CommandExecutor, prefix: String) -> Self {
        Self {
            service,
            executor,
            prefix,
            reporter: ErrorReporter::new(),
        }
    }

    async fn start_polling(&self) {
        if let Err(e) = self.service.start().await {
            self.reporter.report_error(&e);
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected to Discord!", ready.user.name);
        self.start_polling().await;
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        info!("Discord session resumed");
        self.start_polling().await;
    }

    async fn shard_stage_update(&self, _ctx: Context, event: ShardStageUpdateEvent) {
        debug!("Shard {:?} stage {:?} -> {:?}", event.shard_id, event.old, event.new);
        if event.new == ConnectionStage::Disconnected {
            warn!("Discord gateway disconnected, pausing feeds");
            if let Err(e) = self.service.stop().await {
                self.reporter.report_error(&e);
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(parsed) = parse_command(&self.prefix, &msg.content) else {
            return;
        };

        let guild = msg.guild_id.map(|id| GuildId(id.get()));
        let reply = match parsed {
            Ok(command) => {
                debug!("Command from {}: {:?}", msg.author.name, command);
                self.executor.execute(guild, command).await
            }
            Err(e) => {
                self.reporter.report_warning(&e);
                self.executor.error_reply(&e)
            }
        };

        let message = CreateMessage::new().embed(reply.to_create_embed());
        if let Err(e) = msg.channel_id.send_message(&ctx.http, message).await {
            error!("Failed to reply in channel {}: {:?}", msg.channel_id, e);
        }
    }
}
