use crate::embed::submission_embed;
use async_trait::async_trait;
use feed_core::{ChannelId, ChannelSink, DeliveryError, Submission};
use serenity::builder::CreateMessage;
use serenity::http::Http;
use std::sync::Arc;
use tracing::debug;

/// Posts submissions to Discord channels over the REST API.
///
/// Only needs `Http`, so it keeps working across gateway reconnects.
pub struct DiscordSink {
    http: Arc<Http>,
    colour: u32,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>, colour: u32) -> Self {
        Self { http, colour }
    }
}

#[async_trait]
impl ChannelSink for DiscordSink {
    async fn send_submission(
        &self,
        channel: ChannelId,
        submission: &Submission,
    ) -> Result<(), DeliveryError> {
        if channel.0 == 0 {
            return Err(DeliveryError::DestinationUnreachable {
                channel,
                reason: "channel id 0 is not valid".to_string(),
            });
        }

        let embed = submission_embed(submission, self.colour).to_create_embed();
        let message = CreateMessage::new().embed(embed);

        serenity::all::ChannelId::new(channel.0)
            .send_message(&self.http, message)
            .await
            .map_err(|e| DeliveryError::DestinationUnreachable {
                channel,
                reason: e.to_string(),
            })?;

        debug!("Posted {} to channel {}", submission.id, channel);
        Ok(())
    }
}
