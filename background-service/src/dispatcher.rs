use feed_core::{
    ChannelId, ChannelSink, DeliveryError, ErrorExt, GuildId, PollConfig, Submission,
    SubscriptionTable,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A destination whose delivery stopped early this cycle.
#[derive(Debug, Clone)]
pub struct FailedDestination {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub error: DeliveryError,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: Vec<FailedDestination>,
    /// Ids sent to at least one destination.
    pub delivered_ids: HashSet<String>,
    /// Ids that failed or were skipped for some destination.
    pub undelivered_ids: HashSet<String>,
}

impl DispatchReport {
    /// An id is settled once it reached a destination, or when no
    /// destination wanted it. Unsettled ids are retried next cycle.
    pub fn is_settled(&self, id: &str) -> bool {
        self.delivered_ids.contains(id) || !self.undelivered_ids.contains(id)
    }
}

/// Fans new submissions out to every subscription of their subreddit.
pub struct Dispatcher {
    sink: Arc<dyn ChannelSink>,
    send_timeout: Duration,
    oldest_first: bool,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn ChannelSink>, send_timeout: Duration, oldest_first: bool) -> Self {
        Self {
            sink,
            send_timeout,
            oldest_first,
        }
    }

    pub fn from_config(sink: Arc<dyn ChannelSink>, config: &PollConfig) -> Self {
        Self::new(sink, config.send_timeout(), config.oldest_first)
    }

    /// `submissions` arrive newest first, as the feed lists them.
    ///
    /// A failing destination is reported and skipped for the rest of this
    /// batch; other destinations are unaffected.
    pub async fn dispatch(
        &self,
        subreddit: &str,
        submissions: &[Submission],
        table: &SubscriptionTable,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let ordered: Vec<&Submission> = if self.oldest_first {
            submissions.iter().rev().collect()
        } else {
            submissions.iter().collect()
        };

        for (guild, subscriptions) in table {
            for subscription in subscriptions.iter().filter(|s| s.subreddit == subreddit) {
                let channel = subscription.channel;

                let accepted: Vec<&Submission> = ordered
                    .iter()
                    .copied()
                    .filter(|s| subscription.accepts(s))
                    .collect();

                for (position, submission) in accepted.iter().enumerate() {
                    match self.send(channel, submission).await {
                        Ok(()) => {
                            report.delivered += 1;
                            report.delivered_ids.insert(submission.id.clone());
                        }
                        Err(error) => {
                            error.log_warn();
                            warn!(
                                "Skipping remaining r/{} posts for guild {} channel {}",
                                subreddit, guild, channel
                            );
                            report
                                .undelivered_ids
                                .extend(accepted[position..].iter().map(|s| s.id.clone()));
                            report.failed.push(FailedDestination {
                                guild: *guild,
                                channel,
                                error,
                            });
                            break;
                        }
                    }
                }
            }
        }

        debug!(
            "r/{}: delivered {} messages, {} destinations failed",
            subreddit,
            report.delivered,
            report.failed.len()
        );
        report
    }

    async fn send(&self, channel: ChannelId, submission: &Submission) -> Result<(), DeliveryError> {
        match timeout(self.send_timeout, self.sink.send_submission(channel, submission)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::SendTimeout {
                channel,
                seconds: self.send_timeout.as_secs(),
            }),
        }
    }
}
