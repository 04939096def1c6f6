use crate::dispatcher::{DispatchReport, Dispatcher, FailedDestination};
use crate::seen::SeenTracker;
use feed_core::{
    distinct_subreddits, CoreError, ErrorExt, FeedError, FeedSource, Submission,
    SubscriptionStore, SubscriptionTable,
};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one fetch-filter-dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub subreddits_polled: usize,
    pub failed_fetches: Vec<String>,
    /// Subreddits fetched for the first time and recorded without sending.
    pub primed: Vec<String>,
    pub new_posts: usize,
    /// New posts left unrecorded because no destination received them.
    pub retry_posts: usize,
    pub delivered: usize,
    pub failed_destinations: Vec<FailedDestination>,
    pub elapsed: Duration,
}

enum SubredditOutcome {
    FetchFailed(String),
    Primed(String),
    Quiet,
    Dispatched {
        new_posts: usize,
        retry_posts: usize,
        report: DispatchReport,
    },
}

/// Resets the running flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PollLoop {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn SubscriptionStore>,
    seen: Arc<SeenTracker>,
    dispatcher: Dispatcher,
    max_concurrent_fetches: usize,
    prime_new_subreddits: bool,
    running: AtomicBool,
}

impl PollLoop {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn SubscriptionStore>,
        seen: Arc<SeenTracker>,
        dispatcher: Dispatcher,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            source,
            store,
            seen,
            dispatcher,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            prime_new_subreddits: false,
            running: AtomicBool::new(false),
        }
    }

    /// When set, the first listing fetched for a subreddit is recorded as
    /// seen without being sent, so a restart or a new subscription does not
    /// flood channels with the whole listing.
    pub fn with_priming(mut self, prime_new_subreddits: bool) -> Self {
        self.prime_new_subreddits = prime_new_subreddits;
        self
    }

    pub fn seen(&self) -> &Arc<SeenTracker> {
        &self.seen
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one cycle unless one is already in progress, in which case the
    /// attempt is skipped and `None` is returned.
    pub async fn try_run_cycle(&self) -> Option<Result<CycleReport, CoreError>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Poll cycle already running, skipping");
            return None;
        }
        let _guard = CycleGuard(&self.running);

        Some(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> Result<CycleReport, CoreError> {
        let start_time = Instant::now();
        let table = self.store.all_subscriptions().await?;
        let subreddits = distinct_subreddits(&table);

        let mut report = CycleReport {
            subreddits_polled: subreddits.len(),
            ..CycleReport::default()
        };

        let outcomes: Vec<SubredditOutcome> = stream::iter(subreddits)
            .map(|subreddit| self.poll_subreddit(subreddit, &table))
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                SubredditOutcome::FetchFailed(subreddit) => report.failed_fetches.push(subreddit),
                SubredditOutcome::Primed(subreddit) => report.primed.push(subreddit),
                SubredditOutcome::Quiet => {}
                SubredditOutcome::Dispatched {
                    new_posts,
                    retry_posts,
                    report: dispatch,
                } => {
                    report.new_posts += new_posts;
                    report.retry_posts += retry_posts;
                    report.delivered += dispatch.delivered;
                    report.failed_destinations.extend(dispatch.failed);
                }
            }
        }

        report.elapsed = start_time.elapsed();
        info!(
            "Poll cycle: {} subreddits, {} failed fetches, {} primed, {} new posts, {} delivered, {} failed destinations in {:?}",
            report.subreddits_polled,
            report.failed_fetches.len(),
            report.primed.len(),
            report.new_posts,
            report.delivered,
            report.failed_destinations.len(),
            report.elapsed
        );
        Ok(report)
    }

    async fn poll_subreddit(&self, subreddit: String, table: &SubscriptionTable) -> SubredditOutcome {
        let submissions = match self.source.fetch(&subreddit).await {
            Ok(submissions) => submissions,
            Err(FeedError::EmptyListing { .. }) => {
                debug!("r/{} returned an empty listing", subreddit);
                return SubredditOutcome::Quiet;
            }
            Err(e) => {
                if e.is_transient() {
                    e.log_warn();
                } else {
                    e.log_error();
                }
                return SubredditOutcome::FetchFailed(subreddit);
            }
        };

        if self.prime_new_subreddits && !self.seen.knows(&subreddit).await {
            info!(
                "r/{}: first listing, recording {} posts without sending",
                subreddit,
                submissions.len()
            );
            self.seen
                .mark_dispatched(&subreddit, submissions.into_iter().map(|s| s.id))
                .await;
            return SubredditOutcome::Primed(subreddit);
        }

        // Ids still listed stay ahead of eviction
        self.seen
            .refresh(&subreddit, submissions.iter().map(|s| s.id.as_str()))
            .await;

        let fresh = self.seen.filter_new(&subreddit, submissions).await;
        if fresh.is_empty() {
            return SubredditOutcome::Quiet;
        }

        let report = self.dispatcher.dispatch(&subreddit, &fresh, table).await;
        if !report.failed.is_empty() {
            warn!(
                "r/{}: {} destinations failed this cycle",
                subreddit,
                report.failed.len()
            );
        }

        // Recorded only once the dispatch attempt is over, and only for
        // posts that reached a destination or that nobody wanted
        let new_posts = fresh.len();
        let (settled, unsettled): (Vec<Submission>, Vec<Submission>) =
            fresh.into_iter().partition(|s| report.is_settled(&s.id));
        if !unsettled.is_empty() {
            warn!(
                "r/{}: {} posts reached no destination, retrying next cycle",
                subreddit,
                unsettled.len()
            );
        }
        self.seen
            .mark_dispatched(&subreddit, settled.into_iter().map(|s| s.id))
            .await;

        SubredditOutcome::Dispatched {
            new_posts,
            retry_posts: unsettled.len(),
            report,
        }
    }
}
