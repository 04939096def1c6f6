use feed_core::Submission;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Ids of one subreddit, ordered by last use.
#[derive(Debug, Default)]
struct SubredditSeen {
    stamps: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
}

impl SubredditSeen {
    fn touch(&mut self, id: String, stamp: u64) {
        if let Some(previous) = self.stamps.insert(id.clone(), stamp) {
            self.order.remove(&previous);
        }
        self.order.insert(stamp, id);
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.stamps.len() > capacity {
            let Some((_, id)) = self.order.pop_first() else {
                break;
            };
            self.stamps.remove(&id);
        }
    }
}

#[derive(Debug, Default)]
struct SeenSet {
    subreddits: HashMap<String, SubredditSeen>,
    clock: u64,
}

impl SeenSet {
    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Post ids already dispatched, process-wide.
///
/// Ids are kept per subreddit and each subreddit holds at most `capacity`
/// of them, least recently used evicted first. An id is used when it is
/// marked or when it shows up again in a fetched listing, so an id that is
/// still listed is only evicted once a whole listing no longer fits.
#[derive(Debug)]
pub struct SeenTracker {
    inner: RwLock<SeenSet>,
    capacity: usize,
}

impl SeenTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(SeenSet::default()),
            capacity: capacity.max(1),
        }
    }

    /// Keeps the submissions whose ids have not been dispatched, dropping
    /// repeated ids within `submissions`. Does not record anything.
    pub async fn filter_new(&self, subreddit: &str, submissions: Vec<Submission>) -> Vec<Submission> {
        let seen = self.inner.read().await;
        let known = seen.subreddits.get(subreddit);
        let total = submissions.len();
        let mut in_batch = HashSet::with_capacity(total);

        let fresh: Vec<Submission> = submissions
            .into_iter()
            .filter(|s| {
                !known.is_some_and(|k| k.stamps.contains_key(&s.id)) && in_batch.insert(s.id.clone())
            })
            .collect();

        debug!("r/{}: {} of {} submissions are new", subreddit, fresh.len(), total);
        fresh
    }

    /// Records `ids` as dispatched for `subreddit`.
    pub async fn mark_dispatched<I>(&self, subreddit: &str, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = self.inner.write().await;
        let mut stamps = Vec::new();
        for id in ids {
            stamps.push((id, seen.next_stamp()));
        }

        let entry = seen.subreddits.entry(subreddit.to_string()).or_default();
        for (id, stamp) in stamps {
            entry.touch(id, stamp);
        }
        entry.evict_to(self.capacity);
    }

    /// Moves the already recorded ids among `listed` to the back of the
    /// eviction order. Unknown ids are ignored.
    pub async fn refresh<'a, I>(&self, subreddit: &str, listed: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = self.inner.write().await;
        if !seen.subreddits.contains_key(subreddit) {
            return;
        }

        let mut stamps = Vec::new();
        for id in listed {
            stamps.push((id, seen.next_stamp()));
        }

        if let Some(entry) = seen.subreddits.get_mut(subreddit) {
            for (id, stamp) in stamps {
                if entry.stamps.contains_key(id) {
                    entry.touch(id.to_string(), stamp);
                }
            }
        }
    }

    /// True once anything was recorded for `subreddit`.
    pub async fn knows(&self, subreddit: &str) -> bool {
        self.inner.read().await.subreddits.contains_key(subreddit)
    }

    pub async fn contains(&self, subreddit: &str, id: &str) -> bool {
        self.inner
            .read()
            .await
            .subreddits
            .get(subreddit)
            .is_some_and(|k| k.stamps.contains_key(id))
    }

    /// Ids held across all subreddits.
    pub async fn len(&self) -> usize {
        self.inner
            .read()
            .await
            .subreddits
            .values()
            .map(|k| k.stamps.len())
            .sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Per-subreddit bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission(id: &str) -> Submission {
        Submission {
            id: id.to_string(),
            title: format!("Post {}", id),
            text: String::new(),
            author: "someone".to_string(),
            subreddit: "test".to_string(),
            timestamp: Utc::now(),
            preview: None,
            flair: None,
            permalink: None,
        }
    }

    fn ids(submissions: &[Submission]) -> Vec<&str> {
        submissions.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_filter_new_drops_seen_ids() {
        let tracker = SeenTracker::new(100);
        tracker
            .mark_dispatched("test", ["b", "d", "e"].map(String::from))
            .await;

        let batch = ["a", "b", "c", "d", "e"].map(submission).to_vec();
        let fresh = tracker.filter_new("test", batch).await;
        assert_eq!(ids(&fresh), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_filter_new_is_pure() {
        let tracker = SeenTracker::new(100);
        let batch = vec![submission("a"), submission("b")];

        let first = tracker.filter_new("test", batch.clone()).await;
        let second = tracker.filter_new("test", batch).await;
        assert_eq!(first, second);
        assert!(tracker.is_empty().await);
        assert!(!tracker.knows("test").await);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_listing() {
        let tracker = SeenTracker::new(100);
        let batch = vec![submission("a"), submission("a"), submission("b")];
        assert_eq!(ids(&tracker.filter_new("test", batch).await), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_ids_are_scoped_to_their_subreddit() {
        let tracker = SeenTracker::new(100);
        tracker.mark_dispatched("news", ["a".to_string()]).await;

        assert!(tracker.contains("news", "a").await);
        assert!(!tracker.contains("rust", "a").await);
        assert_eq!(tracker.filter_new("rust", vec![submission("a")]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let tracker = SeenTracker::new(3);
        tracker
            .mark_dispatched("test", ["1", "2", "3"].map(String::from))
            .await;
        // "1" is still listed, so "2" becomes the oldest
        tracker.refresh("test", ["1", "unknown"]).await;
        tracker.mark_dispatched("test", ["4".to_string()]).await;

        assert_eq!(tracker.len().await, 3);
        assert!(tracker.contains("test", "1").await);
        assert!(!tracker.contains("test", "2").await);
        assert!(!tracker.contains("test", "unknown").await);
        assert!(tracker.contains("test", "4").await);
    }

    #[tokio::test]
    async fn test_busy_subreddit_does_not_evict_a_quiet_one() {
        let tracker = SeenTracker::new(4);
        tracker.mark_dispatched("slow", ["s1".to_string()]).await;

        for round in 0..10 {
            let batch = [format!("f{}a", round), format!("f{}b", round)];
            tracker.mark_dispatched("fast", batch).await;
        }

        assert!(tracker.contains("slow", "s1").await);
        assert!(tracker.filter_new("slow", vec![submission("s1")]).await.is_empty());
        assert_eq!(tracker.len().await, 5);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(SeenTracker::new(0).capacity(), 1);
    }
}
