use crate::error::SubscriptionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Guild handle owned by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub u64);

/// Channel handle owned by the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post from a subreddit listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub text: String,
    pub author: String,
    pub subreddit: String,
    pub timestamp: DateTime<Utc>,
    pub preview: Option<String>,
    pub flair: Option<String>,
    pub permalink: Option<String>,
}

/// Narrows a subscription to posts with a given flair and/or title text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub flair: Option<String>,
    pub title_contains: Option<String>,
}

impl Filter {
    pub fn new(
        flair: Option<String>,
        title_contains: Option<String>,
    ) -> Result<Self, SubscriptionError> {
        let flair = flair.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        let title_contains = title_contains
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        if flair.is_none() && title_contains.is_none() {
            return Err(SubscriptionError::InvalidFilter {
                reason: "a filter needs a flair or a title substring".to_string(),
            });
        }

        Ok(Self {
            flair,
            title_contains,
        })
    }

    /// Both predicates must hold. A post without flair never satisfies a
    /// flair requirement.
    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(required) = &self.flair {
            match &submission.flair {
                Some(flair) if flair == required => {}
                _ => return false,
            }
        }

        if let Some(needle) = &self.title_contains {
            if !submission.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subreddit: String,
    pub channel: ChannelId,
    pub filter: Option<Filter>,
}

impl Subscription {
    pub fn new(subreddit: &str, channel: ChannelId) -> Result<Self, SubscriptionError> {
        Ok(Self {
            subreddit: normalize_subreddit(subreddit)?,
            channel,
            filter: None,
        })
    }

    pub fn filtered(
        subreddit: &str,
        channel: ChannelId,
        filter: Filter,
    ) -> Result<Self, SubscriptionError> {
        Ok(Self {
            subreddit: normalize_subreddit(subreddit)?,
            channel,
            filter: Some(filter),
        })
    }

    /// Same (subreddit, channel) key, regardless of filter.
    pub fn same_target(&self, other: &Subscription) -> bool {
        self.subreddit == other.subreddit && self.channel == other.channel
    }

    pub fn accepts(&self, submission: &Submission) -> bool {
        match &self.filter {
            Some(filter) => filter.matches(submission),
            None => true,
        }
    }
}

/// Lowercases a subreddit name and strips an optional `r/` prefix.
///
/// Names are 2-21 characters of ASCII letters, digits and underscores.
pub fn normalize_subreddit(name: &str) -> Result<String, SubscriptionError> {
    let trimmed = name.trim();
    let trimmed = trimmed
        .strip_prefix("/r/")
        .or_else(|| trimmed.strip_prefix("r/"))
        .unwrap_or(trimmed);

    let valid = (2..=21).contains(&trimmed.len())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(SubscriptionError::InvalidSubreddit {
            name: name.to_string(),
        });
    }

    Ok(trimmed.to_ascii_lowercase())
}

/// Snapshot of every guild's subscriptions.
pub type SubscriptionTable = BTreeMap<GuildId, Vec<Subscription>>;

/// Distinct subreddit names subscribed across all guilds.
pub fn distinct_subreddits(table: &SubscriptionTable) -> BTreeSet<String> {
    table
        .values()
        .flatten()
        .map(|subscription| subscription.subreddit.clone())
        .collect()
}

/// A comic from the xkcd archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    pub num: u32,
    pub safe_title: String,
    pub year: String,
    pub month: String,
    pub day: String,
    #[serde(default)]
    pub alt: String,
    pub img: String,
}

impl Comic {
    pub fn publish_date(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(title: &str, flair: Option<&str>) -> Submission {
        Submission {
            id: "abc".to_string(),
            title: title.to_string(),
            text: String::new(),
            author: "someone".to_string(),
            subreddit: "news".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            preview: None,
            flair: flair.map(str::to_string),
            permalink: None,
        }
    }

    #[test]
    fn test_filter_requires_flair_and_title() {
        let filter = Filter::new(Some("AMA".to_string()), Some("ask".to_string())).unwrap();

        assert!(filter.matches(&post("Ask me anything", Some("AMA"))));
        assert!(!filter.matches(&post("Ask me anything", Some("Discussion"))));
        assert!(!filter.matches(&post("Today's news", Some("AMA"))));
        assert!(!filter.matches(&post("Ask me anything", None)));
    }

    #[test]
    fn test_title_only_filter_is_case_insensitive() {
        let filter = Filter::new(None, Some("RUST".to_string())).unwrap();
        assert!(filter.matches(&post("Why I like rust", None)));
        assert!(filter.matches(&post("TRUSTED sources", Some("Meta"))));
        assert!(!filter.matches(&post("Go generics", None)));
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        let result = Filter::new(Some("  ".to_string()), None);
        assert!(matches!(
            result,
            Err(SubscriptionError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_subreddit_names_are_normalized() {
        assert_eq!(normalize_subreddit("News").unwrap(), "news");
        assert_eq!(normalize_subreddit("r/AskReddit").unwrap(), "askreddit");
        assert_eq!(normalize_subreddit("/r/rust_gamedev").unwrap(), "rust_gamedev");
        assert!(normalize_subreddit("not a sub").is_err());
        assert!(normalize_subreddit("x").is_err());
    }

    #[test]
    fn test_distinct_subreddits_across_guilds() {
        let mut table = SubscriptionTable::new();
        table.insert(
            GuildId(1),
            vec![
                Subscription::new("news", ChannelId(10)).unwrap(),
                Subscription::new("rust", ChannelId(11)).unwrap(),
            ],
        );
        table.insert(
            GuildId(2),
            vec![Subscription::new("NEWS", ChannelId(20)).unwrap()],
        );

        let subreddits: Vec<String> = distinct_subreddits(&table).into_iter().collect();
        assert_eq!(subreddits, vec!["news".to_string(), "rust".to_string()]);
    }

    #[test]
    fn test_comic_publish_date() {
        let comic = Comic {
            num: 353,
            safe_title: "Python".to_string(),
            year: "2007".to_string(),
            month: "12".to_string(),
            day: "5".to_string(),
            alt: String::new(),
            img: "https://imgs.xkcd.com/comics/python.png".to_string(),
        };
        assert_eq!(comic.publish_date(), "2007-12-5");
    }
}
