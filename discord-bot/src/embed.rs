//! Embeds sent by the bot, kept as plain data until they are handed to
//! serenity.

use feed_core::{Comic, Submission, Subscription};
use serenity::all::Timestamp;
use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter};

pub const TITLE_LIMIT: usize = 256;
pub const DESCRIPTION_LIMIT: usize = 4096;
pub const FIELD_VALUE_LIMIT: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub colour: Option<u32>,
    /// Unix seconds.
    pub timestamp: Option<i64>,
    pub author: Option<String>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    pub fields: Vec<(String, String, bool)>,
    pub footer: Option<String>,
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an
/// ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn submission_embed(submission: &Submission, colour: u32) -> MessageEmbed {
    let description = if submission.text.trim().is_empty() {
        None
    } else {
        Some(truncate(&submission.text, DESCRIPTION_LIMIT))
    };

    MessageEmbed {
        title: Some(truncate(&submission.title, TITLE_LIMIT)),
        description,
        url: submission.permalink.clone(),
        colour: Some(colour),
        timestamp: Some(submission.timestamp.timestamp()),
        author: Some(format!("u/{}", submission.author)),
        thumbnail: submission.preview.clone(),
        footer: Some(format!("r/{}", submission.subreddit)),
        ..MessageEmbed::default()
    }
}

pub fn comic_embed(comic: &Comic, colour: u32) -> MessageEmbed {
    let mut fields = vec![
        ("Comic Title".to_string(), comic.safe_title.clone(), true),
        ("Publish Date".to_string(), comic.publish_date(), true),
    ];
    if !comic.alt.trim().is_empty() {
        fields.push((
            "Comic Alt Text".to_string(),
            truncate(&comic.alt, FIELD_VALUE_LIMIT),
            false,
        ));
    }

    MessageEmbed {
        title: Some(format!("xkcd Comic: #{}", comic.num)),
        colour: Some(colour),
        image: Some(comic.img.clone()),
        fields,
        ..MessageEmbed::default()
    }
}

pub fn error_embed(message: &str, colour: u32) -> MessageEmbed {
    MessageEmbed {
        title: Some("Error".to_string()),
        description: Some(truncate(message, DESCRIPTION_LIMIT)),
        colour: Some(colour),
        ..MessageEmbed::default()
    }
}

pub fn success_embed(title: &str, description: String, colour: u32) -> MessageEmbed {
    MessageEmbed {
        title: Some(title.to_string()),
        description: Some(truncate(&description, DESCRIPTION_LIMIT)),
        colour: Some(colour),
        ..MessageEmbed::default()
    }
}

/// `<#channel> **-** r/subreddit`, plus the filter when there is one.
pub fn feed_line(subscription: &Subscription) -> String {
    let mut line = format!("<#{}> **-** r/{}", subscription.channel, subscription.subreddit);
    if let Some(filter) = &subscription.filter {
        if let Some(flair) = &filter.flair {
            line.push_str(&format!(" flair=`{}`", flair));
        }
        if let Some(title) = &filter.title_contains {
            line.push_str(&format!(" title=`{}`", title));
        }
    }
    line
}

pub fn subscription_list_embed(subscriptions: &[Subscription], colour: u32) -> MessageEmbed {
    let description = if subscriptions.is_empty() {
        "No active feeds".to_string()
    } else {
        subscriptions
            .iter()
            .map(feed_line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    MessageEmbed {
        title: Some("Reddit feeds".to_string()),
        description: Some(truncate(&description, DESCRIPTION_LIMIT)),
        colour: Some(colour),
        ..MessageEmbed::default()
    }
}

impl MessageEmbed {
    pub fn to_create_embed(&self) -> CreateEmbed {
        let mut e = CreateEmbed::new();
        if let Some(ref t) = self.title {
            e = e.title(t);
        }
        if let Some(ref d) = self.description {
            e = e.description(d);
        }
        if let Some(ref u) = self.url {
            e = e.url(u);
        }
        if let Some(c) = self.colour {
            e = e.colour(c);
        }
        if let Some(ts) = self.timestamp.and_then(|s| Timestamp::from_unix_timestamp(s).ok()) {
            e = e.timestamp(ts);
        }
        if let Some(ref a) = self.author {
            e = e.author(CreateEmbedAuthor::new(a));
        }
        if let Some(ref t) = self.thumbnail {
            e = e.thumbnail(t);
        }
        if let Some(ref i) = self.image {
            e = e.image(i);
        }
        for (name, value, inline) in &self.fields {
            e = e.field(name, value, *inline);
        }
        if let Some(ref f) = self.footer {
            e = e.footer(CreateEmbedFooter::new(f));
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use feed_core::{ChannelId, Filter, REDDIT_COLOUR};

    fn submission(title: &str, text: &str) -> Submission {
        Submission {
            id: "abc".to_string(),
            title: title.to_string(),
            text: text.to_string(),
            author: "spez".to_string(),
            subreddit: "announcements".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            preview: Some("https://preview.redd.it/x.png".to_string()),
            flair: None,
            permalink: Some("https://www.reddit.com/r/announcements/comments/abc/".to_string()),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");

        let cut = truncate("abcdefghijkl", 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));

        // Multi-byte characters count once
        let cut = truncate(&"é".repeat(300), TITLE_LIMIT);
        assert_eq!(cut.chars().count(), TITLE_LIMIT);
    }

    #[test]
    fn test_submission_embed() {
        let embed = submission_embed(&submission("Hello", "Body text"), REDDIT_COLOUR);
        assert_eq!(embed.title.as_deref(), Some("Hello"));
        assert_eq!(embed.description.as_deref(), Some("Body text"));
        assert_eq!(embed.colour, Some(0xFF4500));
        assert_eq!(embed.author.as_deref(), Some("u/spez"));
        assert_eq!(embed.footer.as_deref(), Some("r/announcements"));
        assert_eq!(embed.thumbnail.as_deref(), Some("https://preview.redd.it/x.png"));
        assert_eq!(embed.timestamp, Some(1_709_280_000));
        assert!(embed.url.unwrap().ends_with("/comments/abc/"));
    }

    #[test]
    fn test_submission_embed_limits() {
        let long_title = "t".repeat(400);
        let long_text = "x".repeat(5000);
        let embed = submission_embed(&submission(&long_title, &long_text), REDDIT_COLOUR);
        assert_eq!(embed.title.unwrap().chars().count(), TITLE_LIMIT);
        assert_eq!(embed.description.unwrap().chars().count(), DESCRIPTION_LIMIT);

        let link_post = submission_embed(&submission("Link", "  "), REDDIT_COLOUR);
        assert!(link_post.description.is_none());
    }

    #[test]
    fn test_comic_embed() {
        let mut comic = Comic {
            num: 353,
            safe_title: "Python".to_string(),
            year: "2007".to_string(),
            month: "12".to_string(),
            day: "5".to_string(),
            alt: "I wrote 20 short programs in Python yesterday.".to_string(),
            img: "https://imgs.xkcd.com/comics/python.png".to_string(),
        };

        let embed = comic_embed(&comic, 0x123456);
        assert_eq!(embed.title.as_deref(), Some("xkcd Comic: #353"));
        assert_eq!(embed.fields.len(), 3);
        assert_eq!(embed.fields[1], ("Publish Date".to_string(), "2007-12-5".to_string(), true));
        assert_eq!(embed.fields[2].0, "Comic Alt Text");
        assert_eq!(embed.image.as_deref(), Some("https://imgs.xkcd.com/comics/python.png"));

        comic.alt.clear();
        assert_eq!(comic_embed(&comic, 0x123456).fields.len(), 2);
    }

    #[test]
    fn test_feed_lines() {
        let plain = Subscription::new("news", ChannelId(42)).unwrap();
        assert_eq!(feed_line(&plain), "<#42> **-** r/news");

        let filter = Filter::new(Some("AMA".to_string()), Some("Ask".to_string())).unwrap();
        let filtered = Subscription::filtered("news", ChannelId(42), filter).unwrap();
        assert_eq!(feed_line(&filtered), "<#42> **-** r/news flair=`AMA` title=`ask`");

        let list = subscription_list_embed(&[plain, filtered], 0);
        assert_eq!(list.description.unwrap().lines().count(), 2);
        assert_eq!(
            subscription_list_embed(&[], 0).description.as_deref(),
            Some("No active feeds")
        );
    }

    #[test]
    fn test_error_embed() {
        let embed = error_embed("Comic not found", 0);
        assert_eq!(embed.title.as_deref(), Some("Error"));
        assert_eq!(embed.description.as_deref(), Some("Comic not found"));
    }
}
