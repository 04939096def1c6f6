use crate::channels::ChannelDirectory;
use crate::embed::{self, MessageEmbed};
use feed_core::{
    normalize_subreddit, ChannelId, CoreError, ErrorExt, FeedError, Filter, GuildId,
    Subscription, SubscriptionError, SubscriptionStore,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use xkcd_client::ComicClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe {
        subreddit: String,
        channel: ChannelId,
        filter: Option<Filter>,
    },
    Unsubscribe {
        subreddit: String,
        channel: ChannelId,
    },
    List,
    Comic {
        number: Option<u32>,
    },
    Help,
}

const USAGE: &str = "`reddit subscribe <subreddit> <#channel> [flair=<flair>] [title=<text>]`\n\
`reddit unsubscribe <subreddit> <#channel>`\n\
`reddit list`\n\
`xkcd [number]`";

/// Parses a message into a command. Returns `None` for messages that are not
/// addressed to the bot.
pub fn parse_command(prefix: &str, content: &str) -> Option<Result<Command, CoreError>> {
    let rest = content.trim().strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();

    match tokens.next()?.to_ascii_lowercase().as_str() {
        "reddit" => Some(parse_reddit(tokens.collect())),
        "xkcd" => Some(parse_comic(tokens.next())),
        _ => None,
    }
}

fn parse_reddit(args: Vec<&str>) -> Result<Command, CoreError> {
    let Some((sub, args)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match sub.to_ascii_lowercase().as_str() {
        "subscribe" => {
            let (subreddit, channel, options) = parse_target(args)?;
            let filter = parse_filter(options)?;
            Ok(Command::Subscribe {
                subreddit,
                channel,
                filter,
            })
        }
        "unsubscribe" => {
            let (subreddit, channel, extra) = parse_target(args)?;
            if let Some(arg) = extra.first() {
                return Err(CoreError::InvalidInput {
                    message: format!("unexpected argument '{}'", arg),
                });
            }
            Ok(Command::Unsubscribe { subreddit, channel })
        }
        "list" => Ok(Command::List),
        _ => Ok(Command::Help),
    }
}

fn parse_target<'a>(args: &'a [&'a str]) -> Result<(String, ChannelId, &'a [&'a str]), CoreError> {
    let subreddit = args.first().ok_or(SubscriptionError::InvalidSubreddit {
        name: String::new(),
    })?;
    let subreddit = normalize_subreddit(subreddit)?;

    let channel = args.get(1).ok_or(SubscriptionError::InvalidChannel {
        value: String::new(),
    })?;
    let channel = parse_channel(channel)?;

    Ok((subreddit, channel, args.get(2..).unwrap_or(&[])))
}

/// Accepts a `<#id>` mention or a bare id.
pub fn parse_channel(value: &str) -> Result<ChannelId, SubscriptionError> {
    let digits = value
        .strip_prefix("<#")
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value);

    match digits.parse::<u64>() {
        Ok(id) if id > 0 => Ok(ChannelId(id)),
        _ => Err(SubscriptionError::InvalidChannel {
            value: value.to_string(),
        }),
    }
}

/// `flair=<flair>` and `title=<text>`; a value runs until the next option.
fn parse_filter(options: &[&str]) -> Result<Option<Filter>, SubscriptionError> {
    if options.is_empty() {
        return Ok(None);
    }

    enum Slot {
        Flair,
        Title,
    }

    let mut flair: Option<String> = None;
    let mut title: Option<String> = None;
    let mut current: Option<Slot> = None;

    for token in options {
        if let Some(value) = token.strip_prefix("flair=") {
            flair = Some(value.to_string());
            current = Some(Slot::Flair);
        } else if let Some(value) = token.strip_prefix("title=") {
            title = Some(value.to_string());
            current = Some(Slot::Title);
        } else {
            let slot = match current {
                Some(Slot::Flair) => flair.as_mut(),
                Some(Slot::Title) => title.as_mut(),
                None => None,
            };
            let Some(value) = slot else {
                return Err(SubscriptionError::InvalidFilter {
                    reason: format!("unexpected argument '{}'", token),
                });
            };
            value.push(' ');
            value.push_str(token);
        }
    }

    Filter::new(flair, title).map(Some)
}

fn parse_comic(arg: Option<&str>) -> Result<Command, CoreError> {
    match arg {
        None => Ok(Command::Comic { number: None }),
        Some(value) => match value.parse::<u32>() {
            // xkcd numbers start at 1; 0 asks for the latest
            Ok(0) => Ok(Command::Comic { number: None }),
            Ok(n) => Ok(Command::Comic { number: Some(n) }),
            Err(_) => Err(CoreError::InvalidInput {
                message: format!("'{}' is not a comic number", value),
            }),
        },
    }
}

/// Runs commands against the subscription store and the comic archive.
pub struct CommandExecutor {
    store: Arc<dyn SubscriptionStore>,
    channels: Arc<dyn ChannelDirectory>,
    comics: ComicClient,
    colour: u32,
}

impl CommandExecutor {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        channels: Arc<dyn ChannelDirectory>,
        comics: ComicClient,
        colour: u32,
    ) -> Self {
        Self {
            store,
            channels,
            comics,
            colour,
        }
    }

    /// Builds the reply for `command`. Failures become error embeds.
    pub async fn execute(&self, guild: Option<GuildId>, command: Command) -> MessageEmbed {
        match self.run(guild, command).await {
            Ok(reply) => reply,
            Err(e) => {
                e.log_warn();
                embed::error_embed(&e.user_friendly_message(), self.colour)
            }
        }
    }

    pub fn error_reply(&self, error: &CoreError) -> MessageEmbed {
        embed::error_embed(&error.user_friendly_message(), self.colour)
    }

    async fn run(&self, guild: Option<GuildId>, command: Command) -> Result<MessageEmbed, CoreError> {
        match command {
            Command::Subscribe {
                subreddit,
                channel,
                filter,
            } => {
                let guild = require_guild(guild)?;
                self.require_guild_channel(guild, channel).await?;
                let subscription = match filter {
                    Some(filter) => Subscription::filtered(&subreddit, channel, filter)?,
                    None => Subscription::new(&subreddit, channel)?,
                };
                let line = embed::feed_line(&subscription);
                self.store.subscribe(guild, subscription).await?;
                info!("Guild {} subscribed {} to r/{}", guild, channel, subreddit);
                Ok(embed::success_embed("Subscribed to feed", line, self.colour))
            }
            Command::Unsubscribe { subreddit, channel } => {
                let guild = require_guild(guild)?;
                let removed = self.store.unsubscribe(guild, &subreddit, channel).await?;
                info!("Guild {} unsubscribed {} from r/{}", guild, channel, subreddit);
                Ok(embed::success_embed(
                    "Unsubscribed from feed",
                    embed::feed_line(&removed),
                    self.colour,
                ))
            }
            Command::List => {
                let guild = require_guild(guild)?;
                let subscriptions = self.store.guild_subscriptions(guild).await?;
                Ok(embed::subscription_list_embed(&subscriptions, self.colour))
            }
            Command::Comic { number } => match self.comics.fetch(number).await {
                Ok(comic) => Ok(embed::comic_embed(&comic, self.colour)),
                Err(FeedError::NotFound { .. }) | Err(FeedError::HttpStatus { .. }) => {
                    debug!("Comic {:?} not found", number);
                    Ok(embed::error_embed("Comic not found", self.colour))
                }
                Err(e) => Err(e.into()),
            },
            Command::Help => Ok(MessageEmbed {
                title: Some("Commands".to_string()),
                description: Some(USAGE.to_string()),
                colour: Some(self.colour),
                ..MessageEmbed::default()
            }),
        }
    }

    /// Feeds may only target channels of the guild that subscribes them.
    async fn require_guild_channel(&self, guild: GuildId, channel: ChannelId) -> Result<(), CoreError> {
        match self.channels.guild_of(channel).await? {
            Some(owner) if owner == guild => Ok(()),
            owner => {
                warn!(
                    "Guild {} tried to subscribe channel {} owned by {:?}",
                    guild, channel, owner
                );
                Err(SubscriptionError::InvalidChannel {
                    value: format!("<#{}>", channel.0),
                }
                .into())
            }
        }
    }
}

fn require_guild(guild: Option<GuildId>) -> Result<GuildId, CoreError> {
    guild.ok_or_else(|| CoreError::InvalidInput {
        message: "feeds can only be managed from inside a server".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use feed_core::XkcdConfig;
    use std::collections::HashMap;
    use subscription_store::MemorySubscriptionStore;

    /// Channels 1..=9 belong to guild 1, 10..=19 to guild 3, 50 to guild 2.
    struct FixedChannels(HashMap<ChannelId, GuildId>);

    impl FixedChannels {
        fn new() -> Self {
            let mut owners = HashMap::new();
            for id in 1..=9 {
                owners.insert(ChannelId(id), GuildId(1));
            }
            for id in 10..=19 {
                owners.insert(ChannelId(id), GuildId(3));
            }
            owners.insert(ChannelId(50), GuildId(2));
            Self(owners)
        }
    }

    #[async_trait]
    impl ChannelDirectory for FixedChannels {
        async fn guild_of(&self, channel: ChannelId) -> Result<Option<GuildId>, CoreError> {
            Ok(self.0.get(&channel).copied())
        }
    }

    fn parse(content: &str) -> Result<Command, CoreError> {
        parse_command("!", content).expect("addressed to the bot")
    }

    #[test]
    fn test_ignores_other_messages() {
        assert!(parse_command("!", "hello there").is_none());
        assert!(parse_command("!", "!play music").is_none());
        assert!(parse_command("!", "!").is_none());
        assert!(parse_command("?", "!reddit list").is_none());
    }

    #[test]
    fn test_parse_subscribe() {
        assert_eq!(
            parse("!reddit subscribe r/Rust <#1234>").unwrap(),
            Command::Subscribe {
                subreddit: "rust".to_string(),
                channel: ChannelId(1234),
                filter: None,
            }
        );
    }

    #[test]
    fn test_parse_subscribe_with_filter() {
        let command = parse("!reddit subscribe news <#1> flair=AMA title=ask me anything").unwrap();
        let expected = Filter::new(Some("AMA".to_string()), Some("ask me anything".to_string()))
            .unwrap();
        assert_eq!(
            command,
            Command::Subscribe {
                subreddit: "news".to_string(),
                channel: ChannelId(1),
                filter: Some(expected),
            }
        );

        let command = parse("!reddit subscribe news 99 title=Weekly Thread").unwrap();
        match command {
            Command::Subscribe { filter: Some(filter), channel, .. } => {
                assert_eq!(channel, ChannelId(99));
                assert!(filter.flair.is_none());
                assert_eq!(filter.title_contains.as_deref(), Some("weekly thread"));
            }
            other => panic!("Expected a filtered subscribe, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("!reddit subscribe"),
            Err(CoreError::Subscription(SubscriptionError::InvalidSubreddit { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe news"),
            Err(CoreError::Subscription(SubscriptionError::InvalidChannel { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe news #general"),
            Err(CoreError::Subscription(SubscriptionError::InvalidChannel { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe news <#0>"),
            Err(CoreError::Subscription(SubscriptionError::InvalidChannel { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe not-a-sub <#1>"),
            Err(CoreError::Subscription(SubscriptionError::InvalidSubreddit { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe news <#1> colour=red"),
            Err(CoreError::Subscription(SubscriptionError::InvalidFilter { .. }))
        ));
        assert!(matches!(
            parse("!reddit subscribe news <#1> flair= title="),
            Err(CoreError::Subscription(SubscriptionError::InvalidFilter { .. }))
        ));
        assert!(matches!(
            parse("!reddit unsubscribe news <#1> extra"),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse("!reddit list").unwrap(), Command::List);
        assert_eq!(parse("!reddit").unwrap(), Command::Help);
        assert_eq!(parse("!reddit frobnicate").unwrap(), Command::Help);
        assert_eq!(
            parse("!reddit unsubscribe News <#5>").unwrap(),
            Command::Unsubscribe {
                subreddit: "news".to_string(),
                channel: ChannelId(5),
            }
        );
        assert_eq!(parse("!xkcd").unwrap(), Command::Comic { number: None });
        assert_eq!(parse("!xkcd 0").unwrap(), Command::Comic { number: None });
        assert_eq!(parse("!XKCD 353").unwrap(), Command::Comic { number: Some(353) });
        assert!(matches!(parse("!xkcd latest"), Err(CoreError::InvalidInput { .. })));
    }

    fn executor() -> (CommandExecutor, Arc<MemorySubscriptionStore>) {
        let store = Arc::new(MemorySubscriptionStore::new());
        let comics = ComicClient::new(&XkcdConfig::default()).unwrap();
        let executor = CommandExecutor::new(
            store.clone(),
            Arc::new(FixedChannels::new()),
            comics,
            0xABCDEF,
        );
        (executor, store)
    }

    #[tokio::test]
    async fn test_subscribe_and_duplicate() {
        let (executor, store) = executor();
        let guild = Some(GuildId(1));

        let reply = executor.execute(guild, parse("!reddit subscribe news <#7>").unwrap()).await;
        assert_eq!(reply.title.as_deref(), Some("Subscribed to feed"));
        assert_eq!(reply.description.as_deref(), Some("<#7> **-** r/news"));

        let reply = executor
            .execute(guild, parse("!reddit subscribe news <#7> flair=AMA").unwrap())
            .await;
        assert_eq!(reply.title.as_deref(), Some("Error"));
        assert_eq!(
            reply.description.as_deref(),
            Some("That channel is already subscribed to that subreddit")
        );
        assert_eq!(store.guild_subscriptions(GuildId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_missing_feed() {
        let (executor, _store) = executor();
        let reply = executor
            .execute(Some(GuildId(1)), parse("!reddit unsubscribe news <#7>").unwrap())
            .await;
        assert_eq!(
            reply.description.as_deref(),
            Some("There is no active feed for that subreddit")
        );
    }

    #[tokio::test]
    async fn test_list_and_unsubscribe() {
        let (executor, store) = executor();
        let guild = Some(GuildId(3));
        executor.execute(guild, parse("!reddit subscribe rust <#11>").unwrap()).await;
        executor.execute(guild, parse("!reddit subscribe news <#12>").unwrap()).await;

        let list = executor.execute(guild, Command::List).await;
        assert_eq!(
            list.description.as_deref(),
            Some("<#11> **-** r/rust\n<#12> **-** r/news")
        );

        let reply = executor
            .execute(guild, parse("!reddit unsubscribe Rust <#11>").unwrap())
            .await;
        assert_eq!(reply.title.as_deref(), Some("Unsubscribed from feed"));
        assert_eq!(store.guild_subscriptions(GuildId(3)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_feed_commands_need_a_guild() {
        let (executor, store) = executor();
        let reply = executor.execute(None, parse("!reddit subscribe news <#7>").unwrap()).await;
        assert_eq!(reply.title.as_deref(), Some("Error"));
        assert!(store.all_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_channel_of_another_guild_is_rejected() {
        let (executor, store) = executor();

        let reply = executor
            .execute(Some(GuildId(1)), parse("!reddit subscribe news <#50>").unwrap())
            .await;
        assert_eq!(reply.title.as_deref(), Some("Error"));

        let reply = executor
            .execute(Some(GuildId(1)), parse("!reddit subscribe news <#77>").unwrap())
            .await;
        assert_eq!(reply.title.as_deref(), Some("Error"));
        assert!(store.all_subscriptions().await.unwrap().is_empty());

        let reply = executor
            .execute(Some(GuildId(2)), parse("!reddit subscribe news <#50>").unwrap())
            .await;
        assert_eq!(reply.title.as_deref(), Some("Subscribed to feed"));
    }
}
