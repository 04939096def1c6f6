use anyhow::Context as _;
use background_service::{BackgroundService, Dispatcher, PollLoop, SeenTracker};
use discord_bot::{CommandExecutor, DiscordChannels, DiscordSink, Handler};
use feed_core::{AppConfig, ErrorExt};
use reddit_client::RedditClient;
use serenity::http::Http;
use std::sync::Arc;
use subscription_store::SqliteSubscriptionStore;
use tracing_subscriber::EnvFilter;
use xkcd_client::ComicClient;

const DEFAULT_LOG_FILTER: &str = "redditfeed=info,background_service=info,reddit_client=info,discord_bot=info,subscription_store=info,xkcd_client=info,serenity=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Redditfeed - Reddit feeds for Discord");

    let config = AppConfig::load().map_err(|e| {
        e.log_error();
        anyhow::anyhow!(e.user_friendly_message())
    })?;
    let token = config
        .discord
        .token
        .clone()
        .context("Discord token missing after validation")?;

    let store = Arc::new(
        SqliteSubscriptionStore::connect(&config.storage.database_url)
            .await
            .context("opening subscription store")?,
    );
    let reddit = Arc::new(RedditClient::new(&config.reddit).context("building Reddit client")?);
    let comics = ComicClient::new(&config.xkcd).context("building xkcd client")?;

    // REST client for feed delivery, independent of the gateway connection
    let http = Arc::new(Http::new(&token));
    let sink = Arc::new(DiscordSink::new(http.clone(), config.discord.embed_colour));
    let channels = Arc::new(DiscordChannels::new(http));

    let poll_loop = Arc::new(
        PollLoop::new(
            reddit,
            store.clone(),
            Arc::new(SeenTracker::new(config.poll.seen_capacity)),
            Dispatcher::from_config(sink, &config.poll),
            config.reddit.max_concurrent_fetches,
        )
        .with_priming(config.poll.prime_new_subreddits),
    );
    let service = Arc::new(BackgroundService::new(poll_loop, config.poll.interval()));

    let handler = Handler::new(
        service.clone(),
        CommandExecutor::new(store.clone(), channels, comics, config.discord.embed_colour),
        config.discord.command_prefix.clone(),
    );
    let mut client = discord_bot::build_client(&config.discord, handler)
        .await
        .context("building Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        tracing::info!("Ctrl-C received, shutting down");
        shard_manager.shutdown_all().await;
    });

    tracing::info!("Starting Discord bot...");
    let result = client.start().await;

    if let Err(e) = service.stop().await {
        e.log_error();
    }
    store.close().await;

    result.context("Discord client error")?;
    tracing::info!("Redditfeed stopped");
    Ok(())
}
