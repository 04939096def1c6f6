use feed_core::{FeedSource, RedditConfig};
use reddit_client::{ListingKind, RedditClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let subreddit = std::env::args().nth(1).unwrap_or_else(|| "news".to_string());
    let kind = match std::env::args().nth(2).as_deref() {
        Some("hot") => ListingKind::Hot,
        _ => ListingKind::New,
    };

    println!("=== Fetching r/{} ({}) ===\n", subreddit, kind.as_str());

    let client = RedditClient::new(&RedditConfig::default())?.with_listing_kind(kind);
    let url = client.api().listing_url(&subreddit, kind)?;
    println!("GET {}\n", url);

    let submissions = client.fetch(&subreddit).await?;
    for submission in &submissions {
        println!(
            "[{}] {} by u/{}{}",
            submission.timestamp.format("%Y-%m-%d %H:%M"),
            submission.title,
            submission.author,
            submission
                .flair
                .as_ref()
                .map(|f| format!(" ({})", f))
                .unwrap_or_default()
        );
    }

    println!("\n{} submissions", submissions.len());
    let status = client.api().get_rate_limit_status().await;
    println!(
        "Rate limit: {}/{} tokens, {}/{} permits",
        status.available_tokens, status.max_tokens, status.available_permits, status.max_permits
    );

    Ok(())
}
