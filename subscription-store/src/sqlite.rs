use async_trait::async_trait;
use chrono::Utc;
use feed_core::{
    normalize_subreddit, ChannelId, CoreError, Filter, GuildId, StoreError, Subscription,
    SubscriptionError, SubscriptionStore, SubscriptionTable,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

type SubscriptionRow = (i64, String, i64, Option<String>, Option<String>);

/// Subscription table persisted in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteSubscriptionStore {
    pool: SqlitePool,
}

impl SqliteSubscriptionStore {
    /// Opens (creating if missing) the database at `url` and applies migrations.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::ConnectionFailed {
                reason: format!("{}: {}", url, e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                reason: format!("{}: {}", url, e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Subscription store ready at {}", url);
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed {
                migration: e.to_string(),
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_subscription(row: SubscriptionRow) -> Result<(GuildId, Subscription), StoreError> {
    let (guild_id, subreddit, channel_id, flair, title_contains) = row;

    let filter = if flair.is_some() || title_contains.is_some() {
        Some(
            Filter::new(flair, title_contains).map_err(|e| StoreError::CorruptRow {
                details: e.to_string(),
            })?,
        )
    } else {
        None
    };

    Ok((
        GuildId(guild_id as u64),
        Subscription {
            subreddit,
            channel: ChannelId(channel_id as u64),
            filter,
        },
    ))
}

#[async_trait]
impl SubscriptionStore for SqliteSubscriptionStore {
    async fn subscribe(&self, guild: GuildId, subscription: Subscription) -> Result<(), CoreError> {
        let (flair, title_contains) = match &subscription.filter {
            Some(filter) => (filter.flair.clone(), filter.title_contains.clone()),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (guild_id, subreddit, channel_id, flair, title_contains, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id, subreddit, channel_id) DO NOTHING
            "#,
        )
        .bind(guild.0 as i64)
        .bind(&subscription.subreddit)
        .bind(subscription.channel.0 as i64)
        .bind(flair)
        .bind(title_contains)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sql)?;

        if result.rows_affected() == 0 {
            return Err(SubscriptionError::DuplicateSubscription {
                subreddit: subscription.subreddit,
                channel: subscription.channel,
            }
            .into());
        }

        debug!(
            "Guild {} subscribed {} to r/{}",
            guild, subscription.channel, subscription.subreddit
        );
        Ok(())
    }

    async fn unsubscribe(
        &self,
        guild: GuildId,
        subreddit: &str,
        channel: ChannelId,
    ) -> Result<Subscription, CoreError> {
        let subreddit = normalize_subreddit(subreddit)?;

        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            DELETE FROM subscriptions
            WHERE guild_id = ? AND subreddit = ? AND channel_id = ?
            RETURNING guild_id, subreddit, channel_id, flair, title_contains
            "#,
        )
        .bind(guild.0 as i64)
        .bind(&subreddit)
        .bind(channel.0 as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Sql)?;

        match row {
            Some(row) => Ok(row_to_subscription(row)?.1),
            None => Err(SubscriptionError::SubscriptionNotFound { subreddit, channel }.into()),
        }
    }

    async fn guild_subscriptions(&self, guild: GuildId) -> Result<Vec<Subscription>, CoreError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT guild_id, subreddit, channel_id, flair, title_contains
            FROM subscriptions
            WHERE guild_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(guild.0 as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sql)?;

        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            subscriptions.push(row_to_subscription(row)?.1);
        }
        Ok(subscriptions)
    }

    async fn all_subscriptions(&self) -> Result<SubscriptionTable, CoreError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT guild_id, subreddit, channel_id, flair, title_contains
            FROM subscriptions
            ORDER BY guild_id, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sql)?;

        let mut table = SubscriptionTable::new();
        for row in rows {
            let (guild, subscription) = row_to_subscription(row)?;
            table.entry(guild).or_default().push(subscription);
        }
        Ok(table)
    }
}
