#[cfg(test)]
mod tests {
    use crate::SqliteSubscriptionStore;
    use feed_core::{
        ChannelId, CoreError, Filter, GuildId, Subscription, SubscriptionError, SubscriptionStore,
    };
    use std::env;

    async fn setup_test_db() -> SqliteSubscriptionStore {
        let db_path = env::temp_dir().join(format!("test_redditfeed_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        SqliteSubscriptionStore::connect(&db_url)
            .await
            .expect("Failed to open test database")
    }

    #[tokio::test]
    async fn test_connection_and_migrations() {
        let store = setup_test_db().await;

        // Migrations are idempotent
        store.run_migrations().await.expect("Failed to rerun migrations");
        assert!(store.all_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_and_list() {
        let store = setup_test_db().await;
        let guild = GuildId(42);

        store
            .subscribe(guild, Subscription::new("news", ChannelId(1)).unwrap())
            .await
            .unwrap();
        let filter = Filter::new(Some("AMA".to_string()), Some("Ask".to_string())).unwrap();
        store
            .subscribe(
                guild,
                Subscription::filtered("rust", ChannelId(2), filter.clone()).unwrap(),
            )
            .await
            .unwrap();

        let subs = store.guild_subscriptions(guild).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].subreddit, "news");
        assert!(subs[0].filter.is_none());
        assert_eq!(subs[1].channel, ChannelId(2));
        assert_eq!(subs[1].filter.as_ref(), Some(&filter));

        assert!(store.guild_subscriptions(GuildId(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_subscription() {
        let store = setup_test_db().await;
        let guild = GuildId(1);

        store
            .subscribe(guild, Subscription::new("news", ChannelId(5)).unwrap())
            .await
            .unwrap();
        let err = store
            .subscribe(guild, Subscription::new("r/News", ChannelId(5)).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Subscription(SubscriptionError::DuplicateSubscription { .. })
        ));
        assert_eq!(store.guild_subscriptions(guild).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let store = setup_test_db().await;
        let guild = GuildId(1);

        store
            .subscribe(guild, Subscription::new("news", ChannelId(5)).unwrap())
            .await
            .unwrap();

        let err = store
            .unsubscribe(guild, "news", ChannelId(6))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Subscription(SubscriptionError::SubscriptionNotFound { .. })
        ));
        assert_eq!(store.guild_subscriptions(guild).await.unwrap().len(), 1);

        let removed = store.unsubscribe(guild, "NEWS", ChannelId(5)).await.unwrap();
        assert_eq!(removed.subreddit, "news");
        assert!(store.all_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_table_survives_reconnect() {
        let db_path = env::temp_dir().join(format!("test_redditfeed_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let store = SqliteSubscriptionStore::connect(&db_url).await.unwrap();
        store
            .subscribe(GuildId(1), Subscription::new("news", ChannelId(1)).unwrap())
            .await
            .unwrap();
        store
            .subscribe(GuildId(2), Subscription::new("rust", ChannelId(2)).unwrap())
            .await
            .unwrap();
        store.close().await;

        let reopened = SqliteSubscriptionStore::connect(&db_url).await.unwrap();
        let table = reopened.all_subscriptions().await.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[&GuildId(2)][0].subreddit, "rust");
    }
}
