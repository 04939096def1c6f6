use feed_core::CoreError;

/// Errors produced while running the Discord bot.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("serenity error: {0}")]
    Discord(#[from] serenity::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("no bot token configured")]
    NoToken,
}
