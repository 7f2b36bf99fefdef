pub mod discord_webhook;

pub use discord_webhook::{
    calculate_additional_metrics, format_rank_change_text, AdditionalMetrics, DiscordWebhook,
    NotifyError,
};
