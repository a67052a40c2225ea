use std::sync::Arc;

use anyhow::Context as _;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info};

use zkouska_bot::AppState;
use zkouska_bot::config::Settings;
use zkouska_bot::handler::Handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the real environment.
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zkouska_bot=info,serenity=warn".into()),
        )
        .init();

    let settings = Settings::from_env().context("loading configuration")?;
    info!(
        source = %settings.zkouska.source_channel_id,
        destination = %settings.zkouska.destination_channel_id,
        "configuration loaded"
    );

    let app_state = Arc::new(AppState::new(settings.zkouska));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = Client::builder(&settings.discord_token, intents)
        .event_handler(Handler)
        .await
        .context("creating the Discord client")?;

    {
        let mut data = client.data.write().await;
        data.insert::<AppState>(app_state);
    }

    if let Err(why) = client.start().await {
        error!(error = ?why, "client error");
        return Err(why.into());
    }
    Ok(())
}
