use std::env;
use std::sync::Arc;

use poise::serenity_prelude::{self as serenity};
use serenity::{GatewayIntents, GuildId};
use tokio::sync::mpsc;
use tracing::info;

use warden::config::{BotConfig, CONFIG_FILE};
use warden::moderation::render::Identity;
use warden::moderation::store::SANCTIONS_FILE;
use warden::moderation::{SanctionScheduler, SanctionStore, SerenityGateway};
use warden::verification::{VERIFICATION_FILE, VerificationStore};
use warden::{Data, Error, commands, handlers, logging};

/// How often the reversal task re-checks pending sanctions
const REVERSAL_CHECK_INTERVAL_SECONDS: u64 = 30;

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    // Load environment variables
    let token = env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN must be set");

    // Load static configuration; a missing required key fails here, not
    // mid-action
    let config = Arc::new(BotConfig::load(CONFIG_FILE).await?);

    // Load persisted state
    let verification = VerificationStore::load(VERIFICATION_FILE).await;
    let store = SanctionStore::load(SANCTIONS_FILE).await;
    info!("Loaded {} sanction record(s)", store.len());

    let (tx, rx) = mpsc::channel(64);
    let sanctions = SanctionScheduler::new(store, tx);
    let data = Data::new(Arc::clone(&config), verification, sanctions);

    // Configure the Poise framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ban(),
                commands::kick(),
                commands::warn(),
                commands::mute(),
                commands::tempmute(),
                commands::unmute(),
                commands::verify_toggle(),
                commands::addroleall(),
                commands::admin(),
                commands::info(),
                commands::role(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup({
            let data = data.clone();
            move |ctx, ready, framework| {
                Box::pin(async move {
                    // Guild-scoped registration is idempotent on restart
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        GuildId::new(data.config.guild_id),
                    )
                    .await?;
                    logging::log_console("Slash commands registered".to_string());

                    // Start the reversal task; overdue records loaded from
                    // disk fire on its first check
                    let gateway = Arc::new(SerenityGateway::new(ctx.http.clone()));
                    let identity = Identity {
                        bot_name: ready.user.name.to_string(),
                        bot_avatar_url: ready.user.avatar_url(),
                        guild_name: None,
                    };
                    data.sanctions.clone().spawn(
                        gateway,
                        Arc::clone(&data.config),
                        identity,
                        rx,
                        REVERSAL_CHECK_INTERVAL_SECONDS,
                    );

                    Ok(data)
                })
            }
        })
        .build();

    // Configure the Serenity client
    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler { data: data.clone() })
        .framework(framework)
        .await
        .expect("Failed to create client");

    info!("Starting bot...");
    // Start the bot
    if let Err(err) = client.start().await {
        eprintln!("Error starting the bot: {}", err);
    }

    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {}", err);
    }
}
