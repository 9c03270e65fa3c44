use crate::commands::{create_error_embed, get_all_application_commands, CommandContext};
use crate::components::{event_sync::EventSync, ComponentManager};
use crate::config::Config;
use crate::error::{other_error, Error};
use crate::shutdown;
use poise::serenity_prelude as serenity;
use serenity::model::user::OnlineStatus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,serenity=warn,poise=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| other_error(&format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => {
            info!(
                "Syncing {} into guild {} every {} minute(s)",
                config.steam_group_url, config.guild_id, config.sync_interval_minutes
            );
            Ok(Arc::new(RwLock::new(config)))
        }
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Initialize and start the Discord bot
pub async fn start_bot(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let (token, activity) = {
        let config_read = config.read().await;
        (config_read.discord_token.clone(), config_read.activity.clone())
    };

    // Set up framework options
    let options = poise::FrameworkOptions {
        commands: get_all_application_commands(),
        on_error: |error| Box::pin(on_error(error)),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("!".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    // Scheduled events arrive with the non-privileged intents
    let intents = serenity::GatewayIntents::non_privileged();

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(EventSync::new()).await;
    let component_manager = Arc::new(component_manager);

    // Create a shared data context for commands
    let command_data = CommandContext::new(Arc::clone(&config))
        .with_component_manager(Arc::clone(&component_manager));

    // Cancelled by a termination signal or by a finished run-once pass
    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown::handle_signals(shutdown_token.clone()));

    let setup_components = Arc::clone(&component_manager);
    let setup_token = shutdown_token.clone();

    let client_result = serenity::ClientBuilder::new(token, intents)
        .framework(poise::Framework::new(options, move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} is connected!", ready.user.name);

                // Set the bot's status
                ctx.set_presence(
                    Some(serenity::ActivityData::playing(&activity)),
                    OnlineStatus::Online,
                );

                // Initialize components
                if let Err(e) = setup_components.init_all(ctx, setup_token).await {
                    error!("Failed to initialize components: {:?}", e);
                }

                // Register slash commands
                if let Err(e) =
                    poise::builtins::register_globally(ctx, &framework.options().commands).await
                {
                    error!("Failed to register slash commands: {:?}", e);
                } else {
                    info!("Slash commands registered successfully");
                }

                Ok(command_data)
            })
        }))
        .await;

    // Start the bot
    info!("Starting bot...");
    let mut client = client_result.map_err(Error::from)?;
    let shard_manager = Arc::clone(&client.shard_manager);

    // Create a separate task to handle the client
    let client_handle = tokio::spawn(async move { client.start().await.map_err(Error::from) });

    // Wait for either the client to end or a shutdown request
    let result = tokio::select! {
        result = client_handle => {
            info!("Bot process ended");
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => {
                    error!("Client task error: {:?}", e);
                    Err(other_error(&format!("Client task error: {}", e)).into())
                }
            }
        }
        _ = shutdown_token.cancelled() => {
            info!("Shutdown requested, stopping bot...");
            shard_manager.shutdown_all().await;
            Ok(())
        }
    };

    if let Err(e) = component_manager.shutdown_all().await {
        error!("Error shutting down components: {:?}", e);
    } else {
        info!("All components shut down successfully");
    }

    result
}

/// Handle errors from commands
async fn on_error(error: poise::FrameworkError<'_, CommandContext, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Error during setup: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command '{}': {:?}", ctx.command().name, error);
        }
        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
            if let Err(e) = ctx
                .send(
                    poise::CreateReply::default()
                        .embed(create_error_embed(
                            "Missing permissions",
                            "You need the Manage Events permission to run this command.",
                        ))
                        .ephemeral(true),
                )
                .await
            {
                error!("Error while sending error message: {:?}", e);
            }
        }
        error => {
            error!("Other error: {:?}", error);
        }
    }
}
