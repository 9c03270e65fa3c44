use crate::components::ComponentManager;
use crate::config::Config;
use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;

// Export submodules
pub mod sync;
pub mod util;

/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: Arc<RwLock<Config>>,
    pub component_manager: Option<Arc<ComponentManager>>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            config,
            component_manager: None,
        }
    }

    /// Set the component manager
    pub fn with_component_manager(mut self, component_manager: Arc<ComponentManager>) -> Self {
        self.component_manager = Some(component_manager);
        self
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

/// All application commands
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![
        // Utility commands
        util::ping(),
        // Event sync commands
        sync::sync(),
    ]
}

/// Green embed for successful replies
pub fn create_success_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(0x57F287)
}

/// Red embed for error replies
pub fn create_error_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(0xED4245)
}
