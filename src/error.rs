use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(steamsync::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Environment error: {0}")]
    #[diagnostic(code(steamsync::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(steamsync::config))]
    Config(String),

    /// Malformed time, unknown month name or missing page element
    #[error("Parse error: {0}")]
    #[diagnostic(code(steamsync::parse))]
    Parse(String),

    /// HTTP failure or timeout while talking to the source site
    #[error("Transport error: {0}")]
    #[diagnostic(code(steamsync::transport))]
    Transport(String),

    /// Discord rejected a create, edit or delete of a scheduled event
    #[error("Remote mutation error: {0}")]
    #[diagnostic(code(steamsync::remote_mutation))]
    RemoteMutation(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(steamsync::component))]
    Component(String),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(steamsync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(steamsync::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create parse errors
pub fn parse_error(message: &str) -> Error {
    Error::Parse(message.to_string())
}

/// Helper to create transport errors
pub fn transport_error(message: &str) -> Error {
    Error::Transport(message.to_string())
}

/// Helper to create remote mutation errors
pub fn remote_error(message: &str) -> Error {
    Error::RemoteMutation(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
