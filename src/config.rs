use crate::error::{config_error, env_error, BotResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Syncing Steam events";

/// Default time zone the Steam group page displays its times in
pub const DEFAULT_SOURCE_TIMEZONE: &str = "Europe/Paris";

/// Default period between two sync passes
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u64 = 30;

/// Default transport timeout for source site requests
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Longest accepted period between two sync passes (one week)
pub const MAX_SYNC_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Discord guild ID (server) whose scheduled events are managed
    pub guild_id: u64,
    /// Steam group URL, without trailing slash or `/events`
    pub steam_group_url: String,
    /// Time zone the group page displays event times in
    pub source_timezone: String,
    /// Minutes between scheduled sync passes
    pub sync_interval_minutes: u64,
    /// Run a single pass after connecting, then shut down
    pub run_once: bool,
    /// Only create or update events that start in the future
    pub forward_only: bool,
    /// Push days before today in the current month into the next month
    pub month_rollover: bool,
    /// Timeout for page, detail and image requests
    pub http_timeout_seconds: u64,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Bot activity status text
    pub activity: String,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let discord_token = env::var("DISCORD_TOKEN").map_err(|_| env_error("DISCORD_TOKEN"))?;
        let steam_group_url = env::var("STEAM_GROUP_URL").map_err(|_| env_error("STEAM_GROUP_URL"))?;

        let guild_id = env::var("DISCORD_GUILD_ID")
            .map_err(|_| env_error("DISCORD_GUILD_ID"))?
            .parse::<u64>()
            .map_err(|_| env_error("Invalid DISCORD_GUILD_ID format"))?;

        let source_timezone = env::var("SOURCE_TIMEZONE")
            .unwrap_or_else(|_| String::from(DEFAULT_SOURCE_TIMEZONE));

        let sync_interval_minutes =
            parse_var("SYNC_INTERVAL_MINUTES", DEFAULT_SYNC_INTERVAL_MINUTES)?;
        let http_timeout_seconds = parse_var("HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECONDS)?;

        let run_once = parse_flag("SYNC_RUN_ONCE", false)?;
        let forward_only = parse_flag("SYNC_FORWARD_ONLY", true)?;
        let month_rollover = parse_flag("SYNC_MONTH_ROLLOVER", true)?;

        // Bot activity status
        let activity = env::var("BOT_ACTIVITY").unwrap_or_else(|_| String::from(DEFAULT_ACTIVITY));

        // Initialize default components
        let mut components = HashMap::new();
        components.insert("event_sync".to_string(), true);

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            let file_components = toml::from_str::<HashMap<String, bool>>(&content)?;
            // Merge with defaults
            for (key, value) in file_components {
                components.insert(key, value);
            }
        }

        let config = Config {
            discord_token,
            guild_id,
            steam_group_url: normalize_group_url(&steam_group_url),
            source_timezone,
            sync_interval_minutes,
            run_once,
            forward_only,
            month_rollover,
            http_timeout_seconds,
            components,
            activity,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check values that can only be verified once everything is loaded
    pub fn validate(&self) -> BotResult<()> {
        if self.steam_group_url.is_empty() {
            return Err(config_error("STEAM_GROUP_URL must not be empty"));
        }
        // Discord ids are non-zero
        if self.guild_id == 0 {
            return Err(config_error("DISCORD_GUILD_ID must not be 0"));
        }
        if self.sync_interval_minutes == 0 {
            return Err(config_error("SYNC_INTERVAL_MINUTES must be at least 1"));
        }
        if self.sync_interval_minutes > MAX_SYNC_INTERVAL_MINUTES {
            return Err(config_error(&format!(
                "SYNC_INTERVAL_MINUTES must be at most {}",
                MAX_SYNC_INTERVAL_MINUTES
            )));
        }
        if self.http_timeout_seconds == 0 {
            return Err(config_error("HTTP_TIMEOUT_SECONDS must be at least 1"));
        }
        self.source_tz()?;
        Ok(())
    }

    /// Parsed source time zone
    pub fn source_tz(&self) -> BotResult<Tz> {
        self.source_timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown time zone: {}", self.source_timezone)))
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

/// Strip trailing slashes and a trailing `/events` segment from a group URL
pub fn normalize_group_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/events")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

/// Parse a boolean flag such as `true`, `1`, `yes` or `off`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_flag(var: &str, default: bool) -> BotResult<bool> {
    match env::var(var) {
        Ok(value) => parse_bool(&value)
            .ok_or_else(|| config_error(&format!("Invalid boolean for {}: {}", var, value))),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> BotResult<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid value for {}: {}", var, value))),
        Err(_) => Ok(default),
    }
}
