use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::message::SortKey;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Sender label for outgoing messages
    #[arg(long, env = "CHAT_AUTHOR")]
    pub author: Option<String>,

    /// Ordering column for the message list (id | created_at)
    #[arg(long, env = "CHAT_SORT_KEY")]
    pub sort_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Sender label. Empty falls back to the view's placeholder.
    pub author: String,
    /// "id" or "created_at"; anything else falls back to "id".
    pub sort_key: String,
    /// NOTIFY channel carrying row-change payloads.
    pub channel: String,
}

impl ChatConfig {
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::parse(&self.sort_key)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest: defaults → config file → `ROOMSYNC_`
    /// env vars (`__` separator) → CLI flags (which also read their own
    /// env vars via clap).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("database.url", "postgres://localhost:5432/roomsync")?
            .set_default("database.max_connections", 5)?
            .set_default("chat.author", "anonymous")?
            .set_default("chat.sort_key", "id")?
            .set_default("chat.channel", "messages_changes")?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config.yaml"));
        }

        builder = builder.add_source(
            Environment::with_prefix("ROOMSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = cli.database_url {
            builder = builder.set_override("database.url", url)?;
        }
        if let Some(author) = cli.author {
            builder = builder.set_override("chat.author", author)?;
        }
        if let Some(sort_key) = cli.sort_key {
            builder = builder.set_override("chat.sort_key", sort_key)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
