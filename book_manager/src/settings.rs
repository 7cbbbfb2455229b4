use std::collections::HashMap;

use anyhow::Context;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;
const CONFIG_FILE: &str = "book_manager";
const ENV_PREFIX: &str = "BOOK_MANAGER";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Export spans to a local Jaeger agent in addition to the stdout logs
    pub jaeger_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Defaults, overridden by an optional `book_manager.toml`, overridden by
    /// `BOOK_MANAGER_*` environment variables (`BOOK_MANAGER_DATABASE_PATH`,
    /// `BOOK_MANAGER_TELEMETRY__JAEGER_ENABLED`). A bare `PORT` wins over everything
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None, std::env::var("PORT").ok())
    }

    /// `environment` replaces the process environment when given
    fn load_from(
        environment: Option<HashMap<String, String>>,
        port: Option<String>,
    ) -> anyhow::Result<Self> {
        let port = port
            .map(|port| port.trim().parse::<u16>())
            .transpose()
            .context("PORT must be a port number")?;
        Self::from_builder(
            Self::defaults()?
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true)
                        .source(environment),
                )
                .set_override_option("port", port)?,
        )
    }

    fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", DEFAULT_PORT)?
            .set_default("database_path", "books.db")?
            .set_default("telemetry.jaeger_enabled", false)?)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}
