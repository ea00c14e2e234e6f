//! 🔧 App Configuration: TOML and environment, merged into one struct.
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of. 🦆

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::config::DispatcherConfig;
use crate::update::BotIdentity;

/// 📦 Everything a host needs: where to ship records, and who "we" are.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub dispatcher: DispatcherConfig,
    pub bot: BotIdentity,
}

/// 🚀 Load the config from `BOTLYTICS_*` environment variables and, optionally, a TOML file.
///
/// 📐 Nested keys use a double underscore in the environment:
/// `BOTLYTICS_DISPATCHER__ENDPOINT`, `BOTLYTICS_BOT__ID`, and so on.
///   - `config_file_name` is None → env vars only.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Only parses. Validation (URL shape, include/exclude, zero intervals) happens when the
/// dispatcher and normalizer are built from it.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("BOTLYTICS_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (BOTLYTICS_*). \
             The file exists in our hearts, but apparently not in the shape we need.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (BOTLYTICS_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}
