mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{HubSettings, LogSettings, MAX_WAIT_SECS, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `ROOMCAST_HUB__PONG_WAIT_SECS=30`.
pub const ENV_PREFIX: &str = "ROOMCAST";

/// Loads the configuration from `.env`, the default file and environment variables.
///
/// Values that no source provides fall back to `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}
