//! Settings read from the environment.

use roomscout_amadeus::{AmadeusConfig, AmadeusError};
use roomscout_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

use crate::Toolset;

/// Errors found while reading the settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to something that cannot be used.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Name of the variable.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Amadeus credentials are only partially set.
    #[error(transparent)]
    Amadeus(#[from] AmadeusError),
}

/// Everything the CLI needs to start a session.
#[derive(Debug)]
pub struct AppConfig {
    /// OpenAI-compatible endpoint settings.
    pub openai: OpenAIConfig,
    /// Amadeus credentials, if any are set.
    pub amadeus: Option<AmadeusConfig>,
    /// Tools to offer the model.
    pub toolset: Toolset,
    /// Tool rounds per turn, when overridden.
    pub max_iterations: Option<usize>,
    /// User turns sent to the model, when limited.
    pub context_turns: Option<usize>,
}

impl AppConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`], with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY")
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut openai = OpenAIConfigBuilder::with_api_key(api_key);
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            openai = openai.with_model(model);
        }

        let toolset = match get("ROOMSCOUT_TOOLSET") {
            Some(value) => {
                value.parse().map_err(|err| ConfigError::Invalid {
                    key: "ROOMSCOUT_TOOLSET",
                    reason: format!("{err}"),
                })?
            }
            None => Toolset::default(),
        };

        let amadeus = if get("AMADEUS_API_KEY").is_some()
            || get("AMADEUS_API_SECRET").is_some()
        {
            Some(AmadeusConfig::from_lookup(&lookup)?)
        } else {
            None
        };

        Ok(Self {
            openai: openai.build(),
            amadeus,
            toolset,
            max_iterations: parse_count(&get, "ROOMSCOUT_MAX_ITERATIONS")?,
            context_turns: parse_count(&get, "ROOMSCOUT_CONTEXT_TURNS")?,
        })
    }
}

fn parse_count(
    get: impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<usize>, ConfigError> {
    let Some(value) = get(key) else {
        return Ok(None);
    };
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            reason: "must be at least 1".to_owned(),
        }),
        Ok(count) => Ok(Some(count)),
        Err(err) => Err(ConfigError::Invalid {
            key,
            reason: err.to_string(),
        }),
    }
}
