use std::fmt::{self, Debug};

use crate::AmadeusError;

const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";

/// Credentials and endpoint of the Amadeus API.
#[derive(Clone, PartialEq, Eq)]
pub struct AmadeusConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) base_url: String,
}

impl AmadeusConfig {
    /// Creates a configuration for the test environment.
    pub fn new<S1: Into<String>, S2: Into<String>>(
        client_id: S1,
        client_secret: S2,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Points the client at another host, e.g. production.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Reads `AMADEUS_API_KEY`, `AMADEUS_API_SECRET` and the optional
    /// `AMADEUS_BASE_URL` from the process environment.
    pub fn from_env() -> Result<Self, AmadeusError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AmadeusConfig::from_env`], with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AmadeusError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(AmadeusError::MissingCredentials(key))
        };
        let config = Self::new(read("AMADEUS_API_KEY")?, read("AMADEUS_API_SECRET")?);
        Ok(match lookup("AMADEUS_BASE_URL") {
            Some(base_url) if !base_url.is_empty() => config.with_base_url(base_url),
            _ => config,
        })
    }

    /// Returns the base URL without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for AmadeusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmadeusConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
