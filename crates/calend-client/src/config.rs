//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calend/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) accept the secret
//! references described in [`crate::secret`].

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Configuration for the calend client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings, written by `calend init`.
    pub google: Option<GoogleSettings>,

    /// Target calendar settings.
    pub calendar: CalendarSettings,
}

/// Which calendar events go to, and the civil timezone used for dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar identifier.
    pub id: String,

    /// IANA timezone name.
    pub timezone: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            id: CalendarSettings::DEFAULT_ID.to_string(),
            timezone: CalendarSettings::DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl CalendarSettings {
    /// The signed-in user's main calendar.
    pub const DEFAULT_ID: &'static str = "primary";

    /// Timezone used when none is configured.
    pub const DEFAULT_TIMEZONE: &'static str = "Europe/London";

    /// Parses the configured timezone.
    pub fn tz(&self) -> ClientResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ClientError::Config(format!("invalid timezone '{}': {}", self.timezone, e))
        })
    }
}

/// Google Calendar provider settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calend")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calend")
    }

    /// Returns where OAuth tokens are stored.
    #[cfg(feature = "google")]
    pub fn token_path(&self) -> PathBuf {
        self.google
            .as_ref()
            .and_then(|g| g.token_path.clone())
            .unwrap_or_else(calend_providers::google::GoogleConfig::default_token_path)
    }
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> ClientResult<calend_providers::google::GoogleConfig> {
        use calend_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| {
            ClientError::Config(format!("invalid Google credentials: {}", e))
        })?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    /// Resolves Google OAuth credentials from the inline fields.
    ///
    /// Returns [`ClientError::NotInitialised`] when either value is missing.
    pub fn resolve_credentials(
        &self,
    ) -> ClientResult<calend_providers::google::OAuthCredentials> {
        use calend_providers::google::OAuthCredentials;

        let (Some(raw_id), Some(raw_secret)) =
            (self.client_id.as_deref(), self.client_secret.as_deref())
        else {
            return Err(ClientError::NotInitialised);
        };

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
        let client_secret = crate::secret::resolve(raw_secret).map_err(|e| {
            ClientError::Config(format!("failed to resolve client_secret: {}", e))
        })?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }
}

/// Writes the client id and secret into the `[google]` table of the file at
/// `path`, keeping everything else in the file as it was.
///
/// A missing `[calendar]` table is added with default values.
pub fn save_google_credentials(
    path: &Path,
    client_id: &str,
    client_secret: &str,
) -> ClientResult<()> {
    use toml_edit::{DocumentMut, Item, Table, value};

    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<DocumentMut>().map_err(|e| {
        ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = Item::Table(Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("'google' in {} is not a table", path.display()))
    })?;
    google["client_id"] = value(client_id);
    google["client_secret"] = value(client_secret);

    if !doc.contains_key("calendar") {
        let mut calendar = Table::new();
        calendar["id"] = value(CalendarSettings::DEFAULT_ID);
        calendar["timezone"] = value(CalendarSettings::DEFAULT_TIMEZONE);
        doc["calendar"] = Item::Table(calendar);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;

    info!("saved Google credentials to {}", path.display());
    Ok(())
}
