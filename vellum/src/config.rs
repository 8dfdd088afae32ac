// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use anyhow::{bail, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables which override configuration values, for example
/// `VELLUM_DATABASE_URL`.
const ENV_PREFIX: &str = "VELLUM_";

/// Configuration object holding all important variables of the storage engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Configuration {
    /// URL / connection string to PostgreSQL or SQLite database.
    pub database_url: String,

    /// Maximum number of connections that the database pool should maintain.
    ///
    /// Be mindful of the connection limits for the database as well as other applications which
    /// may want to connect to the same database.
    pub database_max_connections: u32,

    /// Locale used for all non-localized values and as the fallback when a requested locale is
    /// missing. Defaults to "en".
    pub default_locale: String,

    /// All locales documents may carry values for. The default locale is always accepted, even
    /// when it is not listed here.
    pub locales: Vec<String>,

    /// Page size used by paginated listings when the caller does not ask for one.
    pub page_size: u64,

    /// Upper bound for requested page sizes.
    pub max_page_size: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 32,
            default_locale: "en".into(),
            locales: vec!["en".into()],
            page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Configuration {
    /// Load configuration from 1. defaults, 2. an optional .toml file and 3. environment
    /// variables (in that order, later sources take precedence over earlier ones).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Configuration::default()));

        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file '{}' does not exist", path.display());
            }

            figment = figment.merge(Toml::file(path));
        }

        let config: Configuration = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;

        if config.default_locale.is_empty() {
            bail!("Default locale can not be empty");
        }

        Ok(config)
    }

    /// Returns the locale settings derived from this configuration.
    pub fn locales(&self) -> Locales {
        Locales::new(&self.default_locale, &self.locales)
    }
}

/// Locales a storage engine accepts, with one of them acting as the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locales {
    default: String,
    available: Vec<String>,
}

impl Locales {
    pub fn new(default: &str, available: &[String]) -> Self {
        let mut locales: Vec<String> = Vec::with_capacity(available.len() + 1);
        locales.push(default.to_owned());

        for locale in available {
            if !locales.contains(locale) {
                locales.push(locale.to_owned());
            }
        }

        Self {
            default: default.to_owned(),
            available: locales,
        }
    }

    /// The locale non-localized values are stored under.
    pub fn default_locale(&self) -> &str {
        &self.default
    }

    /// All accepted locales, starting with the default one.
    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.available.iter().any(|available| available == locale)
    }
}

impl Default for Locales {
    fn default() -> Self {
        Configuration::default().locales()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{Configuration, Locales};

    #[test]
    fn default_locale_is_always_available() {
        let locales = Locales::new("de", &["en".to_string(), "de".to_string()]);
        assert_eq!(locales.default_locale(), "de");
        assert_eq!(locales.available(), &["de".to_string(), "en".to_string()]);
        assert!(locales.contains("en"));
        assert!(!locales.contains("fr"));
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_locale = \"es\"\nlocales = [\"es\", \"fr\"]\npage_size = 25"
        )
        .unwrap();

        let config = Configuration::load(Some(file.path())).unwrap();
        assert_eq!(config.default_locale, "es");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_page_size, 100);
        assert!(config.locales().contains("fr"));
    }

    #[test]
    fn missing_config_file() {
        let path = std::path::Path::new("/this/path/does/not/exist.toml");
        assert!(Configuration::load(Some(path)).is_err());
    }
}
