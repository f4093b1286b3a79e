use config::{Config, Environment, File, FileFormat};
use sqlkit_driver::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Process-level configuration: which named datasource the data-access layer
/// talks to, where the named datasources point, and how loud logging is.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub program_name: String,
    pub version: String,
    pub log_level: LevelFilter,
    /// Name of the default datasource; `None` leaves the layer unconfigured.
    pub datasource: Option<String>,
    /// Datasource name to connection URL, for provider wiring.
    pub datasource_urls: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            program_name: "sqlkit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: LevelFilter::INFO,
            datasource: None,
            datasource_urls: BTreeMap::new(),
        }
    }
}

/// A builder for creating a [Configuration] instance.
#[derive(Clone, Debug, Default)]
pub struct ConfigurationBuilder {
    configuration: Configuration,
}

impl ConfigurationBuilder {
    pub fn new<S: Into<String>>(program_name: S, version: S) -> Self {
        let mut configuration = Configuration::default();
        configuration.program_name = program_name.into();
        configuration.version = version.into();
        Self { configuration }
    }

    /// Load `<dir>/<program_name>.toml` (if present) plus environment
    /// overrides prefixed with the upper-cased program name.
    ///
    /// # Errors
    /// * If the file exists but cannot be parsed
    pub fn with_config_dir<P: Into<PathBuf>>(self, config_dir: P) -> Result<Self> {
        let path = config_dir
            .into()
            .join(format!("{}.toml", self.configuration.program_name));
        let prefix = self.configuration.program_name.to_uppercase();
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(&prefix).separator("_"))
            .build()
            .map_err(|error| Error::ConversionError(error.to_string()))?;
        self.apply(&config)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// * If the string cannot be parsed
    pub fn with_config_str(self, toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|error| Error::ConversionError(error.to_string()))?;
        self.apply(&config)
    }

    /// Set the log level to use.
    #[must_use]
    pub fn with_log_level(mut self, log_level: LevelFilter) -> Self {
        self.configuration.log_level = log_level;
        self
    }

    /// Set the default datasource name.
    #[must_use]
    pub fn with_datasource<S: Into<String>>(mut self, datasource: S) -> Self {
        self.configuration.datasource = Some(datasource.into());
        self
    }

    fn apply(mut self, config: &Config) -> Result<Self> {
        if let Ok(level) = config.get_string("log_level") {
            match LevelFilter::from_str(&level) {
                Ok(level) => self.configuration.log_level = level,
                Err(_) => warn!("unknown log_level {level:?}, keeping default"),
            }
        }
        if let Ok(datasource) = config.get_string("database.datasource") {
            self.configuration.datasource = Some(datasource);
        }
        if let Ok(urls) = config.get::<BTreeMap<String, String>>("database.urls") {
            self.configuration.datasource_urls = urls;
        }
        Ok(self)
    }

    /// Build a [Configuration] instance and install the log subscriber.
    #[must_use]
    pub fn build(self) -> Configuration {
        let configuration = self.configuration;
        if configuration.log_level != LevelFilter::OFF {
            let filter = EnvFilter::builder()
                .with_default_directive(configuration.log_level.into())
                .from_env_lossy();
            // Keeps an already-installed subscriber, e.g. across tests.
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        }
        configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let configuration = ConfigurationBuilder::new("testkit", "1.2.3").build();
        assert_eq!(configuration.program_name, "testkit");
        assert_eq!(configuration.version, "1.2.3");
        assert_eq!(configuration.log_level, LevelFilter::INFO);
        assert!(configuration.datasource.is_none());
        assert!(configuration.datasource_urls.is_empty());
    }

    #[test]
    fn test_config_str_overrides() -> Result<()> {
        let toml = r#"
            log_level = "debug"

            [database]
            datasource = "main"

            [database.urls]
            main = "sqlite://app.db"
            reports = "sqlite://reports.db"
        "#;
        let configuration = ConfigurationBuilder::new("testkit", "1.2.3")
            .with_config_str(toml)?
            .build();

        assert_eq!(configuration.log_level, LevelFilter::DEBUG);
        assert_eq!(configuration.datasource.as_deref(), Some("main"));
        assert_eq!(
            configuration.datasource_urls.get("reports").map(String::as_str),
            Some("sqlite://reports.db")
        );
        Ok(())
    }

    #[test]
    fn test_unknown_log_level_keeps_default() -> Result<()> {
        let configuration = ConfigurationBuilder::new("testkit", "1.2.3")
            .with_config_str(r#"log_level = "shouting""#)?
            .build();
        assert_eq!(configuration.log_level, LevelFilter::INFO);
        Ok(())
    }

    #[test]
    fn test_builder_setters() {
        let configuration = ConfigurationBuilder::new("testkit", "1.2.3")
            .with_log_level(LevelFilter::ERROR)
            .with_datasource("main")
            .build();
        assert_eq!(configuration.log_level, LevelFilter::ERROR);
        assert_eq!(configuration.datasource.as_deref(), Some("main"));
    }
}
