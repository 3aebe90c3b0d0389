//! Configuration management for the Charity Registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (charity.toml)
//! - Environment variables (CHARITY__*)
//!
//! ## Example config file (charity.toml):
//! ```toml
//! [registry]
//! path = "./.charity"
//! administrator = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//! default_caller = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//!
//! [events]
//! log = true
//! trace = true
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::event::{FanoutSink, JsonLinesSink, TracingSink};
use crate::identity::Identity;
use crate::store::RegistryStore;

/// Main configuration for the charity registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: StoreConfig,

    /// Event delivery settings
    #[serde(default)]
    pub events: EventsConfig,

    /// CLI output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the registry lives and who acts on it by default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the registry store directory
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Administrator used by `init` when none is given
    #[serde(default)]
    pub administrator: Option<Identity>,

    /// Caller used when a command does not name one
    #[serde(default)]
    pub default_caller: Option<Identity>,
}

/// Event delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Append events to events.jsonl in the store
    #[serde(default = "default_true")]
    pub log: bool,

    /// Mirror events to tracing
    #[serde(default = "default_true")]
    pub trace: bool,
}

/// CLI output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Render a value as JSON in this format
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

// Default value functions
fn default_store_path() -> PathBuf {
    PathBuf::from(".charity")
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            administrator: None,
            default_caller: None,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            log: true,
            trace: true,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["charity.toml", ".charity.toml", "config/charity.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("org", "charity", "registry") {
            let xdg_config = dirs.config_dir().join("charity.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CHARITY__REGISTRY__PATH, CHARITY__EVENTS__LOG, ...
        builder = builder.add_source(
            Environment::with_prefix("CHARITY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the store path (resolves relative paths)
    pub fn store_path(&self) -> PathBuf {
        if self.registry.path.is_absolute() {
            self.registry.path.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.registry.path)
        }
    }

    /// Administrator for a new registry: an explicit choice first, then the
    /// configured administrator, then the caller
    pub fn init_administrator(
        &self,
        explicit: Option<Identity>,
        caller: Option<Identity>,
    ) -> Option<Identity> {
        explicit.or(self.registry.administrator).or(caller)
    }

    /// Build the event sinks selected by `[events]` for a store
    pub fn event_sink(&self, store: &RegistryStore) -> FanoutSink {
        let mut sink = FanoutSink::new();
        if self.events.trace {
            sink = sink.with(TracingSink);
        }
        if self.events.log {
            sink = sink.with(JsonLinesSink::new(store.events_path()));
        }
        sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.registry.path, PathBuf::from(".charity"));
        assert!(config.registry.administrator.is_none());
        assert!(config.events.log);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = RegistryConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[events]"));
    }

    #[test]
    fn test_parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[registry]
path = "/var/lib/charity"
administrator = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"

[events]
log = false

[output]
format = "compact"
"#,
        )
        .unwrap();

        let config = RegistryConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.registry.path, PathBuf::from("/var/lib/charity"));
        assert_eq!(
            config.registry.administrator.unwrap().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert!(!config.events.log);
        assert!(config.events.trace);
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_init_administrator_precedence() {
        let flag = Identity::from_bytes([1; 20]);
        let configured = Identity::from_bytes([2; 20]);
        let caller = Identity::from_bytes([3; 20]);

        let mut config = RegistryConfig::default();
        config.registry.default_caller = Some(caller);
        assert_eq!(config.init_administrator(None, Some(caller)), Some(caller));

        config.registry.administrator = Some(configured);
        assert_eq!(config.init_administrator(None, Some(caller)), Some(configured));
        assert_eq!(config.init_administrator(Some(flag), Some(caller)), Some(flag));
        assert_eq!(RegistryConfig::default().init_administrator(None, None), None);
    }

    #[test]
    fn test_compact_render() {
        let rendered = OutputFormat::Compact
            .render(&serde_json::json!({ "id": 1 }))
            .unwrap();
        assert_eq!(rendered, r#"{"id":1}"#);
    }
}
