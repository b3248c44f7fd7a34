//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Shared primitives and utilities for the management runtime."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_node_id() -> String {
    "trellis-node".to_owned()
}

fn default_mode() -> ManagementMode {
    ManagementMode::Master
}

fn default_true() -> bool {
    true
}

fn default_persistence_directory() -> PathBuf {
    PathBuf::from("target/trellis-state")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_watchdog_timeout() -> Duration {
    Duration::from_secs(2)
}

/// State a management node is in when it rebinds.
///
/// Only [`ManagementMode::Master`] reconstructs live objects; the two hot
/// modes reconstruct everything read-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ManagementMode {
    Master,
    HotStandby,
    HotBackup,
}

impl ManagementMode {
    /// Hot proxies mirror the master without owning the objects.
    pub fn is_hot_proxy(self) -> bool {
        matches!(self, ManagementMode::HotStandby | ManagementMode::HotBackup)
    }

    pub fn is_read_only(self) -> bool {
        self.is_hot_proxy()
    }

    /// Only the master may mutate the backing store once a rebind completes.
    pub fn may_write_store(self) -> bool {
        self == ManagementMode::Master
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManagementMode::Master => "master",
            ManagementMode::HotStandby => "hot-standby",
            ManagementMode::HotBackup => "hot-backup",
        }
    }
}

impl fmt::Display for ManagementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ManagementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "master" => Ok(ManagementMode::Master),
            "hot-standby" => Ok(ManagementMode::HotStandby),
            "hot-backup" => Ok(ManagementMode::HotBackup),
            other => Err(format!("unknown management mode: {}", other)),
        }
    }
}

/// How the management-wide catalog is populated during a rebind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogLoadMode {
    /// Always replace the catalog with the persisted items.
    LoadPersistedState,
    /// Always reload the catalog from the configured default source.
    LoadDefaultCatalog,
    /// Use persisted items when there are any, otherwise the default source.
    #[default]
    LoadDefaultCatalogIfNoPersistedState,
}

impl CatalogLoadMode {
    pub fn should_reset_to_persisted(self, store_is_empty: bool) -> bool {
        match self {
            CatalogLoadMode::LoadPersistedState => true,
            CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState => !store_is_empty,
            CatalogLoadMode::LoadDefaultCatalog => false,
        }
    }

    pub fn should_load_default(self, store_is_empty: bool) -> bool {
        match self {
            CatalogLoadMode::LoadDefaultCatalog => true,
            CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState => store_is_empty,
            CatalogLoadMode::LoadPersistedState => false,
        }
    }
}

/// Reaction of the rebind exception handler to a per-object problem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    /// Abort the pass on the first problem.
    FailFast,
    /// Keep going, then fail the pass if any problem was recorded.
    #[default]
    FailAtEnd,
    /// Record and keep going.
    Continue,
}

/// Primary configuration object for a Trellis management node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_mode")]
    pub mode: ManagementMode,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub rebind: RebindConfig,
    #[serde(default)]
    pub ha: HaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            mode: default_mode(),
            persistence: PersistenceConfig::default(),
            catalog: CatalogConfig::default(),
            rebind: RebindConfig::default(),
            ha: HaConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "TRELLIS_CONFIG";

    /// Load configuration from disk, respecting the `TRELLIS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config = toml::from_str::<AppConfig>(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(anyhow!("configuration must name the management node"));
        }
        self.ha.validate()?;
        Ok(())
    }
}

/// Where persisted state lives and which object kinds take part in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub features: PersistenceFeatures,
    /// Guess missing catalog provenance for entities persisted without one.
    #[serde(default = "default_true")]
    pub infer_catalog_item_on_rebind: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            directory: default_persistence_directory(),
            features: PersistenceFeatures::default(),
            infer_catalog_item_on_rebind: true,
        }
    }
}

/// Independent persistence toggles per object kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistenceFeatures {
    #[serde(default = "default_true")]
    pub catalog_items: bool,
    #[serde(default = "default_true")]
    pub policies: bool,
    #[serde(default = "default_true")]
    pub enrichers: bool,
    #[serde(default = "default_true")]
    pub feeds: bool,
}

impl Default for PersistenceFeatures {
    fn default() -> Self {
        Self {
            catalog_items: true,
            policies: true,
            enrichers: true,
            feeds: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub load_mode: CatalogLoadMode,
    /// TOML or JSON file listing the default catalog entries.
    #[serde(default)]
    pub default_source: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RebindConfig {
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default = "RebindConfig::default_dangling_mode")]
    pub dangling_ref_failure_mode: FailureMode,
}

impl RebindConfig {
    fn default_dangling_mode() -> FailureMode {
        FailureMode::Continue
    }
}

impl Default for RebindConfig {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::default(),
            dangling_ref_failure_mode: Self::default_dangling_mode(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaConfig {
    /// Lower wins the master election.
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_heartbeat_interval", rename = "heartbeat_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub heartbeat_interval: Duration,
    #[serde(default = "default_watchdog_timeout", rename = "watchdog_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub watchdog_timeout: Duration,
}

impl Default for HaConfig {
    fn default() -> Self {
        Self {
            priority: 0,
            heartbeat_interval: default_heartbeat_interval(),
            watchdog_timeout: default_watchdog_timeout(),
        }
    }
}

impl HaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.watchdog_timeout <= self.heartbeat_interval {
            return Err(anyhow!(
                "ha watchdog timeout ({:?}) must exceed the heartbeat interval ({:?})",
                self.watchdog_timeout,
                self.heartbeat_interval
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Filter used when neither `TRELLIS_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.mode, ManagementMode::Master);
        assert!(config.persistence.features.policies);
        assert!(config.persistence.infer_catalog_item_on_rebind);
        assert_eq!(
            config.catalog.load_mode,
            CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState
        );
        assert_eq!(config.rebind.failure_mode, FailureMode::FailAtEnd);
        assert_eq!(config.rebind.dangling_ref_failure_mode, FailureMode::Continue);
    }

    #[test]
    fn parses_feature_toggles_and_mode() {
        let config = AppConfig::from_toml(
            r#"
            node_id = "standby-1"
            mode = "hot-standby"

            [persistence.features]
            feeds = false

            [catalog]
            load_mode = "load-persisted-state"

            [ha]
            priority = 2
            heartbeat_interval_ms = 100
            watchdog_timeout_ms = 400
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ManagementMode::HotStandby);
        assert!(!config.persistence.features.feeds);
        assert!(config.persistence.features.enrichers);
        assert_eq!(config.catalog.load_mode, CatalogLoadMode::LoadPersistedState);
        assert_eq!(config.ha.watchdog_timeout, Duration::from_millis(400));
    }

    #[test]
    fn rejects_watchdog_shorter_than_heartbeat() {
        let err = AppConfig::from_toml(
            r#"
            [ha]
            heartbeat_interval_ms = 500
            watchdog_timeout_ms = 100
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("watchdog"));
    }

    #[test]
    fn catalog_reset_matrix() {
        use CatalogLoadMode::*;
        assert!(LoadPersistedState.should_reset_to_persisted(true));
        assert!(LoadPersistedState.should_reset_to_persisted(false));
        assert!(!LoadDefaultCatalog.should_reset_to_persisted(false));
        assert!(LoadDefaultCatalog.should_load_default(false));
        assert!(LoadDefaultCatalogIfNoPersistedState.should_reset_to_persisted(false));
        assert!(!LoadDefaultCatalogIfNoPersistedState.should_load_default(false));
        assert!(LoadDefaultCatalogIfNoPersistedState.should_load_default(true));
        assert!(!LoadDefaultCatalogIfNoPersistedState.should_reset_to_persisted(true));
    }

    #[test]
    fn mode_parsing_and_flags() {
        assert_eq!("HOT_BACKUP".parse::<ManagementMode>().unwrap(), ManagementMode::HotBackup);
        assert!(ManagementMode::HotStandby.is_read_only());
        assert!(!ManagementMode::Master.is_hot_proxy());
        assert!(ManagementMode::Master.may_write_store());
        assert!(!ManagementMode::HotBackup.may_write_store());
    }
}
