//! Driver Configuration
//!
//! Everything the random fault driver needs to know about the target:
//! which setup it is, how to reach it, which faults to leave alone and how
//! long to wait between steps. Loaded from TOML; every field has a default so
//! a config file only needs to name what differs.
//!
//! ```toml
//! setup_type = "HW"
//! ignore_list = ["CONTROLLER_FAULT"]
//! monitor_mode = true
//!
//! [host]
//! host = "srvnode-1.example.com"
//! user = "root"
//! password = "secret"
//! ```

use crate::catalog::{FaultCatalog, SetupType, UnknownFaultError};
use crate::params::{EnclosureDetails, HostDetails};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default wait between injecting a fault and resolving it
pub const DEFAULT_INJECT_WAIT_MS: u64 = 30_000;
/// Default pause after a successful teardown
pub const DEFAULT_TEARDOWN_DELAY_MS: u64 = 10_000;

/// Error loading or validating a config
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    UnknownFault(UnknownFaultError),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::UnknownFault(e) => write!(f, "Invalid ignore list: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::UnknownFault(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Network interface names on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub mgmt: String,
    pub public_data: String,
    pub private_data: String,
}

impl InterfaceConfig {
    /// Every interface, in the order the link check visits them
    pub fn all(&self) -> Vec<String> {
        vec![
            self.mgmt.clone(),
            self.public_data.clone(),
            self.private_data.clone(),
        ]
    }
}

/// Interface naming differs between VM and HW deployments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceTable {
    pub vm: InterfaceConfig,
    pub hw: InterfaceConfig,
}

impl Default for InterfaceTable {
    fn default() -> Self {
        InterfaceTable {
            vm: InterfaceConfig {
                mgmt: "eth0".to_string(),
                public_data: "eth1".to_string(),
                private_data: "eth3".to_string(),
            },
            hw: InterfaceConfig {
                mgmt: "eno1".to_string(),
                public_data: "enp175s0f0".to_string(),
                private_data: "enp175s0f1".to_string(),
            },
        }
    }
}

impl InterfaceTable {
    pub fn for_setup(&self, setup: SetupType) -> &InterfaceConfig {
        match setup {
            SetupType::Vm => &self.vm,
            SetupType::Hw => &self.hw,
        }
    }
}

/// Disk group targeted by `DG_FAULT_RESOLVED`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskGroupConfig {
    pub enclosure_id: u32,
    pub disk_group: u32,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Random fault driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub setup_type: SetupType,
    /// Default target for injections
    pub host: HostDetails,
    /// Target reachable over the data network, used while the
    /// management interface is down
    pub alternate_host: Option<HostDetails>,
    pub enclosure: EnclosureDetails,
    /// Fault names the driver must never inject
    pub ignore_list: Vec<String>,
    /// Skip setup/teardown for categories of ignored faults
    pub monitor_mode: bool,
    /// RNG seed; a fresh one is drawn and logged when absent
    pub seed: Option<u64>,
    /// Stop after this many attempted injections
    pub max_iterations: Option<u64>,
    pub inject_wait_ms: u64,
    pub teardown_delay_ms: u64,
    pub interfaces: InterfaceTable,
    /// Configuration store fields cleared before an enclosure fault
    pub enclosure_fields: Vec<String>,
    pub disk_group: DiskGroupConfig,
    pub log: LogConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            setup_type: SetupType::default(),
            host: HostDetails::default(),
            alternate_host: None,
            enclosure: EnclosureDetails::default(),
            ignore_list: Vec::new(),
            monitor_mode: false,
            seed: None,
            max_iterations: None,
            inject_wait_ms: DEFAULT_INJECT_WAIT_MS,
            teardown_delay_ms: DEFAULT_TEARDOWN_DELAY_MS,
            interfaces: InterfaceTable::default(),
            enclosure_fields: vec![
                "fault_alert".to_string(),
                "fault_resolved_alert".to_string(),
                "alert_type".to_string(),
                "resource_id".to_string(),
            ],
            disk_group: DiskGroupConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn new(setup_type: SetupType, host: HostDetails) -> Self {
        DriverConfig {
            setup_type,
            host,
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check the config against the catalog it will drive
    pub fn validate(&self, catalog: &FaultCatalog) -> Result<(), ConfigError> {
        for name in &self.ignore_list {
            catalog.lookup(name).map_err(ConfigError::UnknownFault)?;
        }
        if self.host.host.is_empty() {
            return Err(ConfigError::Invalid("host.host must not be empty".to_string()));
        }
        let interfaces = self.interfaces();
        if interfaces.all().iter().any(|i| i.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "interface names for {} setup must not be empty",
                self.setup_type
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_ignore_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_list = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_monitor_mode(mut self, enabled: bool) -> Self {
        self.monitor_mode = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_iterations(mut self, count: u64) -> Self {
        self.max_iterations = Some(count);
        self
    }

    /// Set both waits at once (tests use zero)
    pub fn with_waits(mut self, inject_wait_ms: u64, teardown_delay_ms: u64) -> Self {
        self.inject_wait_ms = inject_wait_ms;
        self.teardown_delay_ms = teardown_delay_ms;
        self
    }

    pub fn with_alternate_host(mut self, host: HostDetails) -> Self {
        self.alternate_host = Some(host);
        self
    }

    /// Interfaces of the configured setup type
    pub fn interfaces(&self) -> &InterfaceConfig {
        self.interfaces.for_setup(self.setup_type)
    }

    pub fn inject_wait(&self) -> Duration {
        Duration::from_millis(self.inject_wait_ms)
    }

    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_list.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::faults;

    fn host() -> HostDetails {
        HostDetails::new("srvnode-1", "root", "pass")
    }

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.inject_wait(), Duration::from_secs(30));
        assert_eq!(config.teardown_delay(), Duration::from_secs(10));
        assert_eq!(config.setup_type, SetupType::Vm);
        assert!(!config.monitor_mode);
        assert_eq!(config.interfaces().mgmt, "eth0");
        assert_eq!(
            config.disk_group,
            DiskGroupConfig {
                enclosure_id: 0,
                disk_group: 0
            }
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = DriverConfig::new(SetupType::Hw, host())
            .with_ignore_list([faults::enclosure::CONTROLLER_FAULT])
            .with_monitor_mode(true)
            .with_seed(7)
            .with_max_iterations(3)
            .with_waits(0, 0);

        assert!(config.is_ignored("CONTROLLER_FAULT"));
        assert!(!config.is_ignored("PSU_FAULT"));
        assert!(config.monitor_mode);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_iterations, Some(3));
        assert_eq!(config.inject_wait(), Duration::ZERO);
        assert_eq!(config.interfaces().mgmt, "eno1");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = DriverConfig::from_toml_str(
            r#"
            setup_type = "HW"
            ignore_list = ["CONTROLLER_FAULT", "PSU_FAULT"]
            monitor_mode = true
            inject_wait_ms = 500

            [host]
            host = "srvnode-1"
            user = "root"
            password = "pass"

            [interfaces.hw]
            mgmt = "eno2"
            public_data = "p1"
            private_data = "p2"
            "#,
        )
        .unwrap();

        assert_eq!(config.setup_type, SetupType::Hw);
        assert_eq!(config.ignore_list.len(), 2);
        assert_eq!(config.inject_wait_ms, 500);
        assert_eq!(config.teardown_delay_ms, DEFAULT_TEARDOWN_DELAY_MS);
        assert_eq!(config.host.host, "srvnode-1");
        assert_eq!(config.interfaces().mgmt, "eno2");
        // Untouched table keeps its defaults
        assert_eq!(config.interfaces.vm.mgmt, "eth0");
    }

    #[test]
    fn test_parse_rejects_unknown_setup_type() {
        let err = DriverConfig::from_toml_str(r#"setup_type = "K8S""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_unknown_ignored_fault() {
        let config = DriverConfig::new(SetupType::Vm, host()).with_ignore_list(["FAN_FAULT"]);
        let err = config.validate(&FaultCatalog::standard()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFault(_)));
        assert_eq!(err.to_string(), "Invalid ignore list: Unknown fault: FAN_FAULT");
    }

    #[test]
    fn test_validate_requires_host() {
        let config = DriverConfig::default();
        let err = config.validate(&FaultCatalog::standard()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_zero_iterations() {
        let mut config = DriverConfig::new(SetupType::Vm, host());
        config.max_iterations = Some(0);
        assert!(config.validate(&FaultCatalog::standard()).is_err());
    }

    #[test]
    fn test_validate_ok() {
        let config = DriverConfig::new(SetupType::Vm, host()).with_ignore_list(["MGMT_FAULT"]);
        assert!(config.validate(&FaultCatalog::standard()).is_ok());
    }
}
