//! Config File Tests
//!
//! Loading a driver config from disk and running it end to end.

use alert_sim::catalog::{FaultCatalog, SetupType};
use alert_sim::config::{ConfigError, DriverConfig};
use alert_sim::driver::{CancellationToken, RandomFaultDriver};
use alert_sim::procedures::{ProcedureSettings, Procedures};
use alert_sim::simulated::{SimulatedConfigStore, SimulatedInjector, SimulatedNode};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const VM_CONFIG: &str = r#"
setup_type = "VM"
ignore_list = ["MGMT_FAULT", "MGMT_FAULT_RESOLVED"]
monitor_mode = true
seed = 2024
max_iterations = 25
inject_wait_ms = 0
teardown_delay_ms = 0

[host]
host = "srvnode-1.example.com"
user = "root"
password = "secret"

[alternate_host]
host = "srvnode-1.data.example.com"
user = "root"
password = "secret"

[log]
level = "debug"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_and_run_from_file() {
    let file = write_config(VM_CONFIG);
    let config = DriverConfig::from_file(file.path()).unwrap();
    let catalog = FaultCatalog::standard();
    config.validate(&catalog).unwrap();

    assert_eq!(config.setup_type, SetupType::Vm);
    assert_eq!(config.seed, Some(2024));
    assert_eq!(config.log.level, "debug");
    assert_eq!(
        config.alternate_host.as_ref().map(|h| h.host.as_str()),
        Some("srvnode-1.data.example.com")
    );

    let injector = SimulatedInjector::new();
    let procedures = Procedures::new(
        Box::new(SimulatedNode::new()),
        Box::new(SimulatedConfigStore::new()),
        ProcedureSettings::from_config(&config),
    );
    let mut driver = RandomFaultDriver::new(
        config,
        Arc::new(catalog),
        procedures,
        Box::new(injector.clone()),
    );
    assert_eq!(driver.seed(), 2024);

    let report = driver.run(&CancellationToken::new()).unwrap();

    assert_eq!(report.seed, 2024);
    assert_eq!(report.stats.iterations, 25);
    assert!(!injector
        .injected_faults()
        .iter()
        .any(|f| f == "MGMT_FAULT" || f == "MGMT_FAULT_RESOLVED"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = DriverConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_malformed_file() {
    let file = write_config("setup_type = [");
    let err = DriverConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_unknown_ignored_fault_rejected() {
    let file = write_config(
        r#"
        ignore_list = ["FAN_FAULT"]

        [host]
        host = "srvnode-1"
        "#,
    );
    let config = DriverConfig::from_file(file.path()).unwrap();
    let err = config.validate(&FaultCatalog::standard()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownFault(_)));
    assert!(err.to_string().contains("FAN_FAULT"));
}
