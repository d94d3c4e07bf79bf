//! Runtime Parameters
//!
//! Per-injection inputs: which host the injection API talks to and the
//! fault-specific arguments it needs (interface names, md devices, disk
//! group coordinates). Built fresh for every attempt.

use crate::catalog::faults::{enclosure, raid, server_fru};
use crate::config::DriverConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Login details of a server node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostDetails {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl HostDetails {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        HostDetails {
            host: host.into(),
            user: user.into(),
            password: password.into(),
        }
    }
}

/// Management endpoints of the storage enclosure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclosureDetails {
    pub primary_ip: String,
    pub secondary_ip: String,
    pub user: String,
    pub password: String,
}

/// Fault-specific arguments, keyed by the names the injection API expects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputParameters(BTreeMap<String, Value>);

impl InputParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Host override plus arguments for one injection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeParameters {
    /// `None` means the driver's default host
    pub host_details: Option<HostDetails>,
    pub input_parameters: InputParameters,
}

/// Fault whose table entry supplies the parameters for `fault`.
///
/// A network port fault takes the same interface down as the management
/// fault, and reusing that entry means the injection connects through the
/// data network host instead of needing management-network credentials.
pub fn parameter_source(fault: &str) -> &str {
    match fault {
        server_fru::NW_PORT_FAULT => server_fru::MGMT_FAULT,
        server_fru::NW_PORT_FAULT_RESOLVED => server_fru::MGMT_FAULT_RESOLVED,
        other => other,
    }
}

/// Static per-fault parameter table
#[derive(Debug, Clone)]
pub struct RuntimeParameterProvider {
    mgmt_device: String,
    public_data_device: String,
    alternate_host: Option<HostDetails>,
    enclosure_id: u32,
    disk_group: u32,
}

impl RuntimeParameterProvider {
    pub fn new(config: &DriverConfig) -> Self {
        let interfaces = config.interfaces();
        RuntimeParameterProvider {
            mgmt_device: interfaces.mgmt.clone(),
            public_data_device: interfaces.public_data.clone(),
            alternate_host: config.alternate_host.clone(),
            enclosure_id: config.disk_group.enclosure_id,
            disk_group: config.disk_group.disk_group,
        }
    }

    /// Parameters for `fault`, or `None` when the table has no entry and
    /// the fault takes no arguments beyond the default host.
    pub fn params_for(&self, fault: &str) -> Option<RuntimeParameters> {
        let params = match fault {
            server_fru::MGMT_FAULT | server_fru::MGMT_FAULT_RESOLVED => RuntimeParameters {
                host_details: self.alternate_host.clone(),
                input_parameters: InputParameters::new().with("device", self.mgmt_device.as_str()),
            },
            server_fru::PUBLIC_DATA_FAULT | server_fru::PUBLIC_DATA_FAULT_RESOLVED => {
                RuntimeParameters {
                    host_details: None,
                    input_parameters: InputParameters::new()
                        .with("device", self.public_data_device.as_str()),
                }
            }
            enclosure::DG_FAULT_RESOLVED => RuntimeParameters {
                host_details: None,
                input_parameters: InputParameters::new()
                    .with("enclid", self.enclosure_id)
                    .with("ctrl_name", vec!["A", "B"])
                    .with("operation", "Enabled")
                    .with("disk_group", self.disk_group)
                    .with("phy_num", Value::Null)
                    .with("poll", true),
            },
            raid::STOP_DEVICE => raid_params("stop"),
            raid::ASSEMBLE_DEVICE => raid_params("assemble"),
            raid::ADD_DISK => raid_params("add_disk"),
            raid::REMOVE_DISK => raid_params("remove_disk"),
            _ => return None,
        };
        Some(params)
    }
}

/// RAID operations start without a device; the driver fills it from setup
fn raid_params(operation: &str) -> RuntimeParameters {
    RuntimeParameters {
        host_details: None,
        input_parameters: InputParameters::new()
            .with("operation", operation)
            .with("md_device", Value::Null)
            .with("disk", Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::faults::server_os;
    use crate::catalog::SetupType;

    fn provider(setup: SetupType) -> RuntimeParameterProvider {
        let config = DriverConfig::new(setup, HostDetails::new("node", "root", "pw"))
            .with_alternate_host(HostDetails::new("node-data", "root", "pw"));
        RuntimeParameterProvider::new(&config)
    }

    #[test]
    fn test_mgmt_fault_uses_alternate_host() {
        let params = provider(SetupType::Vm).params_for(server_fru::MGMT_FAULT).unwrap();
        assert_eq!(params.host_details.unwrap().host, "node-data");
        assert_eq!(params.input_parameters.get_str("device"), Some("eth0"));
    }

    #[test]
    fn test_public_data_interface_follows_setup_type() {
        let vm = provider(SetupType::Vm).params_for(server_fru::PUBLIC_DATA_FAULT).unwrap();
        let hw = provider(SetupType::Hw).params_for(server_fru::PUBLIC_DATA_FAULT).unwrap();
        assert_eq!(vm.input_parameters.get_str("device"), Some("eth1"));
        assert_eq!(hw.input_parameters.get_str("device"), Some("enp175s0f0"));
        assert!(vm.host_details.is_none());
    }

    #[test]
    fn test_disk_group_resolve() {
        let params = provider(SetupType::Hw).params_for(enclosure::DG_FAULT_RESOLVED).unwrap();
        let input = &params.input_parameters;
        assert_eq!(input.get("enclid"), Some(&Value::from(0)));
        assert_eq!(input.get("ctrl_name"), Some(&serde_json::json!(["A", "B"])));
        assert_eq!(input.get_str("operation"), Some("Enabled"));
        assert_eq!(input.get("phy_num"), Some(&Value::Null));
        assert_eq!(input.get("poll"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_raid_placeholders() {
        let p = provider(SetupType::Hw);
        for (fault, op) in [
            (raid::STOP_DEVICE, "stop"),
            (raid::ASSEMBLE_DEVICE, "assemble"),
            (raid::ADD_DISK, "add_disk"),
            (raid::REMOVE_DISK, "remove_disk"),
        ] {
            let params = p.params_for(fault).unwrap();
            assert_eq!(params.input_parameters.get_str("operation"), Some(op));
            assert_eq!(params.input_parameters.get("md_device"), Some(&Value::Null));
            assert_eq!(params.input_parameters.get("disk"), Some(&Value::Null));
        }
    }

    #[test]
    fn test_unknown_fault_has_no_entry() {
        let p = provider(SetupType::Vm);
        assert!(p.params_for(server_os::CPU_USAGE_ALERT).is_none());
        assert!(p.params_for(server_fru::NW_PORT_FAULT).is_none());
        assert!(p.params_for("NOT_A_FAULT").is_none());
    }

    #[test]
    fn test_parameter_source() {
        assert_eq!(parameter_source(server_fru::NW_PORT_FAULT), server_fru::MGMT_FAULT);
        assert_eq!(
            parameter_source(server_fru::NW_PORT_FAULT_RESOLVED),
            server_fru::MGMT_FAULT_RESOLVED
        );
        assert_eq!(parameter_source(raid::STOP_DEVICE), raid::STOP_DEVICE);
    }

    #[test]
    fn test_input_parameters_serialize_flat() {
        let input = InputParameters::new().with("device", "eth0").with("poll", true);
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"device":"eth0","poll":true}"#);
    }
}
