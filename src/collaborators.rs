//! Collaborator Seams
//!
//! The driver never talks to a cluster directly. Remote node access, the
//! shared configuration store and the alert injection API sit behind these
//! traits so production wiring and the in-memory doubles in
//! [`crate::simulated`] are interchangeable.

use crate::params::{EnclosureDetails, HostDetails, InputParameters};
use serde_json::Value;
use std::fmt;

/// Opaque failure reported by a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(msg: impl Into<String>) -> Self {
        CollaboratorError(msg.into())
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CollaboratorError {}

/// How a saved configuration file is put back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Restore but keep the pending-restore flag so teardown restores again
    Pending,
    /// Final restore, clears the pending-restore flag
    Permanent,
}

/// Operational state of a network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
    Unknown,
}

impl LinkState {
    /// Parse the `state` field of `ip -o link show <iface>` output
    pub fn from_ip_link(output: &str) -> Self {
        let mut words = output.split_whitespace();
        while let Some(word) = words.next() {
            if word == "state" {
                return match words.next() {
                    Some("UP") => LinkState::Up,
                    Some("DOWN") => LinkState::Down,
                    _ => LinkState::Unknown,
                };
            }
        }
        LinkState::Unknown
    }
}

/// Remote server node
pub trait TargetNode: Send {
    /// Raw `/proc/mdstat` contents
    fn read_mdstat(&mut self) -> Result<String, CollaboratorError>;

    /// Put the captured original configuration file back on the node
    fn restore_config(&mut self, mode: RestoreMode) -> Result<(), CollaboratorError>;

    fn link_state(&mut self, interface: &str) -> Result<LinkState, CollaboratorError>;
}

/// Shared key/value configuration store
pub trait ConfigStore: Send {
    /// Write empty values to `fields`, returning the raw store response
    fn clear_fields(&mut self, fields: &[String]) -> Result<String, CollaboratorError>;
}

/// One call to the injection API
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionRequest {
    pub fault: String,
    pub host: HostDetails,
    pub enclosure: EnclosureDetails,
    pub input: InputParameters,
}

/// Injection API reported failure
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionError {
    pub fault: String,
    pub reason: String,
}

impl InjectionError {
    pub fn new(fault: impl Into<String>, reason: impl Into<String>) -> Self {
        InjectionError {
            fault: fault.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Injecting {} failed: {}", self.fault, self.reason)
    }
}

impl std::error::Error for InjectionError {}

/// Alert injection API
pub trait AlertInjector: Send {
    /// Inject `request.fault`; the response payload may carry values later
    /// steps need (the PHY numbers of a disabled disk group, for instance)
    fn inject(&mut self, request: &InjectionRequest) -> Result<Value, InjectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_parse() {
        let up =
            "2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP mode DEFAULT";
        let down = "3: eth1: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN mode DEFAULT";
        assert_eq!(LinkState::from_ip_link(up), LinkState::Up);
        assert_eq!(LinkState::from_ip_link(down), LinkState::Down);
        assert_eq!(LinkState::from_ip_link("1: lo: <LOOPBACK> state UNKNOWN"), LinkState::Unknown);
        assert_eq!(LinkState::from_ip_link(""), LinkState::Unknown);
    }

    #[test]
    fn test_injection_error_display() {
        let err = InjectionError::new("PSU_FAULT", "enclosure unreachable");
        assert_eq!(err.to_string(), "Injecting PSU_FAULT failed: enclosure unreachable");
    }
}
