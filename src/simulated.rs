//! In-Memory Collaborators
//!
//! Doubles for the node, configuration store and injection API. They record
//! every call for verification and can be told to fail. Each is a cheap
//! cloneable handle over shared state, so a test keeps one clone and moves
//! the other into the driver.

use crate::collaborators::{
    AlertInjector, CollaboratorError, ConfigStore, InjectionError, InjectionRequest, LinkState,
    RestoreMode, TargetNode,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Two-disk mirror, enough for every RAID fault
pub const HEALTHY_MDSTAT: &str = "\
Personalities : [raid1]
md0 : active raid1 sdb[1] sda[0]
      976630336 blocks super 1.2 [2/2] [UU]

unused devices: <none>
";

#[derive(Default)]
struct NodeState {
    mdstat: String,
    mdstat_error: Option<String>,
    restore_error: Option<String>,
    links: HashMap<String, LinkState>,
    restores: Vec<RestoreMode>,
}

/// Simulated server node
#[derive(Clone)]
pub struct SimulatedNode {
    state: Arc<Mutex<NodeState>>,
}

impl Default for SimulatedNode {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNode {
    /// Node with a healthy md0 and every interface up
    pub fn new() -> Self {
        SimulatedNode {
            state: Arc::new(Mutex::new(NodeState {
                mdstat: HEALTHY_MDSTAT.to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn with_mdstat(self, text: &str) -> Self {
        self.state.lock().mdstat = text.to_string();
        self
    }

    pub fn fail_mdstat(&self, msg: &str) {
        self.state.lock().mdstat_error = Some(msg.to_string());
    }

    pub fn fail_restore(&self, msg: &str) {
        self.state.lock().restore_error = Some(msg.to_string());
    }

    /// Interfaces never set report `Up`
    pub fn set_link(&self, interface: &str, state: LinkState) {
        self.state.lock().links.insert(interface.to_string(), state);
    }

    /// Restore calls seen so far
    pub fn restores(&self) -> Vec<RestoreMode> {
        self.state.lock().restores.clone()
    }
}

impl TargetNode for SimulatedNode {
    fn read_mdstat(&mut self) -> Result<String, CollaboratorError> {
        let state = self.state.lock();
        match &state.mdstat_error {
            Some(msg) => Err(CollaboratorError::new(msg.as_str())),
            None => Ok(state.mdstat.clone()),
        }
    }

    fn restore_config(&mut self, mode: RestoreMode) -> Result<(), CollaboratorError> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.restore_error {
            return Err(CollaboratorError::new(msg.as_str()));
        }
        state.restores.push(mode);
        Ok(())
    }

    fn link_state(&mut self, interface: &str) -> Result<LinkState, CollaboratorError> {
        Ok(self
            .state
            .lock()
            .links
            .get(interface)
            .copied()
            .unwrap_or(LinkState::Up))
    }
}

#[derive(Default)]
struct StoreState {
    error: Option<String>,
    cleared: Vec<Vec<String>>,
}

/// Simulated configuration store
#[derive(Clone, Default)]
pub struct SimulatedConfigStore {
    state: Arc<Mutex<StoreState>>,
}

impl SimulatedConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, msg: &str) {
        self.state.lock().error = Some(msg.to_string());
    }

    /// Field lists of every successful clear
    pub fn cleared(&self) -> Vec<Vec<String>> {
        self.state.lock().cleared.clone()
    }
}

impl ConfigStore for SimulatedConfigStore {
    fn clear_fields(&mut self, fields: &[String]) -> Result<String, CollaboratorError> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.error {
            return Err(CollaboratorError::new(msg.as_str()));
        }
        state.cleared.push(fields.to_vec());
        Ok(format!("{{\"updated\": {}}}", fields.len()))
    }
}

#[derive(Default)]
struct InjectorState {
    requests: Vec<InjectionRequest>,
    failing: HashSet<String>,
    responses: HashMap<String, Value>,
}

/// Simulated injection API
#[derive(Clone, Default)]
pub struct SimulatedInjector {
    state: Arc<Mutex<InjectorState>>,
}

impl SimulatedInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every injection of `fault` fail
    pub fn fail_fault(&self, fault: &str) {
        self.state.lock().failing.insert(fault.to_string());
    }

    /// Return `payload` whenever `fault` is injected
    pub fn respond_with(&self, fault: &str, payload: Value) {
        self.state.lock().responses.insert(fault.to_string(), payload);
    }

    /// Every request seen, failed ones included
    pub fn requests(&self) -> Vec<InjectionRequest> {
        self.state.lock().requests.clone()
    }

    /// Fault names in call order
    pub fn injected_faults(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|r| r.fault.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().requests.clear();
    }
}

impl AlertInjector for SimulatedInjector {
    fn inject(&mut self, request: &InjectionRequest) -> Result<Value, InjectionError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        if state.failing.contains(&request.fault) {
            return Err(InjectionError::new(&request.fault, "simulated failure"));
        }
        Ok(state
            .responses
            .get(&request.fault)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EnclosureDetails, HostDetails, InputParameters};

    fn request(fault: &str) -> InjectionRequest {
        InjectionRequest {
            fault: fault.to_string(),
            host: HostDetails::new("node", "root", "pw"),
            enclosure: EnclosureDetails::default(),
            input: InputParameters::new(),
        }
    }

    #[test]
    fn test_injector_records_and_fails() {
        let injector = SimulatedInjector::new();
        let mut handle = injector.clone();
        injector.fail_fault("PSU_FAULT");
        injector.respond_with("DG_FAULT", serde_json::json!({"phy_num": [4, 5]}));

        assert!(handle.inject(&request("PSU_FAULT")).is_err());
        let payload = handle.inject(&request("DG_FAULT")).unwrap();
        assert_eq!(payload["phy_num"], serde_json::json!([4, 5]));
        assert_eq!(injector.injected_faults(), vec!["PSU_FAULT", "DG_FAULT"]);

        injector.clear();
        assert!(injector.requests().is_empty());
    }

    #[test]
    fn test_node_defaults() {
        let mut node = SimulatedNode::new();
        assert_eq!(node.link_state("eth9").unwrap(), LinkState::Up);
        assert!(node.read_mdstat().unwrap().contains("md0"));
        node.restore_config(RestoreMode::Pending).unwrap();
        assert_eq!(node.restores(), vec![RestoreMode::Pending]);
    }

    #[test]
    fn test_store_records_fields() {
        let store = SimulatedConfigStore::new();
        let mut handle = store.clone();
        let response = handle.clear_fields(&["a".to_string()]).unwrap();
        assert_eq!(response, "{\"updated\": 1}");
        assert_eq!(store.cleared(), vec![vec!["a".to_string()]]);
    }
}
