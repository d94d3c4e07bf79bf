//! Random Fault Driver
//!
//! Long-running loop that keeps the target under a steady trickle of
//! injected alerts:
//!
//! ```text
//! SELECT -> FILTER -> SETUP -> INJECT -> WAIT -> RESOLVE -> TEARDOWN -> DELAY
//!   ^         |         |         |                            |         |
//!   +---------+---------+---------+----------------------------+---------+
//! ```
//!
//! A failed step abandons the rest of its iteration and the loop moves on;
//! nothing is retried. Exactly one fault is in flight at a time.
//!
//! Cancellation is polled at the top of each iteration. The post-inject
//! wait is never cut short, so an injected fault always gets its resolve
//! alert, but the post-teardown delay ends as soon as the token is
//! cancelled. Worst-case latency is therefore one inject wait plus the
//! collaborator calls of a single iteration.

mod cancel;
mod report;

pub use cancel::CancellationToken;
pub use report::{
    DriverEvent, DriverReport, DriverStats, IterationOutcome, IterationRecord, ResolveStatus,
    SkipReason,
};

use crate::catalog::faults::enclosure;
use crate::catalog::{FaultCatalog, FaultCategory, FaultDescriptor, SetupType};
use crate::collaborators::{AlertInjector, InjectionError, InjectionRequest};
use crate::config::DriverConfig;
use crate::observability::{self, noop_metrics, SharedMetrics};
use crate::params::{parameter_source, RuntimeParameterProvider};
use crate::procedures::{Procedures, SetupOutcome};
use crossbeam::channel::Sender;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Name of the background driver thread
pub const DRIVER_THREAD_NAME: &str = "alert-sim-driver";

/// Error ending a driver run
#[derive(Debug)]
pub enum DriverError {
    /// Every catalog fault is filtered out for this setup and ignore list
    NoEligibleFaults { setup_type: SetupType },
    /// The background thread could not be started
    Spawn(std::io::Error),
    /// The background thread panicked
    Panicked,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::NoEligibleFaults { setup_type } => write!(
                f,
                "No fault is eligible on a {} setup with the given ignore list",
                setup_type
            ),
            DriverError::Spawn(e) => write!(f, "Failed to start driver thread: {}", e),
            DriverError::Panicked => write!(f, "Driver thread panicked"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Session state derived once when the loop starts
#[derive(Debug, Clone, Default)]
pub struct DriverState {
    /// Categories of the faults on the ignore list
    pub ignored_categories: HashSet<FaultCategory>,
}

impl DriverState {
    pub fn new(config: &DriverConfig, catalog: &FaultCatalog) -> Self {
        let mut ignored_categories = HashSet::new();
        for name in &config.ignore_list {
            match catalog.lookup(name) {
                Ok(fault) => {
                    ignored_categories.insert(fault.category);
                }
                Err(e) => warn!("Ignore list entry skipped: {}", e),
            }
        }
        DriverState { ignored_categories }
    }
}

/// The random fault injection loop and its collaborators
pub struct RandomFaultDriver {
    config: DriverConfig,
    catalog: Arc<FaultCatalog>,
    procedures: Procedures,
    params: RuntimeParameterProvider,
    injector: Box<dyn AlertInjector>,
    rng: ChaCha8Rng,
    seed: u64,
    metrics: SharedMetrics,
    events: Option<Sender<DriverEvent>>,
}

impl RandomFaultDriver {
    pub fn new(
        config: DriverConfig,
        catalog: Arc<FaultCatalog>,
        procedures: Procedures,
        injector: Box<dyn AlertInjector>,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let params = RuntimeParameterProvider::new(&config);
        RandomFaultDriver {
            config,
            catalog,
            procedures,
            params,
            injector,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            metrics: noop_metrics(),
            events: None,
        }
    }

    /// Builder: report step outcomes to `metrics`
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builder: send every [`DriverEvent`] on `events`
    pub fn with_events(mut self, events: Sender<DriverEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run the loop on a dedicated thread
    pub fn spawn(self, cancel: CancellationToken) -> Result<DriverHandle, DriverError> {
        let token = cancel.clone();
        let thread = thread::Builder::new()
            .name(DRIVER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut driver = self;
                driver.run(&token)
            })
            .map_err(DriverError::Spawn)?;
        Ok(DriverHandle { cancel, thread })
    }

    /// Run the loop on the calling thread until cancelled or the iteration
    /// bound is reached
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<DriverReport, DriverError> {
        let state = DriverState::new(&self.config, &self.catalog);
        if !self.catalog.all_faults().iter().any(|f| self.skip_reason(f).is_none()) {
            return Err(DriverError::NoEligibleFaults {
                setup_type: self.config.setup_type,
            });
        }

        let span = observability::driver_span(self.seed);
        let _enter = span.enter();
        info!(
            seed = self.seed,
            setup_type = %self.config.setup_type,
            monitor_mode = self.config.monitor_mode,
            ignored = ?self.config.ignore_list,
            "Random fault driver started"
        );

        let mut report = DriverReport::new(self.seed);
        loop {
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping driver");
                break;
            }
            if let Some(max) = self.config.max_iterations {
                if report.stats.iterations >= max {
                    info!(max, "Iteration bound reached, stopping driver");
                    break;
                }
            }

            let Some(fault) = self.catalog.all_faults().choose(&mut self.rng).copied() else {
                break;
            };
            report.stats.selected += 1;
            self.emit(DriverEvent::Selected { fault: fault.name });

            if let Some(reason) = self.skip_reason(&fault) {
                match reason {
                    SkipReason::Platform => report.stats.skipped_platform += 1,
                    SkipReason::Ignored => report.stats.skipped_ignored += 1,
                }
                debug!(fault = fault.name, reason = reason.as_str(), "Skipping fault");
                self.metrics.record_skip(reason.as_str());
                self.emit(DriverEvent::Skipped {
                    fault: fault.name,
                    reason,
                });
                continue;
            }

            report.stats.iterations += 1;
            let iteration = report.stats.iterations;
            let outcome = {
                let span = observability::iteration_span(iteration, fault.name);
                let _enter = span.enter();
                self.run_iteration(iteration, &state, &fault, cancel)
            };
            self.emit(DriverEvent::IterationComplete {
                iteration,
                fault: fault.name,
                outcome: outcome.clone(),
            });
            report.record(iteration, fault.name, outcome);
        }

        info!("{}", report.summary());
        Ok(report)
    }

    fn skip_reason(&self, fault: &FaultDescriptor) -> Option<SkipReason> {
        if !fault.platform_support.runs_on(self.config.setup_type) {
            Some(SkipReason::Platform)
        } else if self.config.is_ignored(fault.name)
            || fault.resolve_name.is_some_and(|r| self.config.is_ignored(r))
        {
            // A fault whose resolve alert is ignored could never be resolved
            Some(SkipReason::Ignored)
        } else {
            None
        }
    }

    fn run_iteration(
        &mut self,
        iteration: u64,
        state: &DriverState,
        fault: &FaultDescriptor,
        cancel: &CancellationToken,
    ) -> IterationOutcome {
        let category = fault.category;
        let prepare = !self.config.monitor_mode || !state.ignored_categories.contains(&category);

        let setup = if prepare {
            match self.procedures.setup(category, fault.name) {
                Ok(outcome) => {
                    self.metrics.record_step("setup", fault.name, true);
                    Some(outcome)
                }
                Err(e) => {
                    error!("Setup failed, skipping fault: {}", e);
                    self.metrics.record_step("setup", fault.name, false);
                    self.emit(DriverEvent::SetupFailed {
                        fault: fault.name,
                        reason: e.reason.clone(),
                    });
                    return IterationOutcome::SetupFailed { reason: e.reason };
                }
            }
        } else {
            debug!(%category, "Monitor mode, skipping setup");
            None
        };

        let request = self.build_request(fault.name, setup.as_ref());
        let response = match self.inject("inject", iteration, fault.name, &request) {
            Ok(response) => response,
            Err(e) => return IterationOutcome::InjectFailed { reason: e.reason },
        };

        let wait = self.config.inject_wait();
        if !wait.is_zero() {
            debug!(wait_ms = self.config.inject_wait_ms, "Waiting before resolving fault");
            thread::sleep(wait);
        }

        let resolve = match fault.resolve_name {
            None => ResolveStatus::NotApplicable,
            Some(resolve_name) => {
                let mut request = self.build_request(resolve_name, setup.as_ref());
                if resolve_name == enclosure::DG_FAULT_RESOLVED {
                    if let Some(phy_num) = response.get("phy_num") {
                        request.input.insert("phy_num", phy_num.clone());
                    }
                }
                match self.inject("resolve", iteration, resolve_name, &request) {
                    Ok(_) => {
                        self.emit(DriverEvent::Resolved {
                            iteration,
                            fault: resolve_name,
                        });
                        ResolveStatus::Resolved(resolve_name)
                    }
                    Err(e) => {
                        warn!("Fault {} left unresolved", fault.name);
                        self.emit(DriverEvent::ResolveFailed {
                            iteration,
                            fault: resolve_name,
                            reason: e.reason.clone(),
                        });
                        ResolveStatus::Failed {
                            fault: resolve_name,
                            reason: e.reason,
                        }
                    }
                }
            }
        };

        if prepare {
            if let Err(e) = self.procedures.teardown(category, fault.name) {
                error!("Teardown failed: {}", e);
                self.metrics.record_step("teardown", fault.name, false);
                self.emit(DriverEvent::TeardownFailed {
                    fault: fault.name,
                    reason: e.reason.clone(),
                });
                return IterationOutcome::TeardownFailed {
                    resolve,
                    reason: e.reason,
                };
            }
            self.metrics.record_step("teardown", fault.name, true);
        } else {
            debug!(%category, "Monitor mode, skipping teardown");
        }

        if cancel.wait_timeout(self.config.teardown_delay()) {
            debug!("Cancelled during teardown delay");
        }
        IterationOutcome::Completed { resolve }
    }

    /// Request for `fault`, carrying RAID devices forward from setup
    fn build_request(&self, fault: &str, setup: Option<&SetupOutcome>) -> InjectionRequest {
        let source = parameter_source(fault);
        let params = self.params.params_for(source).unwrap_or_else(|| {
            debug!(fault, "No parameter entry, using default host and no inputs");
            Default::default()
        });

        let mut input = params.input_parameters;
        if let Some(SetupOutcome::RaidMembers {
            md_device,
            second_disk,
            ..
        }) = setup
        {
            input.insert("md_device", md_device.as_str());
            input.insert("disk", second_disk.as_str());
        }

        InjectionRequest {
            fault: fault.to_string(),
            host: params
                .host_details
                .unwrap_or_else(|| self.config.host.clone()),
            enclosure: self.config.enclosure.clone(),
            input,
        }
    }

    fn inject(
        &mut self,
        step: &str,
        iteration: u64,
        fault: &'static str,
        request: &InjectionRequest,
    ) -> Result<Value, InjectionError> {
        let span = observability::injection_span(fault, &request.host.host);
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.injector.inject(request);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let fault_tag = format!("fault:{}", fault.to_lowercase());
        self.metrics
            .timing("driver.inject.duration", elapsed_ms, &[&fault_tag]);

        match &result {
            Ok(_) => {
                info!(input = ?request.input, "Injected {}", fault);
                self.metrics.record_step(step, fault, true);
                self.emit(DriverEvent::Injected { iteration, fault });
            }
            Err(e) => {
                error!("{}", e);
                self.metrics.record_step(step, fault, false);
                self.emit(DriverEvent::InjectFailed {
                    iteration,
                    fault,
                    reason: e.reason.clone(),
                });
            }
        }
        result
    }

    fn emit(&self, event: DriverEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = events.send(event);
        }
    }
}

/// Handle to a driver running on its own thread
pub struct DriverHandle {
    cancel: CancellationToken,
    thread: JoinHandle<Result<DriverReport, DriverError>>,
}

impl DriverHandle {
    /// Ask the driver to stop after its current iteration
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the driver thread to exit
    pub fn join(self) -> Result<DriverReport, DriverError> {
        self.thread.join().map_err(|_| DriverError::Panicked)?
    }

    /// Cancel, then wait
    pub fn stop(self) -> Result<DriverReport, DriverError> {
        self.cancel();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::faults::{raid, server_fru, server_os};
    use crate::catalog::PlatformSupport;
    use crate::params::HostDetails;
    use crate::procedures::ProcedureSettings;
    use crate::simulated::{SimulatedConfigStore, SimulatedInjector, SimulatedNode};

    fn config(setup: SetupType) -> DriverConfig {
        DriverConfig::new(setup, HostDetails::new("srvnode-1", "root", "pw"))
            .with_seed(42)
            .with_waits(0, 0)
    }

    fn driver_with(
        config: DriverConfig,
        catalog: FaultCatalog,
        node: SimulatedNode,
        injector: SimulatedInjector,
    ) -> RandomFaultDriver {
        let procedures = Procedures::new(
            Box::new(node),
            Box::new(SimulatedConfigStore::new()),
            ProcedureSettings::from_config(&config),
        );
        RandomFaultDriver::new(config, Arc::new(catalog), procedures, Box::new(injector))
    }

    fn single(fault: FaultDescriptor, resolve: Option<FaultDescriptor>) -> FaultCatalog {
        let mut faults = vec![fault];
        faults.extend(resolve);
        FaultCatalog::new(faults).unwrap()
    }

    #[test]
    fn test_driver_state_ignored_categories() {
        let config = config(SetupType::Hw).with_ignore_list(["CONTROLLER_FAULT", "MGMT_FAULT"]);
        let state = DriverState::new(&config, &FaultCatalog::standard());
        let expected: HashSet<_> = [FaultCategory::Enclosure, FaultCategory::ServerFru].into();
        assert_eq!(state.ignored_categories, expected);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let run = || {
            let mut driver = driver_with(
                config(SetupType::Hw).with_max_iterations(20),
                FaultCatalog::standard(),
                SimulatedNode::new(),
                SimulatedInjector::new(),
            );
            driver.run(&CancellationToken::new()).unwrap().attempted_faults()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_no_eligible_faults() {
        let catalog = single(
            FaultDescriptor::new(raid::STOP_DEVICE, FaultCategory::Raid, None, PlatformSupport::Hw),
            None,
        );
        let mut driver = driver_with(
            config(SetupType::Vm),
            catalog,
            SimulatedNode::new(),
            SimulatedInjector::new(),
        );
        let err = driver.run(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, DriverError::NoEligibleFaults { setup_type: SetupType::Vm }));
    }

    #[test]
    fn test_ignored_resolve_disqualifies_its_fault() {
        let catalog = single(
            FaultDescriptor::new(
                server_os::CPU_USAGE_ALERT,
                FaultCategory::ServerOs,
                Some(server_os::CPU_USAGE_RESOLVED),
                PlatformSupport::Vm,
            ),
            Some(FaultDescriptor::new(
                server_os::CPU_USAGE_RESOLVED,
                FaultCategory::ServerOs,
                None,
                PlatformSupport::Vm,
            )),
        );
        let mut driver = driver_with(
            config(SetupType::Vm).with_ignore_list([server_os::CPU_USAGE_RESOLVED]),
            catalog,
            SimulatedNode::new(),
            SimulatedInjector::new(),
        );
        let err = driver.run(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, DriverError::NoEligibleFaults { .. }));
    }

    #[test]
    fn test_cancelled_before_start_runs_nothing() {
        let injector = SimulatedInjector::new();
        let mut driver = driver_with(
            config(SetupType::Hw),
            FaultCatalog::standard(),
            SimulatedNode::new(),
            injector.clone(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = driver.run(&cancel).unwrap();
        assert_eq!(report.stats.selected, 0);
        assert!(injector.requests().is_empty());
    }

    #[test]
    fn test_disk_group_resolve_carries_phy_num() {
        let injector = SimulatedInjector::new();
        injector.respond_with(enclosure::DG_FAULT, serde_json::json!({"phy_num": [8, 9]}));
        let catalog = single(
            FaultDescriptor::new(
                enclosure::DG_FAULT,
                FaultCategory::Enclosure,
                Some(enclosure::DG_FAULT_RESOLVED),
                PlatformSupport::Hw,
            ),
            Some(FaultDescriptor::new(
                enclosure::DG_FAULT_RESOLVED,
                FaultCategory::Enclosure,
                None,
                PlatformSupport::Hw,
            )),
        );
        let mut config = config(SetupType::Hw).with_max_iterations(20);
        config.disk_group.enclosure_id = 3;
        let mut driver = driver_with(config, catalog, SimulatedNode::new(), injector.clone());

        let report = driver.run(&CancellationToken::new()).unwrap();
        assert!(report.stats.resolved > 0);

        let requests = injector.requests();
        let fault_at = requests
            .iter()
            .position(|r| r.fault == enclosure::DG_FAULT)
            .unwrap();
        let resolve = &requests[fault_at + 1];
        assert_eq!(resolve.fault, enclosure::DG_FAULT_RESOLVED);
        assert_eq!(resolve.input.get("phy_num"), Some(&serde_json::json!([8, 9])));
        assert_eq!(resolve.input.get("enclid"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_setup_failure_skips_injection() {
        let node = SimulatedNode::new();
        node.fail_restore("backup missing");
        let catalog = single(
            FaultDescriptor::new(
                server_os::DISK_USAGE_ALERT,
                FaultCategory::ServerOs,
                None,
                PlatformSupport::Vm,
            ),
            None,
        );
        let injector = SimulatedInjector::new();
        let mut driver = driver_with(
            config(SetupType::Vm).with_max_iterations(2),
            catalog,
            node,
            injector.clone(),
        );
        let report = driver.run(&CancellationToken::new()).unwrap();
        // Restore failure aborts at setup, before anything is injected
        assert_eq!(report.stats.setup_failures, 2);
        assert!(injector.requests().is_empty());
    }

    #[test]
    fn test_monitor_mode_skips_procedures_for_ignored_categories() {
        let node = SimulatedNode::new();
        node.set_link("eth1", crate::collaborators::LinkState::Down);
        let catalog = FaultCatalog::new(vec![
            FaultDescriptor::new(
                server_fru::NW_PORT_FAULT,
                FaultCategory::ServerFru,
                None,
                PlatformSupport::Vm,
            ),
            FaultDescriptor::new(
                server_fru::MGMT_FAULT,
                FaultCategory::ServerFru,
                None,
                PlatformSupport::Vm,
            ),
        ])
        .unwrap();
        let injector = SimulatedInjector::new();
        let mut driver = driver_with(
            config(SetupType::Vm)
                .with_ignore_list([server_fru::MGMT_FAULT])
                .with_monitor_mode(true)
                .with_max_iterations(3),
            catalog,
            node,
            injector.clone(),
        );
        let report = driver.run(&CancellationToken::new()).unwrap();
        // The down link would fail the port check, but monitor mode never runs it
        assert_eq!(report.stats.setup_failures, 0);
        assert_eq!(report.stats.completed, 3);
        assert!(injector
            .injected_faults()
            .iter()
            .all(|f| f == server_fru::NW_PORT_FAULT));
    }
}
