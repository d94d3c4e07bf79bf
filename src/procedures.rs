//! Category Setup and Teardown
//!
//! Each fault category needs the target prepared before a fault goes in and
//! cleaned up after it is resolved. The procedures are plain functions
//! looked up by [`FaultCategory`] through [`CategoryProcedures`], so adding a
//! category is a compile error until its procedures exist.

use crate::catalog::faults::server_fru;
use crate::catalog::FaultCategory;
use crate::collaborators::{ConfigStore, LinkState, RestoreMode, TargetNode};
use crate::config::DriverConfig;
use crate::mdstat::{parse_mdstat, MdArray};
use std::fmt;
use tracing::{debug, info, warn};

/// What a successful setup produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Nothing to carry forward
    Ready,
    /// Raw configuration store response
    StoreUpdated(String),
    /// Array and member disks the RAID fault acts on
    RaidMembers {
        md_device: String,
        first_disk: String,
        second_disk: String,
    },
}

/// Setup or teardown could not prepare the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupError {
    pub category: FaultCategory,
    pub fault: String,
    pub reason: String,
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} procedure for {} failed: {}", self.category, self.fault, self.reason)
    }
}

impl std::error::Error for SetupError {}

/// Inputs the procedures need besides the collaborators
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureSettings {
    /// Configuration store fields cleared before enclosure faults
    pub enclosure_fields: Vec<String>,
    /// Interfaces that must be up around a network port fault
    pub interfaces: Vec<String>,
}

impl ProcedureSettings {
    pub fn from_config(config: &DriverConfig) -> Self {
        ProcedureSettings {
            enclosure_fields: config.enclosure_fields.clone(),
            interfaces: config.interfaces().all(),
        }
    }
}

/// Collaborators and settings the procedures operate on
pub struct ProcedureContext {
    node: Box<dyn TargetNode>,
    store: Box<dyn ConfigStore>,
    settings: ProcedureSettings,
}

type SetupFn = fn(&mut ProcedureContext, &str) -> Result<SetupOutcome, String>;
type TeardownFn = fn(&mut ProcedureContext, &str) -> Result<(), String>;

/// Setup and teardown of one category
#[derive(Clone, Copy)]
pub struct CategoryProcedures {
    pub setup: SetupFn,
    pub teardown: TeardownFn,
}

impl CategoryProcedures {
    pub fn for_category(category: FaultCategory) -> Self {
        match category {
            FaultCategory::Enclosure => CategoryProcedures {
                setup: enclosure_setup,
                teardown: no_teardown,
            },
            FaultCategory::Raid => CategoryProcedures {
                setup: raid_setup,
                teardown: no_teardown,
            },
            FaultCategory::ServerOs => CategoryProcedures {
                setup: server_os_setup,
                teardown: server_os_teardown,
            },
            FaultCategory::ServerFru => CategoryProcedures {
                setup: server_fru_setup,
                teardown: server_fru_teardown,
            },
        }
    }
}

/// Setup/teardown resolver over a target node and configuration store
pub struct Procedures {
    ctx: ProcedureContext,
    table: [CategoryProcedures; 4],
}

impl Procedures {
    pub fn new(
        node: Box<dyn TargetNode>,
        store: Box<dyn ConfigStore>,
        settings: ProcedureSettings,
    ) -> Self {
        Procedures {
            ctx: ProcedureContext {
                node,
                store,
                settings,
            },
            table: FaultCategory::ALL.map(CategoryProcedures::for_category),
        }
    }

    fn procedures(&self, category: FaultCategory) -> CategoryProcedures {
        self.table[category as usize]
    }

    /// Prepare the target for `fault`
    pub fn setup(
        &mut self,
        category: FaultCategory,
        fault: &str,
    ) -> Result<SetupOutcome, SetupError> {
        let setup = self.procedures(category).setup;
        setup(&mut self.ctx, fault).map_err(|reason| SetupError {
            category,
            fault: fault.to_string(),
            reason,
        })
    }

    /// Clean up after `fault` was resolved
    pub fn teardown(&mut self, category: FaultCategory, fault: &str) -> Result<(), SetupError> {
        let teardown = self.procedures(category).teardown;
        teardown(&mut self.ctx, fault).map_err(|reason| SetupError {
            category,
            fault: fault.to_string(),
            reason,
        })
    }
}

fn enclosure_setup(ctx: &mut ProcedureContext, fault: &str) -> Result<SetupOutcome, String> {
    let response = ctx
        .store
        .clear_fields(&ctx.settings.enclosure_fields)
        .map_err(|e| format!("clearing enclosure fields: {}", e))?;
    info!(fault, fields = ?ctx.settings.enclosure_fields, "Cleared enclosure alert fields");
    Ok(SetupOutcome::StoreUpdated(response))
}

fn raid_setup(ctx: &mut ProcedureContext, fault: &str) -> Result<SetupOutcome, String> {
    let text = ctx
        .node
        .read_mdstat()
        .map_err(|e| format!("querying md status: {}", e))?;
    let arrays = parse_mdstat(&text);
    let (array, members) = arrays
        .iter()
        .map(|a| (a, a.working_members()))
        .find(|(_, members)| members.len() >= 2)
        .ok_or_else(|| describe_no_raid_target(&arrays))?;
    let (first, second) = (members[0], members[1]);
    info!(fault, md_device = %array.device, %first, %second, "Selected RAID array");
    Ok(SetupOutcome::RaidMembers {
        md_device: array.device.clone(),
        first_disk: first.to_string(),
        second_disk: second.to_string(),
    })
}

fn describe_no_raid_target(arrays: &[MdArray]) -> String {
    if arrays.is_empty() {
        return "no md array on node".to_string();
    }
    let counts: Vec<String> = arrays
        .iter()
        .map(|a| format!("{} has {}", a.device, a.working_members().len()))
        .collect();
    format!(
        "no md array with at least 2 working member disks ({})",
        counts.join(", ")
    )
}

fn server_os_setup(ctx: &mut ProcedureContext, fault: &str) -> Result<SetupOutcome, String> {
    ctx.node
        .restore_config(RestoreMode::Pending)
        .map_err(|e| format!("restoring original config: {}", e))?;
    debug!(fault, "Restored original config (pending)");
    Ok(SetupOutcome::Ready)
}

fn server_os_teardown(ctx: &mut ProcedureContext, fault: &str) -> Result<(), String> {
    ctx.node
        .restore_config(RestoreMode::Permanent)
        .map_err(|e| format!("restoring original config: {}", e))?;
    debug!(fault, "Restored original config");
    Ok(())
}

fn server_fru_setup(ctx: &mut ProcedureContext, fault: &str) -> Result<SetupOutcome, String> {
    if fault == server_fru::NW_PORT_FAULT {
        check_interfaces_up(ctx)?;
    }
    Ok(SetupOutcome::Ready)
}

fn server_fru_teardown(ctx: &mut ProcedureContext, fault: &str) -> Result<(), String> {
    if fault == server_fru::NW_PORT_FAULT {
        check_interfaces_up(ctx)?;
    }
    Ok(())
}

fn no_teardown(_ctx: &mut ProcedureContext, fault: &str) -> Result<(), String> {
    debug!(fault, "No teardown needed");
    Ok(())
}

/// Every configured interface must report UP
fn check_interfaces_up(ctx: &mut ProcedureContext) -> Result<(), String> {
    for interface in &ctx.settings.interfaces {
        let state = ctx
            .node
            .link_state(interface)
            .map_err(|e| format!("querying {}: {}", interface, e))?;
        if state == LinkState::Down {
            warn!(%interface, "Interface is down");
            return Err(format!("interface {} is DOWN", interface));
        }
    }
    Ok(())
}
