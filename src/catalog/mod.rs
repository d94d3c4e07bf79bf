//! Fault Catalog
//!
//! Static table of every injectable alert with its category, the alert that
//! reverses it, and the kind of setup it can run on. Built once and shared by
//! reference with the driver; nothing mutates it afterwards.

pub mod faults;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Group of faults sharing one setup/teardown procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    Enclosure,
    Raid,
    ServerOs,
    ServerFru,
}

impl FaultCategory {
    pub const ALL: [FaultCategory; 4] = [
        FaultCategory::Enclosure,
        FaultCategory::Raid,
        FaultCategory::ServerOs,
        FaultCategory::ServerFru,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultCategory::Enclosure => "enclosure",
            FaultCategory::Raid => "raid",
            FaultCategory::ServerOs => "server_os",
            FaultCategory::ServerFru => "server_fru",
        }
    }
}

impl fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment flavor of the system under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetupType {
    #[serde(rename = "HW")]
    Hw,
    #[serde(rename = "VM")]
    #[default]
    Vm,
}

impl fmt::Display for SetupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupType::Hw => f.write_str("HW"),
            SetupType::Vm => f.write_str("VM"),
        }
    }
}

/// Smallest setup a fault can be injected on.
///
/// `Vm` faults only touch things a virtual machine also has (CPU, memory,
/// network interfaces) and run everywhere. `Hw` faults need real enclosure
/// or RAID hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformSupport {
    #[serde(rename = "HW")]
    Hw,
    #[serde(rename = "VM")]
    Vm,
}

impl PlatformSupport {
    pub fn runs_on(&self, setup: SetupType) -> bool {
        match setup {
            SetupType::Hw => true,
            SetupType::Vm => *self == PlatformSupport::Vm,
        }
    }
}

/// One fault definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultDescriptor {
    pub name: &'static str,
    pub category: FaultCategory,
    /// Alert that reverses this one, if any
    pub resolve_name: Option<&'static str>,
    pub platform_support: PlatformSupport,
}

impl FaultDescriptor {
    pub const fn new(
        name: &'static str,
        category: FaultCategory,
        resolve_name: Option<&'static str>,
        platform_support: PlatformSupport,
    ) -> Self {
        FaultDescriptor {
            name,
            category,
            resolve_name,
            platform_support,
        }
    }
}

/// Lookup miss on the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFaultError(pub String);

impl fmt::Display for UnknownFaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown fault: {}", self.0)
    }
}

impl std::error::Error for UnknownFaultError {}

/// Error building a catalog from descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two descriptors share a name
    Duplicate(&'static str),
    /// A resolve alert that is not in the catalog
    DanglingResolve {
        fault: &'static str,
        resolve: &'static str,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Duplicate(name) => write!(f, "Duplicate fault in catalog: {}", name),
            CatalogError::DanglingResolve { fault, resolve } => write!(
                f,
                "Fault {} resolves with {}, which is not in the catalog",
                fault, resolve
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable fault table
#[derive(Debug, Clone)]
pub struct FaultCatalog {
    faults: Vec<FaultDescriptor>,
}

impl FaultCatalog {
    /// Build a catalog, checking names are unique and every resolve alert exists
    pub fn new(faults: Vec<FaultDescriptor>) -> Result<Self, CatalogError> {
        let mut names = HashSet::with_capacity(faults.len());
        for fault in &faults {
            if !names.insert(fault.name) {
                return Err(CatalogError::Duplicate(fault.name));
            }
        }
        for fault in &faults {
            if let Some(resolve) = fault.resolve_name {
                if !names.contains(resolve) {
                    return Err(CatalogError::DanglingResolve {
                        fault: fault.name,
                        resolve,
                    });
                }
            }
        }
        Ok(FaultCatalog { faults })
    }

    /// The built-in alert table
    pub fn standard() -> Self {
        FaultCatalog {
            faults: standard_faults(),
        }
    }

    pub fn all_faults(&self) -> &[FaultDescriptor] {
        &self.faults
    }

    pub fn lookup(&self, name: &str) -> Result<&FaultDescriptor, UnknownFaultError> {
        self.faults
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| UnknownFaultError(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.faults.iter().any(|f| f.name == name)
    }

    /// Descriptor of the alert that reverses `name`
    pub fn resolve_of(&self, name: &str) -> Result<Option<&FaultDescriptor>, UnknownFaultError> {
        match self.lookup(name)?.resolve_name {
            Some(resolve) => self.lookup(resolve).map(Some),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }
}

impl Default for FaultCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_faults() -> Vec<FaultDescriptor> {
    use faults::*;
    use FaultCategory::*;
    use PlatformSupport::*;

    vec![
        FaultDescriptor::new(
            enclosure::CONTROLLER_FAULT,
            Enclosure,
            Some(enclosure::CONTROLLER_FAULT_RESOLVED),
            Hw,
        ),
        FaultDescriptor::new(enclosure::CONTROLLER_FAULT_RESOLVED, Enclosure, None, Hw),
        FaultDescriptor::new(
            enclosure::PSU_FAULT,
            Enclosure,
            Some(enclosure::PSU_FAULT_RESOLVED),
            Hw,
        ),
        FaultDescriptor::new(enclosure::PSU_FAULT_RESOLVED, Enclosure, None, Hw),
        FaultDescriptor::new(
            enclosure::DG_FAULT,
            Enclosure,
            Some(enclosure::DG_FAULT_RESOLVED),
            Hw,
        ),
        FaultDescriptor::new(enclosure::DG_FAULT_RESOLVED, Enclosure, None, Hw),
        FaultDescriptor::new(raid::STOP_DEVICE, Raid, Some(raid::ASSEMBLE_DEVICE), Hw),
        FaultDescriptor::new(raid::ASSEMBLE_DEVICE, Raid, None, Hw),
        FaultDescriptor::new(raid::REMOVE_DISK, Raid, Some(raid::ADD_DISK), Hw),
        FaultDescriptor::new(raid::ADD_DISK, Raid, None, Hw),
        FaultDescriptor::new(
            server_os::OS_DISK_DISABLE,
            ServerOs,
            Some(server_os::OS_DISK_ENABLE),
            Hw,
        ),
        FaultDescriptor::new(server_os::OS_DISK_ENABLE, ServerOs, None, Hw),
        FaultDescriptor::new(
            server_os::CPU_USAGE_ALERT,
            ServerOs,
            Some(server_os::CPU_USAGE_RESOLVED),
            Vm,
        ),
        FaultDescriptor::new(server_os::CPU_USAGE_RESOLVED, ServerOs, None, Vm),
        FaultDescriptor::new(
            server_os::MEM_USAGE_ALERT,
            ServerOs,
            Some(server_os::MEM_USAGE_RESOLVED),
            Vm,
        ),
        FaultDescriptor::new(server_os::MEM_USAGE_RESOLVED, ServerOs, None, Vm),
        FaultDescriptor::new(server_os::DISK_USAGE_ALERT, ServerOs, None, Vm),
        FaultDescriptor::new(
            server_fru::MGMT_FAULT,
            ServerFru,
            Some(server_fru::MGMT_FAULT_RESOLVED),
            Vm,
        ),
        FaultDescriptor::new(server_fru::MGMT_FAULT_RESOLVED, ServerFru, None, Vm),
        FaultDescriptor::new(
            server_fru::PUBLIC_DATA_FAULT,
            ServerFru,
            Some(server_fru::PUBLIC_DATA_FAULT_RESOLVED),
            Vm,
        ),
        FaultDescriptor::new(server_fru::PUBLIC_DATA_FAULT_RESOLVED, ServerFru, None, Vm),
        FaultDescriptor::new(
            server_fru::NW_PORT_FAULT,
            ServerFru,
            Some(server_fru::NW_PORT_FAULT_RESOLVED),
            Vm,
        ),
        FaultDescriptor::new(server_fru::NW_PORT_FAULT_RESOLVED, ServerFru, None, Vm),
    ]
}
