//! Alert Fault Identifiers
//!
//! Names of every alert the driver knows how to inject, grouped by the
//! category whose setup/teardown procedure prepares the target for them.
//! The identifiers match the alert names understood by the injection API.

/// Storage enclosure faults (controllers, PSUs, disk groups)
pub mod enclosure {
    /// Take one enclosure controller offline
    pub const CONTROLLER_FAULT: &str = "CONTROLLER_FAULT";
    /// Bring the controller back
    pub const CONTROLLER_FAULT_RESOLVED: &str = "CONTROLLER_FAULT_RESOLVED";
    /// Fail an enclosure power supply
    pub const PSU_FAULT: &str = "PSU_FAULT";
    /// Restore the power supply
    pub const PSU_FAULT_RESOLVED: &str = "PSU_FAULT_RESOLVED";
    /// Disable disks of a disk group
    pub const DG_FAULT: &str = "DG_FAULT";
    /// Re-enable the disk group's disks (needs the PHY numbers from `DG_FAULT`)
    pub const DG_FAULT_RESOLVED: &str = "DG_FAULT_RESOLVED";
}

/// Software RAID faults on the server node
pub mod raid {
    /// Stop an md array
    pub const STOP_DEVICE: &str = "RAID_STOP_DEVICE_ALERT";
    /// Re-assemble a stopped md array
    pub const ASSEMBLE_DEVICE: &str = "RAID_ASSEMBLE_DEVICE_ALERT";
    /// Fail and remove a member disk
    pub const REMOVE_DISK: &str = "RAID_REMOVE_DISK_ALERT";
    /// Add the removed member back
    pub const ADD_DISK: &str = "RAID_ADD_DISK_ALERT";
}

/// Server operating system faults
pub mod server_os {
    /// Disable the OS disk
    pub const OS_DISK_DISABLE: &str = "OS_DISK_DISABLE";
    /// Enable the OS disk
    pub const OS_DISK_ENABLE: &str = "OS_DISK_ENABLE";
    /// Push CPU usage over the alert threshold
    pub const CPU_USAGE_ALERT: &str = "CPU_USAGE_ALERT";
    /// Drop CPU usage back under the threshold
    pub const CPU_USAGE_RESOLVED: &str = "CPU_USAGE_RESOLVED";
    /// Push memory usage over the alert threshold
    pub const MEM_USAGE_ALERT: &str = "MEM_USAGE_ALERT";
    /// Drop memory usage back under the threshold
    pub const MEM_USAGE_RESOLVED: &str = "MEM_USAGE_RESOLVED";
    /// Lower the disk usage threshold below current usage (self-clearing)
    pub const DISK_USAGE_ALERT: &str = "DISK_USAGE_ALERT";
}

/// Server field-replaceable unit faults (network ports)
pub mod server_fru {
    /// Bring the management interface down
    pub const MGMT_FAULT: &str = "MGMT_FAULT";
    /// Bring the management interface up
    pub const MGMT_FAULT_RESOLVED: &str = "MGMT_FAULT_RESOLVED";
    /// Bring the public data interface down
    pub const PUBLIC_DATA_FAULT: &str = "PUBLIC_DATA_FAULT";
    /// Bring the public data interface up
    pub const PUBLIC_DATA_FAULT_RESOLVED: &str = "PUBLIC_DATA_FAULT_RESOLVED";
    /// Pull a network port
    pub const NW_PORT_FAULT: &str = "NW_PORT_FAULT";
    /// Restore the network port
    pub const NW_PORT_FAULT_RESOLVED: &str = "NW_PORT_FAULT_RESOLVED";
}

/// All fault identifiers for iteration
pub const ALL_FAULTS: &[&str] = &[
    // Enclosure
    enclosure::CONTROLLER_FAULT,
    enclosure::CONTROLLER_FAULT_RESOLVED,
    enclosure::PSU_FAULT,
    enclosure::PSU_FAULT_RESOLVED,
    enclosure::DG_FAULT,
    enclosure::DG_FAULT_RESOLVED,
    // RAID
    raid::STOP_DEVICE,
    raid::ASSEMBLE_DEVICE,
    raid::REMOVE_DISK,
    raid::ADD_DISK,
    // Server OS
    server_os::OS_DISK_DISABLE,
    server_os::OS_DISK_ENABLE,
    server_os::CPU_USAGE_ALERT,
    server_os::CPU_USAGE_RESOLVED,
    server_os::MEM_USAGE_ALERT,
    server_os::MEM_USAGE_RESOLVED,
    server_os::DISK_USAGE_ALERT,
    // Server FRU
    server_fru::MGMT_FAULT,
    server_fru::MGMT_FAULT_RESOLVED,
    server_fru::PUBLIC_DATA_FAULT,
    server_fru::PUBLIC_DATA_FAULT_RESOLVED,
    server_fru::NW_PORT_FAULT,
    server_fru::NW_PORT_FAULT_RESOLVED,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_faults_unique() {
        let mut seen = std::collections::HashSet::new();
        for fault in ALL_FAULTS {
            assert!(seen.insert(*fault), "Duplicate fault: {}", fault);
        }
    }

    #[test]
    fn test_fault_count() {
        assert_eq!(ALL_FAULTS.len(), 23, "Expected 23 faults, got {}", ALL_FAULTS.len());
    }
}
