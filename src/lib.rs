pub mod catalog;
pub mod collaborators;
pub mod config;
pub mod driver;
pub mod mdstat;
pub mod observability;
pub mod params;
pub mod procedures;
pub mod simulated;

pub use catalog::{FaultCatalog, FaultCategory, FaultDescriptor, PlatformSupport, SetupType};
pub use collaborators::{AlertInjector, ConfigStore, InjectionRequest, TargetNode};
pub use config::DriverConfig;
pub use driver::{CancellationToken, DriverEvent, DriverHandle, DriverReport, RandomFaultDriver};
pub use params::{HostDetails, InputParameters, RuntimeParameterProvider};
pub use procedures::{ProcedureSettings, Procedures};
