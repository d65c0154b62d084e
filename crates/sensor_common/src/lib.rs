//! Sensor Common - Core of the Team Sensor command center
//!
//! Table model, concurrent endpoint prober, merge/filter adapter and the
//! loaders for the spreadsheet-backed sources. Stateless: every call derives
//! its result from explicit inputs only.

pub mod accounts;
pub mod config;
pub mod error;
pub mod merge;
pub mod pool;
pub mod probe;
pub mod record;
pub mod session;
pub mod sheet;
pub mod sites;

pub use accounts::{Account, AccountBook};
pub use config::Config;
pub use error::{Result, SensorError};
pub use merge::{merge, FilterSelection, MergedRow, MergedTable, StatusSummary};
pub use pool::{PoolError, WorkerPool};
pub use probe::{
    is_probe_target, EndpointProber, HttpTransport, ProbeFailure, ProbeReport, ProbeResponse,
    ProbeStatus, ProbeTransport, TransportError,
};
pub use record::{SensorRecord, Table};
pub use sites::{Site, SiteStatus, SiteSummary, SiteTable};
