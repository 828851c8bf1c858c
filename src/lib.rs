#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Hyperview - an instance and hypervisor inventory report
//!
//! Hyperview queries a virtualization control-plane database for active
//! compute instances and their hypervisors, optionally enriches each record
//! with ICMP liveness and forward/reverse DNS-consistency checks, and renders
//! a filtered, sortable table in text or HTML.
//!
//! # Architecture
//!
//! - **[`config`]**: Configuration management (data directory, database
//!   paths, DNS suffix, probe pool size)
//!
//! - **[`database`]**: Read-only SQLite access
//!   - `directory`: tenant/project directory lookup (id <-> name)
//!   - `inventory`: instance/hypervisor query building and fetching
//!
//! - **[`probe`]**: Network probes
//!   - `ping`: bounded ICMP echo probing
//!   - `dns`: forward and reverse DNS-consistency checks
//!
//! - **[`enrich`]**: Per-record enrichment and the bounded concurrent
//!   enrichment pool (order-preserving)
//!
//! - **[`render`]**: Declarative column specification, row filtering and
//!   sorting, text/HTML table output
//!
//! - **[`progress`]**: Terminal progress bar for probing runs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hyperview::database::inventory::{InstanceFilters, InventoryQuery};
//!
//! let filters = InstanceFilters {
//!     env: Some("prod".to_string()),
//!     ..Default::default()
//! };
//! let query = InventoryQuery::from_filters(&filters);
//! println!("{}", query.sql());
//! ```

pub mod config;
pub mod database;
pub mod enrich;
pub mod probe;
pub mod progress;
pub mod render;

pub use config::HyperviewConfig;

pub use database::directory::ProjectDirectory;
pub use database::inventory::{InstanceFilters, InstanceRecord, InventoryQuery};

pub use enrich::{EnrichOptions, EnrichedRow};
pub use probe::{dns::DnsStatus, ping::PingStatus, NetworkProber, Prober};
pub use render::{Column, ColumnConfig};
