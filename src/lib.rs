pub mod cli;
pub mod common;
pub mod config;
pub mod influx_client;
pub mod line_protocol;
pub mod reconcile;
pub mod ryot_client;
pub mod sink;
pub mod sync;
pub mod workout;

pub use common::types::{ConfigError, SinkError, SourceError, SyncError};
pub use config::{Config, InfluxConfig};
pub use reconcile::SyncMode;
pub use sync::{SyncJob, SyncReport};
