pub mod backend;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod replicator;
pub mod routing;

pub mod binlog;
pub mod delivery;

pub use crate::config::Config;
pub use context::RelayContext;
pub use error::{Error, Result};
pub use replicator::Replicator;
