//! Ingest callback listener
//!
//! An HTTP endpoint the ingest server calls when a publisher starts or
//! stops, plus read-only views of the registry for dashboards and
//! monitoring.

pub mod callbacks;
pub mod config;
pub mod guard;
pub mod handlers;
pub mod listener;

pub use callbacks::{CallbackError, CallbackParams, NotificationListener};
pub use config::ServerConfig;
pub use guard::{Acquisition, ListenerGuard};
pub use listener::{build_router, NotificationServer};
