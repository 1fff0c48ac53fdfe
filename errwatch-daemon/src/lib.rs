//! errwatch daemon library.
//!
//! Exposes internal modules for integration testing and for the CLI,
//! which reuses the notifier backends. In production, `errwatch-daemon`
//! is used as a binary (main.rs).

pub mod cli;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod notify;
pub mod orchestrator;
