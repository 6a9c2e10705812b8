//! # `fleetgen-node`
//!
//! Runnable hosts for [`fleetgen_stream`]:
//!
//! - `fleetgen-server` serves records on a block of consecutive ports.
//! - `fleetgen-client` consumes records from one server and runs a
//!   [`fleetgen::FleetGenerator`] pass for each, logging progress.
//!
//! Both read their settings from flags, the environment, or a `.env` file.

pub mod config;
pub mod shutdown;
pub mod telemetry;
