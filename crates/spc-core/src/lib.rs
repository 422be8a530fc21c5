//! Polling and command layer between `spc-api` and hosts (CLI, automation
//! bridges).
//!
//! - **[`Controller`]** -- owns one panel's Web UI client behind a single
//!   lock. [`connect()`](Controller::connect) logs in, takes a first reading
//!   and spawns the poll loop; [`set_state()`](Controller::set_state) queues
//!   a command behind any in-flight poll and waits for confirmation.
//!   [`Controller::oneshot()`](Controller::oneshot) runs a closure against a
//!   connected panel without the background loop.
//!
//! - **[`CommandIssuer`]** -- submits arm/disarm and polls until the panel
//!   reports the requested state, within a bounded confirmation window.
//!
//! - **[`PanelSnapshot`]** -- the published view: last confirmed state,
//!   availability, failure count. Failed polls never change the state;
//!   enough of them in a row mark the panel unavailable.
//!
//! - **[`PanelConfig`]** -- immutable runtime configuration, built by the
//!   host. Core never reads config files.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Ack, CommandIssuer};
pub use config::{PanelConfig, TlsPolicy};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use model::{AlarmState, PanelSnapshot, SchedulerPhase};

// Panel value types, re-exported so hosts need not depend on spc-api.
pub use spc_api::{Endpoints, FormField, PanelCommand, PanelInfo, PanelState, Transport};
