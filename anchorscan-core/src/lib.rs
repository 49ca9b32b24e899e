//! # anchorscan core
//!
//! Domain logic for a fixed beacon anchor: it polls the backend for scan jobs,
//! listens for proximity beacons, matches them against the job's tag roster and
//! reports the strongest reading per tag.
//!
//! ## Architecture
//!
//! - [`beacon`]: pure decoding of proximity-beacon service data frames
//! - [`deadline`]: effective scan length from server timestamps
//! - [`roster`]: per-job tag lookup keyed by beacon identity
//! - [`merger`]: best-signal bookkeeping and early completion detection
//! - [`debug_view`]: operator-only record of every device heard
//! - [`orchestrator`]: the job lifecycle state machine and its control loop
//! - [`ports`]: traits the agent implements for HTTP, radio and identity storage

pub mod beacon;
pub mod deadline;
pub mod debug_view;
pub mod error;
pub mod identity;
pub mod merger;
pub mod orchestrator;
pub mod ports;
pub mod roster;

pub use error::{AnchorError, Result};
