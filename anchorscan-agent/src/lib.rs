//! # anchorscan agent
//!
//! Deployable side of the beacon anchor: the HTTP backend client, the radio
//! bridge process, identity persistence, operator input and the runtime that
//! wires them around the core orchestrator.

pub mod commands;
pub mod infra;
pub mod runtime;

pub use runtime::run_agent;
