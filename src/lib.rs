//! `zeta-quant` library crate.
//!
//! The binary (`zq`) is a thin wrapper around this library so that:
//!
//! - core quantification logic is testable without spawning processes
//! - modules are reusable (e.g., future batch drivers, notebooks, etc.)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calib;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod physics;
pub mod profiles;
pub mod report;
