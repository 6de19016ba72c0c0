//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the element set and its explicit symbol -> slot mapping
//! - immutable intensity profiles on a shared scan-position axis
//! - run configuration (roles, reference region, acquisition, search settings)
//! - quantification outputs (zeta vector, composition/thickness profiles)

pub mod types;

pub use types::*;
