//! Physics lookups and conversion laws.
//!
//! Responsibilities:
//!
//! - atomic masses and elemental densities for the elements this tool meets
//! - weight-fraction <-> atomic-fraction conversion
//! - density of a mixture from its weight-fraction composition

pub mod convert;
pub mod masses;

pub use convert::*;
pub use masses::*;

/// Elementary charge in coulombs (CODATA exact value).
pub const ELEMENTARY_CHARGE_C: f64 = 1.602_176_634e-19;
