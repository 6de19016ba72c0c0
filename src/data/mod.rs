//! Synthetic specimen generation.

pub mod sample;

pub use sample::*;
