//! File I/O: profile CSV ingest, per-pixel result export, profile JSON.
//!
//! Spectral-image files are never read here; the CSV is the already-integrated
//! per-pixel, per-line intensity table produced upstream.

pub mod export;
pub mod ingest;
pub mod profile;
