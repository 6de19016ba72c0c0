//! Error types.
//!
//! Two layers:
//!
//! - [`QuantError`] is the typed taxonomy used by the quantification core
//!   (`calib`, `physics`, `profiles`, `data`). Callers can match on the kind.
//! - [`AppError`] is the flat CLI-boundary error carrying a process exit code.
//!   Everything in `app`/`cli`/`io` reports through it.
//!
//! Exit code conventions:
//!
//! - 2: usage, configuration, or file I/O problems
//! - 3: misaligned or malformed input arrays (shape errors)
//! - 4: degenerate signal (zero/near-zero denominator in a quantification step)
//! - 5: the zeta search hit its iteration bound without converging

use thiserror::Error;

/// Core quantification error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    /// Arrays misaligned in length or element count. Fatal; no recovery.
    #[error("Input shape mismatch in {context}: got {got}, expected {expected}")]
    InputShape {
        context: String,
        got: usize,
        expected: usize,
    },

    /// An element symbol with no entry in the atomic data table, or one that
    /// is not part of the analysed system.
    #[error("Unknown element '{symbol}' ({context})")]
    UnknownElement { symbol: String, context: String },

    /// A scalar parameter outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Zero or near-zero denominator in a zeta or composition computation.
    ///
    /// Surfaced with location context rather than propagated as NaN/Inf.
    #[error("Degenerate signal in {context}: {reason}")]
    DegenerateSignal { context: String, reason: String },

    /// The unknown-zeta search exceeded its iteration bound.
    ///
    /// Carries the last trial state to aid diagnosis.
    #[error(
        "Zeta search did not converge after {iterations} iterations \
         (last trial zeta {trial_zeta}, tolerance {tolerance})"
    )]
    NonConvergence {
        iterations: usize,
        trial_zeta: u64,
        tolerance: f64,
    },
}

/// CLI-boundary error: a message plus a process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<QuantError> for AppError {
    fn from(err: QuantError) -> Self {
        let exit_code = match &err {
            QuantError::UnknownElement { .. } | QuantError::InvalidParameter(_) => 2,
            QuantError::InputShape { .. } => 3,
            QuantError::DegenerateSignal { .. } => 4,
            QuantError::NonConvergence { .. } => 5,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quant_error_exit_codes() {
        let shape = QuantError::InputShape {
            context: "counts".to_string(),
            got: 3,
            expected: 5,
        };
        assert_eq!(AppError::from(shape).exit_code(), 3);

        let degenerate = QuantError::DegenerateSignal {
            context: "pixel 7".to_string(),
            reason: "total weighted intensity is zero".to_string(),
        };
        assert_eq!(AppError::from(degenerate).exit_code(), 4);

        let stuck = QuantError::NonConvergence {
            iterations: 100,
            trial_zeta: 12,
            tolerance: 0.004,
        };
        assert_eq!(AppError::from(stuck).exit_code(), 5);
    }
}
