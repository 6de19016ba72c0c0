//! Unknown zeta-factor search.
//!
//! One element has no reference region, so its zeta-factor cannot be computed
//! in closed form. The physical prior that rescues it: a *different*, already
//! calibrated element is known to have constant atomic-percent composition
//! across the region of interest. The search walks integer trial zeta values
//! and accepts the first trial under which that element's derived composition
//! profile is flat enough.
//!
//! Why an integer grid walk?
//! - It is deterministic given the same inputs/settings.
//! - It has no local-minimum pathology to reason about.
//! - Zeta-factors are order 1e2..1e3 in these units, so unit resolution is
//!   well below the measurement uncertainty.
//!
//! The escalation rule: once the trial exceeds `ceiling_ratio` times the
//! constant element's zeta-factor, the walk has overshot any plausible
//! physical range. The trial restarts from 1 with the flatness tolerance
//! loosened by `tolerance_step`, widening the acceptance band instead of
//! climbing further.

use crate::calib::solver::atomic_composition;
use crate::domain::{Escalation, IntensityProfiles, RoleSpec, SearchOutcome, SearchSettings};
use crate::error::QuantError;

/// Slack on the flatness comparison so an exactly flat profile is accepted at
/// tolerance zero despite floating rounding in the composition arithmetic.
const SPREAD_EPS: f64 = 1e-12;

/// One immutable state of the search walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialState {
    /// Integer-valued trial zeta for the unknown element, starting at 1.
    pub trial_zeta: u64,
    /// Flatness tolerance currently in force.
    pub tolerance: f64,
}

impl TrialState {
    pub fn initial(settings: &SearchSettings) -> Self {
        Self {
            trial_zeta: 1,
            tolerance: settings.initial_tolerance,
        }
    }

    /// Pure successor: either step the trial zeta, or (past the ceiling)
    /// restart from 1 with a loosened tolerance.
    ///
    /// Returns the next state and whether an escalation happened.
    pub fn advance(&self, ceiling: f64, settings: &SearchSettings) -> (TrialState, bool) {
        if self.trial_zeta as f64 > ceiling {
            (
                TrialState {
                    trial_zeta: 1,
                    tolerance: self.tolerance + settings.tolerance_step,
                },
                true,
            )
        } else {
            (
                TrialState {
                    trial_zeta: self.trial_zeta + 1,
                    tolerance: self.tolerance,
                },
                false,
            )
        }
    }
}

/// Max - min of a profile.
fn spread(profile: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in profile {
        min = min.min(v);
        max = max.max(v);
    }
    max - min
}

/// Find the zeta-factor of the unknown element over the region of interest.
///
/// `known` holds the two reference elements' `(symbol, zeta)` pairs from
/// [`crate::calib::reference::calibrate_reference`]. The walk is bounded by
/// `settings.max_iterations`; exceeding the bound reports the last trial state
/// as a NonConvergence error instead of looping forever.
pub fn solve_unknown_zeta(
    roi: &IntensityProfiles,
    roles: &RoleSpec,
    known: &[(String, f64)],
    settings: &SearchSettings,
) -> Result<SearchOutcome, QuantError> {
    let elements = roi.elements();
    roles.validate(elements)?;
    settings.validate()?;
    if roi.n_pixels() == 0 {
        return Err(QuantError::InvalidParameter(
            "region of interest is empty".to_string(),
        ));
    }
    if known.len() != 2 {
        return Err(QuantError::InputShape {
            context: "known zeta-factors".to_string(),
            got: known.len(),
            expected: 2,
        });
    }

    // Fill the fixed slots of the trial vector; the unknown slot is rewritten
    // every iteration.
    let mut zetas = vec![0.0_f64; elements.len()];
    for (symbol, zeta) in known {
        if !(zeta.is_finite() && *zeta > 0.0) {
            return Err(QuantError::InvalidParameter(format!(
                "known zeta-factor for '{symbol}' must be positive, got {zeta}"
            )));
        }
        zetas[elements.slot(symbol)?] = *zeta;
    }
    let unknown_slot = elements.slot(&roles.unknown)?;
    let constant_slot = elements.slot(&roles.constant)?;

    let zeta_constant = zetas[constant_slot];
    if zeta_constant <= 0.0 {
        return Err(QuantError::InvalidParameter(format!(
            "no known zeta-factor supplied for constant element '{}'",
            roles.constant
        )));
    }
    let ceiling = settings.ceiling_ratio * zeta_constant;

    let mut state = TrialState::initial(settings);
    let mut escalations = Vec::new();

    for iteration in 0..settings.max_iterations {
        zetas[unknown_slot] = state.trial_zeta as f64;
        let composition = atomic_composition(roi, &zetas)?;
        let flatness = spread(&composition[constant_slot]);

        if flatness <= state.tolerance + SPREAD_EPS {
            return Ok(SearchOutcome {
                zeta: state.trial_zeta as f64,
                tolerance: state.tolerance,
                spread: flatness,
                iterations: iteration + 1,
                escalations,
            });
        }

        let (next, escalated) = state.advance(ceiling, settings);
        if escalated {
            escalations.push(Escalation {
                iteration,
                ceiling_trial: state.trial_zeta,
                new_tolerance: next.tolerance,
            });
        }
        state = next;
    }

    Err(QuantError::NonConvergence {
        iterations: settings.max_iterations,
        trial_zeta: state.trial_zeta,
        tolerance: state.tolerance,
    })
}
