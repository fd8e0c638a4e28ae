//! Fine local fix (C6), part one: the differentiable navigation model.
//!
//! Replays a [`FixLog`] against a candidate starting position and a shared
//! altitude-bias parameter, accumulating a least-squares loss over
//! haversine/rhumb-line residuals. Every parameter-dependent quantity is a
//! [`Var`] on a [`Tape`] so [`crate::optimizer`] can differentiate the
//! whole replay in one reverse pass.
//!
//! Grounded on the prototype's `NavigationModel.forward`/`move_rhumb`
//! (`examples/original_source/mctoon_global_navigation_challenge.py`);
//! `Coordinate`/degrees bookkeeping is this crate's own (C1), the
//! autodiff primitives are [`crate::autodiff`].

use crate::angle::Coordinate;
use crate::autodiff::{backward, Tape, Var};
use crate::error::{FixError, Result};
use crate::fix_log::{FixLog, LogEntry};

/// Nautical miles per radian of great-circle arc: `360*60/(2*pi)`.
const NM_PER_RADIAN: f64 = 360.0 * 60.0 / (2.0 * std::f64::consts::PI);

/// Near-zero threshold on the Mercator-stretch denominator below which a
/// leg is treated as due east/west (spec §4.6).
const MERCATOR_EPSILON: f64 = 1e-12;

/// The three differentiable parameters of the fine fix: starting
/// latitude/longitude (radians) and a shared additive altitude bias
/// (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationState {
    /// Starting latitude, in radians.
    pub starting_lat_rad: f64,
    /// Starting longitude, in radians.
    pub starting_lon_rad: f64,
    /// Shared additive altitude bias, in degrees.
    pub observation_error_deg: f64,
}

impl NavigationState {
    /// Seeds the fine fix from the coarse fix, with zero bias, per spec
    /// §4.6.
    pub fn seeded_from(coarse: Coordinate) -> Self {
        NavigationState {
            starting_lat_rad: coarse.lat.radians(),
            starting_lon_rad: coarse.lon.radians(),
            observation_error_deg: 0.0,
        }
    }
}

/// The outcome of one forward-pass replay: the position after each
/// movement leg (starting with the seed position), the per-observation
/// residuals (nautical miles), the optional per-observation magnetic
/// residuals (degrees), and the total loss.
pub struct ForwardResult {
    /// Positions visited, in replay order; `positions[0]` is the seed.
    pub positions: Vec<Coordinate>,
    /// One entry per observation, in log order (nautical miles).
    pub residuals: Vec<f64>,
    /// Total loss (sum of squared residuals, optionally plus the
    /// magnetic-bearing term).
    pub loss: Var,
    /// The three leaf `Var`s this pass was parameterized by, in
    /// `(starting_lat, starting_lon, observation_error)` order — pass
    /// these to [`crate::autodiff::Gradients::wrt`] after [`backward`].
    pub leaves: (Var, Var, Var),
}

/// Differentiable normalization of a radian angle into `(-pi, pi]` via
/// `atan2(sin(x), cos(x))`, smooth everywhere except exactly at the
/// antipodal seam — unlike a `rem_euclid`-based wrap, this stays inside
/// the tape's primitive set (sin, cos, atan2).
fn wrap_rad(x: &Var) -> Var {
    x.sin().atan2(&x.cos())
}

/// Runs the forward pass described in spec §4.6 over `log`, starting from
/// `state`, with the magnetic-bearing term weighted by
/// `magnetic_bearing_weight` (zero disables it, per spec §9's open
/// question and SPEC_FULL §11).
///
/// Returns [`FixError::PastPole`] if any rhumb-line leg pushes the
/// latitude estimate past 90 degrees.
pub fn forward(
    tape: &Tape,
    state: NavigationState,
    log: &FixLog,
    magnetic_bearing_weight: f64,
) -> Result<ForwardResult> {
    let phi0 = tape.var(state.starting_lat_rad);
    let lambda0 = tape.var(state.starting_lon_rad);
    let eps_deg = tape.var(state.observation_error_deg);
    let mut phi = phi0.clone();
    let mut lambda = lambda0.clone();

    let mut positions = vec![Coordinate::from_degrees(phi.value().to_degrees(), lambda.value().to_degrees())];
    let mut residuals = Vec::new();
    let mut loss = Var::constant(tape, 0.0);

    for entry in log.entries() {
        match entry {
            LogEntry::Observation(obs) => {
                let gp_phi = Var::constant(tape, obs.gp.lat.radians());
                let gp_lambda = Var::constant(tape, obs.gp.lon.radians());

                let d_phi = &gp_phi - &phi;
                let d_lambda = &gp_lambda - &lambda;

                let half_dphi = &d_phi * &Var::constant(tape, 0.5);
                let half_dlambda = &d_lambda * &Var::constant(tape, 0.5);
                let sin_half_dphi = half_dphi.sin();
                let sin_half_dlambda = half_dlambda.sin();

                let a = &sin_half_dphi.square()
                    + &(&(&phi.cos() * &gp_phi.cos()) * &sin_half_dlambda.square());
                let sqrt_a = a.sqrt();
                let one_minus_a = &Var::constant(tape, 1.0) - &a;
                let sqrt_one_minus_a = one_minus_a.sqrt();
                let d_rad = &sqrt_a.atan2(&sqrt_one_minus_a) * &Var::constant(tape, 2.0);
                let d_nm = &d_rad * &Var::constant(tape, NM_PER_RADIAN);

                let h_deg = Var::constant(tape, obs.alt_observed.degrees());
                let h_plus_eps = &h_deg + &eps_deg;
                let zenith_deg = &Var::constant(tape, 90.0) - &h_plus_eps;
                let z_nm = &zenith_deg * &Var::constant(tape, 60.0);

                let r = &z_nm - &d_nm;
                residuals.push(r.value());
                loss = &loss + &r.square();

                if magnetic_bearing_weight != 0.0 {
                    if let Some(mag) = obs.mag {
                        let bearing_to_gp = {
                            let y = &d_lambda.sin() * &gp_phi.cos();
                            let x = &(&phi.cos() * &gp_phi.sin())
                                - &(&(&phi.sin() * &gp_phi.cos()) * &d_lambda.cos());
                            y.atan2(&x)
                        };
                        let mag_rad = Var::constant(tape, mag.radians());
                        let diff = &mag_rad - &bearing_to_gp;
                        let wrapped = wrap_rad(&diff);
                        let wrapped_deg = &wrapped * &Var::constant(tape, 180.0 / std::f64::consts::PI);
                        let weighted =
                            &wrapped_deg.square() * &Var::constant(tape, magnetic_bearing_weight);
                        loss = &loss + &weighted;
                    }
                }
            }
            LogEntry::Movement(movement) => {
                let d_r = movement.distance_nm() / NM_PER_RADIAN;
                let beta = Var::constant(tape, -movement.bearing.radians());

                let phi_new = &phi + &(&beta.cos() * &Var::constant(tape, d_r));
                if phi_new.value().abs() > std::f64::consts::FRAC_PI_2 {
                    return Err(FixError::PastPole {
                        origin_lat_deg: phi.value().to_degrees(),
                        origin_lon_deg: lambda.value().to_degrees(),
                        bearing_deg: movement.bearing.degrees(),
                        distance_nm: movement.distance_nm(),
                    });
                }

                let quarter_pi = std::f64::consts::FRAC_PI_4;
                let tan_new = (&Var::constant(tape, quarter_pi)
                    + &(&phi_new * &Var::constant(tape, 0.5)))
                    .tan();
                let tan_old =
                    (&Var::constant(tape, quarter_pi) + &(&phi * &Var::constant(tape, 0.5))).tan();
                let m = (&tan_new / &tan_old).ln();

                let q = if m.value().abs() < MERCATOR_EPSILON {
                    phi.cos()
                } else {
                    &(&phi_new - &phi) / &m
                };

                let lambda_new =
                    &lambda - &(&(&beta.sin() * &Var::constant(tape, d_r)) / &q);

                phi = phi_new;
                lambda = lambda_new;
                positions.push(Coordinate::from_degrees(
                    phi.value().to_degrees(),
                    lambda.value().to_degrees(),
                ));
            }
        }
    }

    Ok(ForwardResult { positions, residuals, loss, leaves: (phi0, lambda0, eps_deg) })
}

/// Convenience wrapper used by tests and the orchestrator: runs
/// [`forward`] and immediately takes the reverse-mode gradient of the
/// loss with respect to the three [`NavigationState`] components, plus
/// their values.
pub struct Gradient {
    /// d(loss)/d(starting_lat_rad).
    pub d_lat: f64,
    /// d(loss)/d(starting_lon_rad).
    pub d_lon: f64,
    /// d(loss)/d(observation_error_deg).
    pub d_eps: f64,
    /// The loss value at this `state`.
    pub loss_value: f64,
    /// The full positions list visited by the replay at this `state`,
    /// seed first and final fix last (spec §4.6's "positions list").
    pub positions: Vec<Coordinate>,
    /// Per-observation residuals (nautical miles).
    pub residuals: Vec<f64>,
}

/// Runs [`forward`] then [`backward`], collecting the gradient with
/// respect to the three state parameters.
pub fn evaluate(
    state: NavigationState,
    log: &FixLog,
    magnetic_bearing_weight: f64,
) -> Result<Gradient> {
    let tape = Tape::new();
    let result = forward(&tape, state, log, magnetic_bearing_weight)?;
    let loss_value = result.loss.value();
    let grads = backward(&result.loss);

    let d_lat = grads.wrt(&result.leaves.0);
    let d_lon = grads.wrt(&result.leaves.1);
    let d_eps = grads.wrt(&result.leaves.2);

    Ok(Gradient {
        d_lat,
        d_lon,
        d_eps,
        loss_value,
        positions: result.positions,
        residuals: result.residuals,
    })
}
