//! Orchestrator (C7): assembles C2–C6 into a single end-to-end `fix()`
//! entry point.
//!
//! Grounded on the prototype's `CelestialFix.fix`
//! (`examples/original_source/mctoon_global_navigation_challenge.py`),
//! which logs the coarse radius, per-star residuals, estimated bias, and
//! final position list at the configured verbosity — reproduced here via
//! the `log` facade rather than bespoke print statements, per SPEC_FULL
//! §10.2.

use log::info;

use crate::angle::Coordinate;
use crate::coarse_fix::fix_global_rough;
use crate::collaborators::{Instant, StarGpResolver};
use crate::correction::ObservationParams;
use crate::error::Result;
use crate::fix_log::FixLog;
use crate::navigation_model::NavigationState;
use crate::optimizer::{fine_fix, FineFixReport};

/// A single fix session: an observer's fix log plus the correction
/// parameters and collaborator handle it was built with. Mirrors the
/// prototype's `CelestialFix` instance.
pub struct FixSession<'a> {
    log: FixLog,
    params: ObservationParams,
    resolver: &'a dyn StarGpResolver,
    magnetic_bearing_weight: f64,
}

impl<'a> FixSession<'a> {
    /// Starts a new session against `resolver` (the ephemeris/catalog
    /// collaborator pair), using `params` for every subsequent sextant
    /// correction.
    pub fn new(resolver: &'a dyn StarGpResolver, params: ObservationParams) -> Self {
        FixSession {
            log: FixLog::new(),
            params,
            resolver,
            magnetic_bearing_weight: 0.0,
        }
    }

    /// Enables the magnetic-bearing residual term at `weight` (disabled,
    /// i.e. weight `0.0`, by default — spec §9's open question,
    /// SPEC_FULL §11).
    pub fn set_magnetic_bearing_weight(&mut self, weight: f64) {
        self.magnetic_bearing_weight = weight;
    }

    /// Updates the ambient motion state applied to subsequent
    /// observations (spec §4.4).
    pub fn set_bearing_speed(&mut self, bearing_deg: f64, speed_knots: f64) {
        self.log.set_bearing_speed(bearing_deg, speed_knots);
    }

    /// Corrects `alt_sextant_deg` via C2, resolves `star_name`'s GP via
    /// C3, and appends the observation (and, if applicable, a synthesized
    /// motion leg) to the log (spec §4.4).
    pub fn add_observation(
        &mut self,
        star_name: &str,
        instant: Instant,
        instant_days: f64,
        alt_sextant_deg: f64,
        mag_deg: Option<f64>,
    ) -> Result<()> {
        let alt_observed_deg = self.params.corrected_altitude(alt_sextant_deg);
        let gp = self.resolver.star_gp(star_name, instant)?;
        self.log.add_observation(
            star_name,
            instant_days,
            gp,
            crate::angle::Angle::from_degrees(alt_observed_deg),
            mag_deg.map(crate::angle::Angle::from_degrees),
        )
    }

    /// Runs the full C5 → C6 pipeline (spec §4.7) and returns the final
    /// fix along with diagnostics.
    pub fn fix(&self) -> Result<FixOutcome> {
        let coarse = fix_global_rough(&self.log)?;
        info!("coarse fix: {}", coarse.format());

        let seed = NavigationState::seeded_from(coarse);
        let report = fine_fix(seed, &self.log, self.magnetic_bearing_weight)?;

        for (i, r) in report.residuals.iter().enumerate() {
            info!("observation {i}: residual = {r:.3} NM");
        }
        info!("estimated altitude bias: {:.4}°", report.state.observation_error_deg);

        for (i, pos) in report.final_positions.iter().enumerate() {
            info!("position {i}: {}", pos.format());
        }

        let fix_position = *report
            .final_positions
            .last()
            .expect("fine_fix always evaluates at least one final position");

        Ok(FixOutcome { coarse, report, position: fix_position })
    }
}

/// The result of [`FixSession::fix`]: the coarse fix, the full fine-fix
/// report (including the per-iteration loss trace), and the final
/// position.
pub struct FixOutcome {
    /// The C5 coarse global fix.
    pub coarse: Coordinate,
    /// The full C6 fine-fix report.
    pub report: FineFixReport,
    /// The final fix position — `format()` this for display.
    pub position: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fixtures::fixture_collaborators;

    fn great_circle_distance_rad(a: Coordinate, b: Coordinate) -> f64 {
        let dlat = b.lat.radians() - a.lat.radians();
        let dlon = b.lon.radians() - a.lon.radians();
        let h = (dlat / 2.0).sin().powi(2)
            + a.lat.radians().cos() * b.lat.radians().cos() * (dlon / 2.0).sin().powi(2);
        2.0 * h.sqrt().atan2((1.0 - h).sqrt())
    }

    #[test]
    fn test_end_to_end_synthetic_fix() {
        let truth = Coordinate::from_degrees(29.683, -36.955);
        let gps = [
            Coordinate::from_degrees(11.9, -170.0),
            Coordinate::from_degrees(19.1, -146.0),
            Coordinate::from_degrees(61.6, -194.0),
        ];

        // GAST/RA/Dec chosen so star_gp() reproduces each gp exactly
        // (lat = dec; lon = normalize(-GHA), GHA = mod(gast*15 - ra*15, 360)).
        let gast_hours = 0.0;
        let mut stars = Vec::new();
        for (i, gp) in gps.iter().enumerate() {
            let dec = gp.lat.degrees();
            let gha = -gp.lon.degrees();
            let ra_hours = (gast_hours * 15.0 - gha).rem_euclid(360.0) / 15.0;
            stars.push((format!("s{i}"), ra_hours, dec));
        }
        let star_refs: Vec<(&str, f64, f64)> =
            stars.iter().map(|(n, ra, dec)| (n.as_str(), *ra, *dec)).collect();
        let collabs = fixture_collaborators(gast_hours, &star_refs);

        let mut session = FixSession::new(&collabs, ObservationParams { needs_correction: false, ..Default::default() });
        for (i, gp) in gps.iter().enumerate() {
            let dist_rad = great_circle_distance_rad(truth, *gp);
            let alt_deg = 90.0 - dist_rad.to_degrees();
            session
                .add_observation(&format!("s{i}"), Instant::from_julian_day(i as f64), i as f64, alt_deg, None)
                .unwrap();
        }

        let outcome = session.fix().unwrap();
        assert!((outcome.position.lat.degrees() - truth.lat.degrees()).abs() < 0.2);
        assert!((outcome.position.lon.degrees() - truth.lon.degrees()).abs() < 0.2);
    }

    #[test]
    fn test_unknown_star_propagates() {
        let collabs = fixture_collaborators(0.0, &[]);
        let mut session = FixSession::new(&collabs, ObservationParams::default());
        let err = session
            .add_observation("Nonexistent", Instant::from_julian_day(0.0), 0.0, 45.0, None)
            .unwrap_err();
        assert!(matches!(err, crate::error::FixError::UnknownStar { .. }));
    }

    #[test]
    fn test_underdetermined_propagates_from_fix() {
        let collabs = fixture_collaborators(0.0, &[("s0", 0.0, 0.0), ("s1", 0.0, 10.0)]);
        let mut session = FixSession::new(&collabs, ObservationParams { needs_correction: false, ..Default::default() });
        session.add_observation("s0", Instant::from_julian_day(0.0), 0.0, 45.0, None).unwrap();
        session.add_observation("s1", Instant::from_julian_day(0.0), 1.0, 45.0, None).unwrap();
        let err = session.fix().unwrap_err();
        assert!(matches!(err, crate::error::FixError::Underdetermined { .. }));
    }
}
