//! Sextant correction (C2): converts a sextant altitude (Hs) to an
//! observed altitude (Ho) via index error, dip, refraction, and
//! semidiameter.
//!
//! The refraction model is Bennett (1982), scaled for temperature and
//! pressure, matching the prototype's `ObservationParams.refraction_correction`
//! (`examples/original_source/mctoon_global_navigation_challenge.py`).

use log::debug;

/// Instrument and environment configuration for the sextant correction.
///
/// `Copy` by design (spec §9 open question): each `FixSession`/observation
/// holds its own value rather than sharing one by reference, so a caller
/// mutating a "default params" value later can never retroactively change
/// an already-recorded observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationParams {
    /// Signed arcminutes; positive means the sextant reads too high
    /// (subtracted during correction).
    pub index_error_min: f64,
    /// Observer's eye height above sea level, in meters. Must be `>= 0`.
    pub eye_height_m: f64,
    /// Signed arcminutes, applied additively to the apparent altitude.
    /// Zero for point-source stars; plumbed through for sun/moon/planet
    /// extensibility (spec §1 non-goals).
    pub semidiameter_correction_min: f64,
    /// Ambient temperature, in Celsius, for the refraction model.
    pub temperature_degc: f64,
    /// Ambient pressure, in hectopascals, for the refraction model.
    pub pressure_hpa: f64,
    /// If `false`, `corrected_altitude` passes `Hs` through unchanged —
    /// used for synthetic/test inputs that already are observed altitudes.
    pub needs_correction: bool,
}

impl Default for ObservationParams {
    fn default() -> Self {
        ObservationParams {
            index_error_min: 0.0,
            eye_height_m: 0.0,
            semidiameter_correction_min: 0.0,
            temperature_degc: 10.0,
            pressure_hpa: 1010.0,
            needs_correction: true,
        }
    }
}

impl ObservationParams {
    /// Converts a sextant altitude (Hs, degrees) to an observed altitude
    /// (Ho, degrees).
    pub fn corrected_altitude(&self, alt_sextant_deg: f64) -> f64 {
        if !self.needs_correction {
            return alt_sextant_deg;
        }

        let apparent_deg =
            alt_sextant_deg - self.index_error_min / 60.0 + self.dip_correction_deg();
        debug!("  Ha: {apparent_deg:.4}°");

        let observed_deg = apparent_deg
            + self.refraction_correction_deg(apparent_deg)
            + self.semidiameter_correction_min / 60.0;
        debug!("  Ho: {observed_deg:.4}°");

        observed_deg
    }

    /// Dip correction, in degrees. Always non-positive; the apparent
    /// horizon dips below the true horizontal plane as eye height grows.
    pub fn dip_correction_deg(&self) -> f64 {
        let minutes = 1.76 * self.eye_height_m.sqrt();
        -minutes / 60.0
    }

    /// Refraction correction, in degrees, for an apparent altitude.
    /// Bennett (1982), scaled for temperature/pressure. Always
    /// non-positive for `Ha` in `(0°, 90°]` at standard conditions —
    /// refraction raises the apparent altitude, so the correction that
    /// removes it is negative.
    pub fn refraction_correction_deg(&self, apparent_alt_deg: f64) -> f64 {
        let h = apparent_alt_deg;
        let r_mean = 1.0 / (h + 7.31 / (h + 4.4)).to_radians().tan();
        let r = r_mean * (self.pressure_hpa - 80.0) / 930.0
            / (1.0 + 8e-5 * (r_mean + 30.0) * (self.temperature_degc - 10.0));
        debug!("  refraction: {:.4}′", -r);
        -r / 60.0
    }
}
