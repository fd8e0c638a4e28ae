//! Angle and coordinate primitives (C1).
//!
//! An [`Angle`] is a scalar real angle, stored canonically in radians and
//! exposed in degrees, radians, or signed degrees-minutes form. A
//! [`Coordinate`] is a `(lat, lon)` pair of angles. All angle arithmetic on
//! a circle goes through [`normalize`], which maps into `(-180°, 180°]`.

use crate::error::{FixError, Result};

/// A scalar angle, stored canonically in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    /// Constructs an angle from radians.
    pub fn from_radians(radians: f64) -> Self {
        Angle { radians }
    }

    /// Constructs an angle from decimal degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        Angle { radians: degrees.to_radians() }
    }

    /// Value in radians.
    pub fn radians(self) -> f64 {
        self.radians
    }

    /// Value in decimal degrees.
    pub fn degrees(self) -> f64 {
        self.radians.to_degrees()
    }

    /// Maps this angle into `(-180°, 180°]`.
    pub fn normalized(self) -> Angle {
        normalize(self)
    }

    /// Formats this angle as degrees-decimal-minutes with a trailing
    /// hemisphere glyph, e.g. ` 46°36.5′N`. See [`format_dm`].
    pub fn format_dm(self, pos_sign: char, neg_sign: char) -> String {
        format_dm(self, pos_sign, neg_sign)
    }
}

/// Builds a signed angle in decimal degrees from degrees/minutes/seconds.
/// The sign is carried entirely by `d` (and, for `d == 0`, by the caller
/// negating the result) — this mirrors the prototype's `dms()` helper,
/// which is always called with a non-negative `d` and relies on the
/// sextant-reading convention that altitudes and corrections are never
/// input as `-0°xx'`.
pub fn dms(d: f64, m: f64, s: f64) -> f64 {
    let sign = if d < 0.0 { -1.0 } else { 1.0 };
    sign * (d.abs() + m / 60.0 + s / 3600.0)
}

/// Normalizes an angle into `(-180°, 180°]`.
pub fn normalize(a: Angle) -> Angle {
    let deg = a.degrees();
    // rem_euclid keeps `deg + 180` in [0, 360), so subtracting 180 lands in
    // [-180, 180). The one point we still need to fix up is exactly -180,
    // which the half-open target range excludes in favor of +180.
    let mut wrapped = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped = 180.0;
    }
    Angle::from_degrees(wrapped)
}

/// Formats an angle as degrees-decimal-minutes to one decimal place, e.g.
/// ` 46°36.5′N`. Rounding is half-to-even on tenths of an arcminute; the
/// sign glyph follows the value (`pos_sign` for `>= 0`, `neg_sign`
/// otherwise).
pub fn format_dm(a: Angle, pos_sign: char, neg_sign: char) -> String {
    let deg = a.degrees();
    let side = if deg >= 0.0 { pos_sign } else { neg_sign };

    // Round to the nearest tenth of an arcminute (half-to-even), matching
    // the prototype's `np.round(degrees * 600.0) / 600.0`.
    let tenths_of_arcmin = deg.abs() * 600.0;
    let rounded_tenths = round_half_to_even(tenths_of_arcmin);
    let total_minutes = rounded_tenths / 10.0;

    let d = (total_minutes / 60.0).floor();
    let m = total_minutes - d * 60.0;

    format!("{:3.0}°{:04.1}′{}", d, m, side)
}

fn round_half_to_even(x: f64) -> f64 {
    let floor = x.floor();
    let frac = x - floor;
    if (frac - 0.5).abs() < 1e-9 {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        x.round()
    }
}

/// A geographic position: latitude in `[-90°, 90°]`, longitude in
/// `(-180°, 180°]`. Longitude is undefined (and carries an arbitrary
/// value) at the poles, where `|lat| == 90°`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude, positive north.
    pub lat: Angle,
    /// Longitude, positive east, normalized to `(-180°, 180°]`.
    pub lon: Angle,
}

impl Coordinate {
    /// Builds a coordinate from latitude/longitude in degrees, normalizing
    /// the longitude.
    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Coordinate {
            lat: Angle::from_degrees(lat_deg),
            lon: normalize(Angle::from_degrees(lon_deg)),
        }
    }

    /// Formats as ` DDD°MM.M′H  DDD°MM.M′H` (spec §6 `format_coord`).
    pub fn format(self) -> String {
        format!(
            "{} {}",
            format_dm(self.lat, 'N', 'S'),
            format_dm(self.lon, 'E', 'W')
        )
    }
}

/// Converts a coordinate to a unit Cartesian vector:
/// `x = cos(lat)cos(lon)`, `y = cos(lat)sin(lon)`, `z = sin(lat)`.
pub fn coord_to_vec(coord: Coordinate) -> (f64, f64, f64) {
    let lat = coord.lat.radians();
    let lon = coord.lon.radians();
    let cos_lat = lat.cos();
    (cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin())
}

/// Recovers a coordinate from a Cartesian vector. The vector is normalized
/// first; `lat = asin(z)`, `lon = atan2(y, x)`, both renormalized.
///
/// # Errors
/// Returns [`FixError::DegenerateVector`] if `‖v‖ == 0`.
pub fn vec_to_coord(v: (f64, f64, f64)) -> Result<Coordinate> {
    let (x, y, z) = v;
    let norm = (x * x + y * y + z * z).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(FixError::DegenerateVector);
    }
    let (x, y, z) = (x / norm, y / norm, z / norm);

    let lat = normalize(Angle::from_radians(z.clamp(-1.0, 1.0).asin()));
    let lon = normalize(Angle::from_radians(y.atan2(x)));
    Ok(Coordinate { lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dms_positive() {
        assert_relative_eq!(dms(46.0, 36.0, 30.0), 46.0 + 36.5 / 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dms_negative() {
        assert_relative_eq!(dms(-46.0, 36.0, 0.0), -(46.0 + 36.0 / 60.0), epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_idempotent() {
        for deg in [0.0, 180.0, -180.0, 270.0, -270.0, 540.0, -540.0, 0.3] {
            let a = normalize(Angle::from_degrees(deg));
            let b = normalize(a);
            assert_relative_eq!(a.degrees(), b.degrees(), epsilon = 1e-9);
            assert!(a.degrees() > -180.0 && a.degrees() <= 180.0);
        }
    }

    #[test]
    fn test_normalize_boundary() {
        assert_relative_eq!(normalize(Angle::from_degrees(180.0)).degrees(), 180.0, epsilon = 1e-9);
        assert_relative_eq!(normalize(Angle::from_degrees(-180.0)).degrees(), 180.0, epsilon = 1e-9);
        assert_relative_eq!(normalize(Angle::from_degrees(360.0)).degrees(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip_coord_vec() {
        let table = [(0.0, 0.0), (10.0, 20.0), (-40.0, 170.0), (89.0, -179.0), (-89.0, 1.0)];
        for (lat, lon) in table {
            let c = Coordinate::from_degrees(lat, lon);
            let v = coord_to_vec(c);
            let back = vec_to_coord(v).unwrap();
            assert_relative_eq!(back.lat.radians(), c.lat.radians(), epsilon = 1e-9);
            assert_relative_eq!(back.lon.radians(), c.lon.radians(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_coord_to_vec_known_points() {
        let table = [
            ((0.0, 0.0), (1.0, 0.0, 0.0)),
            ((0.0, 90.0), (0.0, 1.0, 0.0)),
            ((0.0, 180.0), (-1.0, 0.0, 0.0)),
            ((90.0, 0.0), (0.0, 0.0, 1.0)),
            ((-90.0, 0.0), (0.0, 0.0, -1.0)),
        ];
        for ((lat, lon), (x, y, z)) in table {
            let v = coord_to_vec(Coordinate::from_degrees(lat, lon));
            assert_relative_eq!(v.0, x, epsilon = 1e-9);
            assert_relative_eq!(v.1, y, epsilon = 1e-9);
            assert_relative_eq!(v.2, z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_vec_to_coord_degenerate() {
        assert_eq!(vec_to_coord((0.0, 0.0, 0.0)), Err(FixError::DegenerateVector));
    }

    #[test]
    fn test_format_dm() {
        // 46°36.5'N from dms(46, 36, 30)
        let a = Angle::from_degrees(dms(46.0, 36.0, 30.0));
        assert_eq!(format_dm(a, 'N', 'S'), " 46°36.5′N");
    }

    #[test]
    fn test_format_dm_negative() {
        let a = Angle::from_degrees(-dms(54.0, 0.0, 6.0));
        assert_eq!(format_dm(a, 'N', 'S'), " 54°00.1′S");
    }

    #[test]
    fn test_format_coord() {
        let c = Coordinate::from_degrees(dms(29.0, 41.0, 0.0), -dms(36.0, 57.0, 18.0));
        assert_eq!(c.format(), " 29°41.0′N  36°57.3′W");
    }
}
