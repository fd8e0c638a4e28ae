//! External collaborator boundary (C3): the ephemeris provider, star
//! catalog, and time library the spec declares out of scope, plus the GP
//! resolver that sits on top of them.
//!
//! These are interfaces only — no almanac or first-principles ephemeris
//! computation lives in this crate. `Instant` construction is grounded on
//! the teacher's `time::julian_date` (`src/time.rs`); everything past that
//! (observing a star, naming it) is a trait a caller supplies.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use once_cell::sync::OnceCell;

use crate::angle::{normalize, Angle, Coordinate};
use crate::error::{FixError, Result};

/// A UT1 instant, stored as a Julian Date. `Copy` and totally ordered by
/// time; the only operation the spec asks of it is differencing into
/// fractional days.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Instant {
    julian_day: f64,
}

impl Instant {
    /// Builds an instant directly from a Julian Date.
    pub fn from_julian_day(julian_day: f64) -> Self {
        Instant { julian_day }
    }

    /// The underlying Julian Date.
    pub fn julian_day(self) -> f64 {
        self.julian_day
    }

    /// `self - other`, in fractional days. Matches spec §6: "difference
    /// between instants yields fractional days."
    pub fn diff_days(self, other: Instant) -> f64 {
        self.julian_day - other.julian_day
    }
}

/// Constructs a UT1 [`Instant`] from a wall-clock tuple and a whole-hour
/// timezone offset, per spec §6. Fractional-hour offsets are out of scope
/// (the spec's own restriction); callers with e.g. UTC+5:30 should
/// pre-convert to UT1 before calling.
///
/// The calendar tuple is built and validated through `chrono` (rejecting
/// e.g. `month: 13` or `day: 31` in February) rather than hand-rolled
/// arithmetic, the way the teacher's `astro_math::time::julian_date` takes
/// an already-validated `chrono::DateTime<Utc>` and pulls fields back out
/// via `Datelike`/`Timelike`. The Julian Date formula itself is the same
/// one `julian_date` uses.
///
/// # Panics
/// Panics if `(year, month, day, hour, minute)` is not a valid UTC instant.
pub fn ut1_instant(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
    tz_hours: f64,
) -> Instant {
    let whole_seconds = second.floor() as u32;
    let nanos = ((second - whole_seconds as f64) * 1e9).round() as u32;

    let local = Utc
        .with_ymd_and_hms(year, month, day, hour, minute, whole_seconds)
        .single()
        .expect("invalid calendar date/time")
        + Duration::nanoseconds(nanos as i64);

    let tz_offset = Duration::milliseconds((tz_hours * 3_600_000.0).round() as i64);
    let ut1 = local - tz_offset;

    Instant::from_julian_day(julian_date(ut1))
}

/// Julian Date of a UTC instant. Same formula as the teacher's
/// `astro_math::time::julian_date`.
fn julian_date(datetime: DateTime<Utc>) -> f64 {
    let year = datetime.year();
    let month = datetime.month();
    let day = datetime.day() as f64;

    let (y, m) = if month <= 2 { (year - 1, month as i32 + 12) } else { (year, month as i32) };
    let a = (y as f64 / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    let hour = datetime.hour() as f64;
    let minute = datetime.minute() as f64;
    let second = datetime.second() as f64 + datetime.nanosecond() as f64 / 1e9;
    let frac_day = (hour + minute / 60.0 + second / 3600.0) / 24.0;

    (365.25 * (y as f64 + 4716.0)).floor()
        + (30.6001 * (m as f64 + 1.0)).floor()
        + day
        + frac_day
        + b
        - 1524.5
}

/// A star catalog identifier. Opaque to this crate; meaningful only to the
/// [`StarCatalog`]/[`EphemerisProvider`] pair that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StarId(pub String);

/// Apparent right ascension/declination of a star at a given instant, in
/// the units spec §6 specifies: hours and degrees respectively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApparentPosition {
    /// Right ascension, in hours.
    pub ra_hours: f64,
    /// Declination, in degrees.
    pub dec_degrees: f64,
}

/// The ephemeris collaborator: apparent star positions and sidereal time.
/// Implementations may wrap a real almanac/kernel; this crate never
/// computes one.
pub trait EphemerisProvider {
    /// Apparent RA/Dec of `star`, including aberration and nutation, at
    /// `instant`.
    fn observe_star(&self, star: &StarId, instant: Instant) -> ApparentPosition;

    /// Greenwich apparent sidereal time at `instant`, in hours.
    fn gast(&self, instant: Instant) -> f64;
}

/// The star catalog collaborator: human-readable names to catalog ids.
pub trait StarCatalog {
    /// Looks up `name`, returning its catalog id or `None`.
    fn lookup(&self, name: &str) -> Option<StarId>;
}

/// The time collaborator: builds [`Instant`]s from wall-clock tuples.
/// [`ut1_instant`] already implements this directly; the trait exists so
/// callers can swap in a library-backed implementation (e.g. one that
/// also validates calendar dates) without touching the GP resolver.
pub trait TimeProvider {
    /// Builds a UT1 instant from a wall-clock tuple and whole-hour tz
    /// offset.
    fn ut1(
        &self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: f64,
        tz_hours: f64,
    ) -> Instant;
}

/// A [`TimeProvider`] backed directly by [`ut1_instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ut1TimeProvider;

impl TimeProvider for Ut1TimeProvider {
    fn ut1(
        &self,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: f64,
        tz_hours: f64,
    ) -> Instant {
        ut1_instant(year, month, day, hour, minute, second, tz_hours)
    }
}

/// Process-wide, lazily-initialized, immutable handle to the ephemeris and
/// catalog collaborators. Spec §5: "Ephemeris kernel data and star catalog
/// are process-wide, immutable after lazy initialization... Initialization
/// must be idempotent and safe under repeated invocation." `OnceCell`
/// gives exactly that: the first caller to reach [`Collaborators::get_or_init`]
/// runs `init`; every later caller (on any thread) gets the same handle
/// without re-running it.
///
/// The teacher reaches for `lazy_static!` for its own process-wide state
/// (compiled regexes in `location.rs`), but those are eagerly constructed
/// from a `const` pattern with no fallible, caller-supplied initializer.
/// This crate's ephemeris/catalog handle is supplied by the binary at
/// startup (it may come from disk or network), so `once_cell::sync::OnceCell`
/// — populated once via `get_or_init` — is the closer fit.
pub struct Collaborators<E, C> {
    ephemeris: E,
    catalog: C,
}

impl<E, C> Collaborators<E, C>
where
    E: EphemerisProvider,
    C: StarCatalog,
{
    /// Wraps an already-constructed ephemeris/catalog pair.
    pub fn new(ephemeris: E, catalog: C) -> Self {
        Collaborators { ephemeris, catalog }
    }

    /// Resolves `name`'s geographic position at `instant`, per spec §4.3:
    /// `lat = declination`, `lon = normalize(-GHA)`,
    /// `GHA = mod(GAST*15 - RA*15, 360)`.
    pub fn star_gp(&self, name: &str, instant: Instant) -> Result<Coordinate> {
        let star_id = self
            .catalog
            .lookup(name)
            .ok_or_else(|| FixError::UnknownStar { name: name.to_string() })?;
        let pos = self.ephemeris.observe_star(&star_id, instant);
        let gast_deg = self.ephemeris.gast(instant) * 15.0;
        let ra_deg = pos.ra_hours * 15.0;
        let gha = (gast_deg - ra_deg).rem_euclid(360.0);

        let lat = Angle::from_degrees(pos.dec_degrees);
        let lon = normalize(Angle::from_degrees(-gha));
        Ok(Coordinate { lat, lon })
    }
}

/// A process-wide [`OnceCell`] a binary can use to hold its
/// `Collaborators` handle for the lifetime of the process, per spec §5.
/// Generic over the caller's concrete provider types so this crate never
/// has to commit to one.
pub static GLOBAL_COLLABORATORS: OnceCell<Box<dyn StarGpResolver>> = OnceCell::new();

/// Object-safe wrapper so [`GLOBAL_COLLABORATORS`] can hold any
/// `Collaborators<E, C>` behind a single trait object.
pub trait StarGpResolver: Send + Sync {
    /// See [`Collaborators::star_gp`].
    fn star_gp(&self, name: &str, instant: Instant) -> Result<Coordinate>;
}

impl<E, C> StarGpResolver for Collaborators<E, C>
where
    E: EphemerisProvider + Send + Sync,
    C: StarCatalog + Send + Sync,
{
    fn star_gp(&self, name: &str, instant: Instant) -> Result<Coordinate> {
        Collaborators::star_gp(self, name, instant)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Fixture ephemeris/catalog implementations for this crate's own
    //! tests. No real almanac or catalog data is bundled (spec's
    //! ephemeris/catalog collaborators are out of scope for this crate);
    //! these fixtures let C3's formula and the orchestrator's wiring be
    //! exercised without one.

    use super::*;
    use std::collections::HashMap;

    /// A fixed RA/Dec/GAST fixture: every instant maps to the same GAST,
    /// and every star has a fixed RA/Dec independent of time (no
    /// proper-motion or nutation modeling — this is a test fixture, not an
    /// ephemeris).
    pub struct FixtureEphemeris {
        pub gast_hours: f64,
        pub stars: HashMap<String, ApparentPosition>,
    }

    impl EphemerisProvider for FixtureEphemeris {
        fn observe_star(&self, star: &StarId, _instant: Instant) -> ApparentPosition {
            self.stars[&star.0]
        }

        fn gast(&self, _instant: Instant) -> f64 {
            self.gast_hours
        }
    }

    pub struct FixtureCatalog {
        pub names: HashMap<String, StarId>,
    }

    impl StarCatalog for FixtureCatalog {
        fn lookup(&self, name: &str) -> Option<StarId> {
            self.names.get(name).cloned()
        }
    }

    pub fn fixture_collaborators(
        gast_hours: f64,
        stars: &[(&str, f64, f64)],
    ) -> Collaborators<FixtureEphemeris, FixtureCatalog> {
        let mut positions = HashMap::new();
        let mut names = HashMap::new();
        for &(name, ra_hours, dec_degrees) in stars {
            let id = StarId(name.to_string());
            positions.insert(name.to_string(), ApparentPosition { ra_hours, dec_degrees });
            names.insert(name.to_string(), id);
        }
        Collaborators::new(FixtureEphemeris { gast_hours, stars: positions }, FixtureCatalog { names })
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::fixture_collaborators;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_star_gp_formula() {
        // GAST = 10h, RA = 4h, Dec = 30deg -> GHA = (150 - 60) mod 360 = 90
        // lon = normalize(-90) = -90
        let collabs = fixture_collaborators(10.0, &[("Regulus", 4.0, 30.0)]);
        let gp = collabs.star_gp("Regulus", Instant::from_julian_day(0.0)).unwrap();
        assert_relative_eq!(gp.lat.degrees(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(gp.lon.degrees(), -90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_star_gp_unknown_star() {
        let collabs = fixture_collaborators(0.0, &[]);
        let err = collabs.star_gp("Nonexistent", Instant::from_julian_day(0.0)).unwrap_err();
        assert!(matches!(err, FixError::UnknownStar { .. }));
    }

    #[test]
    fn test_instant_diff_days() {
        let a = Instant::from_julian_day(2451545.0);
        let b = Instant::from_julian_day(2451544.5);
        assert_relative_eq!(a.diff_days(b), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ut1_instant_j2000() {
        let instant = ut1_instant(2000, 1, 1, 12, 0, 0.0, 0.0);
        assert_relative_eq!(instant.julian_day(), 2451545.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ut1_instant_applies_timezone() {
        // 2000-01-01 12:00 at tz=-5 is 2000-01-01 17:00 UT1.
        let tz = ut1_instant(2000, 1, 1, 12, 0, 0.0, -5.0);
        let utc = ut1_instant(2000, 1, 1, 17, 0, 0.0, 0.0);
        assert_relative_eq!(tz.julian_day(), utc.julian_day(), epsilon = 1e-9);
    }
}
