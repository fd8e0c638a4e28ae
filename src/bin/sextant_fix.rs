//! `sextant-fix` CLI: builds a fix session from the command line, adds
//! observations, and prints the resulting fix.
//!
//! Spec §6: "a single entry point that constructs a Fix session, adds
//! observations (star name, UT1 instant, sextant altitude in decimal
//! degrees, optional magnetic bearing), and prints the fix. No flags are
//! required for the core; verbosity and configuration are
//! implementation-defined."
//!
//! This binary ships a tiny built-in [`DemoCatalog`]/[`DemoEphemeris`]
//! pair for the handful of named stars spec §8's scenarios use — fixed
//! RA/Dec with no proper motion, nutation, or aberration applied. It is
//! a stand-in for the real ephemeris/catalog collaborator the spec
//! declares out of scope (§1), not a source of navigationally valid
//! fixes; see `DESIGN.md`.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use sextant_fix::collaborators::{
    ApparentPosition, Collaborators, EphemerisProvider, Instant, StarCatalog, StarGpResolver,
    StarId, TimeProvider, Ut1TimeProvider, GLOBAL_COLLABORATORS,
};
use sextant_fix::correction::ObservationParams;
use sextant_fix::orchestrator::FixSession;

#[derive(Parser)]
#[command(name = "sextant-fix", about = "Geographic fix from celestial sextant observations")]
struct Cli {
    /// Increase log verbosity (-v for info, -vv for debug, -vvv for trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a fix from a set of observations.
    Fix(FixArgs),
}

#[derive(Args)]
struct FixArgs {
    /// One observation, repeatable: `NAME@YYYY-MM-DDTHH:MM:SS=ALT_DEG[,MAG_DEG]`.
    #[arg(long = "observe", required = true)]
    observe: Vec<String>,

    /// Whole-hour timezone offset applied to each observation's timestamp.
    #[arg(long = "tz", default_value_t = 0.0)]
    tz_hours: f64,

    /// Ambient true bearing, in degrees, for rhumb-line dead reckoning
    /// between observations.
    #[arg(long = "bearing", default_value_t = 0.0)]
    bearing_deg: f64,

    /// Ambient speed made good, in knots.
    #[arg(long = "speed", default_value_t = 0.0)]
    speed_knots: f64,

    /// Sextant index error, in arcminutes (positive: sextant reads high).
    #[arg(long = "index-error", default_value_t = 0.0)]
    index_error_min: f64,

    /// Observer's eye height above sea level, in meters.
    #[arg(long = "eye-height", default_value_t = 0.0)]
    eye_height_m: f64,

    /// Ambient temperature, in Celsius, for the refraction model.
    #[arg(long = "temperature", default_value_t = 10.0)]
    temperature_degc: f64,

    /// Ambient pressure, in hectopascals, for the refraction model.
    #[arg(long = "pressure", default_value_t = 1010.0)]
    pressure_hpa: f64,

    /// Skip sextant correction entirely — inputs are already observed
    /// altitudes.
    #[arg(long = "no-correction")]
    no_correction: bool,

    /// Enable the magnetic-bearing residual term at this weight
    /// (disabled, weight 0, by default).
    #[arg(long = "magnetic-bearing-weight", default_value_t = 0.0)]
    magnetic_bearing_weight: f64,
}

/// A parsed `--observe` argument.
struct ObserveArg {
    star_name: String,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
    alt_sextant_deg: f64,
    mag_deg: Option<f64>,
}

fn parse_observe(raw: &str) -> Result<ObserveArg, String> {
    let (star_name, rest) = raw
        .split_once('@')
        .ok_or_else(|| format!("--observe {raw:?}: missing '@' before the timestamp"))?;
    let (timestamp, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("--observe {raw:?}: missing '=' before the altitude"))?;

    let (date_part, time_part) = timestamp
        .split_once('T')
        .ok_or_else(|| format!("--observe {raw:?}: timestamp must be YYYY-MM-DDTHH:MM:SS"))?;
    let date_fields: Vec<&str> = date_part.split('-').collect();
    let time_fields: Vec<&str> = time_part.split(':').collect();
    if date_fields.len() != 3 || time_fields.len() != 3 {
        return Err(format!("--observe {raw:?}: timestamp must be YYYY-MM-DDTHH:MM:SS"));
    }
    let year: i32 = date_fields[0].parse().map_err(|_| format!("{raw:?}: bad year"))?;
    let month: u32 = date_fields[1].parse().map_err(|_| format!("{raw:?}: bad month"))?;
    let day: u32 = date_fields[2].parse().map_err(|_| format!("{raw:?}: bad day"))?;
    let hour: u32 = time_fields[0].parse().map_err(|_| format!("{raw:?}: bad hour"))?;
    let minute: u32 = time_fields[1].parse().map_err(|_| format!("{raw:?}: bad minute"))?;
    let second: f64 = time_fields[2].parse().map_err(|_| format!("{raw:?}: bad second"))?;

    let (alt_str, mag_str) = match value.split_once(',') {
        Some((a, m)) => (a, Some(m)),
        None => (value, None),
    };
    let alt_sextant_deg: f64 =
        alt_str.parse().map_err(|_| format!("{raw:?}: bad altitude {alt_str:?}"))?;
    let mag_deg = mag_str
        .map(|m| m.parse::<f64>().map_err(|_| format!("{raw:?}: bad magnetic bearing {m:?}")))
        .transpose()?;

    Ok(ObserveArg {
        star_name: star_name.to_string(),
        year,
        month,
        day,
        hour,
        minute,
        second,
        alt_sextant_deg,
        mag_deg,
    })
}

/// Fixed RA/Dec/GAST demo data for the named stars spec §8's scenarios
/// use. Not a real ephemeris: no proper motion, nutation, or aberration.
struct DemoEphemeris {
    stars: HashMap<&'static str, ApparentPosition>,
}

impl DemoEphemeris {
    fn new() -> Self {
        let mut stars = HashMap::new();
        stars.insert("Polaris", ApparentPosition { ra_hours: 2.95, dec_degrees: 89.26 });
        stars.insert("Regulus", ApparentPosition { ra_hours: 10.14, dec_degrees: 11.97 });
        stars.insert("Arcturus", ApparentPosition { ra_hours: 14.26, dec_degrees: 19.18 });
        stars.insert("Dubhe", ApparentPosition { ra_hours: 11.06, dec_degrees: 61.75 });
        stars.insert("Alkaid", ApparentPosition { ra_hours: 13.79, dec_degrees: 49.31 });
        stars.insert("Capella", ApparentPosition { ra_hours: 5.28, dec_degrees: 45.998 });
        stars.insert("Alphard", ApparentPosition { ra_hours: 9.46, dec_degrees: -8.66 });
        stars.insert("Rigel", ApparentPosition { ra_hours: 5.24, dec_degrees: -8.20 });
        stars.insert("Aldebaran", ApparentPosition { ra_hours: 4.60, dec_degrees: 16.51 });
        stars.insert("Procyon", ApparentPosition { ra_hours: 7.66, dec_degrees: 5.23 });
        stars.insert("Peacock", ApparentPosition { ra_hours: 20.43, dec_degrees: -56.74 });
        stars.insert("Acrux", ApparentPosition { ra_hours: 12.44, dec_degrees: -63.10 });
        stars.insert("Rigil Kentaurus", ApparentPosition { ra_hours: 14.66, dec_degrees: -60.84 });
        DemoEphemeris { stars }
    }
}

impl EphemerisProvider for DemoEphemeris {
    fn observe_star(&self, star: &StarId, _instant: Instant) -> ApparentPosition {
        self.stars[star.0.as_str()]
    }

    fn gast(&self, instant: Instant) -> f64 {
        // Mean-sidereal-time-at-Greenwich approximation (IAU 1982 formula,
        // no equation-of-the-equinoxes nutation term) — adequate for a
        // demo ephemeris, not for a real fix.
        let t = (instant.julian_day() - 2451545.0) / 36525.0;
        let gmst_deg = 280.46061837
            + 360.98564736629 * (instant.julian_day() - 2451545.0)
            + 0.000387933 * t * t
            - t * t * t / 38710000.0;
        gmst_deg.rem_euclid(360.0) / 15.0
    }
}

struct DemoCatalog {
    names: Vec<&'static str>,
}

impl StarCatalog for DemoCatalog {
    fn lookup(&self, name: &str) -> Option<StarId> {
        self.names.iter().find(|&&n| n == name).map(|&n| StarId(n.to_string()))
    }
}

fn run(args: FixArgs) -> Result<(), String> {
    let params = ObservationParams {
        index_error_min: args.index_error_min,
        eye_height_m: args.eye_height_m,
        semidiameter_correction_min: 0.0,
        temperature_degc: args.temperature_degc,
        pressure_hpa: args.pressure_hpa,
        needs_correction: !args.no_correction,
    };

    // Process-wide, lazily-initialized on first use (spec §5); every
    // later call in this process reuses the same handle.
    let collaborators = GLOBAL_COLLABORATORS.get_or_init(|| {
        let ephemeris = DemoEphemeris::new();
        let names: Vec<&'static str> = ephemeris.stars.keys().copied().collect();
        Box::new(Collaborators::new(ephemeris, DemoCatalog { names })) as Box<dyn StarGpResolver>
    });
    let time_provider = Ut1TimeProvider;

    let mut session = FixSession::new(collaborators.as_ref(), params);
    session.set_bearing_speed(args.bearing_deg, args.speed_knots);
    session.set_magnetic_bearing_weight(args.magnetic_bearing_weight);

    let mut day0: Option<f64> = None;
    for raw in &args.observe {
        let obs = parse_observe(raw)?;
        let instant = time_provider.ut1(obs.year, obs.month, obs.day, obs.hour, obs.minute, obs.second, args.tz_hours);
        let day0 = *day0.get_or_insert(instant.julian_day());
        session
            .add_observation(
                &obs.star_name,
                instant,
                instant.julian_day() - day0,
                obs.alt_sextant_deg,
                obs.mag_deg,
            )
            .map_err(|e| e.to_string())?;
    }

    let outcome = session.fix().map_err(|e| e.to_string())?;
    println!("{}", outcome.position.format());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_observe_basic() {
        let obs = parse_observe("Regulus@2018-11-15T08:28:15=70.8117").unwrap();
        assert_eq!(obs.star_name, "Regulus");
        assert_eq!((obs.year, obs.month, obs.day), (2018, 11, 15));
        assert_eq!((obs.hour, obs.minute), (8, 28));
        assert!((obs.second - 15.0).abs() < 1e-9);
        assert!((obs.alt_sextant_deg - 70.8117).abs() < 1e-9);
        assert!(obs.mag_deg.is_none());
    }

    #[test]
    fn test_parse_observe_with_magnetic_bearing() {
        let obs = parse_observe("Polaris@2022-03-28T00:20:00=45.6,12.5").unwrap();
        assert_eq!(obs.mag_deg, Some(12.5));
    }

    #[test]
    fn test_parse_observe_missing_at() {
        assert!(parse_observe("Polaris2022-03-28T00:20:00=45.6").is_err());
    }

    #[test]
    fn test_parse_observe_bad_timestamp() {
        assert!(parse_observe("Polaris@2022-03-28=45.6").is_err());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let result = match cli.command {
        Command::Fix(args) => run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
