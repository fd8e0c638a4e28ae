//! Fix log (C4): an ordered, time-monotonic sequence of observations and
//! rhumb-line motion legs.
//!
//! Grounded on the prototype's `CelestialFix.log`/`add_observation`/
//! `set_bearing_speed` (`examples/original_source/mctoon_global_navigation_challenge.py`),
//! restructured as a tagged `LogEntry` sum type per spec §9's design note —
//! the forward pass in C6 dispatches on it with a single `match`.

use log::info;

use crate::angle::{Angle, Coordinate};
use crate::error::{FixError, Result};

/// A single star sighting, frozen at the instant it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The star's catalog name.
    pub star_name: String,
    /// The star's geographic position at the observation's instant.
    pub gp: Coordinate,
    /// Observed altitude (Ho), after sextant correction.
    pub alt_observed: Angle,
    /// Optional magnetic bearing to the star, for the (disabled-by-default)
    /// magnetic-bearing residual term.
    pub mag: Option<Angle>,
}

/// A rhumb-line (loxodrome) motion leg between two observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhumbLineMovement {
    /// True bearing, clockwise from north.
    pub bearing: Angle,
    /// Speed made good, in knots.
    pub speed_knots: f64,
    /// Duration of the leg, in hours. Always `>= 0`.
    pub duration_hours: f64,
}

impl RhumbLineMovement {
    /// Distance covered by this leg, in nautical miles.
    pub fn distance_nm(self) -> f64 {
        self.speed_knots * self.duration_hours
    }
}

/// A tagged entry in the [`FixLog`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// A star sighting.
    Observation(Observation),
    /// A rhumb-line motion leg between two sightings.
    Movement(RhumbLineMovement),
}

/// The ordered sequence of observations and motion legs for one fix
/// session. Observations appear in strict non-decreasing time order;
/// movement legs never appear before the first observation nor after the
/// last, and any two adjacent observations separated by a nonzero time
/// delta under nonzero set speed have exactly one movement leg between
/// them whose duration equals that delta.
#[derive(Debug, Clone, Default)]
pub struct FixLog {
    entries: Vec<LogEntry>,
    bearing: Angle,
    speed_knots: f64,
    last_instant_days: Option<f64>,
}

impl FixLog {
    /// Builds an empty log with zero ambient bearing/speed.
    pub fn new() -> Self {
        FixLog {
            entries: Vec::new(),
            bearing: Angle::from_degrees(0.0),
            speed_knots: 0.0,
            last_instant_days: None,
        }
    }

    /// Updates the ambient motion state applied to subsequent observations
    /// (not retroactively to ones already recorded).
    pub fn set_bearing_speed(&mut self, bearing_deg: f64, speed_knots: f64) {
        self.bearing = Angle::from_degrees(bearing_deg);
        self.speed_knots = speed_knots;
    }

    /// All entries in insertion (== time) order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Appends an observation, synthesizing a preceding [`RhumbLineMovement`]
    /// if the ambient speed is nonzero and a previous observation exists.
    ///
    /// `instant_days` is the observation's instant, expressed as whatever
    /// monotonic fractional-day timeline the caller's [`crate::collaborators::TimeProvider`]
    /// uses; `gp` and `alt_observed` must already reflect that instant
    /// (GP resolution and sextant correction happen in the orchestrator,
    /// per spec §4.4 steps 2–3, before this is called).
    pub fn add_observation(
        &mut self,
        star_name: impl Into<String>,
        instant_days: f64,
        gp: Coordinate,
        alt_observed: Angle,
        mag: Option<Angle>,
    ) -> Result<()> {
        if let Some(prev_days) = self.last_instant_days {
            if self.speed_knots != 0.0 {
                let diff_hours = (instant_days - prev_days) * 24.0;
                if diff_hours < 0.0 {
                    return Err(FixError::TimeWentBackward { prev_days, next_days: instant_days });
                }
                let movement = RhumbLineMovement {
                    bearing: self.bearing,
                    speed_knots: self.speed_knots,
                    duration_hours: diff_hours,
                };
                info!(
                    "adding movement: {:.1}° true at {:.1} kn for {:.3} h ({:.1} NM)",
                    movement.bearing.degrees(),
                    movement.speed_knots,
                    movement.duration_hours,
                    movement.distance_nm(),
                );
                self.entries.push(LogEntry::Movement(movement));
            }
        }
        self.last_instant_days = Some(instant_days);

        let star_name = star_name.into();
        info!("adding observation: {star_name}");
        self.entries.push(LogEntry::Observation(Observation {
            star_name,
            gp,
            alt_observed,
            mag,
        }));
        Ok(())
    }
}
