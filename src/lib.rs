//! # sextant-fix
//!
//! Computes a geographic fix (latitude, longitude) of an observer from a
//! series of celestial sextant observations of named stars, optionally
//! interleaved with rhumb-line movement legs.
//!
//! The hard engineering is a two-stage geodesic solver:
//!
//! 1. [`coarse_fix`] — a global coarse fix that converts motion-ignored
//!    circles of equal altitude into a linear plane-intersection problem
//!    in three-dimensional Cartesian coordinates.
//! 2. [`navigation_model`] + [`optimizer`] — a local fine fix that
//!    refines the coarse point by gradient-based nonlinear least squares
//!    over a differentiable navigation model, including rhumb-line dead
//!    reckoning between observations.
//!
//! The ephemeris provider, star catalog, and time library that resolve a
//! star's geographic position at an instant are external collaborators
//! ([`collaborators`]) — this crate specifies their interfaces and
//! implements the solver, not an almanac.
//!
//! ## Quick example
//!
//! ```
//! use sextant_fix::angle::{Angle, Coordinate};
//! use sextant_fix::collaborators::{Collaborators, Instant};
//! use sextant_fix::correction::ObservationParams;
//! use sextant_fix::orchestrator::FixSession;
//!
//! # use sextant_fix::collaborators::{ApparentPosition, EphemerisProvider, StarCatalog, StarId};
//! # struct FixedEphemeris { gast_hours: f64, ra_hours: f64, dec_degrees: f64 }
//! # impl EphemerisProvider for FixedEphemeris {
//! #     fn observe_star(&self, _star: &StarId, _instant: Instant) -> ApparentPosition {
//! #         ApparentPosition { ra_hours: self.ra_hours, dec_degrees: self.dec_degrees }
//! #     }
//! #     fn gast(&self, _instant: Instant) -> f64 { self.gast_hours }
//! # }
//! # struct OneStarCatalog;
//! # impl StarCatalog for OneStarCatalog {
//! #     fn lookup(&self, name: &str) -> Option<StarId> {
//! #         (name == "Polaris").then(|| StarId("Polaris".to_string()))
//! #     }
//! # }
//! let collaborators = Collaborators::new(
//!     FixedEphemeris { gast_hours: 12.0, ra_hours: 2.5, dec_degrees: 89.3 },
//!     OneStarCatalog,
//! );
//! let mut session = FixSession::new(&collaborators, ObservationParams::default());
//! session
//!     .add_observation("Polaris", Instant::from_julian_day(2451545.0), 0.0, 45.0, None)
//!     .unwrap();
//! // `fix()` requires at least three independent observations (spec §4.5);
//! // a single one here is enough to demonstrate the API's shape.
//! assert!(session.fix().is_err());
//! ```

pub mod angle;
pub mod autodiff;
pub mod coarse_fix;
pub mod collaborators;
pub mod correction;
pub mod error;
pub mod fix_log;
pub mod navigation_model;
pub mod optimizer;
pub mod orchestrator;

pub use angle::{Angle, Coordinate};
pub use collaborators::{Collaborators, Instant};
pub use correction::ObservationParams;
pub use error::{FixError, Result};
pub use fix_log::{FixLog, Observation, RhumbLineMovement};
pub use orchestrator::{FixOutcome, FixSession};
