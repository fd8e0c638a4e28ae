//! Error types for sextant-fix calculations.
//!
//! Covers validation failures in the angle/coordinate primitives (C1), the
//! fix log (C4), and the coarse global fix (C5). Every variant here is
//! fatal to the `fix()` call that raised it — none are retried internally.
//!
//! Numerical issues in the fine fix (a non-finite loss) are not represented
//! here: the spec treats them as a bug, not a recoverable error, so they
//! abort via `panic!`/`debug_assert!` instead of a `Result`.

use thiserror::Error;

/// Main error type for sextant-fix operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FixError {
    /// A star name was not found in the catalog collaborator.
    #[error("unknown star: {name}")]
    UnknownStar {
        /// The name that was looked up.
        name: String,
    },

    /// An observation was added with an earlier instant than its
    /// predecessor while the log's ambient speed was nonzero.
    #[error("time went backward: {prev_days:.6} -> {next_days:.6} (fractional days since epoch)")]
    TimeWentBackward {
        /// The previous observation's instant, in fractional days.
        prev_days: f64,
        /// The new observation's instant, in fractional days.
        next_days: f64,
    },

    /// Rhumb-line integration pushed the current position past a pole.
    #[error(
        "rhumb-line track past a pole: origin ({origin_lat_deg:.4}, {origin_lon_deg:.4}), \
         bearing {bearing_deg:.1}°, distance {distance_nm:.1} NM"
    )]
    PastPole {
        /// Latitude of the leg's starting point, in degrees.
        origin_lat_deg: f64,
        /// Longitude of the leg's starting point, in degrees.
        origin_lon_deg: f64,
        /// True bearing of the leg, in degrees.
        bearing_deg: f64,
        /// Length of the leg, in nautical miles.
        distance_nm: f64,
    },

    /// The coarse fix's observation matrix does not have rank 3 — fewer
    /// than three independent circles of equal altitude were supplied, or
    /// two of the supplied GPs were antipodal.
    #[error("underdetermined coarse fix: need 3 independent observations, matrix rank was {rank}")]
    Underdetermined {
        /// The rank actually found (always < 3).
        rank: usize,
    },

    /// A zero-norm vector was passed to `vec_to_coord`.
    #[error("degenerate vector: cannot recover a coordinate from a zero-norm vector")]
    DegenerateVector,
}

/// Type alias for `Result`s in this crate.
pub type Result<T> = std::result::Result<T, FixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FixError::UnknownStar { name: "Wolf 359".to_string() };
        assert_eq!(err.to_string(), "unknown star: Wolf 359");
    }

    #[test]
    fn test_underdetermined_display() {
        let err = FixError::Underdetermined { rank: 2 };
        assert!(err.to_string().contains("rank was 2"));
    }
}
