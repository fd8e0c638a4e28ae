//! Coarse global fix (C5): converts simultaneous (motion-ignoring) circles
//! of equal altitude into a linear plane-intersection problem in
//! three-dimensional Cartesian coordinates.
//!
//! A circle of equal altitude around GP `ĝ` at observed altitude `h` is the
//! intersection of the unit sphere with the plane `{x : x·ĝ = sin(h)}`.
//! Three or more non-degenerate such planes intersect (in the
//! least-squares sense, when overdetermined) at a single point, which,
//! absent measurement error, lies on the unit sphere and is the observer's
//! position.
//!
//! Grounded on the prototype's `plane_intersection`/`coord_to_vector_m`
//! (`examples/original_source/mctoon_global_navigation_challenge.py`),
//! reimplemented over `nalgebra` in place of numpy — the teacher crate's
//! own `nalgebra` dependency, otherwise unused upstream, finds its first
//! real consumer here.

use log::info;
use nalgebra::{DMatrix, DVector};

use crate::angle::{coord_to_vec, vec_to_coord, Coordinate};
use crate::error::{FixError, Result};
use crate::fix_log::{FixLog, LogEntry};

/// Tolerance used both for the SVD-based rank check and for treating a
/// singular value as zero when solving.
const RANK_EPSILON: f64 = 1e-9;

/// Runs the coarse global fix over all observations in `log` (movement
/// legs are ignored, per spec §4.5 step 1). Requires at least three
/// observations whose GP vectors are linearly independent (rank 3);
/// returns [`FixError::Underdetermined`] otherwise — including the
/// antipodal-GP and two-observation degenerate cases.
pub fn fix_global_rough(log: &FixLog) -> Result<Coordinate> {
    let mut gp_vecs = Vec::new();
    let mut alts_rad = Vec::new();

    for entry in log.entries() {
        if let LogEntry::Observation(obs) = entry {
            gp_vecs.push(coord_to_vec(obs.gp));
            alts_rad.push(obs.alt_observed.radians());
        }
    }

    let n = gp_vecs.len();
    if n < 3 {
        return Err(FixError::Underdetermined { rank: n.min(2) });
    }

    // M has one row per observation: the GP's unit vector. b_i = sin(h_i).
    let mut m = DMatrix::<f64>::zeros(n, 3);
    let mut b = DVector::<f64>::zeros(n);
    for (i, (&(gx, gy, gz), &h)) in gp_vecs.iter().zip(alts_rad.iter()).enumerate() {
        m[(i, 0)] = gx;
        m[(i, 1)] = gy;
        m[(i, 2)] = gz;
        b[i] = h.sin();
    }

    let svd = nalgebra::linalg::SVD::new(m.clone(), true, true);
    let rank = svd.rank(RANK_EPSILON);
    if rank < 3 {
        return Err(FixError::Underdetermined { rank });
    }

    let x = svd
        .solve(&b, RANK_EPSILON)
        .expect("rank check above guarantees a least-squares solution exists");

    let radius = x.norm();
    info!("rough global fix: radius (1 is optimal) = {radius:.6}");

    let point = (x[0] / radius, x[1] / radius, x[2] / radius);
    let pos = vec_to_coord(point)?;
    info!("rough global fix: plane intersection = {}", pos.format());
    Ok(pos)
}
