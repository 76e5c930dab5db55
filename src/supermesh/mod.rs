//! The overset supermesh (§4.5, §9): splits a hex donor cell into a fixed
//! set of five tets, clips each tet against the receiver cell's bounding
//! planes, and integrates a field over the resulting overlap volume for the
//! Galerkin projection. This only covers the explicit-flux overset method;
//! field-interpolation overset (§4.3 step 8) bypasses it entirely.

use crate::error::FlurryError;
use crate::geometry::Point;

/// The fixed hex→5-tet connectivity (§4.5, §9): vertex indices into the
/// hex's own 8-corner ordering, not a per-mesh computed decomposition.
pub const HEX_TO_TETS: [[usize; 4]; 5] = [[0, 1, 4, 3], [2, 1, 6, 3], [5, 1, 6, 4], [7, 3, 4, 6], [1, 3, 6, 4]];

/// A 4-point, degree-2 symmetric quadrature rule on the reference tet
/// (barycentric coordinates summing to 1 per point, weights summing to 1
/// overall so they can be scaled directly by a tet's physical volume).
const TET_QUAD_BARY: [[f64; 4]; 4] = {
    const A: f64 = 0.585_410_196_624_968_5;
    const B: f64 = 0.138_196_601_125_010_5;
    [[A, B, B, B], [B, A, B, B], [B, B, A, B], [B, B, B, A]]
};
const TET_QUAD_WEIGHT: f64 = 0.25;

pub fn split_hex_to_tets(vertices: &[Point; 8]) -> [[Point; 4]; 5] {
    let mut tets = [[Point::zero(); 4]; 5];
    for (tet, idxs) in tets.iter_mut().zip(HEX_TO_TETS.iter()) {
        for (slot, &i) in tet.iter_mut().zip(idxs.iter()) {
            *slot = vertices[i];
        }
    }
    tets
}

/// The affine map's constant Jacobian determinant, `6 * signed volume`.
fn tet_jacobian_det(tet: &[Point; 4]) -> f64 {
    let e1 = tet[1] - tet[0];
    let e2 = tet[2] - tet[0];
    let e3 = tet[3] - tet[0];
    e1.dot(&e2.cross(&e3))
}

pub fn tet_volume(tet: &[Point; 4]) -> f64 {
    tet_jacobian_det(tet).abs() / 6.0
}

/// Quadrature points of `tet` in physical space, in `TET_QUAD_BARY` order.
pub fn tet_quadrature_points(tet: &[Point; 4]) -> [Point; 4] {
    let mut pts = [Point::zero(); 4];
    for (slot, bary) in pts.iter_mut().zip(TET_QUAD_BARY.iter()) {
        let mut p = Point::zero();
        for (&lambda, &v) in bary.iter().zip(tet.iter()) {
            p = p + v * lambda;
        }
        *slot = p;
    }
    pts
}

fn edge_plane_intersection(a: Point, b: Point, plane_point: Point, normal: Point) -> Point {
    let alpha = normal.dot(&(plane_point - a)) / normal.dot(&(b - a));
    a + (b - a) * alpha
}

/// Clips `tet` against the half-space `normal · (x − plane_point) <= 0`
/// (§9 open question, §4.5 clipping cases 0-3 plus the fully-outside
/// case 4), returning the kept sub-tets. Cases 1 and 3 return a
/// triangular-frustum decomposition with matching end-cap correspondence;
/// case 2 returns the analogous triangular-prism decomposition. Both are
/// the standard fan triangulation of a topological prism/frustum, not a
/// clipping-specific invention.
pub fn clip_tet(tet: [Point; 4], plane_point: Point, normal: Point) -> Vec<[Point; 4]> {
    const TOL: f64 = 1e-12;
    let d: Vec<f64> = tet.iter().map(|&v| normal.dot(&(v - plane_point))).collect();
    let outside: Vec<bool> = d.iter().map(|&di| di > TOL).collect();
    let n_outside = outside.iter().filter(|&&b| b).count();

    match n_outside {
        0 => vec![tet],
        4 => vec![],
        1 => {
            let out_idx = outside.iter().position(|&b| b).unwrap();
            let out_v = tet[out_idx];
            let ins: Vec<Point> = (0..4).filter(|&i| i != out_idx).map(|i| tet[i]).collect();
            let cuts: Vec<Point> = ins.iter().map(|&p| edge_plane_intersection(out_v, p, plane_point, normal)).collect();
            let (a, b, c) = (ins[0], ins[1], ins[2]);
            let (pa, pb, pc) = (cuts[0], cuts[1], cuts[2]);
            vec![[a, b, c, pa], [b, c, pa, pb], [c, pa, pb, pc]]
        }
        3 => {
            let in_idx = outside.iter().position(|&b| !b).unwrap();
            let in_v = tet[in_idx];
            let outs: Vec<Point> = (0..4).filter(|&i| i != in_idx).map(|i| tet[i]).collect();
            let cuts: Vec<Point> = outs.iter().map(|&p| edge_plane_intersection(in_v, p, plane_point, normal)).collect();
            vec![[in_v, cuts[0], cuts[1], cuts[2]]]
        }
        2 => {
            let ins: Vec<Point> = (0..4).filter(|&i| !outside[i]).map(|i| tet[i]).collect();
            let outs: Vec<Point> = (0..4).filter(|&i| outside[i]).map(|i| tet[i]).collect();
            let (a, b) = (ins[0], ins[1]);
            let (c, d) = (outs[0], outs[1]);
            let p_ac = edge_plane_intersection(a, c, plane_point, normal);
            let p_ad = edge_plane_intersection(a, d, plane_point, normal);
            let p_bc = edge_plane_intersection(b, c, plane_point, normal);
            let p_bd = edge_plane_intersection(b, d, plane_point, normal);
            vec![[a, p_ac, p_ad, b], [p_ac, p_ad, b, p_bc], [p_ad, b, p_bc, p_bd]]
        }
        _ => unreachable!("a tetrahedron has only 4 vertices"),
    }
}

/// `superMesh::integrate` (§9 open question): the original has no return
/// statement on this branch; the contract implemented here is
/// `Σ_tets Σ_qpts w_q · data_q · detJ_local`, with `data[i]` the field
/// values already evaluated at tet `i`'s quadrature points in
/// `tet_quadrature_points` order.
pub fn integrate(tets: &[[Point; 4]], data: &[Vec<Vec<f64>>]) -> Result<Vec<f64>, FlurryError> {
    if data.len() != tets.len() {
        return Err(FlurryError::SupermeshDataLengthMismatch { expected: tets.len(), found: data.len() });
    }

    let n_vars = data.iter().flat_map(|d| d.first()).next().map_or(0, |row| row.len());
    let mut total = vec![0.0; n_vars];

    for (tet, qvals) in tets.iter().zip(data.iter()) {
        if qvals.len() != TET_QUAD_BARY.len() {
            return Err(FlurryError::SupermeshDataLengthMismatch { expected: TET_QUAD_BARY.len(), found: qvals.len() });
        }
        let volume = tet_volume(tet);
        for row in qvals {
            for (t, &v) in total.iter_mut().zip(row.iter()) {
                *t += TET_QUAD_WEIGHT * v * volume;
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_hex() -> [Point; 8] {
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
            Point::new(0.0, 0.0, 1.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.0, 1.0, 1.0),
        ]
    }

    fn unit_tet() -> [Point; 4] {
        [Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0), Point::new(0.0, 0.0, 1.0)]
    }

    #[test]
    fn five_tets_exactly_fill_the_hex_volume() {
        let tets = split_hex_to_tets(&unit_hex());
        let total: f64 = tets.iter().map(tet_volume).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clipping_fully_inside_or_outside_is_trivial() {
        let tet = unit_tet();
        let far_plane = Point::new(100.0, 100.0, 100.0);
        let normal = Point::new(1.0, 1.0, 1.0) / 3.0_f64.sqrt();
        assert_eq!(clip_tet(tet, far_plane, normal).len(), 1);

        let near_plane = Point::new(-100.0, -100.0, -100.0);
        assert!(clip_tet(tet, near_plane, normal).is_empty());
    }

    #[test]
    fn case_one_and_case_three_partition_the_tet_volume() {
        let tet = unit_tet();
        let plane_point = Point::new(0.8, 0.0, 0.0);
        let normal = Point::new(1.0, 1.0, 1.0) / 3.0_f64.sqrt();

        let kept = clip_tet(tet, plane_point, normal);
        let kept_volume: f64 = kept.iter().map(tet_volume).sum();

        let complement = clip_tet(tet, plane_point, normal * -1.0);
        let complement_volume: f64 = complement.iter().map(tet_volume).sum();

        assert!((kept_volume + complement_volume - tet_volume(&tet)).abs() < 1e-12);
    }

    #[test]
    fn case_two_split_partitions_the_tet_volume() {
        let tet = unit_tet();
        // Plane through the midpoints of the two diagonals not touching a
        // shared vertex: separates {v0, v1} from {v2, v3}.
        let plane_point = Point::new(0.25, 0.25, 0.25);
        let normal = Point::new(-1.0, 1.0, 1.0) / 3.0_f64.sqrt();

        let kept = clip_tet(tet, plane_point, normal);
        let kept_volume: f64 = kept.iter().map(tet_volume).sum();
        let complement = clip_tet(tet, plane_point, normal * -1.0);
        let complement_volume: f64 = complement.iter().map(tet_volume).sum();

        assert!((kept_volume + complement_volume - tet_volume(&tet)).abs() < 1e-12);
    }

    #[test]
    fn integrate_rejects_mismatched_tet_count() {
        let tets = vec![unit_tet()];
        let data = vec![];
        assert!(integrate(&tets, &data).is_err());
    }

    #[test]
    fn integrate_of_a_constant_field_returns_volume_times_the_constant() {
        let tet = unit_tet();
        let volume = tet_volume(&tet);
        let data = vec![vec![vec![2.0]; 4]];
        let total = integrate(&[tet], &data).unwrap();
        assert!((total[0] - 2.0 * volume).abs() < 1e-12);
    }
}
