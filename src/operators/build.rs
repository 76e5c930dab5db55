//! Construction of the dense tensor-product operators for one
//! `(ElementKind, order)` pair: extrapolation to flux and plot points,
//! reference-space gradient, and the FR correction-function divergence.
//! These are exactly the matrices `operators::cache::OperatorCache` stores
//! once per observed pair (§4.4).

use crate::basis::{lagrange, points as point_sets, PointSet};
use crate::element::kind::ElementKind;
use crate::geometry::Point;
use crate::linalg::Matrix;

/// One reusable bundle of dense operators for a fixed `(ElementKind,
/// order)`. Everything here is read-only once built; `OperatorCache` hands
/// out shared references.
#[derive(Clone, Debug)]
pub struct OperatorSet {
    pub dims: usize,
    pub n_spts: usize,
    pub n_fpts: usize,
    pub n_mpts: usize,
    /// Reference-space coordinates of the solution points, in tensor
    /// lexicographic order.
    pub spts_ref: Vec<Point>,
    /// Reference-space coordinates of the flux points, grouped by face in
    /// the same order as `face_offsets`.
    pub fpts_ref: Vec<Point>,
    /// `face_offsets[f]..face_offsets[f + 1]` indexes the flux points
    /// belonging to face `f`, matching `geometry::normals::reference_face_normal`.
    pub face_offsets: Vec<usize>,
    /// Reference-space coordinates of the plot points (always endpoint
    /// inclusive, independent of `spts_type_quad`).
    pub mpts_ref: Vec<Point>,
    pub opp_spts_to_fpts: Matrix,
    pub opp_spts_to_mpts: Matrix,
    pub opp_grad_spts: Vec<Matrix>,
    pub opp_div_fpts_to_spts: Matrix,
    /// `opp_grad_corr[dim]` (§4.4): the same correction-function derivative
    /// used by `opp_div_fpts_to_spts`, but restricted to the two faces whose
    /// reference normal is `dim` (every other column is zero). Applied to
    /// the jump `(u_common - u_fpts)` at the flux points, it corrects only
    /// the `dim` component of the reference gradient, leaving the other
    /// `dims - 1` components untouched — unlike the divergence operator,
    /// which deliberately sums every face's contribution into one scalar.
    pub opp_grad_corr: Vec<Matrix>,
}

impl OperatorSet {
    /// Which face (index into `face_offsets`) owns flux point `fpt`.
    pub fn face_of(&self, fpt: usize) -> usize {
        self.face_offsets.partition_point(|&o| o <= fpt) - 1
    }

    pub fn num_faces(&self) -> usize {
        self.face_offsets.len() - 1
    }
}

/// `(normal_dim, side)` for each face, `side = 0` meaning the `-1` face and
/// `side = 1` the `+1` face of that dimension. Ordering must track
/// `geometry::normals::reference_face_normal` exactly.
fn face_table(kind: ElementKind) -> Vec<(usize, usize)> {
    match kind {
        ElementKind::Quad => vec![(1, 0), (0, 1), (1, 1), (0, 0)],
        ElementKind::Hex => vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)],
        ElementKind::Tri => panic!("Tri elements are not supported by the operator builder"),
    }
}

fn multi_index(mut idx: usize, n: usize, dims: usize) -> Vec<usize> {
    let mut out = vec![0; dims];
    for d in 0..dims {
        out[d] = idx % n;
        idx /= n;
    }
    out
}

fn linear_index(multi: &[usize], n: usize) -> usize {
    multi.iter().rev().fold(0, |acc, &m| acc * n + m)
}

fn to_point(coords: &[f64]) -> Point {
    match coords.len() {
        2 => Point::new(coords[0], coords[1], 0.0),
        3 => Point::new(coords[0], coords[1], coords[2]),
        _ => unreachable!("only 2-D and 3-D tensor-product elements are supported"),
    }
}

/// The DG correction functions' derivatives, `g_L'` and `g_R'`, evaluated at
/// every node of `nodes`. `g_L = (-1)^p/2 (P_p - P_{p+1})`, `g_R = 1/2 (P_p +
/// P_{p+1})`, with `p = nodes.len() - 1` the polynomial order (the Huynh
/// "g_DG" correction, the standard FR choice).
fn correction_derivatives(nodes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let p = nodes.len() - 1;
    let sign = if p % 2 == 0 { 1.0 } else { -1.0 };
    let mut dgl = Vec::with_capacity(nodes.len());
    let mut dgr = Vec::with_capacity(nodes.len());
    for &x in nodes {
        let (_, dpp) = point_sets::legendre_value_and_derivative(p, x);
        let (_, dpp1) = point_sets::legendre_value_and_derivative(p + 1, x);
        dgl.push(sign * 0.5 * (dpp - dpp1));
        dgr.push(0.5 * (dpp + dpp1));
    }
    (dgl, dgr)
}

/// Build the full operator bundle for `kind` at polynomial order `order`
/// (so `order + 1` solution points per reference dimension), using
/// `spts_type` to choose the 1-D solution-point distribution.
pub fn build_operators(kind: ElementKind, order: usize, spts_type: PointSet) -> OperatorSet {
    assert!(kind.is_supported(), "element kind is not supported by the residual pipeline");
    let dims = kind.dims();
    let n = order + 1;
    let n_spts = n.pow(dims as u32);

    let spts_1d = point_sets::points(spts_type, n);
    let mpts_1d = point_sets::points(PointSet::GaussLobatto, n);

    let spts_ref: Vec<Point> = (0..n_spts)
        .map(|idx| {
            let mi = multi_index(idx, n, dims);
            to_point(&mi.iter().map(|&k| spts_1d[k]).collect::<Vec<_>>())
        })
        .collect();

    let mpts_ref: Vec<Point> = (0..n_spts)
        .map(|idx| {
            let mi = multi_index(idx, n, dims);
            to_point(&mi.iter().map(|&k| mpts_1d[k]).collect::<Vec<_>>())
        })
        .collect();
    let n_mpts = mpts_ref.len();

    let faces = face_table(kind);
    let n_face_pts = n.pow((dims - 1) as u32);
    let mut fpts_ref = Vec::with_capacity(faces.len() * n_face_pts);
    let mut face_offsets = vec![0usize];

    for &(normal_dim, side) in &faces {
        for t in 0..n_face_pts {
            let tmi = multi_index(t, n, dims - 1);
            let mut coords = vec![0.0; dims];
            let mut ti = 0;
            for d in 0..dims {
                if d == normal_dim {
                    coords[d] = if side == 0 { -1.0 } else { 1.0 };
                } else {
                    coords[d] = spts_1d[tmi[ti]];
                    ti += 1;
                }
            }
            fpts_ref.push(to_point(&coords));
        }
        face_offsets.push(fpts_ref.len());
    }
    let n_fpts = fpts_ref.len();

    let extrap_minus = lagrange::extrapolation_matrix(&spts_1d, &[-1.0]);
    let extrap_plus = lagrange::extrapolation_matrix(&spts_1d, &[1.0]);
    let (dgl, dgr) = correction_derivatives(&spts_1d);

    let opp_spts_to_fpts = Matrix::from_fn(n_fpts, n_spts, |row, col| {
        let face = face_offsets.partition_point(|&o| o <= row) - 1;
        let (normal_dim, side) = faces[face];
        let local = row - face_offsets[face];
        let tmi = multi_index(local, n, dims - 1);
        let smi = multi_index(col, n, dims);

        let mut t = 0;
        let mut value = 1.0;
        for d in 0..dims {
            if d == normal_dim {
                let e = if side == 0 { &extrap_minus } else { &extrap_plus };
                value *= e[(0, smi[d])];
            } else {
                value *= if smi[d] == tmi[t] { 1.0 } else { 0.0 };
                t += 1;
            }
        }
        value
    });

    let opp_spts_to_mpts = Matrix::from_fn(n_mpts, n_spts, |row, col| {
        let rmi = multi_index(row, n, dims);
        let smi = multi_index(col, n, dims);
        let mut value = 1.0;
        for d in 0..dims {
            value *= lagrange::eval(&spts_1d, smi[d], mpts_1d[rmi[d]]);
        }
        value
    });

    let diff_1d = lagrange::differentiation_matrix(&spts_1d);
    let opp_grad_spts: Vec<Matrix> = (0..dims)
        .map(|dim| {
            Matrix::from_fn(n_spts, n_spts, |row, col| {
                let rmi = multi_index(row, n, dims);
                let cmi = multi_index(col, n, dims);
                let mut value = diff_1d[(rmi[dim], cmi[dim])];
                for d in 0..dims {
                    if d != dim {
                        value *= if rmi[d] == cmi[d] { 1.0 } else { 0.0 };
                    }
                }
                value
            })
        })
        .collect();

    let opp_div_fpts_to_spts = Matrix::from_fn(n_spts, n_fpts, |row, col| {
        let face = face_offsets.partition_point(|&o| o <= col) - 1;
        let (normal_dim, side) = faces[face];
        let local = col - face_offsets[face];
        let tmi = multi_index(local, n, dims - 1);
        let smi = multi_index(row, n, dims);

        let mut t = 0;
        let mut value = if side == 0 { dgl[smi[normal_dim]] } else { dgr[smi[normal_dim]] };
        for d in 0..dims {
            if d != normal_dim {
                value *= if smi[d] == tmi[t] { 1.0 } else { 0.0 };
                t += 1;
            }
        }
        value
    });

    let opp_grad_corr: Vec<Matrix> = (0..dims)
        .map(|dim| {
            Matrix::from_fn(n_spts, n_fpts, |row, col| {
                let face = face_offsets.partition_point(|&o| o <= col) - 1;
                let (normal_dim, side) = faces[face];
                if normal_dim != dim {
                    return 0.0;
                }
                let local = col - face_offsets[face];
                let tmi = multi_index(local, n, dims - 1);
                let smi = multi_index(row, n, dims);

                let mut t = 0;
                let mut value = if side == 0 { dgl[smi[normal_dim]] } else { dgr[smi[normal_dim]] };
                for d in 0..dims {
                    if d != normal_dim {
                        value *= if smi[d] == tmi[t] { 1.0 } else { 0.0 };
                        t += 1;
                    }
                }
                value
            })
        })
        .collect();

    OperatorSet {
        dims,
        n_spts,
        n_fpts,
        n_mpts,
        spts_ref,
        fpts_ref,
        face_offsets,
        mpts_ref,
        opp_spts_to_fpts,
        opp_spts_to_mpts,
        opp_grad_spts,
        opp_div_fpts_to_spts,
        opp_grad_corr,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quad_order1_has_four_points_per_face_of_size_two() {
        let ops = build_operators(ElementKind::Quad, 1, PointSet::GaussLegendre);
        assert_eq!(ops.n_spts, 4);
        assert_eq!(ops.n_fpts, 8);
        assert_eq!(ops.face_offsets, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn hex_order2_counts_match_tensor_product() {
        let ops = build_operators(ElementKind::Hex, 2, PointSet::GaussLegendre);
        assert_eq!(ops.n_spts, 27);
        assert_eq!(ops.n_fpts, 6 * 9);
        assert_eq!(ops.n_mpts, 27);
    }

    #[test]
    fn extrapolation_of_constant_field_is_constant() {
        let ops = build_operators(ElementKind::Quad, 3, PointSet::GaussLegendre);
        let u = vec![1.0; ops.n_spts];
        let fpts = ops.opp_spts_to_fpts.matvec(&u);
        for v in fpts {
            assert!((v - 1.0).abs() < 1e-10);
        }
        let mpts = ops.opp_spts_to_mpts.matvec(&u);
        for v in mpts {
            assert!((v - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn gradient_of_linear_field_is_exact() {
        let ops = build_operators(ElementKind::Quad, 3, PointSet::GaussLegendre);
        // f(xi, eta) = 2*xi - 3*eta
        let u: Vec<f64> = ops.spts_ref.iter().map(|p| 2.0 * p.x() - 3.0 * p.y()).collect();
        let dudxi = ops.opp_grad_spts[0].matvec(&u);
        let dudeta = ops.opp_grad_spts[1].matvec(&u);
        for v in dudxi {
            assert!((v - 2.0).abs() < 1e-10);
        }
        for v in dudeta {
            assert!((v + 3.0).abs() < 1e-10);
        }
    }
}
