//! Reference-location solve: given a physical point, find the reference
//! coordinate `r` such that `x(r) = sum_i N_i(r) x_i` (§4.1).

use crate::element::kind::ElementKind;
use crate::geometry::shape;
use crate::geometry::Point;

/// Sentinel reference location returned when the Newton solve fails to
/// converge, signalling the caller to fall back to Nelder-Mead (§7:
/// recoverable, not fatal).
pub const NEWTON_FAILURE_SENTINEL: Point = Point(99.0, 99.0, 99.0);

fn bbox(kind: ElementKind, nodes: &[Point]) -> (Point, Point) {
    let mut lo = Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut hi = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in nodes {
        lo = Point::new(lo.x().min(p.x()), lo.y().min(p.y()), lo.z().min(p.z()));
        hi = Point::new(hi.x().max(p.x()), hi.y().max(p.y()), hi.z().max(p.z()));
    }
    let _ = kind;
    (lo, hi)
}

fn inside_bbox(x: Point, lo: Point, hi: Point, tol: f64) -> bool {
    x.x() >= lo.x() - tol
        && x.x() <= hi.x() + tol
        && x.y() >= lo.y() - tol
        && x.y() <= hi.y() + tol
        && x.z() >= lo.z() - tol
        && x.z() <= hi.z() + tol
}

fn image(kind: ElementKind, nodes: &[Point], r: &[f64]) -> Point {
    let s = shape::eval(kind, r);
    let mut x = Point::zero();
    for (n_i, node) in s.n.iter().zip(nodes.iter()) {
        x = x + *node * *n_i;
    }
    x
}

fn jacobian_columns(kind: ElementKind, nodes: &[Point], r: &[f64]) -> Vec<Point> {
    let s = shape::eval(kind, r);
    let dims = kind.dims();
    (0..dims)
        .map(|d| {
            s.dn.iter()
                .zip(nodes.iter())
                .fold(Point::zero(), |acc, (dn_i, node)| acc + *node * dn_i[d])
        })
        .collect()
}

fn residual_norm(kind: ElementKind, nodes: &[Point], r: &[f64], target: Point) -> f64 {
    let dims = kind.dims();
    let diff = image(kind, nodes, r) - target;
    match dims {
        2 => (diff.x() * diff.x() + diff.y() * diff.y()).sqrt(),
        _ => diff.norm(),
    }
}

/// Up to 20 Newton iterations on `r -> x(r) = target`, clamped to
/// `[-1, 1]^dims` at every step, with a bounding-box reject and a tolerance
/// of `1e-12 * h` where `h` is the smallest bbox extent. Returns `Ok(r)` on
/// convergence, `Err(())` (caller falls back to Nelder-Mead) otherwise.
pub fn get_ref_loc_newton(kind: ElementKind, nodes: &[Point], target: Point) -> Result<Point, ()> {
    assert!(kind.is_supported(), "getRefLocNewton dispatches only on quad/hex");

    let (lo, hi) = bbox(kind, nodes);
    let h = (hi.x() - lo.x()).min(hi.y() - lo.y()).min(if kind.dims() == 3 {
        hi.z() - lo.z()
    } else {
        f64::INFINITY
    });
    let tol = 1e-12 * h.max(1e-300);

    if !inside_bbox(target, lo, hi, 1e-8 * h.max(1e-300)) {
        return Err(());
    }

    let dims = kind.dims();
    let mut r = vec![0.0; dims];

    for _ in 0..20 {
        let cols = jacobian_columns(kind, nodes, &r);
        let res = target - image(kind, nodes, &r);

        // Solve the (dims x dims) linear system `J dr = res` by Cramer's
        // rule via the existing small dense-matrix machinery.
        let j = crate::linalg::Matrix::from_fn(dims, dims, |i, d| match i {
            0 => cols[d].x(),
            1 => cols[d].y(),
            _ => cols[d].z(),
        });
        let det = j.determinant();
        if det.abs() < 1e-300 {
            return Err(());
        }
        let adj = j.adjoint();
        let rhs = match dims {
            2 => vec![res.x(), res.y()],
            _ => vec![res.x(), res.y(), res.z()],
        };
        let dr = adj.matvec(&rhs).iter().map(|v| v / det).collect::<Vec<_>>();

        for d in 0..dims {
            r[d] = (r[d] + dr[d]).clamp(-1.0, 1.0);
        }

        if residual_norm(kind, nodes, &r, target) < tol {
            return Ok(to_point(&r));
        }
    }

    Err(())
}

fn to_point(r: &[f64]) -> Point {
    match r.len() {
        2 => Point::new(r[0], r[1], 0.0),
        3 => Point::new(r[0], r[1], r[2]),
        _ => unreachable!(),
    }
}

/// Nelder-Mead fallback for a degenerate Jacobian, minimizing
/// `|x(r) - target|^2` over `r in [-1, 1]^dims`, up to 300 iterations, with
/// the same bbox reject as the Newton solve.
pub fn get_ref_loc_nelder_mead(kind: ElementKind, nodes: &[Point], target: Point) -> Result<Point, ()> {
    assert!(kind.is_supported());

    let (lo, hi) = bbox(kind, nodes);
    if !inside_bbox(target, lo, hi, 1e-6) {
        return Err(());
    }

    let dims = kind.dims();
    let f = |r: &[f64]| {
        let clamped: Vec<f64> = r.iter().map(|&v| v.clamp(-1.0, 1.0)).collect();
        residual_norm(kind, nodes, &clamped, target)
    };

    let n = dims + 1;
    let mut simplex: Vec<Vec<f64>> = vec![vec![0.0; dims]; n];
    for (i, s) in simplex.iter_mut().enumerate().skip(1) {
        s[i - 1] = 0.5;
    }
    let mut fvals: Vec<f64> = simplex.iter().map(|s| f(s)).collect();

    let alpha = 1.0;
    let gamma = 2.0;
    let rho = 0.5;
    let sigma = 0.5;

    for _ in 0..300 {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| fvals[a].partial_cmp(&fvals[b]).unwrap());
        let best = order[0];
        let worst = order[n - 1];
        let second_worst = order[n - 2];

        if fvals[best] < 1e-24 {
            break;
        }

        let centroid: Vec<f64> = (0..dims)
            .map(|d| order[..n - 1].iter().map(|&i| simplex[i][d]).sum::<f64>() / (n - 1) as f64)
            .collect();

        let reflected: Vec<f64> = (0..dims).map(|d| centroid[d] + alpha * (centroid[d] - simplex[worst][d])).collect();
        let f_reflected = f(&reflected);

        if f_reflected < fvals[best] {
            let expanded: Vec<f64> = (0..dims).map(|d| centroid[d] + gamma * (reflected[d] - centroid[d])).collect();
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                fvals[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                fvals[worst] = f_reflected;
            }
        } else if f_reflected < fvals[second_worst] {
            simplex[worst] = reflected;
            fvals[worst] = f_reflected;
        } else {
            let contracted: Vec<f64> = (0..dims).map(|d| centroid[d] + rho * (simplex[worst][d] - centroid[d])).collect();
            let f_contracted = f(&contracted);
            if f_contracted < fvals[worst] {
                simplex[worst] = contracted;
                fvals[worst] = f_contracted;
            } else {
                for &i in &order[1..] {
                    for d in 0..dims {
                        simplex[i][d] = simplex[best][d] + sigma * (simplex[i][d] - simplex[best][d]);
                    }
                    fvals[i] = f(&simplex[i]);
                }
            }
        }
    }

    let best = (0..n).min_by(|&a, &b| fvals[a].partial_cmp(&fvals[b]).unwrap()).unwrap();
    if fvals[best] < 1e-6 {
        let clamped: Vec<f64> = simplex[best].iter().map(|&v| v.clamp(-1.0, 1.0)).collect();
        Ok(to_point(&clamped))
    } else {
        Err(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unit_quad() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn newton_solve_recovers_center_of_unit_quad() {
        let nodes = unit_quad();
        let r = get_ref_loc_newton(ElementKind::Quad, &nodes, Point::new(0.5, 0.5, 0.0)).unwrap();
        assert!(r.norm() < 1e-9);
    }

    #[test]
    fn newton_solve_rejects_point_outside_bbox() {
        let nodes = unit_quad();
        let result = get_ref_loc_newton(ElementKind::Quad, &nodes, Point::new(5.0, 5.0, 0.0));
        assert!(result.is_err());
    }

    #[test]
    fn nelder_mead_recovers_known_interior_point() {
        let nodes = unit_quad();
        let target = Point::new(0.75, 0.25, 0.0);
        let r = get_ref_loc_nelder_mead(ElementKind::Quad, &nodes, target).unwrap();
        let back = image(ElementKind::Quad, &nodes, &[r.x(), r.y()]);
        assert!((back - target).norm() < 1e-3);
    }
}
