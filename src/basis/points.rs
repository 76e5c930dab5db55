//! Standard 1-D point sets on the reference interval `[-1, 1]`, selected by
//! `spts_type_quad` in the configuration (§6).

/// Which 1-D point distribution backs the tensor-product solution points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PointSet {
    /// Interior Gauss-Legendre quadrature points; does not include the
    /// element endpoints.
    GaussLegendre,
    /// Gauss-Lobatto points, which include both endpoints at `-1` and `1`.
    GaussLobatto,
}

/// Evaluate the Legendre polynomial `P_n` at `x` by the three-term
/// recurrence, returning `(P_{n-1}(x), P_n(x))` so callers can form both
/// `P_n` and `P'_n = n (x P_n - P_{n-1}) / (x^2 - 1)` without recomputing.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let (mut p0, mut p1) = (1.0, x);
    for k in 1..n {
        let k = k as f64;
        let p2 = ((2.0 * k + 1.0) * x * p1 - k * p0) / (k + 1.0);
        p0 = p1;
        p1 = p2;
    }
    (p0, p1)
}

fn legendre_derivative(n: usize, x: f64) -> f64 {
    let (p0, p1) = legendre_pair(n, x);
    n as f64 * (x * p1 - p0) / (x * x - 1.0)
}

/// `n` Gauss-Legendre points on `[-1, 1]`, found as the roots of `P_n` by
/// Newton's method started from the Chebyshev-node initial guess.
pub fn gauss_legendre(n: usize) -> Vec<f64> {
    assert!(n >= 1);
    let mut roots = vec![0.0; n];
    for (i, root) in roots.iter_mut().enumerate() {
        let mut x = -(std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (_, p) = legendre_pair(n, x);
            let dp = legendre_derivative(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        *root = x;
    }
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
    roots
}

/// `n` Gauss-Lobatto points on `[-1, 1]`: the endpoints plus the `n - 2`
/// roots of `P'_{n-1}`, found by Newton's method on the derivative of the
/// Legendre polynomial of degree `n - 1` (itself differentiated by a
/// centered finite difference, to avoid a second recurrence).
pub fn gauss_lobatto(n: usize) -> Vec<f64> {
    assert!(n >= 2);
    if n == 2 {
        return vec![-1.0, 1.0];
    }
    let m = n - 1;
    let mut interior = vec![0.0; m - 1];
    for (i, root) in interior.iter_mut().enumerate() {
        let mut x = -(std::f64::consts::PI * (i as f64 + 1.0) / m as f64).cos();
        for _ in 0..100 {
            let h = 1e-6;
            let f = legendre_derivative(m, x);
            let df = (legendre_derivative(m, x + h) - legendre_derivative(m, x - h)) / (2.0 * h);
            let dx = f / df;
            x -= dx;
            if dx.abs() < 1e-14 {
                break;
            }
        }
        *root = x;
    }
    let mut points = Vec::with_capacity(n);
    points.push(-1.0);
    points.extend(interior);
    points.push(1.0);
    points.sort_by(|a, b| a.partial_cmp(b).unwrap());
    points
}

/// Return the `n` 1-D points selected by `set`.
pub fn points(set: PointSet, n: usize) -> Vec<f64> {
    match set {
        PointSet::GaussLegendre => gauss_legendre(n),
        PointSet::GaussLobatto => gauss_lobatto(n),
    }
}

/// Legendre polynomial `P_n(x)` and its derivative `P'_n(x)`. Exposed for
/// the 1-D DG correction functions in `operators::build`, which are defined
/// directly in terms of `P_p` and `P_{p+1}`.
pub fn legendre_value_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let (_, p) = legendre_pair(n, x);
    (p, legendre_derivative(n, x))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gauss_legendre_is_symmetric_about_origin() {
        let p = gauss_legendre(4);
        assert_eq!(p.len(), 4);
        for i in 0..2 {
            assert!((p[i] + p[3 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn gauss_lobatto_includes_endpoints() {
        let p = gauss_lobatto(5);
        assert_eq!(p.len(), 5);
        assert!((p[0] - (-1.0)).abs() < 1e-14);
        assert!((p[4] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn gauss_lobatto_three_points_is_minus_one_zero_one() {
        let p = gauss_lobatto(3);
        assert!((p[0] + 1.0).abs() < 1e-12);
        assert!(p[1].abs() < 1e-12);
        assert!((p[2] - 1.0).abs() < 1e-12);
    }
}
