//! 1-D Lagrange evaluation at arbitrary points, and the nodal-derivative
//! matrices used to build every tensor-product operator in
//! `operators/build.rs`.

use crate::linalg::Matrix;

/// Value of the Lagrange basis function for node `i` of `nodes`, evaluated
/// at `x`.
pub fn eval(nodes: &[f64], i: usize, x: f64) -> f64 {
    let xi = nodes[i];
    nodes
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &xj)| (x - xj) / (xi - xj))
        .product()
}

/// Value of every Lagrange basis function of `nodes`, evaluated at `x`.
pub fn eval_all(nodes: &[f64], x: f64) -> Vec<f64> {
    (0..nodes.len()).map(|i| eval(nodes, i, x)).collect()
}

/// Derivative of the Lagrange basis function for node `i`, evaluated at
/// `x`, by the standard sum-of-products rule.
pub fn derivative(nodes: &[f64], i: usize, x: f64) -> f64 {
    let xi = nodes[i];
    let n = nodes.len();
    (0..n)
        .filter(|&j| j != i)
        .map(|j| {
            let xj = nodes[j];
            (0..n)
                .filter(|&k| k != i && k != j)
                .map(|k| (x - nodes[k]) / (xi - nodes[k]))
                .product::<f64>()
                / (xi - xj)
        })
        .sum()
}

/// The `n x n` matrix `D[i][j] = dL_j/dx` evaluated at node `i`, i.e. the
/// standard nodal differentiation matrix for the 1-D basis defined by
/// `nodes`.
pub fn differentiation_matrix(nodes: &[f64]) -> Matrix {
    let n = nodes.len();
    Matrix::from_fn(n, n, |i, j| derivative(nodes, j, nodes[i]))
}

/// The `m x n` matrix `E[k][j] = L_j(targets[k])`, extrapolating a nodal
/// representation on `nodes` to the `m` points in `targets`.
pub fn extrapolation_matrix(nodes: &[f64], targets: &[f64]) -> Matrix {
    Matrix::from_fn(targets.len(), nodes.len(), |k, j| {
        eval(nodes, j, targets[k])
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lagrange_basis_is_kronecker_delta_at_nodes() {
        let nodes = [-1.0, 0.0, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                let v = eval(&nodes, i, nodes[j]);
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((v - expect).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn differentiation_matrix_is_exact_for_linear_function() {
        let nodes = [-1.0, -0.2, 0.5, 1.0];
        let d = differentiation_matrix(&nodes);
        // f(x) = 2x + 3 should differentiate to the constant 2 everywhere.
        let f: Vec<f64> = nodes.iter().map(|&x| 2.0 * x + 3.0).collect();
        let df = d.matvec(&f);
        for v in df {
            assert!((v - 2.0).abs() < 1e-10);
        }
    }

    #[test]
    fn extrapolation_matrix_reproduces_quadratic_at_new_points() {
        let nodes = [-1.0, 0.0, 1.0];
        let targets = [-0.5, 0.5];
        let e = extrapolation_matrix(&nodes, &targets);
        let f: Vec<f64> = nodes.iter().map(|&x| x * x - x + 1.0).collect();
        let out = e.matvec(&f);
        for (v, &x) in out.iter().zip(targets.iter()) {
            assert!((v - (x * x - x + 1.0)).abs() < 1e-10);
        }
    }
}
