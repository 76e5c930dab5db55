use crate::element::kind::ElementKind;

/// Shape-function values and reference-space derivatives at a point `xi`,
/// for the linear/bilinear/trilinear isoparametric map used to carry mesh
/// node coordinates (and, on moving meshes, `nodesRK`) into physical space.
///
/// Quad and hex are fully supported. Tri support is partial: only the
/// shape values and derivatives of the 3-node linear triangle are given,
/// for the supermesh helper (§4.5); a `Tri` element is otherwise rejected
/// at `Element::setup` (see `element/state.rs`).
pub struct ShapeEval {
    /// Value of each node's shape function at the query point.
    pub n: Vec<f64>,
    /// Reference-space derivative of each node's shape function: `d[i][d]`
    /// is `dN_i/dxi_d`.
    pub dn: Vec<Vec<f64>>,
}

pub fn node_count(kind: ElementKind) -> usize {
    match kind {
        ElementKind::Quad => 4,
        ElementKind::Hex => 8,
        ElementKind::Tri => 3,
    }
}

/// Evaluate shape values and reference derivatives for `kind` at the
/// reference point `xi` (unused trailing components are ignored: a 2-D
/// quad only reads `xi[0..2]`).
pub fn eval(kind: ElementKind, xi: &[f64]) -> ShapeEval {
    match kind {
        ElementKind::Quad => quad(xi[0], xi[1]),
        ElementKind::Hex => hex(xi[0], xi[1], xi[2]),
        ElementKind::Tri => tri(xi[0], xi[1]),
    }
}

/// Corner ordering: (-1,-1), (1,-1), (1,1), (-1,1).
fn quad(xi: f64, eta: f64) -> ShapeEval {
    let sx = [-1.0, 1.0, 1.0, -1.0];
    let se = [-1.0, -1.0, 1.0, 1.0];

    let n = (0..4)
        .map(|i| 0.25 * (1.0 + sx[i] * xi) * (1.0 + se[i] * eta))
        .collect();

    let dn = (0..4)
        .map(|i| {
            vec![
                0.25 * sx[i] * (1.0 + se[i] * eta),
                0.25 * se[i] * (1.0 + sx[i] * xi),
            ]
        })
        .collect();

    ShapeEval { n, dn }
}

/// Corner ordering follows the VTK hexahedron convention: bottom face
/// (-1,-1,-1),(1,-1,-1),(1,1,-1),(-1,1,-1), then the matching top face.
fn hex(xi: f64, eta: f64, zeta: f64) -> ShapeEval {
    let sx = [-1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0];
    let se = [-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0];
    let sz = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];

    let n = (0..8)
        .map(|i| {
            0.125 * (1.0 + sx[i] * xi) * (1.0 + se[i] * eta) * (1.0 + sz[i] * zeta)
        })
        .collect();

    let dn = (0..8)
        .map(|i| {
            vec![
                0.125 * sx[i] * (1.0 + se[i] * eta) * (1.0 + sz[i] * zeta),
                0.125 * se[i] * (1.0 + sx[i] * xi) * (1.0 + sz[i] * zeta),
                0.125 * sz[i] * (1.0 + sx[i] * xi) * (1.0 + se[i] * eta),
            ]
        })
        .collect();

    ShapeEval { n, dn }
}

/// Linear triangle in area (barycentric) coordinates driven off `(xi, eta)`
/// on the unit right triangle `{xi >= 0, eta >= 0, xi + eta <= 1}`. Used
/// only by the supermesh tetrahedron clipper, never by `Element::setup`.
fn tri(xi: f64, eta: f64) -> ShapeEval {
    ShapeEval {
        n: vec![1.0 - xi - eta, xi, eta],
        dn: vec![vec![-1.0, -1.0], vec![1.0, 0.0], vec![0.0, 1.0]],
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quad_shape_functions_partition_unity() {
        let s = quad(0.3, -0.6);
        let sum: f64 = s.n.iter().sum();
        assert!((sum - 1.0).abs() < 1e-14);
    }

    #[test]
    fn hex_shape_functions_partition_unity() {
        let s = hex(0.2, -0.4, 0.7);
        let sum: f64 = s.n.iter().sum();
        assert!((sum - 1.0).abs() < 1e-14);
    }

    #[test]
    fn quad_corner_shape_is_kronecker_delta() {
        // node 0 sits at (-1, -1)
        let s = quad(-1.0, -1.0);
        assert!((s.n[0] - 1.0).abs() < 1e-14);
        for &v in &s.n[1..] {
            assert!(v.abs() < 1e-14);
        }
    }
}
