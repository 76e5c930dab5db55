use crate::element::kind::ElementKind;
use crate::geometry::point::Point;

/// The constant reference-space outward normal of each face of the
/// reference element, stored once per (type, p) the first time it is
/// observed (§4.1: "reference outward normals at flux points are constant
/// and stored once per (type, p)").
///
/// Face ordering for `Quad`: bottom (eta=-1), right (xi=1), top (eta=1),
/// left (xi=-1). Face ordering for `Hex` follows the VTK hexahedron face
/// convention: -xi, +xi, -eta, +eta, -zeta, +zeta.
pub fn reference_face_normal(kind: ElementKind, face: usize) -> Point {
    match kind {
        ElementKind::Quad => match face {
            0 => Point::new(0.0, -1.0, 0.0),
            1 => Point::new(1.0, 0.0, 0.0),
            2 => Point::new(0.0, 1.0, 0.0),
            3 => Point::new(-1.0, 0.0, 0.0),
            _ => panic!("quad has only 4 faces"),
        },
        ElementKind::Hex => match face {
            0 => Point::new(-1.0, 0.0, 0.0),
            1 => Point::new(1.0, 0.0, 0.0),
            2 => Point::new(0.0, -1.0, 0.0),
            3 => Point::new(0.0, 1.0, 0.0),
            4 => Point::new(0.0, 0.0, -1.0),
            5 => Point::new(0.0, 0.0, 1.0),
            _ => panic!("hex has only 6 faces"),
        },
        ElementKind::Tri => panic!("Tri elements are not supported outside the supermesh helper"),
    }
}

/// Sum of the `(normal, area-weight)` pairs over the whole reference
/// element, used by the geometric-closure test (§8 invariant 3 / scenario
/// E): on a reference cube the discrete sum of outward face normals, each
/// weighted by its reference face measure, is exactly zero.
pub fn reference_closure_residual(kind: ElementKind) -> Point {
    (0..kind.num_faces())
        .map(|f| reference_face_normal(kind, f))
        .fold(Point::zero(), |acc, n| acc + n)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quad_reference_normals_sum_to_zero() {
        let r = reference_closure_residual(ElementKind::Quad);
        assert!(r.norm() < 1e-14);
    }

    #[test]
    fn hex_reference_normals_sum_to_zero() {
        let r = reference_closure_residual(ElementKind::Hex);
        assert!(r.norm() < 1e-14);
    }
}
