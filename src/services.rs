//! Collaborator interfaces the core residual pipeline consumes but does
//! not own the implementation of (§5 "Shared resources", §6 "External
//! services consumed by the core"). Concrete geometry/overset
//! implementations live outside this crate's scope; `Solver` is generic
//! over these traits so a host application can supply its own mesh reader
//! or overset coupling without the core depending on it directly.

use crate::geometry::Point;

/// A cell's overset status (§6 `writeIBLANK`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Iblank {
    Normal,
    Hole,
    Fringe,
}

/// Mesh connectivity and motion, owned outside the solver (§6 "Geometry
/// service").
pub trait GeometryService {
    /// Vertex indices of cell `cell_id`'s corners, in the element's own
    /// shape-function node ordering.
    fn c2v(&self, cell_id: usize) -> &[usize];
    fn vertex(&self, v: usize) -> Point;
    /// Zero on a static mesh; nonzero once `motion != 0`.
    fn grid_velocity(&self, v: usize) -> Point;
    fn iblank(&self, cell_id: usize) -> Iblank;
    /// Rebuild the alternating digital tree (or equivalent spatial index)
    /// after the mesh moves; a no-op on a static mesh.
    fn update_adt(&mut self);
}

/// A single donor→receiver interpolation weight, as produced by
/// `match_overset_points`/`perform_galerkin_projection`.
#[derive(Clone, Copy, Debug)]
pub struct OversetWeight {
    pub donor_cell: usize,
    pub receiver_point: usize,
    pub weight: f64,
}

/// The overset coupling collaborator (§6 "Overset communicator"). Owns the
/// donor search and either field interpolation or the Galerkin-projection
/// flux exchange the `supermesh` module feeds.
pub trait OversetCommunicator {
    fn setup_fringe_cell_points(&mut self);
    fn setup_over_face_points(&mut self);
    fn match_overset_points(&mut self) -> Vec<OversetWeight>;
    /// Push the donor-side field values across to the receiver ranks;
    /// completion is observed through `Automaton::receive` on the
    /// receiving `OversetFace`s, not through this call's return.
    fn exchange_overset_data(&mut self, donor_values: &[(usize, Vec<f64>)]);
    fn perform_galerkin_projection(&mut self, weights: &[OversetWeight]) -> Vec<f64>;
}

#[cfg(test)]
mod test {
    use super::*;

    struct StubGeometry;
    impl GeometryService for StubGeometry {
        fn c2v(&self, _cell_id: usize) -> &[usize] {
            &[]
        }
        fn vertex(&self, _v: usize) -> Point {
            Point::zero()
        }
        fn grid_velocity(&self, _v: usize) -> Point {
            Point::zero()
        }
        fn iblank(&self, _cell_id: usize) -> Iblank {
            Iblank::Normal
        }
        fn update_adt(&mut self) {}
    }

    #[test]
    fn a_stub_geometry_service_satisfies_the_trait() {
        let geo = StubGeometry;
        assert_eq!(geo.iblank(0), Iblank::Normal);
    }
}
