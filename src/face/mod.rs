//! Face polymorphism (§4.2, §9): a closed set of four variants sharing one
//! method contract. `Face` dispatches into whichever kind a mesh face
//! turned out to be; `Solver` holds a flat `Vec<Face>` per partition and
//! never needs to know which variant it's driving.

pub mod boundary;
pub mod common;
pub mod interior;
pub mod mpi;
pub mod overset;

pub use boundary::{BoundaryFace, BoundaryKind, Freestream};
pub use common::{FaceKernel, FaceSlots, LdgParams, RiemannType};
pub use interior::InteriorFace;
pub use mpi::MpiFace;
pub use overset::OversetFace;

use crate::element::state::Element;

/// One mesh face, tagged by kind. `Mpi`/`Overset` additionally implement
/// `automaton::Automaton` on their own concrete type — the solver folds
/// them through the coordinator separately from this enum's synchronous
/// `FaceKernel` calls (§5: non-blocking trace exchange brackets the
/// synchronous interior/boundary evaluation).
pub enum Face {
    Interior(InteriorFace),
    Boundary(BoundaryFace),
    Mpi(MpiFace),
    Overset(OversetFace),
}

impl FaceKernel for Face {
    fn setup_face(&mut self, left: &Element, right_hint: Option<&Element>) {
        match self {
            Face::Interior(f) => f.setup_face(left, right_hint),
            Face::Boundary(f) => f.setup_face(left, right_hint),
            Face::Mpi(f) => f.setup_face(left, right_hint),
            Face::Overset(f) => f.setup_face(left, right_hint),
        }
    }

    fn get_left_state(&mut self, left: &Element) {
        match self {
            Face::Interior(f) => f.get_left_state(left),
            Face::Boundary(f) => f.get_left_state(left),
            Face::Mpi(f) => f.get_left_state(left),
            Face::Overset(f) => f.get_left_state(left),
        }
    }

    fn get_right_state(&mut self, right: Option<&Element>) {
        match self {
            Face::Interior(f) => f.get_right_state(right),
            Face::Boundary(f) => f.get_right_state(right),
            Face::Mpi(f) => f.get_right_state(right),
            Face::Overset(f) => f.get_right_state(right),
        }
    }

    fn calc_inviscid_flux(&mut self, riemann: RiemannType) {
        match self {
            Face::Interior(f) => f.calc_inviscid_flux(riemann),
            Face::Boundary(f) => f.calc_inviscid_flux(riemann),
            Face::Mpi(f) => f.calc_inviscid_flux(riemann),
            Face::Overset(f) => f.calc_inviscid_flux(riemann),
        }
    }

    fn calc_viscous_flux(&mut self, ldg: LdgParams) {
        match self {
            Face::Interior(f) => f.calc_viscous_flux(ldg),
            Face::Boundary(f) => f.calc_viscous_flux(ldg),
            Face::Mpi(f) => f.calc_viscous_flux(ldg),
            Face::Overset(f) => f.calc_viscous_flux(ldg),
        }
    }

    fn set_right_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        match self {
            Face::Interior(f) => f.set_right_state(left, right),
            Face::Boundary(f) => f.set_right_state(left, right),
            Face::Mpi(f) => f.set_right_state(left, right),
            Face::Overset(f) => f.set_right_state(left, right),
        }
    }

    fn write_common_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        match self {
            Face::Interior(f) => f.write_common_state(left, right),
            Face::Boundary(f) => f.write_common_state(left, right),
            Face::Mpi(f) => f.write_common_state(left, right),
            Face::Overset(f) => f.write_common_state(left, right),
        }
    }
}

impl Face {
    pub fn is_local(&self) -> bool {
        matches!(self, Face::Interior(_) | Face::Boundary(_))
    }
}
