//! The overset face kind (§4.2, §6, §9): the right state comes from a
//! donor cell in another overlapping mesh, resolved by the (out-of-scope)
//! overset communicator's interpolation rather than read off a local
//! neighbor or exchanged as a raw flux-point trace. Like `MpiFace`, arrival
//! of that donor state is a non-blocking event, so `OversetFace` implements
//! `Automaton` too — the donor interpolation is the one "message" it waits
//! on before it is eligible to run.
//!
//! §4.3 step 8 notes that explicit overset flux evaluation is skipped
//! entirely when the overset method is field interpolation (fringe cells
//! are overwritten directly instead); this module only covers the
//! Galerkin-projection/explicit-flux overset method.

use crate::automaton::{Automaton, Status};
use crate::element::state::Element;
use crate::face::common::{common_viscous_flux, inviscid_flux, ldg_common_state, FaceKernel, FaceSlots, LdgParams, RiemannType};

pub type OversetFaceKey = u64;

pub struct OversetFace {
    key: OversetFaceKey,
    slots: FaceSlots,
    riemann: RiemannType,
    ldg: LdgParams,

    ul: Vec<Vec<f64>>,
    donor_state: Option<Vec<Vec<f64>>>,
    fn_common: Vec<Vec<f64>>,
}

impl OversetFace {
    pub fn new(key: OversetFaceKey, slots: FaceSlots, riemann: RiemannType, ldg: LdgParams) -> Self {
        Self {
            key,
            slots,
            riemann,
            ldg,
            ul: Vec::new(),
            donor_state: None,
            fn_common: Vec::new(),
        }
    }

    fn n_face_pts(&self) -> usize {
        self.slots.left_fpts.len()
    }

    /// Whether the donor interpolation has arrived yet (driven externally,
    /// since the overset communicator sits outside this `Automaton` group).
    pub fn has_donor_state(&self) -> bool {
        self.donor_state.is_some()
    }
}

impl FaceKernel for OversetFace {
    fn setup_face(&mut self, left: &Element, _right_hint: Option<&Element>) {
        let n = self.n_face_pts();
        let n_vars = left.n_vars();
        self.ul = vec![vec![0.0; n_vars]; n];
        self.fn_common = vec![vec![0.0; n_vars]; n];
    }

    fn get_left_state(&mut self, left: &Element) {
        for (row, &k) in self.ul.iter_mut().zip(self.slots.left_fpts.iter()) {
            row.copy_from_slice(&left.u_fpts[k]);
        }
    }

    /// No-op: the donor state arrives through `Automaton::receive`, sourced
    /// from the overset communicator's interpolation, not a local element.
    fn get_right_state(&mut self, _right: Option<&Element>) {}

    fn calc_inviscid_flux(&mut self, riemann: RiemannType) {
        self.riemann = riemann;
    }

    fn calc_viscous_flux(&mut self, ldg: LdgParams) {
        self.ldg = ldg;
    }

    fn set_right_state(&mut self, left: &mut Element, _right: Option<&mut Element>) {
        for (i, &lk) in self.slots.left_fpts.iter().enumerate() {
            left.fn_fpts[lk].copy_from_slice(&self.fn_common[i]);
        }
    }

    /// No-op, for the same reason as `MpiFace::write_common_state`: the
    /// donor interpolation needed is the same one `Automaton::receive`
    /// already gathers, reused by `resolve_common_state`.
    fn write_common_state(&mut self, _left: &mut Element, _right: Option<&mut Element>) {}
}

impl Automaton for OversetFace {
    type Key = OversetFaceKey;
    type Message = Vec<Vec<f64>>;
    type Value = (OversetFaceKey, Vec<Vec<f64>>);

    fn key(&self) -> Self::Key {
        self.key
    }

    /// The overset face never originates a message of its own — the donor
    /// interpolation is pushed to it by the overset communicator, which
    /// sits outside this automaton group.
    fn messages(&self) -> Vec<(Self::Key, Self::Message)> {
        Vec::new()
    }

    fn receive(&mut self, message: Self::Message) -> Status {
        self.donor_state = Some(message);
        Status::Eligible
    }

    fn value(self) -> Self::Value {
        (self.key, self.fn_common)
    }
}

/// Write the LDG common state into `left.u_common_fpts`, run once the donor
/// interpolation has arrived but before `calc_corrected_gradients`. Reuses
/// the donor state `resolve_overset_flux` reads later — `setup_face` never
/// resets `OversetFace::donor_state`, so one interpolation serves both the
/// common-state and flux passes.
pub fn resolve_common_state(face: &mut OversetFace, left: &mut Element) {
    let donor = face.donor_state.clone().expect("resolve_common_state called before the donor state arrived");
    for (i, &lk) in face.slots.left_fpts.iter().enumerate() {
        let common = ldg_common_state(&face.ul[i], &donor[i], face.ldg);
        left.u_common_fpts[lk].copy_from_slice(&common);
    }
}

/// The real flux evaluation, run once the donor interpolation has arrived
/// and the owning element's equation/normals are available. Like
/// `mpi::resolve_mpi_flux`, the viscous term is one-sided: only the donor's
/// interpolated solution crosses into this face, not its gradient, so the
/// left element's own gradient stands in for both sides.
pub fn resolve_overset_flux(face: &mut OversetFace, left: &Element) {
    let donor = face.donor_state.clone().expect("resolve_overset_flux called before the donor state arrived");
    let riemann = face.riemann;
    for (i, &lk) in face.slots.left_fpts.iter().enumerate() {
        let normal = left.normal_fpts[lk];
        let mut flux = inviscid_flux(&left.equation, &face.ul[i], &donor[i], normal, riemann);
        if left.equation.is_viscous() {
            let visc = common_viscous_flux(&left.equation, &face.ul[i], &donor[i], &left.grad_phys_fpts[lk], &left.grad_phys_fpts[lk], normal, face.ldg);
            for (f, v) in flux.iter_mut().zip(visc.iter()) {
                *f -= v;
            }
        }
        face.fn_common[i] = flux;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::basis::PointSet;
    use crate::element::kind::ElementKind;
    use crate::element::state::Equation;
    use crate::geometry::Point;
    use crate::operators::build::build_operators;
    use crate::physics::advection_diffusion;
    use std::sync::Arc;

    fn quad_element(order: usize) -> Element {
        let ops = Arc::new(build_operators(ElementKind::Quad, order, PointSet::GaussLegendre));
        let nodes = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        Element::setup(
            ElementKind::Quad,
            order,
            ops,
            nodes,
            vec![Point::zero(); 4],
            Equation::AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams {
                velocity: Point::new(1.0, 0.0, 0.0),
                diff_d: 0.0,
                lambda: 1.0,
            }),
            false,
        )
    }

    #[test]
    fn overset_face_has_no_outgoing_messages() {
        let left = quad_element(1);
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        let face = OversetFace::new(
            7,
            FaceSlots { left_fpts: slots, right_fpts: vec![] },
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        assert!(face.messages().is_empty());
    }

    #[test]
    fn receiving_donor_state_resolves_a_finite_flux() {
        let mut left = quad_element(1);
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        for &k in &slots {
            left.u_fpts[k][0] = 1.5;
        }
        let mut face = OversetFace::new(
            3,
            FaceSlots { left_fpts: slots.clone(), right_fpts: vec![] },
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, None);
        face.get_left_state(&left);
        let donor = face.ul.clone();
        assert!(matches!(face.receive(donor), Status::Eligible));
        resolve_overset_flux(&mut face, &left);
        face.set_right_state(&mut left, None);
        for &k in &slots {
            assert!(left.fn_fpts[k][0].is_finite());
        }
    }
}
