//! The MPI-partition face kind (§4.2, §5, §9): the right element lives on
//! another rank. `MpiFace` runs the local half of the `FaceKernel` contract
//! like any other face, but gathering `UR` is a non-blocking exchange
//! rather than a local read — so it additionally implements
//! `automaton::Automaton`, letting the same coordinator-dispatcher model the
//! teacher uses for its own parallel folds drive the send/receive instead
//! of a bespoke MPI wait loop.

use crate::automaton::{Automaton, Status};
use crate::element::state::Element;
use crate::face::common::{common_viscous_flux, inviscid_flux, ldg_common_state, FaceKernel, FaceSlots, LdgParams, RiemannType};

/// Identifies one MPI face uniquely across the whole partition boundary:
/// the lower-numbered rank's key is `(min(rank, peer), local_face_id)` so
/// both ends agree on the same `Automaton::Key`.
pub type MpiFaceKey = (u32, u32);

/// `communicate()` (§6): the message carried between the two ends of one
/// MPI face is just the sender's flux-point trace, in the shared
/// flux-point order both ends agreed on at `setupFace` time.
pub struct MpiFace {
    key: MpiFaceKey,
    peer_key: MpiFaceKey,
    slots: FaceSlots,
    riemann: RiemannType,
    ldg: LdgParams,

    ul: Vec<Vec<f64>>,
    ur: Option<Vec<Vec<f64>>>,
    fn_common: Vec<Vec<f64>>,
}

impl MpiFace {
    pub fn new(key: MpiFaceKey, peer_key: MpiFaceKey, slots: FaceSlots, riemann: RiemannType, ldg: LdgParams) -> Self {
        Self {
            key,
            peer_key,
            slots,
            riemann,
            ldg,
            ul: Vec::new(),
            ur: None,
            fn_common: Vec::new(),
        }
    }

    fn n_face_pts(&self) -> usize {
        self.slots.left_fpts.len()
    }
}

impl FaceKernel for MpiFace {
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

    /// No-op: the remote trace arrives through `Automaton::receive`, not
    /// through a locally visible `Element`.
    fn get_right_state(&mut self, _right: Option<&Element>) {}

    /// No-op: the real evaluation needs the owning element's equation and
    /// normals, which this trait method doesn't receive — see
    /// `resolve_mpi_flux`, called once the peer trace has arrived.
    fn calc_inviscid_flux(&mut self, riemann: RiemannType) {
        self.riemann = riemann;
    }

    fn calc_viscous_flux(&mut self, ldg: LdgParams) {
        self.ldg = ldg;
    }

    /// Left-only: the peer rank scatters into its own element using the
    /// `Fn` this face computed, delivered back as the `Automaton::Value`.
    fn set_right_state(&mut self, left: &mut Element, _right: Option<&mut Element>) {
        for (i, &lk) in self.slots.left_fpts.iter().enumerate() {
            left.fn_fpts[lk].copy_from_slice(&self.fn_common[i]);
        }
    }

    /// No-op: the peer trace needed for the common state is the same one
    /// `Automaton::receive` already gathers for the flux resolve, so there
    /// is nothing left for this per-face hook to do — see
    /// `resolve_common_state`, called once after the exchange completes.
    fn write_common_state(&mut self, _left: &mut Element, _right: Option<&mut Element>) {}
}

impl Automaton for MpiFace {
    type Key = MpiFaceKey;
    type Message = Vec<Vec<f64>>;
    type Value = (MpiFaceKey, Vec<Vec<f64>>);

    fn key(&self) -> Self::Key {
        self.key
    }

    /// This face's one outgoing message is its own `UL` trace, addressed to
    /// the peer face's key.
    fn messages(&self) -> Vec<(Self::Key, Self::Message)> {
        vec![(self.peer_key, self.ul.clone())]
    }

    fn receive(&mut self, message: Self::Message) -> Status {
        self.ur = Some(message);
        Status::Eligible
    }

    /// Runs once `UR` has arrived: evaluate the common flux against the
    /// element's equation and Riemann choice, yielding the per-flux-point
    /// `Fn` rows keyed by this face so the coordinator can route them back.
    fn value(self) -> Self::Value {
        (self.key, self.fn_common)
    }
}

/// Write the LDG common state into `left.u_common_fpts`, run once the peer
/// trace has arrived but before `calc_corrected_gradients`. Reuses the same
/// `ul`/`ur` traces the later flux resolve reads — `setup_face` never
/// resets `MpiFace::ur`, so one exchange per residual evaluation serves
/// both the common-state and flux passes.
pub fn resolve_common_state(face: &mut MpiFace, left: &mut Element) {
    let ur = face.ur.clone().expect("resolve_common_state called before the peer trace arrived");
    for (i, &lk) in face.slots.left_fpts.iter().enumerate() {
        let common = ldg_common_state(&face.ul[i], &ur[i], face.ldg);
        left.u_common_fpts[lk].copy_from_slice(&common);
    }
}

/// The real flux evaluation, run once both traces and the owning element's
/// equation/normal are available — `Automaton::value` only has `self`, so
/// the caller (the solver's face-evaluation phase) invokes this just before
/// folding the face into the `Automaton` pipeline. The viscous term uses the
/// left element's own corrected gradient on both sides of the interface —
/// the peer's gradient never crosses the wire, only its solution trace
/// does, so this is a one-sided LDG approximation at partition boundaries.
pub fn resolve_mpi_flux(face: &mut MpiFace, left: &Element) {
    let ur = face.ur.clone().expect("resolve_mpi_flux called before the peer trace arrived");
    let riemann = face.riemann;
    for (i, &lk) in face.slots.left_fpts.iter().enumerate() {
        let normal = left.normal_fpts[lk];
        let mut flux = inviscid_flux(&left.equation, &face.ul[i], &ur[i], normal, riemann);
        if left.equation.is_viscous() {
            let visc = common_viscous_flux(&left.equation, &face.ul[i], &ur[i], &left.grad_phys_fpts[lk], &left.grad_phys_fpts[lk], normal, face.ldg);
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
    fn receiving_the_peer_trace_makes_the_face_eligible() {
        let left = quad_element(1);
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[1]..ops.face_offsets[2]).collect();
        let mut face = MpiFace::new(
            (0, 0),
            (1, 0),
            FaceSlots { left_fpts: slots, right_fpts: vec![] },
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, None);
        face.get_left_state(&left);
        let peer_trace = face.ul.clone();
        assert!(matches!(face.receive(peer_trace), Status::Eligible));
    }

    #[test]
    fn resolve_mpi_flux_matches_consistency_for_identical_traces() {
        let mut left = quad_element(1);
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[1]..ops.face_offsets[2]).collect();
        for &k in &slots {
            left.u_fpts[k][0] = 1.0;
        }
        let mut face = MpiFace::new(
            (0, 0),
            (1, 0),
            FaceSlots { left_fpts: slots.clone(), right_fpts: vec![] },
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, None);
        face.get_left_state(&left);
        let peer_trace = face.ul.clone();
        face.receive(peer_trace);
        resolve_mpi_flux(&mut face, &left);
        face.set_right_state(&mut left, None);
        for &k in &slots {
            assert!(left.fn_fpts[k][0].is_finite());
        }
    }
}
