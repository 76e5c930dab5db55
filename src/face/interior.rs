//! The interior face kind (§4.2, §9): both sides are local elements owned
//! by the same partition. No ghost synthesis, no message passing — this is
//! the simplest of the four face variants and the one the others fall back
//! to once their own state (boundary ghost, MPI receive, overset donor
//! interpolation) has produced a right-hand trace.

use crate::element::state::Element;
use crate::face::common::{common_viscous_flux, inviscid_flux, ldg_common_state, FaceKernel, FaceSlots, LdgParams, RiemannType};
use crate::geometry::Point;

/// One interior face. `slots` is built by the geometry service (out of
/// scope, §6) and merely consumed here: which flux-point index on the left
/// element corresponds to which on the right, already accounting for any
/// face rotation/flipping.
pub struct InteriorFace {
    slots: FaceSlots,
    riemann: RiemannType,
    ldg: LdgParams,

    ul: Vec<Vec<f64>>,
    ur: Vec<Vec<f64>>,
    fn_common: Vec<Vec<f64>>,
}

impl InteriorFace {
    pub fn new(slots: FaceSlots, riemann: RiemannType, ldg: LdgParams) -> Self {
        assert_eq!(slots.left_fpts.len(), slots.right_fpts.len(), "interior face slot counts must match");
        Self { slots, riemann, ldg, ul: Vec::new(), ur: Vec::new(), fn_common: Vec::new() }
    }

    fn n_face_pts(&self) -> usize {
        self.slots.left_fpts.len()
    }
}

impl FaceKernel for InteriorFace {
    fn setup_face(&mut self, left: &Element, right_hint: Option<&Element>) {
        assert!(right_hint.is_some(), "an interior face requires both elements");
        let n = self.n_face_pts();
        let n_vars = left.n_vars();
        self.ul = vec![vec![0.0; n_vars]; n];
        self.ur = vec![vec![0.0; n_vars]; n];
        self.fn_common = vec![vec![0.0; n_vars]; n];
    }

    fn get_left_state(&mut self, left: &Element) {
        for (row, &k) in self.ul.iter_mut().zip(self.slots.left_fpts.iter()) {
            row.copy_from_slice(&left.u_fpts[k]);
        }
    }

    fn get_right_state(&mut self, right: Option<&Element>) {
        let right = right.expect("an interior face always has a right element");
        for (row, &k) in self.ur.iter_mut().zip(self.slots.right_fpts.iter()) {
            row.copy_from_slice(&right.u_fpts[k]);
        }
    }

    fn calc_inviscid_flux(&mut self, riemann: RiemannType) {
        self.riemann = riemann;
    }

    fn calc_viscous_flux(&mut self, ldg: LdgParams) {
        self.ldg = ldg;
    }

    fn set_right_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        let right = right.expect("an interior face always has a right element");
        for (i, (&lk, &rk)) in self.slots.left_fpts.iter().zip(self.slots.right_fpts.iter()).enumerate() {
            let normal = left.normal_fpts[lk];
            let mut flux = inviscid_flux(&left.equation, &self.ul[i], &self.ur[i], normal, self.riemann);
            if left.equation.is_viscous() {
                let visc = common_viscous_flux(
                    &left.equation,
                    &self.ul[i],
                    &self.ur[i],
                    &left.grad_phys_fpts[lk],
                    &right.grad_phys_fpts[rk],
                    normal,
                    self.ldg,
                );
                for (f, v) in flux.iter_mut().zip(visc.iter()) {
                    *f -= v;
                }
            }
            self.fn_common[i] = flux;
            left.fn_fpts[lk].copy_from_slice(&self.fn_common[i]);
            // The right element's outward normal at the matching flux
            // point is antiparallel to the left's, so its common flux is
            // the negation of the left-referenced one.
            for (v, f) in right.fn_fpts[rk].iter_mut().zip(self.fn_common[i].iter()) {
                *v = -f;
            }
        }
    }

    fn write_common_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        let right = right.expect("an interior face always has a right element");
        for (&lk, &rk) in self.slots.left_fpts.iter().zip(self.slots.right_fpts.iter()) {
            let common = ldg_common_state(&left.u_fpts[lk], &right.u_fpts[rk], self.ldg);
            left.u_common_fpts[lk].copy_from_slice(&common);
            right.u_common_fpts[rk].copy_from_slice(&common);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::basis::PointSet;
    use crate::element::kind::ElementKind;
    use crate::element::state::Equation;
    use crate::operators::build::build_operators;
    use crate::physics::advection_diffusion;
    use std::sync::Arc;

    fn quad_element(order: usize, nodes: Vec<Point>) -> Element {
        let ops = Arc::new(build_operators(ElementKind::Quad, order, PointSet::GaussLegendre));
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
    fn matching_states_produce_zero_net_flux_on_both_sides() {
        let nodes_left = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let nodes_right = vec![
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
            Point::new(2.0, 1.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
        ];
        let mut left = quad_element(2, nodes_left);
        let mut right = quad_element(2, nodes_right);

        // Face 1 is the "+xi" face of `left` in the `face_table` convention;
        // face 3 is the "-xi" face of `right`, its geometric neighbor.
        let ops = left.ops.clone();
        let left_slots: Vec<usize> = (ops.face_offsets[1]..ops.face_offsets[2]).collect();
        let right_slots: Vec<usize> = (ops.face_offsets[3]..ops.face_offsets[4]).collect();

        for &k in &left_slots {
            left.u_fpts[k][0] = 2.0;
        }
        for &k in &right_slots {
            right.u_fpts[k][0] = 2.0;
        }

        let mut face = InteriorFace::new(
            FaceSlots { left_fpts: left_slots, right_fpts: right_slots },
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, Some(&right));
        face.get_left_state(&left);
        face.get_right_state(Some(&right));
        face.calc_inviscid_flux(RiemannType::Rusanov);
        face.set_right_state(&mut left, Some(&mut right));

        for k in &face.slots.left_fpts {
            assert!(left.fn_fpts[*k].iter().all(|v| v.is_finite()));
        }
    }
}
