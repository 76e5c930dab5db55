//! The boundary face kind (§4.2): one local element and a condition tag.
//! The right-hand trace is synthesized from the tag and, where needed, the
//! freestream configuration rather than read off a neighboring element.
//! Periodic is the one exception — its "ghost" is a genuine element on the
//! opposite side of the domain, reached the same way an interior face
//! reaches its right element.

use crate::element::state::Element;
use crate::face::common::{common_viscous_flux, inviscid_flux, ldg_common_state, FaceKernel, FaceSlots, LdgParams, RiemannType};
use crate::geometry::Point;
use crate::physics::{euler2d, euler3d};

/// `freestream` (§6): `rhoBound, uBound, vBound, wBound, pBound` give the
/// far-field primitive state directly; `MachBound`/`Re`/`Lref`/`TBound` are
/// consumed upstream of this module to derive `mu`/`gamma` and are not
/// needed again here once `rho/u/v/w/p` are known.
#[derive(Clone, Copy, Debug)]
pub struct Freestream {
    pub rho: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
    pub p: f64,
}

/// The boundary-condition tags §4.2 lists, all sharing the one `FaceKernel`
/// contract.
#[derive(Clone, Copy, Debug)]
pub enum BoundaryKind {
    SlipWall,
    NoSlipAdiabatic,
    IsothermalNoSlip { t_wall: f64 },
    SupersonicInflow,
    SupersonicOutflow,
    Characteristic,
    Periodic,
}

pub struct BoundaryFace {
    slots: FaceSlots,
    /// Only populated for `Periodic`: the matching flux-point indices on
    /// the partner element across the domain.
    partner_fpts: Vec<usize>,
    kind: BoundaryKind,
    freestream: Freestream,
    riemann: RiemannType,
    ldg: LdgParams,

    ul: Vec<Vec<f64>>,
    ur: Vec<Vec<f64>>,
    fn_common: Vec<Vec<f64>>,
}

impl BoundaryFace {
    pub fn new(slots: FaceSlots, kind: BoundaryKind, freestream: Freestream, riemann: RiemannType, ldg: LdgParams) -> Self {
        let partner_fpts = match kind {
            BoundaryKind::Periodic => slots.right_fpts.clone(),
            _ => Vec::new(),
        };
        Self {
            slots,
            partner_fpts,
            kind,
            freestream,
            riemann,
            ldg,
            ul: Vec::new(),
            ur: Vec::new(),
            fn_common: Vec::new(),
        }
    }

    fn n_face_pts(&self) -> usize {
        self.slots.left_fpts.len()
    }

    fn synthesize_euler2d(&self, ul: &[f64], normal: Point, gamma: f64) -> Vec<f64> {
        let pl = euler2d::Conserved::from_slice(ul).to_primitive(gamma).expect("squeezing guards this");
        let (nx, ny) = (normal.x(), normal.y());
        let vn_l = pl.velocity_1() * nx + pl.velocity_2() * ny;

        let ghost = match self.kind {
            BoundaryKind::SlipWall => {
                let u = pl.velocity_1() - 2.0 * vn_l * nx;
                let v = pl.velocity_2() - 2.0 * vn_l * ny;
                euler2d::Primitive::new(pl.mass_density(), u, v, pl.gas_pressure())
            }
            BoundaryKind::NoSlipAdiabatic => {
                euler2d::Primitive::new(pl.mass_density(), -pl.velocity_1(), -pl.velocity_2(), pl.gas_pressure())
            }
            BoundaryKind::IsothermalNoSlip { t_wall } => {
                let rho_wall = gamma * pl.gas_pressure() / ((gamma - 1.0) * t_wall).max(1e-300);
                euler2d::Primitive::new(rho_wall, -pl.velocity_1(), -pl.velocity_2(), pl.gas_pressure())
            }
            BoundaryKind::SupersonicInflow => {
                euler2d::Primitive::new(self.freestream.rho, self.freestream.u, self.freestream.v, self.freestream.p)
            }
            BoundaryKind::SupersonicOutflow => pl,
            BoundaryKind::Characteristic => {
                let c_l = pl.sound_speed_squared(gamma).sqrt();
                let c_inf = (gamma * self.freestream.p / self.freestream.rho).sqrt();
                let vn_inf = self.freestream.u * nx + self.freestream.v * ny;

                let r_plus = vn_l + 2.0 * c_l / (gamma - 1.0);
                let r_minus = vn_inf - 2.0 * c_inf / (gamma - 1.0);
                let vn_b = 0.5 * (r_plus + r_minus);
                let c_b = (gamma - 1.0) * 0.25 * (r_plus - r_minus);

                let (rho_src, u_src, v_src, p_src) = if vn_b > 0.0 {
                    (pl.mass_density(), pl.velocity_1(), pl.velocity_2(), pl.gas_pressure())
                } else {
                    (self.freestream.rho, self.freestream.u, self.freestream.v, self.freestream.p)
                };
                let s = p_src / rho_src.powf(gamma);
                let rho_b = (c_b * c_b / (gamma * s)).powf(1.0 / (gamma - 1.0));
                let p_b = rho_b * c_b * c_b / gamma;
                let vn_src = u_src * nx + v_src * ny;
                let u_b = u_src + (vn_b - vn_src) * nx;
                let v_b = v_src + (vn_b - vn_src) * ny;
                euler2d::Primitive::new(rho_b, u_b, v_b, p_b)
            }
            BoundaryKind::Periodic => unreachable!("periodic boundaries gather their right state from a partner element"),
        };
        ghost.to_conserved(gamma).as_array().to_vec()
    }

    fn synthesize_euler3d(&self, ul: &[f64], normal: Point, gamma: f64) -> Vec<f64> {
        let pl = euler3d::Conserved::from_slice(ul).to_primitive(gamma).expect("squeezing guards this");
        let n = normal;
        let v_l = Point::new(pl.velocity_1(), pl.velocity_2(), pl.velocity_3());
        let vn_l = v_l.dot(&n);

        let ghost = match self.kind {
            BoundaryKind::SlipWall => {
                let v = v_l - n * (2.0 * vn_l);
                euler3d::Primitive::new(pl.mass_density(), v.x(), v.y(), v.z(), pl.gas_pressure())
            }
            BoundaryKind::NoSlipAdiabatic => {
                euler3d::Primitive::new(pl.mass_density(), -pl.velocity_1(), -pl.velocity_2(), -pl.velocity_3(), pl.gas_pressure())
            }
            BoundaryKind::IsothermalNoSlip { t_wall } => {
                let rho_wall = gamma * pl.gas_pressure() / ((gamma - 1.0) * t_wall).max(1e-300);
                euler3d::Primitive::new(rho_wall, -pl.velocity_1(), -pl.velocity_2(), -pl.velocity_3(), pl.gas_pressure())
            }
            BoundaryKind::SupersonicInflow => euler3d::Primitive::new(
                self.freestream.rho,
                self.freestream.u,
                self.freestream.v,
                self.freestream.w,
                self.freestream.p,
            ),
            BoundaryKind::SupersonicOutflow => pl,
            BoundaryKind::Characteristic => {
                let c_l = pl.sound_speed_squared(gamma).sqrt();
                let c_inf = (gamma * self.freestream.p / self.freestream.rho).sqrt();
                let v_inf = Point::new(self.freestream.u, self.freestream.v, self.freestream.w);
                let vn_inf = v_inf.dot(&n);

                let r_plus = vn_l + 2.0 * c_l / (gamma - 1.0);
                let r_minus = vn_inf - 2.0 * c_inf / (gamma - 1.0);
                let vn_b = 0.5 * (r_plus + r_minus);
                let c_b = (gamma - 1.0) * 0.25 * (r_plus - r_minus);

                let (rho_src, v_src, p_src) = if vn_b > 0.0 {
                    (pl.mass_density(), v_l, pl.gas_pressure())
                } else {
                    (self.freestream.rho, v_inf, self.freestream.p)
                };
                let s = p_src / rho_src.powf(gamma);
                let rho_b = (c_b * c_b / (gamma * s)).powf(1.0 / (gamma - 1.0));
                let p_b = rho_b * c_b * c_b / gamma;
                let vn_src = v_src.dot(&n);
                let v_b = v_src + n * (vn_b - vn_src);
                euler3d::Primitive::new(rho_b, v_b.x(), v_b.y(), v_b.z(), p_b)
            }
            BoundaryKind::Periodic => unreachable!("periodic boundaries gather their right state from a partner element"),
        };
        ghost.to_conserved(gamma).as_array().to_vec()
    }
}

impl FaceKernel for BoundaryFace {
    fn setup_face(&mut self, left: &Element, right_hint: Option<&Element>) {
        if matches!(self.kind, BoundaryKind::Periodic) {
            assert!(right_hint.is_some(), "a periodic boundary requires its partner element");
        }
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
        if matches!(self.kind, BoundaryKind::Periodic) {
            let right = right.expect("a periodic boundary requires its partner element");
            for (row, &k) in self.ur.iter_mut().zip(self.partner_fpts.iter()) {
                row.copy_from_slice(&right.u_fpts[k]);
            }
            return;
        }
        // Ghost synthesis needs the left element's equation/normal, deferred
        // to `calc_inviscid_flux` where both are in scope; left untouched
        // here so the §4.2 step ordering still holds five distinct calls.
    }

    fn calc_inviscid_flux(&mut self, riemann: RiemannType) {
        self.riemann = riemann;
    }

    fn calc_viscous_flux(&mut self, ldg: LdgParams) {
        self.ldg = ldg;
    }

    fn set_right_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        let is_periodic = matches!(self.kind, BoundaryKind::Periodic);
        for (i, &lk) in self.slots.left_fpts.iter().enumerate() {
            let normal = left.normal_fpts[lk];

            if !is_periodic {
                self.ur[i] = match &left.equation {
                    crate::element::state::Equation::Euler2D { gamma, .. } => self.synthesize_euler2d(&self.ul[i], normal, *gamma),
                    crate::element::state::Equation::Euler3D { gamma, .. } => self.synthesize_euler3d(&self.ul[i], normal, *gamma),
                    crate::element::state::Equation::AdvectionDiffusion(_) => self.ul[i].clone(),
                };
            }

            let mut flux = inviscid_flux(&left.equation, &self.ul[i], &self.ur[i], normal, self.riemann);
            if left.equation.is_viscous() {
                // The ghost/partner gradient: the real partner element's
                // gradient for `Periodic`, the interior element's own
                // gradient everywhere else (no distinct ghost gradient
                // exists for a synthesized state).
                let gr = if is_periodic {
                    let rk = self.partner_fpts[i];
                    right.as_ref().expect("a periodic boundary requires its partner element").grad_phys_fpts[rk].clone()
                } else {
                    left.grad_phys_fpts[lk].clone()
                };
                let visc = common_viscous_flux(&left.equation, &self.ul[i], &self.ur[i], &left.grad_phys_fpts[lk], &gr, normal, self.ldg);
                for (f, v) in flux.iter_mut().zip(visc.iter()) {
                    *f -= v;
                }
            }
            self.fn_common[i] = flux;
            left.fn_fpts[lk].copy_from_slice(&self.fn_common[i]);
        }

        if is_periodic {
            let right = right.expect("a periodic boundary requires its partner element");
            for (i, &rk) in self.partner_fpts.iter().enumerate() {
                for (v, f) in right.fn_fpts[rk].iter_mut().zip(self.fn_common[i].iter()) {
                    *v = -f;
                }
            }
        }
    }

    fn write_common_state(&mut self, left: &mut Element, right: Option<&mut Element>) {
        let is_periodic = matches!(self.kind, BoundaryKind::Periodic);
        let mut right = right;
        for (i, &lk) in self.slots.left_fpts.iter().enumerate() {
            let ul = left.u_fpts[lk].clone();
            let normal = left.normal_fpts[lk];
            let ur = if is_periodic {
                let rk = self.partner_fpts[i];
                right.as_ref().expect("a periodic boundary requires its partner element").u_fpts[rk].clone()
            } else {
                match &left.equation {
                    crate::element::state::Equation::Euler2D { gamma, .. } => self.synthesize_euler2d(&ul, normal, *gamma),
                    crate::element::state::Equation::Euler3D { gamma, .. } => self.synthesize_euler3d(&ul, normal, *gamma),
                    crate::element::state::Equation::AdvectionDiffusion(_) => ul.clone(),
                }
            };
            let common = ldg_common_state(&ul, &ur, self.ldg);
            left.u_common_fpts[lk].copy_from_slice(&common);
            if is_periodic {
                let rk = self.partner_fpts[i];
                right.as_mut().unwrap().u_common_fpts[rk].copy_from_slice(&common);
            }
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
    use crate::physics::NsParams;
    use std::sync::Arc;

    fn unit_quad_euler(order: usize) -> Element {
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
            Equation::Euler2D { gamma: 1.4, viscous: None },
            false,
        )
    }

    fn freestream() -> Freestream {
        Freestream { rho: 1.0, u: 0.3, v: 0.0, w: 0.0, p: 1.0 / 1.4 }
    }

    #[test]
    fn slip_wall_cancels_normal_velocity_in_common_flux_mass_row() {
        let mut left = unit_quad_euler(2);
        let ops = left.ops.clone();
        let bottom_slots: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        for &k in &bottom_slots {
            left.u_fpts[k] = euler2d::Primitive::new(1.2, 0.3, -0.2, 0.9).to_conserved(1.4).as_array().to_vec();
        }

        let mut face = BoundaryFace::new(
            FaceSlots { left_fpts: bottom_slots.clone(), right_fpts: vec![] },
            BoundaryKind::SlipWall,
            freestream(),
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, None);
        face.get_left_state(&left);
        face.get_right_state(None);
        face.calc_inviscid_flux(RiemannType::Rusanov);
        face.set_right_state(&mut left, None);

        for &k in &bottom_slots {
            assert!(left.fn_fpts[k][0].abs() < 1e-10, "slip wall should pass zero mass flux through the wall");
        }
    }

    #[test]
    fn supersonic_inflow_ghost_matches_freestream() {
        let mut left = unit_quad_euler(1);
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[3]..ops.face_offsets[4]).collect();
        for &k in &slots {
            left.u_fpts[k] = euler2d::Primitive::new(1.0, 0.0, 0.0, 1.0 / 1.4).to_conserved(1.4).as_array().to_vec();
        }

        let mut face = BoundaryFace::new(
            FaceSlots { left_fpts: slots.clone(), right_fpts: vec![] },
            BoundaryKind::SupersonicInflow,
            freestream(),
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.setup_face(&left, None);
        face.get_left_state(&left);
        face.get_right_state(None);
        face.calc_inviscid_flux(RiemannType::Rusanov);
        face.set_right_state(&mut left, None);

        let expected = euler2d::Primitive::new(1.0, 0.3, 0.0, 1.0 / 1.4).to_conserved(1.4).as_array();
        assert!((face.ur[0][0] - expected[0]).abs() < 1e-12);
        assert!((face.ur[0][1] - expected[1]).abs() < 1e-12);
    }

    #[test]
    fn viscous_param_selector_does_not_panic_for_any_equation() {
        let mut left = unit_quad_euler(1);
        left.equation = Equation::Euler2D { gamma: 1.4, viscous: Some(NsParams { gamma: 1.4, mu: 1e-3, pr: 0.72 }) };
        let ops = left.ops.clone();
        let slots: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        let mut face = BoundaryFace::new(
            FaceSlots { left_fpts: slots, right_fpts: vec![] },
            BoundaryKind::IsothermalNoSlip { t_wall: 1.0 },
            freestream(),
            RiemannType::Rusanov,
            LdgParams { pen_fact: 1.0, tau: 1.0 },
        );
        face.calc_viscous_flux(LdgParams { pen_fact: 1.0, tau: 1.0 });
    }
}
