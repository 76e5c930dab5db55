//! The shared face contract (§4.2, §9 design note): a face never owns
//! element data, it borrows two elements (or one element and a boundary
//! tag) and reads/writes their flux-point traces by index. `Solver` owns
//! both the element and the face collections.

use crate::element::state::Element;
use crate::geometry::Point;
use crate::physics::{advection_diffusion, euler2d, euler3d};

/// `riemannType` (§6): Rusanov is available for every equation, Roe only
/// for Euler/NS. The central/upwind blend is the advection-diffusion
/// equation's own choice and does not participate in this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RiemannType {
    Rusanov,
    Roe,
}

/// The LDG viscous-flux parameters shared by every face kind (§4.2,
/// `LDG_penFact`/`LDG_tau`).
#[derive(Clone, Copy, Debug)]
pub struct LdgParams {
    pub pen_fact: f64,
    pub tau: f64,
}

/// Which element-local flux-point slots a face reads/writes, and which
/// side's slot indices it owns; both `left` and `right` index into the
/// `Element::u_fpts`/`fn_fpts`/etc. arrays of their respective elements.
#[derive(Clone, Debug)]
pub struct FaceSlots {
    pub left_fpts: Vec<usize>,
    pub right_fpts: Vec<usize>,
}

/// The shared step-by-step contract every face kind implements (§4.2).
/// `Interior`/`Boundary` run it synchronously inline in `calc_residual`;
/// `Mpi`/`Overset` instead implement `crate::automaton::Automaton` so the
/// same steps run as non-blocking message exchanges.
pub trait FaceKernel {
    /// Establish left/right flux-point correspondence, accounting for face
    /// rotation/flipping, and size the local traces.
    fn setup_face(&mut self, left: &Element, right_hint: Option<&Element>);

    fn get_left_state(&mut self, left: &Element);

    /// Gather `UR`. Interior and MPI faces pass a real neighboring element;
    /// boundary faces synthesize it from the tag/freestream and ignore the
    /// argument; overset faces synthesize it from the donor interpolation.
    fn get_right_state(&mut self, right: Option<&Element>);

    /// Produce the common normal flux `Fn` from `UL`, `UR`, and the face's
    /// outward normal/area, using the configured Riemann solver.
    fn calc_inviscid_flux(&mut self, riemann: RiemannType);

    /// Viscous-only: form the interface-common `U_c` (LDG) and the common
    /// viscous flux, added onto `Fn`.
    fn calc_viscous_flux(&mut self, ldg: LdgParams);

    /// Scatter the common results back. `right` is `None` for every face
    /// kind that has no local mutable neighbor to write into (boundary,
    /// MPI, overset — those write into a ghost buffer or transport layer
    /// instead).
    fn set_right_state(&mut self, left: &mut Element, right: Option<&mut Element>);

    /// Viscous-only pre-pass (§4.3 step 5), run before `calc_gradients`'s
    /// output is corrected: write this face's LDG common state into both
    /// sides' `Element::u_common_fpts`. A no-op for the face kinds whose
    /// common state is instead resolved through the MPI/overset exchange —
    /// see `face::mpi::resolve_common_state`/`face::overset::resolve_common_state`.
    fn write_common_state(&mut self, left: &mut Element, right: Option<&mut Element>);
}

/// Evaluate the configured inviscid Riemann flux for one equation at one
/// flux point, dispatching on the element's equation kind. Shared by every
/// face variant so the solver choice stays in one place.
pub fn inviscid_flux(
    equation: &crate::element::state::Equation,
    ul: &[f64],
    ur: &[f64],
    normal: Point,
    riemann: RiemannType,
) -> Vec<f64> {
    use crate::element::state::Equation as Eq;

    match equation {
        Eq::Euler2D { gamma, .. } => {
            let pl = euler2d::Conserved::from_slice(ul).to_primitive(*gamma).expect("squeezing guards this");
            let pr = euler2d::Conserved::from_slice(ur).to_primitive(*gamma).expect("squeezing guards this");

            // Rotate into the face-normal frame (n, t = (-ny, nx)), solve a
            // 1-D Riemann problem along the rotated "I" axis, then rotate
            // the momentum components of the resulting flux back.
            let (nx, ny) = (normal.x(), normal.y());
            let (tx, ty) = (-ny, nx);
            let rotate = |p: euler2d::Primitive| {
                let un = p.velocity_1() * nx + p.velocity_2() * ny;
                let ut = p.velocity_1() * tx + p.velocity_2() * ty;
                euler2d::Primitive::new(p.mass_density(), un, ut, p.gas_pressure())
            };

            let f_rot = match riemann {
                RiemannType::Rusanov => euler2d::riemann_rusanov(rotate(pl), rotate(pr), euler2d::Direction::I, *gamma),
                RiemannType::Roe => euler2d::riemann_roe(rotate(pl), rotate(pr), euler2d::Direction::I, *gamma),
            }
            .as_array();

            vec![
                f_rot[0],
                f_rot[1] * nx + f_rot[2] * tx,
                f_rot[1] * ny + f_rot[2] * ty,
                f_rot[3],
            ]
        }
        Eq::Euler3D { gamma, .. } => {
            let pl = euler3d::Conserved::from_slice(ul).to_primitive(*gamma).expect("squeezing guards this");
            let pr = euler3d::Conserved::from_slice(ur).to_primitive(*gamma).expect("squeezing guards this");

            let n = Point::new(normal.x(), normal.y(), normal.z());
            let reference = if n.x().abs() < 0.9 { Point::new(1.0, 0.0, 0.0) } else { Point::new(0.0, 1.0, 0.0) };
            let t1_unnorm = reference - n * reference.dot(&n);
            let t1 = t1_unnorm / t1_unnorm.norm();
            let t2 = n.cross(&t1);

            let rotate = |p: euler3d::Primitive| {
                let v = Point::new(p.velocity_1(), p.velocity_2(), p.velocity_3());
                euler3d::Primitive::new(p.mass_density(), v.dot(&n), v.dot(&t1), v.dot(&t2), p.gas_pressure())
            };

            let f_rot = match riemann {
                RiemannType::Rusanov => euler3d::riemann_rusanov(rotate(pl), rotate(pr), euler3d::Direction::X, *gamma),
                RiemannType::Roe => euler3d::riemann_roe(rotate(pl), rotate(pr), euler3d::Direction::X, *gamma),
            }
            .as_array();

            let momentum = n * f_rot[1] + t1 * f_rot[2] + t2 * f_rot[3];
            vec![f_rot[0], momentum.x(), momentum.y(), momentum.z(), f_rot[4]]
        }
        Eq::AdvectionDiffusion(params) => {
            let f = advection_diffusion::riemann_central_upwind(
                advection_diffusion::Scalar::new(ul[0]),
                advection_diffusion::Scalar::new(ur[0]),
                normal,
                *params,
            );
            vec![f]
        }
    }
}

/// The LDG common interface state (§4.2): a `pen_fact`-weighted blend of
/// `UL`/`UR`, reducing to the plain average at `pen_fact = 0`. Feeds the
/// gradient-correction jump `(U_common - U_fpts)` each element runs through
/// `opp_grad_corr` before transforming its own gradient to physical space.
pub fn ldg_common_state(ul: &[f64], ur: &[f64], ldg: LdgParams) -> Vec<f64> {
    ul.iter().zip(ur.iter()).map(|(&l, &r)| 0.5 * (l + r) + ldg.pen_fact * (l - r)).collect()
}

/// The common viscous flux at one flux point (§4.2 LDG), in the same
/// physical-flux sign convention `Element::calc_transformed_fluxes` uses:
/// callers subtract this from the inviscid common flux, never add it.
/// `gl`/`gr` are `[dim][var]`, the physical-space gradient of the conserved
/// state on each side. The usual LDG stabilization subtracts `tau` times
/// the `UL`/`UR` jump from the plain average of each side's physical
/// viscous flux, the same dissipative-penalty shape Rusanov's wave-speed
/// term has for the inviscid flux.
pub fn common_viscous_flux(
    equation: &crate::element::state::Equation,
    ul: &[f64],
    ur: &[f64],
    gl: &[Vec<f64>],
    gr: &[Vec<f64>],
    normal: Point,
    ldg: LdgParams,
) -> Vec<f64> {
    use crate::element::state::Equation as Eq;

    match equation {
        Eq::Euler2D { gamma, viscous: Some(params) } => {
            let pl = euler2d::Conserved::from_slice(ul).to_primitive(*gamma).expect("squeezing guards this");
            let pr = euler2d::Conserved::from_slice(ur).to_primitive(*gamma).expect("squeezing guards this");
            let gl2 = [[gl[0][0], gl[0][1], gl[0][2], gl[0][3]], [gl[1][0], gl[1][1], gl[1][2], gl[1][3]]];
            let gr2 = [[gr[0][0], gr[0][1], gr[0][2], gr[0][3]], [gr[1][0], gr[1][1], gr[1][2], gr[1][3]]];
            let pgl = euler2d::primitive_gradient(&pl, &gl2, *gamma);
            let pgr = euler2d::primitive_gradient(&pr, &gr2, *gamma);
            let fl = euler2d::viscous_flux_dot_normal(&pl, &pgl, normal, *params);
            let fr = euler2d::viscous_flux_dot_normal(&pr, &pgr, normal, *params);
            let mut out = ((fl + fr) * 0.5).as_array().to_vec();
            for (o, (&l, &r)) in out.iter_mut().zip(ul.iter().zip(ur.iter())) {
                *o -= ldg.tau * (l - r);
            }
            out
        }
        Eq::Euler3D { gamma, viscous: Some(params) } => {
            let pl = euler3d::Conserved::from_slice(ul).to_primitive(*gamma).expect("squeezing guards this");
            let pr = euler3d::Conserved::from_slice(ur).to_primitive(*gamma).expect("squeezing guards this");
            let gl3 = [
                [gl[0][0], gl[0][1], gl[0][2], gl[0][3], gl[0][4]],
                [gl[1][0], gl[1][1], gl[1][2], gl[1][3], gl[1][4]],
                [gl[2][0], gl[2][1], gl[2][2], gl[2][3], gl[2][4]],
            ];
            let gr3 = [
                [gr[0][0], gr[0][1], gr[0][2], gr[0][3], gr[0][4]],
                [gr[1][0], gr[1][1], gr[1][2], gr[1][3], gr[1][4]],
                [gr[2][0], gr[2][1], gr[2][2], gr[2][3], gr[2][4]],
            ];
            let pgl = euler3d::primitive_gradient(&pl, &gl3, *gamma);
            let pgr = euler3d::primitive_gradient(&pr, &gr3, *gamma);
            let fl = euler3d::viscous_flux_dot_normal(&pl, &pgl, normal, *params);
            let fr = euler3d::viscous_flux_dot_normal(&pr, &pgr, normal, *params);
            let mut out = ((fl + fr) * 0.5).as_array().to_vec();
            for (o, (&l, &r)) in out.iter_mut().zip(ul.iter().zip(ur.iter())) {
                *o -= ldg.tau * (l - r);
            }
            out
        }
        Eq::AdvectionDiffusion(params) if params.diff_d != 0.0 => {
            let to_point = |g: &[Vec<f64>]| match g.len() {
                2 => Point::new(g[0][0], g[1][0], 0.0),
                _ => Point::new(g[0][0], g[1][0], g[2][0]),
            };
            let fl = advection_diffusion::viscous_flux(to_point(gl), normal, *params);
            let fr = advection_diffusion::viscous_flux(to_point(gr), normal, *params);
            vec![0.5 * (fl + fr) - ldg.tau * (ul[0] - ur[0])]
        }
        _ => vec![0.0; ul.len()],
    }
}
