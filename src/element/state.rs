//! The per-element FR state and its local kernels (§3, §4.1): solution at
//! solution and flux points, transformed fluxes, gradients, divergences,
//! Jacobians and their cofactor matrices, grid velocity, and the
//! positivity/RK machinery that acts on them.

use std::sync::Arc;

use crate::element::kind::ElementKind;
use crate::element::squeeze::{self, SqueezeStats};
use crate::geometry::{shape, Point};
use crate::linalg::Matrix;
use crate::operators::OperatorSet;
use crate::physics::{advection_diffusion, euler2d, euler3d, NsParams};

/// Which conservation law this element evolves, and the parameters its
/// flux evaluators need. `Euler2D`/`Euler3D` carry an optional viscous
/// closure; `None` means `viscous = 0` in the configuration.
#[derive(Clone, Debug)]
pub enum Equation {
    Euler2D { gamma: f64, viscous: Option<NsParams> },
    Euler3D { gamma: f64, viscous: Option<NsParams> },
    AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams),
}

impl Equation {
    pub fn n_vars(&self) -> usize {
        match self {
            Equation::Euler2D { .. } => 4,
            Equation::Euler3D { .. } => 5,
            Equation::AdvectionDiffusion(_) => 1,
        }
    }

    pub fn is_viscous(&self) -> bool {
        match self {
            Equation::Euler2D { viscous, .. } => viscous.is_some(),
            Equation::Euler3D { viscous, .. } => viscous.is_some(),
            Equation::AdvectionDiffusion(params) => params.diff_d != 0.0,
        }
    }

    fn pressure_of(&self, u: &[f64]) -> f64 {
        match self {
            Equation::Euler2D { gamma, .. } => euler2d::Conserved::from_slice(u)
                .to_primitive(*gamma)
                .map(|p| p.gas_pressure())
                .unwrap_or(0.0),
            Equation::Euler3D { gamma, .. } => euler3d::Conserved::from_slice(u)
                .to_primitive(*gamma)
                .map(|p| p.gas_pressure())
                .unwrap_or(0.0),
            Equation::AdvectionDiffusion(_) => 0.0,
        }
    }

    fn entropy_bound(&self, exps0: f64) -> Option<(f64, f64)> {
        match self {
            Equation::Euler2D { gamma, .. } | Equation::Euler3D { gamma, .. } => Some((*gamma, exps0)),
            Equation::AdvectionDiffusion(_) => None,
        }
    }

    /// `[rho, u, v, w, p]`, always length 5 even in 2-D (§6 restart field
    /// layout), for `Element::primitives_plot`.
    fn primitives_of(&self, u: &[f64]) -> [f64; 5] {
        match self {
            Equation::Euler2D { gamma, .. } => {
                let p = euler2d::Conserved::from_slice(u).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                [p.mass_density(), p.velocity_1(), p.velocity_2(), 0.0, p.gas_pressure()]
            }
            Equation::Euler3D { gamma, .. } => {
                let p = euler3d::Conserved::from_slice(u).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                [p.mass_density(), p.velocity_1(), p.velocity_2(), p.velocity_3(), p.gas_pressure()]
            }
            Equation::AdvectionDiffusion(_) => [u[0], 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Inverse of `primitives_of`, used by the restart reader to turn the
    /// `[rho, u, v, w, p]` rows read back off disk into conserved state.
    pub fn conserved_of(&self, p: [f64; 5]) -> Vec<f64> {
        match self {
            Equation::Euler2D { gamma, .. } => euler2d::Primitive::new(p[0], p[1], p[2], p[4]).to_conserved(*gamma).as_array().to_vec(),
            Equation::Euler3D { gamma, .. } => euler3d::Primitive::new(p[0], p[1], p[2], p[3], p[4]).to_conserved(*gamma).as_array().to_vec(),
            Equation::AdvectionDiffusion(_) => vec![p[0]],
        }
    }
}

/// Geometric data attached to one query point (solution or flux point):
/// the Jacobian's cofactor matrix `JGinv = det(J) J^-1` and its
/// determinant. The outward normal derived from `JGinv` at flux points is
/// stored separately in `Element::normal_fpts`/`da_fpts`.
#[derive(Clone, Debug)]
pub struct GeomPoint {
    pub jginv: Matrix,
    pub det_j: f64,
}

pub struct Element {
    pub kind: ElementKind,
    pub order: usize,
    pub ops: Arc<OperatorSet>,
    pub equation: Equation,
    pub moving: bool,

    /// Physical positions of the shape-function nodes.
    nodes: Vec<Point>,
    /// Grid velocity at the shape-function nodes; all-zero on a static
    /// mesh.
    grid_vel_nodes: Vec<Point>,

    pub u_spts: Vec<Vec<f64>>,
    pub u_fpts: Vec<Vec<f64>>,
    pub u0_spts: Vec<Vec<f64>>,

    pub grad_u_spts: Vec<Vec<Vec<f64>>>,
    /// Physical-space, LDG-corrected gradient of the solution, viscous runs
    /// only: `grad_phys_spts[spt][dim][var]`/`grad_phys_fpts[fpt][dim][var]`.
    /// Left zero-filled (and unused) when `equation.is_viscous()` is false.
    pub grad_phys_spts: Vec<Vec<Vec<f64>>>,
    pub grad_phys_fpts: Vec<Vec<Vec<f64>>>,
    /// The LDG common interface state at each flux point, written by this
    /// face's `FaceKernel::write_common_state` ahead of the gradient
    /// correction pass (§4.2). Left zero-filled on a non-viscous run.
    pub u_common_fpts: Vec<Vec<f64>>,
    /// Reference-space transformed flux, one vector per reference
    /// dimension, at every solution point: `f_ref_spts[spt][dim][var]`.
    pub f_ref_spts: Vec<Vec<Vec<f64>>>,
    pub fn_fpts: Vec<Vec<f64>>,
    pub disc_fn_fpts: Vec<Vec<f64>>,

    pub div_f_spts: Vec<Vec<Vec<f64>>>,

    geom_spts: Vec<GeomPoint>,
    geom_fpts: Vec<GeomPoint>,
    pub normal_fpts: Vec<Point>,
    pub da_fpts: Vec<f64>,

    pub squeeze_counter: u64,
}

impl Element {
    /// Build an element from its mesh-node coordinates, wiring it to a
    /// shared operator bundle already built for `(kind, order)`.
    pub fn setup(
        kind: ElementKind,
        order: usize,
        ops: Arc<OperatorSet>,
        nodes: Vec<Point>,
        grid_vel_nodes: Vec<Point>,
        equation: Equation,
        moving: bool,
    ) -> Self {
        assert!(kind.is_supported(), "Element::setup: unsupported element kind");
        assert_eq!(nodes.len(), shape::node_count(kind));

        let n_vars = equation.n_vars();
        let n_spts = ops.n_spts;
        let n_fpts = ops.n_fpts;

        let mut el = Self {
            kind,
            order,
            ops,
            equation,
            moving,
            nodes,
            grid_vel_nodes,
            u_spts: vec![vec![0.0; n_vars]; n_spts],
            u_fpts: vec![vec![0.0; n_vars]; n_fpts],
            u0_spts: vec![vec![0.0; n_vars]; n_spts],
            grad_u_spts: vec![vec![vec![0.0; n_vars]; kind.dims()]; n_spts],
            grad_phys_spts: vec![vec![vec![0.0; n_vars]; kind.dims()]; n_spts],
            grad_phys_fpts: vec![vec![vec![0.0; n_vars]; kind.dims()]; n_fpts],
            u_common_fpts: vec![vec![0.0; n_vars]; n_fpts],
            f_ref_spts: vec![vec![vec![0.0; n_vars]; kind.dims()]; n_spts],
            fn_fpts: vec![vec![0.0; n_vars]; n_fpts],
            disc_fn_fpts: vec![vec![0.0; n_vars]; n_fpts],
            div_f_spts: Vec::new(),
            geom_spts: Vec::new(),
            geom_fpts: Vec::new(),
            normal_fpts: vec![Point::zero(); n_fpts],
            da_fpts: vec![0.0; n_fpts],
            squeeze_counter: 0,
        };
        el.setup_all_geometry();
        el
    }

    fn shape_image_and_jacobian(&self, r: &Point) -> (Point, Matrix) {
        let dims = self.kind.dims();
        let coords: Vec<f64> = match dims {
            2 => vec![r.x(), r.y()],
            _ => vec![r.x(), r.y(), r.z()],
        };
        let s = shape::eval(self.kind, &coords);

        let mut x = Point::zero();
        for (n_i, node) in s.n.iter().zip(self.nodes.iter()) {
            x = x + *node * *n_i;
        }

        let j = Matrix::from_fn(dims, dims, |e, d| {
            s.dn.iter().zip(self.nodes.iter()).map(|(dn_i, node)| dn_i[d] * node_component(node, e)).sum()
        });

        (x, j)
    }

    fn grid_velocity_at(&self, r: &Point) -> Point {
        let dims = self.kind.dims();
        let coords: Vec<f64> = match dims {
            2 => vec![r.x(), r.y()],
            _ => vec![r.x(), r.y(), r.z()],
        };
        let s = shape::eval(self.kind, &coords);
        s.n.iter()
            .zip(self.grid_vel_nodes.iter())
            .fold(Point::zero(), |acc, (n_i, v)| acc + *v * *n_i)
    }

    /// Compute `JGinv` and `detJ` at every solution and flux point, and the
    /// outward normal/area element at every flux point. Fatal (§7) if any
    /// `detJ` is non-positive.
    pub fn setup_all_geometry(&mut self) {
        let ops = self.ops.clone();

        self.geom_spts = ops
            .spts_ref
            .iter()
            .map(|r| {
                let (_, j) = self.shape_image_and_jacobian(r);
                let det_j = j.determinant();
                assert!(det_j > 0.0, "non-positive Jacobian at a solution point");
                GeomPoint { jginv: j.adjoint(), det_j }
            })
            .collect();

        self.geom_fpts = ops
            .fpts_ref
            .iter()
            .map(|r| {
                let (_, j) = self.shape_image_and_jacobian(r);
                let det_j = j.determinant();
                assert!(det_j > 0.0, "non-positive Jacobian at a flux point");
                GeomPoint { jginv: j.adjoint(), det_j }
            })
            .collect();

        for (k, r) in ops.fpts_ref.iter().enumerate() {
            let face = ops.face_of(k);
            let n_ref = crate::geometry::normals::reference_face_normal(self.kind, face);
            let jginv = &self.geom_fpts[k].jginv;
            let dims = self.kind.dims();

            let n_phys: Vec<f64> = (0..dims)
                .map(|e| (0..dims).map(|d| jginv[(d, e)] * node_component(&n_ref, d)).sum())
                .collect();
            let da = match dims {
                2 => (n_phys[0] * n_phys[0] + n_phys[1] * n_phys[1]).sqrt(),
                _ => (n_phys[0] * n_phys[0] + n_phys[1] * n_phys[1] + n_phys[2] * n_phys[2]).sqrt(),
            };

            self.da_fpts[k] = da;
            self.normal_fpts[k] = if da > 1e-300 {
                match dims {
                    2 => Point::new(n_phys[0] / da, n_phys[1] / da, 0.0),
                    _ => Point::new(n_phys[0] / da, n_phys[1] / da, n_phys[2] / da),
                }
            } else {
                Point::zero()
            };
            let _ = r;
        }
    }

    /// Extrapolate `U_spts` to `U_fpts` via the operator-cache extrapolation
    /// matrix (§4.3 step 3).
    pub fn extrapolate_to_fpts(&mut self) {
        let n_vars = self.equation.n_vars();
        let n_fpts = self.u_fpts.len();
        for var in 0..n_vars {
            let field: Vec<f64> = self.u_spts.iter().map(|u| u[var]).collect();
            let fpts_field = self.ops.opp_spts_to_fpts.matvec(&field);
            for k in 0..n_fpts {
                self.u_fpts[k][var] = fpts_field[k];
            }
        }
    }

    /// The element-average state, `Uavg = sum_i w_i U_i / sum_i w_i` with
    /// unit quadrature weights (§4.1, used by `checkEntropy`/squeezing).
    pub fn average_state(&self) -> Vec<f64> {
        let n_vars = self.equation.n_vars();
        let n_spts = self.u_spts.len() as f64;
        let mut avg = vec![0.0; n_vars];
        for u in &self.u_spts {
            for (a, v) in avg.iter_mut().zip(u.iter()) {
                *a += v / n_spts;
            }
        }
        avg
    }

    /// `getPrimitivesPlot` (§6): `U_spts` extrapolated to plot points and
    /// converted to primitives, one `[rho, u, v, w, p]` row per plot point.
    pub fn primitives_plot(&self) -> Vec<[f64; 5]> {
        let n_vars = self.equation.n_vars();
        let n_mpts = self.ops.mpts_ref.len();
        let mut u_mpts = vec![vec![0.0; n_vars]; n_mpts];
        for var in 0..n_vars {
            let field: Vec<f64> = self.u_spts.iter().map(|u| u[var]).collect();
            let mpts_field = self.ops.opp_spts_to_mpts.matvec(&field);
            for k in 0..n_mpts {
                u_mpts[k][var] = mpts_field[k];
            }
        }
        u_mpts.iter().map(|u| self.equation.primitives_of(u)).collect()
    }

    /// `getGridVelPlot` (§6): the mesh velocity at every plot point,
    /// zero everywhere unless `motion != 0`.
    pub fn grid_vel_plot(&self) -> Vec<Point> {
        self.ops.mpts_ref.iter().map(|r| self.grid_velocity_at(r)).collect()
    }

    /// `getEntropyErrPlot` (§6): the pointwise deviation of the physical
    /// entropy `p / rho^gamma` from the element-average entropy, one value
    /// per plot point; zero for the advection-diffusion equation, which has
    /// no entropy notion.
    pub fn entropy_err_plot(&self) -> Vec<f64> {
        let gamma = match &self.equation {
            Equation::Euler2D { gamma, .. } | Equation::Euler3D { gamma, .. } => *gamma,
            Equation::AdvectionDiffusion(_) => return vec![0.0; self.ops.mpts_ref.len()],
        };
        let avg = self.average_state();
        let avg_prim = self.equation.primitives_of(&avg);
        let s_avg = avg_prim[4] / avg_prim[0].powf(gamma);

        self.primitives_plot()
            .iter()
            .map(|p| {
                let s = p[4] / p[0].powf(gamma);
                s - s_avg
            })
            .collect()
    }

    fn flux_and_primitive(&self, u: &[f64], dim: usize) -> (Vec<f64>, f64) {
        match &self.equation {
            Equation::Euler2D { gamma, .. } => {
                let prim = euler2d::Conserved::from_slice(u).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                let dir = match dim {
                    0 => euler2d::Direction::I,
                    _ => euler2d::Direction::J,
                };
                (prim.flux_vector(dir, *gamma).as_array().to_vec(), prim.gas_pressure())
            }
            Equation::Euler3D { gamma, .. } => {
                let prim = euler3d::Conserved::from_slice(u).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                let dir = match dim {
                    0 => euler3d::Direction::X,
                    1 => euler3d::Direction::Y,
                    _ => euler3d::Direction::Z,
                };
                (prim.flux_vector(dir, *gamma).as_array().to_vec(), prim.gas_pressure())
            }
            Equation::AdvectionDiffusion(params) => {
                let direction = ref_unit_vector(dim);
                let f = advection_diffusion::flux_vector(advection_diffusion::Scalar::new(u[0]), direction, *params);
                (vec![f], 0.0)
            }
        }
    }

    /// Transform the physical flux at every solution point into reference
    /// space: `F_ref_d = JGinv[:, d] . F_phys` (§4.1).
    pub fn calc_transformed_fluxes(&mut self) {
        let dims = self.kind.dims();
        for i in 0..self.u_spts.len() {
            let n_vars = self.u_spts[i].len();
            let geom = &self.geom_spts[i];

            let mut f_phys = vec![vec![0.0; n_vars]; dims];
            for (e, row) in f_phys.iter_mut().enumerate() {
                *row = self.flux_and_primitive(&self.u_spts[i], e).0;
            }
            if let Some(visc) = self.viscous_flux_phys(i) {
                for (row, v) in f_phys.iter_mut().zip(visc.iter()) {
                    for (f, g) in row.iter_mut().zip(v.iter()) {
                        *f -= g;
                    }
                }
            }

            for d in 0..dims {
                let mut f_ref_d = vec![0.0; n_vars];
                for (e, row) in f_phys.iter().enumerate() {
                    let w = geom.jginv[(e, d)];
                    for k in 0..n_vars {
                        f_ref_d[k] += w * row[k];
                    }
                }
                if self.moving {
                    let r = self.ops.spts_ref[i];
                    let vg = self.grid_velocity_at(&r);
                    let vg_d = node_component(&vg, d);
                    for k in 0..n_vars {
                        f_ref_d[k] -= vg_d * self.u_spts[i][k];
                    }
                }
                self.f_ref_spts[i][d] = f_ref_d;
            }
        }
    }

    /// Reference-space gradient of the solution at every solution point,
    /// `grad_u_spts[spt][dim][var] = sum_j opp_grad_spts[dim][spt][j] U_j[var]`.
    pub fn calc_gradients(&mut self) {
        let dims = self.kind.dims();
        let n_vars = self.equation.n_vars();
        let n_spts = self.u_spts.len();

        for d in 0..dims {
            for var in 0..n_vars {
                let field: Vec<f64> = self.u_spts.iter().map(|u| u[var]).collect();
                let dfield = self.ops.opp_grad_spts[d].matvec(&field);
                for i in 0..n_spts {
                    self.grad_u_spts[i][d][var] = dfield[i];
                }
            }
        }
    }

    /// LDG-corrected physical gradient (§4.2, viscous runs only): the raw
    /// reference gradient from `calc_gradients`, corrected by the common
    /// interface state's jump over the flux points (`opp_grad_corr`), then
    /// transformed to physical space through `JGinv / detJ` the same way
    /// `setup_all_geometry` transforms the reference normal. Requires
    /// `write_common_state` to have already filled `u_common_fpts` on every
    /// face of this element.
    pub fn calc_corrected_gradients(&mut self) {
        let dims = self.kind.dims();
        let n_vars = self.equation.n_vars();
        let n_spts = self.u_spts.len();
        let n_fpts = self.u_fpts.len();

        let mut grad_ref = self.grad_u_spts.clone();
        for d in 0..dims {
            for var in 0..n_vars {
                let jump: Vec<f64> = (0..n_fpts).map(|k| self.u_common_fpts[k][var] - self.u_fpts[k][var]).collect();
                let corr = self.ops.opp_grad_corr[d].matvec(&jump);
                for i in 0..n_spts {
                    grad_ref[i][d][var] += corr[i];
                }
            }
        }

        for i in 0..n_spts {
            let jginv = &self.geom_spts[i].jginv;
            let det_j = self.geom_spts[i].det_j;
            for e in 0..dims {
                for var in 0..n_vars {
                    let g: f64 = (0..dims).map(|d| jginv[(d, e)] * grad_ref[i][d][var]).sum();
                    self.grad_phys_spts[i][e][var] = g / det_j;
                }
            }
        }

        for e in 0..dims {
            for var in 0..n_vars {
                let field: Vec<f64> = self.grad_phys_spts.iter().map(|g| g[e][var]).collect();
                let out = self.ops.opp_spts_to_fpts.matvec(&field);
                for k in 0..n_fpts {
                    self.grad_phys_fpts[k][e][var] = out[k];
                }
            }
        }
    }

    /// Per-dimension physical viscous flux at solution point `i`, `None` on
    /// a non-viscous run. Consumed by `calc_transformed_fluxes`, which
    /// subtracts it from the inviscid flux before the reference transform —
    /// the same sign convention `physics::euler2d::viscous_flux` documents.
    fn viscous_flux_phys(&self, i: usize) -> Option<Vec<Vec<f64>>> {
        match &self.equation {
            Equation::Euler2D { gamma, viscous: Some(params) } => {
                let prim = euler2d::Conserved::from_slice(&self.u_spts[i]).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                let g = &self.grad_phys_spts[i];
                let grad_cons = [[g[0][0], g[0][1], g[0][2], g[0][3]], [g[1][0], g[1][1], g[1][2], g[1][3]]];
                let grad = euler2d::primitive_gradient(&prim, &grad_cons, *gamma);
                Some(vec![
                    euler2d::viscous_flux(&prim, &grad, euler2d::Direction::I, *params).as_array().to_vec(),
                    euler2d::viscous_flux(&prim, &grad, euler2d::Direction::J, *params).as_array().to_vec(),
                ])
            }
            Equation::Euler3D { gamma, viscous: Some(params) } => {
                let prim = euler3d::Conserved::from_slice(&self.u_spts[i]).to_primitive(*gamma).expect("squeezing keeps pressure/density positive");
                let g = &self.grad_phys_spts[i];
                let grad_cons = [
                    [g[0][0], g[0][1], g[0][2], g[0][3], g[0][4]],
                    [g[1][0], g[1][1], g[1][2], g[1][3], g[1][4]],
                    [g[2][0], g[2][1], g[2][2], g[2][3], g[2][4]],
                ];
                let grad = euler3d::primitive_gradient(&prim, &grad_cons, *gamma);
                Some(vec![
                    euler3d::viscous_flux(&prim, &grad, euler3d::Direction::X, *params).as_array().to_vec(),
                    euler3d::viscous_flux(&prim, &grad, euler3d::Direction::Y, *params).as_array().to_vec(),
                    euler3d::viscous_flux(&prim, &grad, euler3d::Direction::Z, *params).as_array().to_vec(),
                ])
            }
            Equation::AdvectionDiffusion(params) if params.diff_d != 0.0 => {
                let dims = self.kind.dims();
                let g = &self.grad_phys_spts[i];
                let grad_u = match dims {
                    2 => Point::new(g[0][0], g[1][0], 0.0),
                    _ => Point::new(g[0][0], g[1][0], g[2][0]),
                };
                Some((0..dims).map(|d| vec![advection_diffusion::viscous_flux(grad_u, ref_unit_vector(d), *params)]).collect())
            }
            _ => None,
        }
    }

    /// Standard conservative divergence: `divF_spts = sum_d dF_ref_d/dxi_d`.
    fn divergence_standard(&self) -> Vec<Vec<f64>> {
        let dims = self.kind.dims();
        let n_vars = self.equation.n_vars();
        let n_spts = self.u_spts.len();
        let mut div = vec![vec![0.0; n_vars]; n_spts];

        for d in 0..dims {
            for var in 0..n_vars {
                let field: Vec<f64> = self.f_ref_spts.iter().map(|f| f[d][var]).collect();
                let dfield = self.ops.opp_grad_spts[d].matvec(&field);
                for i in 0..n_spts {
                    div[i][var] += dfield[i];
                }
            }
        }
        div
    }

    /// Non-conservation chain-rule divergence (Liang-Miyaji-Zhang) for
    /// moving meshes: the standard divergence of `F_ref` plus a
    /// grid-velocity-weighted gradient-of-`U` correction that vanishes
    /// identically when the mesh is static, matching invariant 5 (§8).
    fn divergence_chain_rule(&self) -> Vec<Vec<f64>> {
        let mut div = self.divergence_standard();
        if !self.moving {
            return div;
        }

        let dims = self.kind.dims();
        let n_vars = self.equation.n_vars();
        for (i, r) in self.ops.spts_ref.clone().iter().enumerate() {
            let vg = self.grid_velocity_at(r);
            for d in 0..dims {
                let vg_d = node_component(&vg, d);
                for var in 0..n_vars {
                    div[i][var] -= vg_d * self.grad_u_spts[i][d][var];
                }
            }
        }
        div
    }

    pub fn calc_divergence(&mut self, stage: usize) {
        let div = if self.moving { self.divergence_chain_rule() } else { self.divergence_standard() };
        if self.div_f_spts.len() <= stage {
            self.div_f_spts.resize(stage + 1, Vec::new());
        }
        self.div_f_spts[stage] = div;
    }

    /// `opp_extrap_normal_flux` (§4.4): extrapolate each reference-flux
    /// component `F_ref_d` to the flux points separately, then at each flux
    /// point dot the extrapolated vector against that point's own constant
    /// reference-space outward normal (`geometry::normals::reference_face_normal`,
    /// a one-hot ±1 vector). Extrapolating the sum of components first (as
    /// opposed to extrapolating, then selecting) would add every
    /// transverse-direction flux into `disFn_fpts` instead of just the
    /// matching normal component.
    pub fn calc_disc_normal_flux(&mut self) {
        let dims = self.kind.dims();
        let n_vars = self.equation.n_vars();
        let n_fpts = self.u_fpts.len();

        let mut fpts_field = vec![vec![vec![0.0; n_vars]; n_fpts]; dims];
        for d in 0..dims {
            for var in 0..n_vars {
                let field: Vec<f64> = self.f_ref_spts.iter().map(|f| f[d][var]).collect();
                let out = self.ops.opp_spts_to_fpts.matvec(&field);
                for k in 0..n_fpts {
                    fpts_field[d][k][var] = out[k];
                }
            }
        }

        for k in 0..n_fpts {
            let face = self.ops.face_of(k);
            let n_ref = crate::geometry::normals::reference_face_normal(self.kind, face);
            for var in 0..n_vars {
                self.disc_fn_fpts[k][var] = (0..dims).map(|d| node_component(&n_ref, d) * fpts_field[d][k][var]).sum();
            }
        }
    }

    /// Apply the boundary correction: `dFn = Fn - disFn` at every flux
    /// point, then `divF_spts += opp_div_fpts_to_spts * dFn` (§4.3 step 12).
    pub fn apply_correction(&mut self, stage: usize) {
        let n_vars = self.equation.n_vars();
        let n_fpts = self.fn_fpts.len();
        let n_spts = self.u_spts.len();

        let mut d_fn = vec![vec![0.0; n_vars]; n_fpts];
        for k in 0..n_fpts {
            for var in 0..n_vars {
                d_fn[k][var] = self.fn_fpts[k][var] - self.disc_fn_fpts[k][var];
            }
        }

        for var in 0..n_vars {
            let field: Vec<f64> = d_fn.iter().map(|r| r[var]).collect();
            let corr = self.ops.opp_div_fpts_to_spts.matvec(&field);
            for i in 0..n_spts {
                self.div_f_spts[stage][i][var] += corr[i];
            }
        }
    }

    pub fn snapshot(&mut self) {
        self.u0_spts = self.u_spts.clone();
    }

    /// `U <- U0 - a dt divF[stage] / detJ`, stages 0..S-2.
    pub fn time_step_a(&mut self, stage: usize, a: f64, dt: f64) {
        self.time_step_a_src(stage, a, dt, None);
    }

    pub fn time_step_a_src(&mut self, stage: usize, a: f64, dt: f64, src_spts: Option<&[Vec<f64>]>) {
        let n_vars = self.equation.n_vars();
        for i in 0..self.u_spts.len() {
            let det_j = self.geom_spts[i].det_j;
            for var in 0..n_vars {
                let mut rhs = self.div_f_spts[stage][i][var];
                if let Some(src) = src_spts {
                    rhs -= src[i][var];
                }
                self.u_spts[i][var] = self.u0_spts[i][var] - a * dt * rhs / det_j;
            }
        }
    }

    /// `U <- U - b dt divF[stage] / detJ`, accumulated over all stages
    /// after restoring `U <- U0` (handled by the caller, `Solver::update`).
    pub fn time_step_b(&mut self, stage: usize, b: f64, dt: f64) {
        self.time_step_b_src(stage, b, dt, None);
    }

    pub fn time_step_b_src(&mut self, stage: usize, b: f64, dt: f64, src_spts: Option<&[Vec<f64>]>) {
        let n_vars = self.equation.n_vars();
        for i in 0..self.u_spts.len() {
            let det_j = self.geom_spts[i].det_j;
            for var in 0..n_vars {
                let mut rhs = self.div_f_spts[stage][i][var];
                if let Some(src) = src_spts {
                    rhs -= src[i][var];
                }
                self.u_spts[i][var] -= b * dt * rhs / det_j;
            }
        }
    }

    pub fn restore_u0(&mut self) {
        self.u_spts = self.u0_spts.clone();
    }

    /// Positivity-preserving squeeze (§4.1), skipped entirely for the
    /// scalar advection-diffusion equation.
    pub fn squeeze(&mut self, tol: f64, exps0: f64) -> SqueezeStats {
        let weights = vec![1.0; self.u_spts.len()];
        let entropy_bound = self.equation.entropy_bound(exps0);
        let equation = self.equation.clone();

        let stats = squeeze::squeeze(
            &mut self.u_spts,
            &mut self.u_fpts,
            None,
            &weights,
            tol,
            entropy_bound,
            |u| equation.pressure_of(u),
        );
        if stats.density_triggered || stats.entropy_triggered {
            self.squeeze_counter += 1;
        }
        stats
    }

    /// Normal convective speed (minus grid velocity) plus the acoustic
    /// speed, divided by the area element, at every flux point (§4.1).
    pub fn max_wave_speed(&self) -> f64 {
        let mut max_speed: f64 = 0.0;
        for k in 0..self.u_fpts.len() {
            if self.da_fpts[k] < 1e-300 {
                continue;
            }
            let speed = match &self.equation {
                Equation::Euler2D { gamma, .. } => {
                    let prim = euler2d::Conserved::from_slice(&self.u_fpts[k]).to_primitive(*gamma).unwrap_or(euler2d::Primitive::new(1.0, 0.0, 0.0, 1.0));
                    prim.max_signal_speed(self.normal_fpts[k], Point::zero(), *gamma)
                }
                Equation::Euler3D { gamma, .. } => {
                    let prim = euler3d::Conserved::from_slice(&self.u_fpts[k]).to_primitive(*gamma).unwrap_or(euler3d::Primitive::new(1.0, 0.0, 0.0, 0.0, 1.0));
                    prim.max_signal_speed(*gamma)
                }
                Equation::AdvectionDiffusion(params) => advection_diffusion::max_signal_speed(self.normal_fpts[k], *params),
            };
            max_speed = max_speed.max(speed / self.da_fpts[k]);
        }
        max_speed
    }

    /// `dt = CFL * cfl_limit(p) * 2 / (max wave speed + 1e-10)`.
    pub fn local_dt(&self, cfl: f64) -> f64 {
        let cfl_limit = 1.0 / (2.0 * self.order as f64 + 1.0);
        cfl * cfl_limit * 2.0 / (self.max_wave_speed() + 1e-10)
    }

    pub fn n_vars(&self) -> usize {
        self.equation.n_vars()
    }
}

fn node_component(p: &Point, index: usize) -> f64 {
    match index {
        0 => p.x(),
        1 => p.y(),
        _ => p.z(),
    }
}

fn ref_unit_vector(dim: usize) -> Point {
    match dim {
        0 => Point::new(1.0, 0.0, 0.0),
        1 => Point::new(0.0, 1.0, 0.0),
        _ => Point::new(0.0, 0.0, 1.0),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::basis::PointSet;
    use crate::operators::build::build_operators;

    fn unit_quad_ops(order: usize) -> Arc<OperatorSet> {
        Arc::new(build_operators(ElementKind::Quad, order, PointSet::GaussLegendre))
    }

    fn unit_quad_nodes() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn unit_quad_has_constant_positive_jacobian() {
        let ops = unit_quad_ops(2);
        let el = Element::setup(
            ElementKind::Quad,
            2,
            ops,
            unit_quad_nodes(),
            vec![Point::zero(); 4],
            Equation::AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams {
                velocity: Point::new(1.0, 0.0, 0.0),
                diff_d: 0.0,
                lambda: 1.0,
            }),
            false,
        );
        for g in &el.geom_spts {
            assert!((g.det_j - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn standard_and_chain_rule_divergence_agree_on_static_mesh() {
        let ops = unit_quad_ops(2);
        let mut el = Element::setup(
            ElementKind::Quad,
            2,
            ops,
            unit_quad_nodes(),
            vec![Point::zero(); 4],
            Equation::AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams {
                velocity: Point::new(1.0, 0.3, 0.0),
                diff_d: 0.0,
                lambda: 1.0,
            }),
            false,
        );
        for (i, u) in el.u_spts.iter_mut().enumerate() {
            u[0] = i as f64 * 0.1;
        }
        el.calc_transformed_fluxes();
        el.calc_gradients();
        let standard = el.divergence_standard();
        let chain = el.divergence_chain_rule();
        for (a, b) in standard.iter().zip(chain.iter()) {
            assert!((a[0] - b[0]).abs() < 1e-12);
        }
    }
}
