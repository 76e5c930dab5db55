//! The configuration object (§6): a flat key→effect table, parsed once at
//! startup from the command line (or a serialized config file) and treated
//! as read-only for the remainder of the run (§5 "Shared resources").
//!
//! Fields mirror §6 directly rather than being pre-sorted into the solver's
//! internal types; `Config::validate` and the `to_*` conversion methods are
//! where raw integers like `equation`/`dtType`/`motion` turn into the
//! `Equation`/`DtPolicy`/motion enums the rest of the crate actually uses.

use clap::Parser;

use crate::element::state::Equation;
use crate::face::boundary::Freestream;
use crate::face::common::RiemannType;
use crate::physics::{advection_diffusion::AdvectionDiffusionParams, NsParams};
use crate::solver::rk::TimeScheme;
use crate::solver::{DtPolicy, SqueezeConfig};

/// `motion` (§6): the grid-motion kind, `0` meaning a fixed mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Motion {
    Static,
    KuiPerturbation,
    LiangDeform,
    RigidRotation,
    RigidTranslation,
}

impl Motion {
    fn from_code(code: u8) -> Result<Self, crate::error::FlurryError> {
        match code {
            0 => Ok(Motion::Static),
            1 => Ok(Motion::KuiPerturbation),
            2 => Ok(Motion::LiangDeform),
            3 => Ok(Motion::RigidRotation),
            4 => Ok(Motion::RigidTranslation),
            other => Err(crate::error::FlurryError::InvalidConfig(format!("motion {} out of range 0..=4", other))),
        }
    }

    pub fn is_moving(&self) -> bool {
        !matches!(self, Motion::Static)
    }
}

/// `meshType` (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MeshSource {
    Read,
    Create,
    Overset,
}

/// The full flat configuration table, one field per §6 key. Grouped loosely
/// by the subsystem each feeds, in the order §6 lists them.
#[derive(Clone, Debug, Parser, serde::Serialize, serde::Deserialize)]
#[clap(name = "flurry", about = "Unstructured high-order flux reconstruction solver")]
pub struct Config {
    /// 0 = advection-diffusion, 1 = Euler/Navier-Stokes.
    #[clap(long, default_value = "1")]
    pub equation: u8,
    #[clap(long, default_value = "3")]
    pub order: usize,
    #[clap(long, default_value = "2")]
    pub n_dims: u8,

    /// 0 = forward Euler, 4 = classical RK44.
    #[clap(long, default_value = "4")]
    pub time_type: u8,
    /// 0 = fixed dt, 1 = global CFL, 2 = local (per-element) CFL.
    #[clap(long, default_value = "1")]
    pub dt_type: u8,
    #[clap(long, default_value = "1e-4")]
    pub dt: f64,
    #[clap(long, default_value = "0.5")]
    pub cfl: f64,

    #[clap(long)]
    pub viscous: bool,
    /// 0..=4, see `Motion`.
    #[clap(long, default_value = "0")]
    pub motion: u8,
    /// 0 = Rusanov, 1 = Roe (Euler/NS only).
    #[clap(long, default_value = "0")]
    pub riemann_type: u8,

    #[clap(long, default_value = "1.0")]
    pub advect_vx: f64,
    #[clap(long, default_value = "0.0")]
    pub advect_vy: f64,
    #[clap(long, default_value = "0.0")]
    pub advect_vz: f64,
    #[clap(long, default_value = "1.0")]
    pub lambda: f64,
    #[clap(long, default_value = "0.0")]
    pub diff_d: f64,

    /// 0, 1, or 2, meaning set per equation (isentropic vortex / Gaussian /
    /// restart-supplied for Euler, 0/1/2 for advection-diffusion).
    #[clap(long, default_value = "0")]
    pub ic_type: u8,
    #[clap(long, default_value = "0")]
    pub test_case: u8,
    #[clap(long, default_value = "1000")]
    pub iter_max: usize,

    #[clap(long, default_value = "0")]
    pub plot_freq: usize,
    #[clap(long, default_value = "100")]
    pub monitor_res_freq: usize,
    /// 1 = L1, 2 = L2, 3 = Linf.
    #[clap(long, default_value = "2")]
    pub res_type: u8,
    #[clap(long, default_value = "out")]
    pub data_file_name: String,
    #[clap(long)]
    pub entropy_sensor: bool,
    #[clap(long)]
    pub write_iblank: bool,

    /// 0 = read from file, 1 = create a Cartesian box, 2 = overset.
    #[clap(long, default_value = "0")]
    pub mesh_type: u8,
    #[clap(long, default_value = "mesh.vtu")]
    pub mesh_file: String,
    #[clap(long, default_value = "1")]
    pub nx: usize,
    #[clap(long, default_value = "1")]
    pub ny: usize,
    #[clap(long, default_value = "1")]
    pub nz: usize,
    #[clap(long, default_value = "0.0")]
    pub xmin: f64,
    #[clap(long, default_value = "1.0")]
    pub xmax: f64,
    #[clap(long, default_value = "0.0")]
    pub ymin: f64,
    #[clap(long, default_value = "1.0")]
    pub ymax: f64,
    #[clap(long, default_value = "0.0")]
    pub zmin: f64,
    #[clap(long, default_value = "1.0")]
    pub zmax: f64,

    #[clap(long, default_value = "1.0")]
    pub rho_bound: f64,
    #[clap(long, default_value = "1.0")]
    pub u_bound: f64,
    #[clap(long, default_value = "0.0")]
    pub v_bound: f64,
    #[clap(long, default_value = "0.0")]
    pub w_bound: f64,
    #[clap(long, default_value = "1.0")]
    pub p_bound: f64,
    #[clap(long, default_value = "0.2")]
    pub mach_bound: f64,
    #[clap(long, default_value = "100.0")]
    pub re: f64,
    #[clap(long, default_value = "1.0")]
    pub l_ref: f64,
    #[clap(long, default_value = "300.0")]
    pub t_bound: f64,
    #[clap(long, default_value = "1.4")]
    pub gamma: f64,
    #[clap(long, default_value = "0.72")]
    pub pr: f64,
    #[clap(long, default_value = "1.0")]
    pub nx_bound: f64,
    #[clap(long, default_value = "0.0")]
    pub ny_bound: f64,
    #[clap(long, default_value = "0.0")]
    pub nz_bound: f64,

    #[clap(long, default_value = "0.5")]
    pub ldg_pen_fact: f64,
    #[clap(long, default_value = "1.0")]
    pub ldg_tau: f64,

    /// 0 = Gauss-Legendre, 1 = Gauss-Lobatto.
    #[clap(long, default_value = "0")]
    pub spts_type_quad: u8,

    #[clap(long)]
    pub shock_capture: bool,
    #[clap(long, default_value = "1e-3")]
    pub threshold: f64,
    #[clap(long)]
    pub squeeze: bool,
    /// §7 "silent" squeeze tolerance: keeps density/pressure above `tol *
    /// Uavg` rather than strictly positive.
    #[clap(long, default_value = "1e-10")]
    pub squeeze_tol: f64,
    #[clap(long, default_value = "1.0")]
    pub entropy_s0: f64,

    #[clap(long)]
    pub pmg: bool,

    #[clap(long)]
    pub restart_file: Option<String>,
}

impl Config {
    /// Checks the cross-field constraints §6/§7 imply but a flat CLI can't
    /// express structurally: equation/dims compatibility, a Riemann choice
    /// valid for the chosen equation, and range checks on the coded enums.
    pub fn validate(&self) -> Result<(), crate::error::FlurryError> {
        if self.n_dims != 2 && self.n_dims != 3 {
            return Err(crate::error::FlurryError::InvalidConfig(format!("n_dims must be 2 or 3, got {}", self.n_dims)));
        }
        if self.order == 0 {
            return Err(crate::error::FlurryError::InvalidConfig("order must be >= 1".into()));
        }
        if self.equation == 0 && self.riemann_type == 1 {
            return Err(crate::error::FlurryError::InvalidConfig("Roe flux requires equation = 1 (Euler/NS)".into()));
        }
        if self.equation > 1 {
            return Err(crate::error::FlurryError::InvalidConfig(format!("equation must be 0 or 1, got {}", self.equation)));
        }
        if self.res_type < 1 || self.res_type > 3 {
            return Err(crate::error::FlurryError::InvalidConfig(format!("res_type must be in 1..=3, got {}", self.res_type)));
        }
        Motion::from_code(self.motion)?;
        Ok(())
    }

    pub fn motion(&self) -> Result<Motion, crate::error::FlurryError> {
        Motion::from_code(self.motion)
    }

    pub fn mesh_source(&self) -> Result<MeshSource, crate::error::FlurryError> {
        match self.mesh_type {
            0 => Ok(MeshSource::Read),
            1 => Ok(MeshSource::Create),
            2 => Ok(MeshSource::Overset),
            other => Err(crate::error::FlurryError::InvalidConfig(format!("mesh_type {} out of range 0..=2", other))),
        }
    }

    pub fn time_scheme(&self) -> TimeScheme {
        match self.time_type {
            4 => TimeScheme::Rk44,
            _ => TimeScheme::ForwardEuler,
        }
    }

    pub fn dt_policy(&self) -> DtPolicy {
        match self.dt_type {
            1 => DtPolicy::GlobalCfl(self.cfl),
            2 => DtPolicy::LocalCfl(self.cfl),
            _ => DtPolicy::Fixed(self.dt),
        }
    }

    pub fn riemann_type(&self) -> RiemannType {
        match self.riemann_type {
            1 => RiemannType::Roe,
            _ => RiemannType::Rusanov,
        }
    }

    pub fn squeeze_config(&self) -> SqueezeConfig {
        SqueezeConfig {
            enabled: self.squeeze,
            tol: self.squeeze_tol,
            entropy_s0: self.entropy_s0,
        }
    }

    pub fn point_set(&self) -> crate::basis::PointSet {
        match self.spts_type_quad {
            1 => crate::basis::PointSet::GaussLobatto,
            _ => crate::basis::PointSet::GaussLegendre,
        }
    }

    /// `mu` is derived from `Re`/`Lref`/freestream density and velocity the
    /// way the freestream configuration block implies (§6): `Re = rho * U *
    /// Lref / mu`.
    pub fn ns_params(&self) -> NsParams {
        let mu = if self.viscous {
            self.rho_bound * self.u_bound.max(self.mach_bound) * self.l_ref / self.re.max(1e-12)
        } else {
            0.0
        };
        NsParams { gamma: self.gamma, mu, pr: self.pr }
    }

    pub fn freestream(&self) -> Freestream {
        Freestream {
            rho: self.rho_bound,
            u: self.u_bound,
            v: self.v_bound,
            w: self.w_bound,
            p: self.p_bound,
        }
    }

    pub fn equation(&self) -> Equation {
        if self.equation == 0 {
            Equation::AdvectionDiffusion(AdvectionDiffusionParams {
                velocity: crate::geometry::Point::new(self.advect_vx, self.advect_vy, self.advect_vz),
                diff_d: self.diff_d,
                lambda: self.lambda,
            })
        } else {
            let viscous = if self.viscous { Some(self.ns_params()) } else { None };
            if self.n_dims == 3 {
                Equation::Euler3D { gamma: self.gamma, viscous }
            } else {
                Equation::Euler2D { gamma: self.gamma, viscous }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["flurry"])
    }

    #[test]
    fn defaults_validate_cleanly() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn roe_flux_requires_euler_equation() {
        let mut cfg = base_config();
        cfg.equation = 0;
        cfg.riemann_type = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn dt_policy_maps_dt_type_codes() {
        let mut cfg = base_config();
        cfg.dt_type = 2;
        assert!(matches!(cfg.dt_policy(), DtPolicy::LocalCfl(_)));
    }

    #[test]
    fn motion_rejects_out_of_range_codes() {
        let mut cfg = base_config();
        cfg.motion = 9;
        assert!(cfg.validate().is_err());
    }
}
