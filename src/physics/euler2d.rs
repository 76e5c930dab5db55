use super::error::Error;
use crate::geometry::Point;
use std::ops::{Add, Div, Mul, Sub};

/// Direction of a reference axis in a 2-D element.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    I,
    J,
}

impl Direction {
    pub fn along(&self, other: Direction) -> f64 {
        if *self == other {
            1.0
        } else {
            0.0
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Direction::I => 0,
            Direction::J => 1,
        }
    }
}

/// Parameters shared by the inviscid and viscous flux evaluators. `gamma`
/// is the ratio of specific heats, `mu` the dynamic viscosity (derived
/// externally from the freestream `Re`/`Lref` configuration), and `pr` the
/// Prandtl number.
#[derive(Clone, Copy, Debug)]
pub struct NsParams {
    pub gamma: f64,
    pub mu: f64,
    pub pr: f64,
}

// ============================================================================
pub struct Conserved(f64, f64, f64, f64);
pub struct Primitive(f64, f64, f64, f64);

// ============================================================================
impl Conserved {
    pub fn from_slice(cons: &[f64]) -> Self {
        Self(cons[0], cons[1], cons[2], cons[3])
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[0] = self.0;
        cons[1] = self.1;
        cons[2] = self.2;
        cons[3] = self.3;
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.0, self.1, self.2, self.3]
    }

    pub fn mass_density(&self) -> f64 {
        self.0
    }

    pub fn momentum_1(&self) -> f64 {
        self.1
    }

    pub fn momentum_2(&self) -> f64 {
        self.2
    }

    pub fn energy_density(&self) -> f64 {
        self.3
    }

    pub fn momentum(&self, direction: Direction) -> f64 {
        match direction {
            Direction::I => self.momentum_1(),
            Direction::J => self.momentum_2(),
        }
    }

    pub fn momentum_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2
    }

    pub fn to_primitive(&self, gamma: f64) -> Result<Primitive, Error> {
        let ek = 0.5 * self.momentum_squared() / self.mass_density();
        let et = self.energy_density() - ek;
        let pg = et * (gamma - 1.0);
        let v1 = self.momentum_1() / self.mass_density();
        let v2 = self.momentum_2() / self.mass_density();

        if self.mass_density() < 0.0 {
            Err(Error::NegativeMassDensity(self.mass_density()))
        } else if pg < 0.0 {
            Err(Error::NegativeGasPressure(pg))
        } else {
            Ok(Primitive(self.mass_density(), v1, v2, pg))
        }
    }
}

// ============================================================================
impl Primitive {
    pub fn from_slice(prim: &[f64]) -> Self {
        Self(prim[0], prim[1], prim[2], prim[3])
    }

    pub fn write_to_slice(&self, prim: &mut [f64]) {
        prim[0] = self.0;
        prim[1] = self.1;
        prim[2] = self.2;
        prim[3] = self.3;
    }

    pub fn new(d0: f64, u0: f64, v0: f64, p0: f64) -> Self {
        Self(d0, u0, v0, p0)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.0, self.1, self.2, self.3]
    }

    pub fn mass_density(&self) -> f64 {
        self.0
    }

    pub fn velocity_1(&self) -> f64 {
        self.1
    }

    pub fn velocity_2(&self) -> f64 {
        self.2
    }

    pub fn gas_pressure(&self) -> f64 {
        self.3
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        match direction {
            Direction::I => self.velocity_1(),
            Direction::J => self.velocity_2(),
        }
    }

    pub fn velocity_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2
    }

    pub fn sound_speed_squared(&self, gamma: f64) -> f64 {
        gamma * self.gas_pressure() / self.mass_density()
    }

    pub fn temperature(&self, gamma: f64) -> f64 {
        gamma * self.gas_pressure() / self.mass_density()
    }

    pub fn mach_number(&self, gamma: f64) -> f64 {
        (self.velocity_squared() / self.sound_speed_squared(gamma)).sqrt()
    }

    pub fn outer_wavespeeds(&self, direction: Direction, gamma: f64) -> (f64, f64) {
        let cs = self.sound_speed_squared(gamma).sqrt();
        let vn = self.velocity(direction);
        (vn - cs, vn + cs)
    }

    /// Normal convective speed minus any grid-velocity component, plus the
    /// acoustic speed; this is the per-flux-point quantity §4.1 uses to set
    /// the element's local time step.
    pub fn max_signal_speed(&self, normal: Point, grid_velocity: Point, gamma: f64) -> f64 {
        let vn = self.velocity_1() * normal.x() + self.velocity_2() * normal.y();
        let vgn = grid_velocity.x() * normal.x() + grid_velocity.y() * normal.y();
        (vn - vgn).abs() + self.sound_speed_squared(gamma).sqrt()
    }

    pub fn to_conserved(&self, gamma: f64) -> Conserved {
        let d = self.mass_density();
        let p = self.gas_pressure();
        let vsq = self.velocity_squared();

        Conserved(
            d,
            d * self.velocity_1(),
            d * self.velocity_2(),
            d * vsq * 0.5 + p / (gamma - 1.0),
        )
    }

    pub fn flux_vector(&self, direction: Direction, gamma: f64) -> Conserved {
        let pg = self.gas_pressure();
        let vn = self.velocity(direction);
        let u = self.to_conserved(gamma);

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::I),
            u.2 * vn + pg * direction.along(Direction::J),
            u.3 * vn + pg * vn,
        )
    }

    pub fn reflect(&self, direction: Direction) -> Primitive {
        match direction {
            Direction::I => Primitive(self.0, -self.1, self.2, self.3),
            Direction::J => Primitive(self.0, self.1, -self.2, self.3),
        }
    }
}

impl From<&[f64]> for Conserved {
    fn from(cons: &[f64]) -> Self {
        Self::from_slice(cons)
    }
}

impl From<&[f64]> for Primitive {
    fn from(prim: &[f64]) -> Self {
        Self::from_slice(prim)
    }
}

// ============================================================================
impl Add<Conserved> for Conserved {
    type Output = Conserved;
    fn add(self, u: Self) -> Conserved {
        Conserved(self.0 + u.0, self.1 + u.1, self.2 + u.2, self.3 + u.3)
    }
}

impl Sub<Conserved> for Conserved {
    type Output = Self;
    fn sub(self, u: Self) -> Self {
        Self(self.0 - u.0, self.1 - u.1, self.2 - u.2, self.3 - u.3)
    }
}

impl Mul<f64> for Conserved {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0 * a, self.1 * a, self.2 * a, self.3 * a)
    }
}

impl Div<f64> for Conserved {
    type Output = Self;
    fn div(self, a: f64) -> Self {
        Self(self.0 / a, self.1 / a, self.2 / a, self.3 / a)
    }
}

// ============================================================================
/// Local Lax-Friedrichs / Rusanov flux: a single maximal wave speed bounds
/// the dissipation on both sides of the interface.
pub fn riemann_rusanov(pl: Primitive, pr: Primitive, direction: Direction, gamma: f64) -> Conserved {
    let ul = pl.to_conserved(gamma);
    let ur = pr.to_conserved(gamma);
    let fl = pl.flux_vector(direction, gamma);
    let fr = pr.flux_vector(direction, gamma);

    let (alm, alp) = pl.outer_wavespeeds(direction, gamma);
    let (arm, arp) = pr.outer_wavespeeds(direction, gamma);
    let smax = alm.abs().max(alp.abs()).max(arm.abs()).max(arp.abs());

    (fl + fr - (ur - ul) * smax) / 2.0
}

/// Roe's approximate Riemann solver with Roe-averaged state, entropy fix
/// disabled (the standard flux-difference splitting form; §6 `riemannType
/// = 1`, NS only).
pub fn riemann_roe(pl: Primitive, pr: Primitive, direction: Direction, gamma: f64) -> Conserved {
    let ul = pl.to_conserved(gamma);
    let ur = pr.to_conserved(gamma);
    let fl = pl.flux_vector(direction, gamma);
    let fr = pr.flux_vector(direction, gamma);

    let rl = pl.mass_density().sqrt();
    let rr = pr.mass_density().sqrt();
    let rsum = rl + rr;

    let u = (rl * pl.velocity_1() + rr * pr.velocity_1()) / rsum;
    let v = (rl * pl.velocity_2() + rr * pr.velocity_2()) / rsum;
    let hl = (ul.energy_density() + pl.gas_pressure()) / pl.mass_density();
    let hr = (ur.energy_density() + pr.gas_pressure()) / pr.mass_density();
    let h = (rl * hl + rr * hr) / rsum;
    let vn = match direction {
        Direction::I => u,
        Direction::J => v,
    };
    let q2 = u * u + v * v;
    let c2 = (gamma - 1.0) * (h - 0.5 * q2);
    let c = c2.max(1e-14).sqrt();

    let dd = pr.mass_density() - pl.mass_density();
    let du = pr.velocity_1() - pl.velocity_1();
    let dv = pr.velocity_2() - pl.velocity_2();
    let dp = pr.gas_pressure() - pl.gas_pressure();
    let dvn = match direction {
        Direction::I => du,
        Direction::J => dv,
    };

    let l1 = (vn - c).abs();
    let l2 = vn.abs();
    let l3 = (vn + c).abs();

    // Four-wave decomposition: two acoustic waves at vn +/- c, an entropy
    // wave and a shear wave both advecting at vn. Since `direction` is
    // axis-aligned the normal/tangent split is just a choice of which
    // velocity component is "along" and which is "across".
    let rho_avg = rho_c(&pl, &pr);
    let dv_tang = match direction {
        Direction::I => dv,
        Direction::J => du,
    };

    let a1 = (dp - rho_avg * c * dvn) / (2.0 * c * c);
    let a2 = dd - dp / c2;
    let a3 = rho_avg * dv_tang;
    let a4 = (dp + rho_avg * c * dvn) / (2.0 * c * c);

    let (e1_0, e1_1, e1_2, e1_3) = match direction {
        Direction::I => (1.0, u - c, v, h - vn * c),
        Direction::J => (1.0, u, v - c, h - vn * c),
    };
    let (e2_0, e2_1, e2_2, e2_3) = (1.0, u, v, 0.5 * q2);
    let (e3_0, e3_1, e3_2, e3_3) = match direction {
        Direction::I => (0.0, 0.0, 1.0, v),
        Direction::J => (0.0, 1.0, 0.0, u),
    };
    let (e4_0, e4_1, e4_2, e4_3) = match direction {
        Direction::I => (1.0, u + c, v, h + vn * c),
        Direction::J => (1.0, u, v + c, h + vn * c),
    };

    let diss0 = l1 * a1 * e1_0 + l2 * a2 * e2_0 + l2 * a3 * e3_0 + l3 * a4 * e4_0;
    let diss1 = l1 * a1 * e1_1 + l2 * a2 * e2_1 + l2 * a3 * e3_1 + l3 * a4 * e4_1;
    let diss2 = l1 * a1 * e1_2 + l2 * a2 * e2_2 + l2 * a3 * e3_2 + l3 * a4 * e4_2;
    let diss3 = l1 * a1 * e1_3 + l2 * a2 * e2_3 + l2 * a3 * e3_3 + l3 * a4 * e4_3;

    Conserved(
        0.5 * (fl.0 + fr.0) - 0.5 * diss0,
        0.5 * (fl.1 + fr.1) - 0.5 * diss1,
        0.5 * (fl.2 + fr.2) - 0.5 * diss2,
        0.5 * (fl.3 + fr.3) - 0.5 * diss3,
    )
}

fn rho_c(pl: &Primitive, pr: &Primitive) -> f64 {
    (pl.mass_density() * pr.mass_density()).sqrt()
}

/// The gradient of a primitive field, `[d./dI, d./dJ]` per component, as
/// produced by the element's reference-to-physical gradient kernel.
pub struct PrimitiveGradient {
    pub drho: [f64; 2],
    pub du: [f64; 2],
    pub dv: [f64; 2],
    pub dp: [f64; 2],
}

/// Compressible Navier-Stokes viscous flux in `direction`, under Stokes'
/// hypothesis (`lambda = -2/3 mu`) and Fourier heat conduction with thermal
/// conductivity `k = mu gamma / (Pr (gamma - 1))` (the usual nondimensional
/// closure, `R = 1`).
pub fn viscous_flux(
    prim: &Primitive,
    grad: &PrimitiveGradient,
    direction: Direction,
    params: NsParams,
) -> Conserved {
    let mu = params.mu;
    let gamma = params.gamma;
    let k = mu * gamma / (params.pr * (gamma - 1.0));

    let dudx = grad.du[0];
    let dudy = grad.du[1];
    let dvdx = grad.dv[0];
    let dvdy = grad.dv[1];

    let div_v = dudx + dvdy;
    let tau_xx = mu * (2.0 * dudx - (2.0 / 3.0) * div_v);
    let tau_yy = mu * (2.0 * dvdy - (2.0 / 3.0) * div_v);
    let tau_xy = mu * (dudy + dvdx);

    let rho = prim.mass_density();
    let p = prim.gas_pressure();
    let dtdx = gamma * (grad.dp[0] / rho - p / (rho * rho) * grad.drho[0]);
    let dtdy = gamma * (grad.dp[1] / rho - p / (rho * rho) * grad.drho[1]);
    let qx = -k * dtdx;
    let qy = -k * dtdy;

    let u = prim.velocity_1();
    let v = prim.velocity_2();

    match direction {
        Direction::I => Conserved(0.0, tau_xx, tau_xy, u * tau_xx + v * tau_xy - qx),
        Direction::J => Conserved(0.0, tau_xy, tau_yy, u * tau_xy + v * tau_yy - qy),
    }
}

/// Chain-rule conversion from the physical gradient of the conserved state
/// (`grad_cons[dim][var]`, `var` in conserved order) to `PrimitiveGradient`,
/// needed because `viscous_flux` is written against `du/dx` etc, not
/// `d(rho u)/dx`.
pub fn primitive_gradient(prim: &Primitive, grad_cons: &[[f64; 4]; 2], gamma: f64) -> PrimitiveGradient {
    let rho = prim.mass_density();
    let u = prim.velocity_1();
    let v = prim.velocity_2();
    let mut drho = [0.0; 2];
    let mut du = [0.0; 2];
    let mut dv = [0.0; 2];
    let mut dp = [0.0; 2];
    for d in 0..2 {
        let g = grad_cons[d];
        drho[d] = g[0];
        du[d] = (g[1] - u * drho[d]) / rho;
        dv[d] = (g[2] - v * drho[d]) / rho;
        dp[d] = (gamma - 1.0) * (g[3] - 0.5 * drho[d] * (u * u + v * v) - rho * (u * du[d] + v * dv[d]));
    }
    PrimitiveGradient { drho, du, dv, dp }
}

/// `viscous_flux` projected onto a general physical-space `normal`, the way
/// `face::common::inviscid_flux` combines the rotated Riemann flux.
pub fn viscous_flux_dot_normal(prim: &Primitive, grad: &PrimitiveGradient, normal: Point, params: NsParams) -> Conserved {
    let fi = viscous_flux(prim, grad, Direction::I, params);
    let fj = viscous_flux(prim, grad, Direction::J, params);
    fi * normal.x() + fj * normal.y()
}

#[cfg(test)]
mod test {
    use super::*;

    fn uniform_state(gamma: f64) -> Primitive {
        Primitive::new(1.2, 0.3, -0.1, 0.9)
    }

    #[test]
    fn rusanov_is_consistent_with_itself() {
        let gamma = 1.4;
        let p = uniform_state(gamma);
        let u = p.to_conserved(gamma);
        let fphys = p.flux_vector(Direction::I, gamma);
        let f = riemann_rusanov(
            Primitive::new(u.0, u.1 / u.0, u.2 / u.0, p.gas_pressure()),
            Primitive::new(u.0, u.1 / u.0, u.2 / u.0, p.gas_pressure()),
            Direction::I,
            gamma,
        );
        assert!((f.0 - fphys.0).abs() < 1e-12);
        assert!((f.1 - fphys.1).abs() < 1e-12);
        assert!((f.2 - fphys.2).abs() < 1e-12);
        assert!((f.3 - fphys.3).abs() < 1e-12);
    }

    #[test]
    fn roe_is_consistent_with_itself() {
        let gamma = 1.4;
        let p = uniform_state(gamma);
        let fphys = p.flux_vector(Direction::J, gamma);
        let pl = Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.gas_pressure());
        let pr = Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.gas_pressure());
        let f = riemann_roe(pl, pr, Direction::J, gamma);
        assert!((f.0 - fphys.0).abs() < 1e-10);
        assert!((f.1 - fphys.1).abs() < 1e-10);
        assert!((f.2 - fphys.2).abs() < 1e-10);
        assert!((f.3 - fphys.3).abs() < 1e-10);
    }

    #[test]
    fn cons_to_prim_to_cons_round_trips() {
        let gamma = 1.4;
        let prim = Primitive::new(1.1, 0.2, -0.3, 1.05);
        let cons = prim.to_conserved(gamma);
        let back = cons.to_primitive(gamma).unwrap();
        assert!((back.mass_density() - prim.mass_density()).abs() < 1e-12);
        assert!((back.velocity_1() - prim.velocity_1()).abs() < 1e-12);
        assert!((back.velocity_2() - prim.velocity_2()).abs() < 1e-12);
        assert!((back.gas_pressure() - prim.gas_pressure()).abs() < 1e-12);
    }
}
