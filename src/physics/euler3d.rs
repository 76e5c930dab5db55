use super::error::Error;
use super::euler2d::NsParams;
use crate::geometry::Point;
use std::ops::{Add, Div, Mul, Sub};

/// Direction of a reference axis in a 3-D element.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    X,
    Y,
    Z,
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
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }
}

// ============================================================================
pub struct Conserved(f64, f64, f64, f64, f64);
pub struct Primitive(f64, f64, f64, f64, f64);

// ============================================================================
impl Conserved {
    pub fn from_slice(cons: &[f64]) -> Self {
        Self(cons[0], cons[1], cons[2], cons[3], cons[4])
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[0] = self.0;
        cons[1] = self.1;
        cons[2] = self.2;
        cons[3] = self.3;
        cons[4] = self.4;
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.0, self.1, self.2, self.3, self.4]
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

    pub fn momentum_3(&self) -> f64 {
        self.3
    }

    pub fn energy_density(&self) -> f64 {
        self.4
    }

    pub fn momentum(&self, direction: Direction) -> f64 {
        match direction {
            Direction::X => self.momentum_1(),
            Direction::Y => self.momentum_2(),
            Direction::Z => self.momentum_3(),
        }
    }

    pub fn momentum_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2 + self.3 * self.3
    }

    pub fn to_primitive(&self, gamma: f64) -> Result<Primitive, Error> {
        let ek = 0.5 * self.momentum_squared() / self.mass_density();
        let et = self.energy_density() - ek;
        let pg = et * (gamma - 1.0);
        let v1 = self.momentum_1() / self.mass_density();
        let v2 = self.momentum_2() / self.mass_density();
        let v3 = self.momentum_3() / self.mass_density();

        if self.mass_density() < 0.0 {
            Err(Error::NegativeMassDensity(self.mass_density()))
        } else if pg < 0.0 {
            Err(Error::NegativeGasPressure(pg))
        } else {
            Ok(Primitive(self.mass_density(), v1, v2, v3, pg))
        }
    }
}

// ============================================================================
impl Primitive {
    pub fn from_slice(prim: &[f64]) -> Self {
        Self(prim[0], prim[1], prim[2], prim[3], prim[4])
    }

    pub fn write_to_slice(&self, prim: &mut [f64]) {
        prim[0] = self.0;
        prim[1] = self.1;
        prim[2] = self.2;
        prim[3] = self.3;
        prim[4] = self.4;
    }

    pub fn new(d0: f64, u0: f64, v0: f64, w0: f64, p0: f64) -> Self {
        Self(d0, u0, v0, w0, p0)
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.0, self.1, self.2, self.3, self.4]
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

    pub fn velocity_3(&self) -> f64 {
        self.3
    }

    pub fn gas_pressure(&self) -> f64 {
        self.4
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        match direction {
            Direction::X => self.velocity_1(),
            Direction::Y => self.velocity_2(),
            Direction::Z => self.velocity_3(),
        }
    }

    pub fn velocity_squared(&self) -> f64 {
        self.1 * self.1 + self.2 * self.2 + self.3 * self.3
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

    pub fn max_signal_speed(&self, gamma: f64) -> f64 {
        self.velocity_squared().sqrt() + self.sound_speed_squared(gamma).sqrt()
    }

    pub fn to_conserved(&self, gamma: f64) -> Conserved {
        let d = self.mass_density();
        let p = self.gas_pressure();
        let vsq = self.velocity_squared();

        Conserved(
            d,
            d * self.velocity_1(),
            d * self.velocity_2(),
            d * self.velocity_3(),
            d * vsq * 0.5 + p / (gamma - 1.0),
        )
    }

    pub fn flux_vector(&self, direction: Direction, gamma: f64) -> Conserved {
        let pg = self.gas_pressure();
        let vn = self.velocity(direction);
        let u = self.to_conserved(gamma);

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::X),
            u.2 * vn + pg * direction.along(Direction::Y),
            u.3 * vn + pg * direction.along(Direction::Z),
            u.4 * vn + pg * vn,
        )
    }

    pub fn reflect(&self, direction: Direction) -> Primitive {
        match direction {
            Direction::X => Primitive(self.0, -self.1, self.2, self.3, self.4),
            Direction::Y => Primitive(self.0, self.1, -self.2, self.3, self.4),
            Direction::Z => Primitive(self.0, self.1, self.2, -self.3, self.4),
        }
    }
}

// ============================================================================
impl Add<Conserved> for Conserved {
    type Output = Conserved;
    fn add(self, u: Self) -> Conserved {
        Conserved(self.0 + u.0, self.1 + u.1, self.2 + u.2, self.3 + u.3, self.4 + u.4)
    }
}

impl Sub<Conserved> for Conserved {
    type Output = Self;
    fn sub(self, u: Self) -> Self {
        Self(self.0 - u.0, self.1 - u.1, self.2 - u.2, self.3 - u.3, self.4 - u.4)
    }
}

impl Mul<f64> for Conserved {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0 * a, self.1 * a, self.2 * a, self.3 * a, self.4 * a)
    }
}

impl Div<f64> for Conserved {
    type Output = Self;
    fn div(self, a: f64) -> Self {
        Self(self.0 / a, self.1 / a, self.2 / a, self.3 / a, self.4 / a)
    }
}

// ============================================================================
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

/// Roe's approximate Riemann solver, extended to 3-D: one acoustic pair at
/// `vn +/- c`, an entropy wave, and *two* shear waves carrying the jump in
/// each of the transverse velocity components.
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
    let w = (rl * pl.velocity_3() + rr * pr.velocity_3()) / rsum;
    let hl = (ul.energy_density() + pl.gas_pressure()) / pl.mass_density();
    let hr = (ur.energy_density() + pr.gas_pressure()) / pr.mass_density();
    let h = (rl * hl + rr * hr) / rsum;

    let vn = match direction {
        Direction::X => u,
        Direction::Y => v,
        Direction::Z => w,
    };
    let q2 = u * u + v * v + w * w;
    let c2 = (gamma - 1.0) * (h - 0.5 * q2);
    let c = c2.max(1e-14).sqrt();

    let dd = pr.mass_density() - pl.mass_density();
    let du = pr.velocity_1() - pl.velocity_1();
    let dv = pr.velocity_2() - pl.velocity_2();
    let dw = pr.velocity_3() - pl.velocity_3();
    let dp = pr.gas_pressure() - pl.gas_pressure();
    let dvn = match direction {
        Direction::X => du,
        Direction::Y => dv,
        Direction::Z => dw,
    };
    let (dt1, dt2) = match direction {
        Direction::X => (dv, dw),
        Direction::Y => (du, dw),
        Direction::Z => (du, dv),
    };

    let l1 = (vn - c).abs();
    let l2 = vn.abs();
    let l3 = (vn + c).abs();

    let rho_avg = rho_c(&pl, &pr);
    let a1 = (dp - rho_avg * c * dvn) / (2.0 * c * c);
    let a2 = dd - dp / c2;
    let a3 = rho_avg * dt1;
    let a4 = rho_avg * dt2;
    let a5 = (dp + rho_avg * c * dvn) / (2.0 * c * c);

    let (e1_0, e1_1, e1_2, e1_3, e1_4) = match direction {
        Direction::X => (1.0, u - c, v, w, h - vn * c),
        Direction::Y => (1.0, u, v - c, w, h - vn * c),
        Direction::Z => (1.0, u, v, w - c, h - vn * c),
    };
    let (e2_0, e2_1, e2_2, e2_3, e2_4) = (1.0, u, v, w, 0.5 * q2);
    let (e3_0, e3_1, e3_2, e3_3, e3_4) = match direction {
        Direction::X => (0.0, 0.0, 1.0, 0.0, v),
        Direction::Y => (0.0, 1.0, 0.0, 0.0, u),
        Direction::Z => (0.0, 1.0, 0.0, 0.0, u),
    };
    let (e4_0, e4_1, e4_2, e4_3, e4_4) = match direction {
        Direction::X => (0.0, 0.0, 0.0, 1.0, w),
        Direction::Y => (0.0, 0.0, 0.0, 1.0, w),
        Direction::Z => (0.0, 0.0, 1.0, 0.0, v),
    };
    let (e5_0, e5_1, e5_2, e5_3, e5_4) = match direction {
        Direction::X => (1.0, u + c, v, w, h + vn * c),
        Direction::Y => (1.0, u, v + c, w, h + vn * c),
        Direction::Z => (1.0, u, v, w + c, h + vn * c),
    };

    let diss0 = l1 * a1 * e1_0 + l2 * a2 * e2_0 + l2 * a3 * e3_0 + l2 * a4 * e4_0 + l3 * a5 * e5_0;
    let diss1 = l1 * a1 * e1_1 + l2 * a2 * e2_1 + l2 * a3 * e3_1 + l2 * a4 * e4_1 + l3 * a5 * e5_1;
    let diss2 = l1 * a1 * e1_2 + l2 * a2 * e2_2 + l2 * a3 * e3_2 + l2 * a4 * e4_2 + l3 * a5 * e5_2;
    let diss3 = l1 * a1 * e1_3 + l2 * a2 * e2_3 + l2 * a3 * e3_3 + l2 * a4 * e4_3 + l3 * a5 * e5_3;
    let diss4 = l1 * a1 * e1_4 + l2 * a2 * e2_4 + l2 * a3 * e3_4 + l2 * a4 * e4_4 + l3 * a5 * e5_4;

    Conserved(
        0.5 * (fl.0 + fr.0) - 0.5 * diss0,
        0.5 * (fl.1 + fr.1) - 0.5 * diss1,
        0.5 * (fl.2 + fr.2) - 0.5 * diss2,
        0.5 * (fl.3 + fr.3) - 0.5 * diss3,
        0.5 * (fl.4 + fr.4) - 0.5 * diss4,
    )
}

fn rho_c(pl: &Primitive, pr: &Primitive) -> f64 {
    (pl.mass_density() * pr.mass_density()).sqrt()
}

/// Gradient of a primitive field, `[d./dx, d./dy, d./dz]` per component.
pub struct PrimitiveGradient {
    pub drho: [f64; 3],
    pub du: [f64; 3],
    pub dv: [f64; 3],
    pub dw: [f64; 3],
    pub dp: [f64; 3],
}

/// Compressible Navier-Stokes viscous flux in `direction` (3-D form of
/// [`super::euler2d::viscous_flux`]).
pub fn viscous_flux(prim: &Primitive, grad: &PrimitiveGradient, direction: Direction, params: NsParams) -> Conserved {
    let mu = params.mu;
    let gamma = params.gamma;
    let k = mu * gamma / (params.pr * (gamma - 1.0));

    let dudx = grad.du[0];
    let dudy = grad.du[1];
    let dudz = grad.du[2];
    let dvdx = grad.dv[0];
    let dvdy = grad.dv[1];
    let dvdz = grad.dv[2];
    let dwdx = grad.dw[0];
    let dwdy = grad.dw[1];
    let dwdz = grad.dw[2];

    let div_v = dudx + dvdy + dwdz;
    let tau_xx = mu * (2.0 * dudx - (2.0 / 3.0) * div_v);
    let tau_yy = mu * (2.0 * dvdy - (2.0 / 3.0) * div_v);
    let tau_zz = mu * (2.0 * dwdz - (2.0 / 3.0) * div_v);
    let tau_xy = mu * (dudy + dvdx);
    let tau_xz = mu * (dudz + dwdx);
    let tau_yz = mu * (dvdz + dwdy);

    let rho = prim.mass_density();
    let p = prim.gas_pressure();
    let dtdk = |k: usize| gamma * (grad.dp[k] / rho - p / (rho * rho) * grad.drho[k]);
    let dtdx = dtdk(0);
    let dtdy = dtdk(1);
    let dtdz = dtdk(2);

    let u = prim.velocity_1();
    let v = prim.velocity_2();
    let w = prim.velocity_3();

    match direction {
        Direction::X => Conserved(0.0, tau_xx, tau_xy, tau_xz, u * tau_xx + v * tau_xy + w * tau_xz + k * dtdx),
        Direction::Y => Conserved(0.0, tau_xy, tau_yy, tau_yz, u * tau_xy + v * tau_yy + w * tau_yz + k * dtdy),
        Direction::Z => Conserved(0.0, tau_xz, tau_yz, tau_zz, u * tau_xz + v * tau_yz + w * tau_zz + k * dtdz),
    }
}

/// Chain-rule conversion from the physical gradient of the conserved state
/// to `PrimitiveGradient`, the 3-D form of [`super::euler2d::primitive_gradient`].
pub fn primitive_gradient(prim: &Primitive, grad_cons: &[[f64; 5]; 3], gamma: f64) -> PrimitiveGradient {
    let rho = prim.mass_density();
    let u = prim.velocity_1();
    let v = prim.velocity_2();
    let w = prim.velocity_3();
    let mut drho = [0.0; 3];
    let mut du = [0.0; 3];
    let mut dv = [0.0; 3];
    let mut dw = [0.0; 3];
    let mut dp = [0.0; 3];
    for d in 0..3 {
        let g = grad_cons[d];
        drho[d] = g[0];
        du[d] = (g[1] - u * drho[d]) / rho;
        dv[d] = (g[2] - v * drho[d]) / rho;
        dw[d] = (g[3] - w * drho[d]) / rho;
        dp[d] = (gamma - 1.0) * (g[4] - 0.5 * drho[d] * (u * u + v * v + w * w) - rho * (u * du[d] + v * dv[d] + w * dw[d]));
    }
    PrimitiveGradient { drho, du, dv, dw, dp }
}

/// `viscous_flux` projected onto a general physical-space `normal`, the 3-D
/// form of [`super::euler2d::viscous_flux_dot_normal`].
pub fn viscous_flux_dot_normal(prim: &Primitive, grad: &PrimitiveGradient, normal: Point, params: NsParams) -> Conserved {
    let fx = viscous_flux(prim, grad, Direction::X, params);
    let fy = viscous_flux(prim, grad, Direction::Y, params);
    let fz = viscous_flux(prim, grad, Direction::Z, params);
    fx * normal.x() + fy * normal.y() + fz * normal.z()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rusanov_is_consistent_with_itself() {
        let gamma = 1.4;
        let p = Primitive::new(1.2, 0.3, -0.1, 0.2, 0.9);
        let fphys = p.flux_vector(Direction::X, gamma);
        let f = riemann_rusanov(
            Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.velocity_3(), p.gas_pressure()),
            Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.velocity_3(), p.gas_pressure()),
            Direction::X,
            gamma,
        );
        assert!((f.0 - fphys.0).abs() < 1e-12);
        assert!((f.4 - fphys.4).abs() < 1e-12);
    }

    #[test]
    fn roe_is_consistent_with_itself() {
        let gamma = 1.4;
        let p = Primitive::new(1.2, 0.3, -0.1, 0.2, 0.9);
        let fphys = p.flux_vector(Direction::Z, gamma);
        let pl = Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.velocity_3(), p.gas_pressure());
        let pr = Primitive::new(p.mass_density(), p.velocity_1(), p.velocity_2(), p.velocity_3(), p.gas_pressure());
        let f = riemann_roe(pl, pr, Direction::Z, gamma);
        assert!((f.0 - fphys.0).abs() < 1e-10);
        assert!((f.4 - fphys.4).abs() < 1e-10);
    }

    #[test]
    fn cons_to_prim_to_cons_round_trips() {
        let gamma = 1.4;
        let prim = Primitive::new(1.1, 0.2, -0.3, 0.1, 1.05);
        let cons = prim.to_conserved(gamma);
        let back = cons.to_primitive(gamma).unwrap();
        assert!((back.mass_density() - prim.mass_density()).abs() < 1e-12);
        assert!((back.velocity_3() - prim.velocity_3()).abs() < 1e-12);
        assert!((back.gas_pressure() - prim.gas_pressure()).abs() < 1e-12);
    }
}
