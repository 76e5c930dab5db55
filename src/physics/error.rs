#![allow(unused)]
use std::error;
use std::fmt;

/// Error representing invalid hydrodynamics data or a failed primitive
/// variable recovery. Recovered per-point so the caller (typically
/// `Element::calc_transformed_fluxes`) can decide whether the condition is
/// fatal (see §7: a negative Jacobian is fatal, but a transient negative
/// pressure is handled by squeezing before it is ever observed here).
#[derive(Debug)]
pub enum Error {
    NegativeGasPressure(f64),
    NegativeMassDensity(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;

        match self {
            NegativeGasPressure(p) => write!(fmt, "negative gas pressure: {}", p),
            NegativeMassDensity(d) => write!(fmt, "negative mass density: {}", d),
        }
    }
}

impl error::Error for Error {}
