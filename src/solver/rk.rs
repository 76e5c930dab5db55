//! Runge-Kutta coefficient tables (§4.1, §8 invariant 7): `RkScheme` holds
//! the `a`/`b` pairs `Solver::update` feeds into `Element::time_step_a`/
//! `time_step_b`, one stage short of `a` (the first stage needs no `timeStepA`
//! call — it runs directly off `U0`).

/// `timeType` (§6): forward Euler is the degenerate one-stage scheme;
/// `Rk44` is the classical four-stage, fourth-order table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimeScheme {
    ForwardEuler,
    Rk44,
}

/// `a[s]` multiplies `dt` in `timeStepA` ahead of stage `s + 1` (so `a` has
/// `S - 1` entries for an `S`-stage scheme); `b[s]` multiplies `dt` in the
/// final `timeStepB` accumulation over every stage.
#[derive(Clone, Debug)]
pub struct RkScheme {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl RkScheme {
    pub fn from_time_scheme(scheme: TimeScheme) -> Self {
        match scheme {
            TimeScheme::ForwardEuler => RkScheme { a: vec![], b: vec![1.0] },
            TimeScheme::Rk44 => RkScheme {
                a: vec![0.5, 0.5, 1.0],
                b: vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
            },
        }
    }

    pub fn num_stages(&self) -> usize {
        self.b.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rk44_matches_the_classical_coefficient_pattern() {
        let rk = RkScheme::from_time_scheme(TimeScheme::Rk44);
        assert_eq!(rk.num_stages(), 4);
        assert_eq!(rk.a, vec![0.5, 0.5, 1.0]);
        assert!((rk.b.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn forward_euler_is_a_single_stage() {
        let rk = RkScheme::from_time_scheme(TimeScheme::ForwardEuler);
        assert_eq!(rk.num_stages(), 1);
        assert!(rk.a.is_empty());
    }
}
