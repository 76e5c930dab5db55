//! Positivity-preserving squeezing (§4.1): convex blending of a field
//! toward its element mean, enforcing a positive density and an
//! entropy-bounded pressure. Operates on raw conserved-variable rows so it
//! has no dependency on which equation (Euler 2-D/3-D) produced them; the
//! linear advection-diffusion equation never calls this (it has no
//! pressure and its scalar field has no positivity constraint).

/// Counts of how many times each stage of squeezing activated during one
/// call, for the per-iteration diagnostic counter (§7: "silent" error
/// kind — squeezing is reported only through this counter, never logged
/// per occurrence).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SqueezeStats {
    pub density_triggered: bool,
    pub entropy_triggered: bool,
}

fn quadrature_mean(points: &[Vec<f64>], weights: &[f64]) -> Vec<f64> {
    let n_vars = points[0].len();
    let total: f64 = weights.iter().sum();
    let mut mean = vec![0.0; n_vars];
    for (u, &w) in points.iter().zip(weights.iter()) {
        for k in 0..n_vars {
            mean[k] += w * u[k];
        }
    }
    for m in &mut mean {
        *m /= total;
    }
    mean
}

fn blend_toward(points: &mut [Vec<f64>], mean: &[f64], eps: f64) {
    for u in points.iter_mut() {
        for (k, v) in u.iter_mut().enumerate() {
            *v = mean[k] + eps * (*v - mean[k]);
        }
    }
}

/// Enforce `rho >= tol` by shrinking the solution-point field toward its
/// mean, then apply the identical blend factor to the flux-point and
/// (optional) mesh-point traces so all three stay consistent.
fn squeeze_density(
    u_spts: &mut [Vec<f64>],
    u_fpts: &mut [Vec<f64>],
    u_mpts: Option<&mut [Vec<f64>]>,
    weights: &[f64],
    tol: f64,
) -> (Vec<f64>, bool) {
    let mean = quadrature_mean(u_spts, weights);
    let rho_min = u_spts.iter().map(|u| u[0]).fold(f64::INFINITY, f64::min);

    if rho_min >= 0.0 {
        return (mean, false);
    }

    let eps = (mean[0] - tol) / (mean[0] - rho_min);
    blend_toward(u_spts, &mean, eps);
    blend_toward(u_fpts, &mean, eps);
    if let Some(mpts) = u_mpts {
        blend_toward(mpts, &mean, eps);
    }
    (mean, true)
}

/// Enforce `p >= exps0 * rho^gamma` (NS only) by the same mean-blend
/// strategy, using a caller-supplied pressure extractor so this module
/// stays agnostic to which conserved-variable layout produced the row.
fn squeeze_entropy(
    u_spts: &mut [Vec<f64>],
    u_fpts: &mut [Vec<f64>],
    u_mpts: Option<&mut [Vec<f64>]>,
    mean: &[f64],
    gamma: f64,
    exps0: f64,
    pressure_of: impl Fn(&[f64]) -> f64,
) -> bool {
    let tau = |u: &[f64]| pressure_of(u) - exps0 * u[0].max(0.0).powf(gamma);
    let tau_min = u_spts.iter().map(|u| tau(u)).fold(f64::INFINITY, f64::min);

    if tau_min >= 0.0 {
        return false;
    }

    let p_avg = pressure_of(mean);
    let rho_avg = mean[0];
    let eps = tau_min / (tau_min - p_avg + exps0 * rho_avg.max(0.0).powf(gamma));

    blend_toward(u_spts, mean, eps);
    blend_toward(u_fpts, mean, eps);
    if let Some(mpts) = u_mpts {
        blend_toward(mpts, mean, eps);
    }
    true
}

/// Run both squeezing stages in order. `pressure_of` is only consulted
/// when `entropy_bound` is `Some((gamma, exps0))` (Euler/NS runs); the
/// scalar advection-diffusion equation passes `None`.
pub fn squeeze(
    u_spts: &mut [Vec<f64>],
    u_fpts: &mut [Vec<f64>],
    mut u_mpts: Option<&mut [Vec<f64>]>,
    weights: &[f64],
    tol: f64,
    entropy_bound: Option<(f64, f64)>,
    pressure_of: impl Fn(&[f64]) -> f64,
) -> SqueezeStats {
    let (mean, density_triggered) = squeeze_density(u_spts, u_fpts, u_mpts.as_deref_mut(), weights, tol);

    let entropy_triggered = match entropy_bound {
        Some((gamma, exps0)) => squeeze_entropy(u_spts, u_fpts, u_mpts, &mean, gamma, exps0, pressure_of),
        None => false,
    };

    SqueezeStats {
        density_triggered,
        entropy_triggered,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_density_point_is_squeezed_to_tolerance() {
        let mut spts = vec![vec![1.0, 0.0, 0.0, 2.5], vec![1.0, 0.0, 0.0, 2.5], vec![-0.01, 0.0, 0.0, 2.5]];
        let mut fpts: Vec<Vec<f64>> = vec![];
        let weights = vec![1.0, 1.0, 1.0];
        let stats = squeeze(&mut spts, &mut fpts, None, &weights, 1e-10, None, |_| 0.0);
        assert!(stats.density_triggered);
        assert!(spts.iter().all(|u| u[0] >= -1e-12));
        let worst = spts[2][0];
        assert!((worst - 1e-10).abs() < 1e-8);
    }

    #[test]
    fn all_positive_density_leaves_field_untouched() {
        let mut spts = vec![vec![1.0, 0.0, 0.0, 2.5], vec![1.2, 0.0, 0.0, 2.5]];
        let mut fpts: Vec<Vec<f64>> = vec![];
        let weights = vec![1.0, 1.0];
        let before = spts.clone();
        let stats = squeeze(&mut spts, &mut fpts, None, &weights, 1e-10, None, |_| 0.0);
        assert!(!stats.density_triggered);
        assert_eq!(spts, before);
    }

    #[test]
    fn squeezing_is_idempotent() {
        let mut spts = vec![vec![1.0, 0.0, 0.0, 2.5], vec![1.0, 0.0, 0.0, 2.5], vec![-0.01, 0.0, 0.0, 2.5]];
        let mut fpts: Vec<Vec<f64>> = vec![];
        let weights = vec![1.0, 1.0, 1.0];
        squeeze(&mut spts, &mut fpts, None, &weights, 1e-10, None, |_| 0.0);
        let after_first = spts.clone();
        squeeze(&mut spts, &mut fpts, None, &weights, 1e-10, None, |_| 0.0);
        assert_eq!(spts, after_first);
    }
}
