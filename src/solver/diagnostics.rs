//! Residual norms and the `monitorResFreq` console report (§6: `resType
//! ∈{1,2,3}`, `monitorResFreq`).

use crate::element::state::Element;

/// `resType` (§6): which norm `residual_norm` reduces the per-spt residual
/// with. `L1`/`L2` are taken over every solution point and variable; `LInf`
/// is the maximum magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResidualNorm {
    L1,
    L2,
    LInf,
}

impl ResidualNorm {
    pub fn from_res_type(res_type: u8) -> Self {
        match res_type {
            1 => ResidualNorm::L1,
            2 => ResidualNorm::L2,
            _ => ResidualNorm::LInf,
        }
    }
}

/// The per-variable residual computed from one element's divergence tensor
/// at the given RK stage, folded across every element in the local
/// partition (a true multi-rank run all-reduces this across ranks too, via
/// `transport::comm::Communicator::all_reduce`).
pub fn local_residual(elements: &[Element], stage: usize, norm: ResidualNorm) -> Vec<f64> {
    let n_vars = elements.first().map_or(0, |e| e.n_vars());
    let mut acc = vec![0.0; n_vars];
    let mut count = 0usize;

    for el in elements {
        for row in &el.div_f_spts[stage] {
            count += 1;
            for (a, &r) in acc.iter_mut().zip(row.iter()) {
                match norm {
                    ResidualNorm::L1 => *a += r.abs(),
                    ResidualNorm::L2 => *a += r * r,
                    ResidualNorm::LInf => *a = a.max(r.abs()),
                }
            }
        }
    }

    match norm {
        ResidualNorm::L1 => acc.iter_mut().for_each(|a| *a /= count.max(1) as f64),
        ResidualNorm::L2 => acc.iter_mut().for_each(|a| *a = (*a / count.max(1) as f64).sqrt()),
        ResidualNorm::LInf => {}
    }
    acc
}

/// `log::info!` a one-line residual report, the way `monitorResFreq`
/// gates console output in the original solver loop.
pub fn report(iteration: usize, time: f64, residual: &[f64]) {
    let cells = residual.iter().map(|r| format!("{:.6e}", r)).collect::<Vec<_>>().join(", ");
    log::info!("iter {:>8}  t = {:.6e}  residual = [{}]", iteration, time, cells);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::basis::PointSet;
    use crate::element::kind::ElementKind;
    use crate::element::state::Equation;
    use crate::geometry::Point;
    use crate::operators::build::build_operators;
    use crate::physics::advection_diffusion;
    use std::sync::Arc;

    fn element_with_divergence(values: Vec<f64>) -> Element {
        let ops = Arc::new(build_operators(ElementKind::Quad, 1, PointSet::GaussLegendre));
        let nodes = vec![
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        ];
        let mut el = Element::setup(
            ElementKind::Quad,
            1,
            ops,
            nodes,
            vec![Point::zero(); 4],
            Equation::AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams {
                velocity: Point::new(1.0, 0.0, 0.0),
                diff_d: 0.0,
                lambda: 1.0,
            }),
            false,
        );
        el.div_f_spts = vec![values.iter().map(|&v| vec![v]).collect()];
        el
    }

    #[test]
    fn l_inf_norm_picks_the_largest_magnitude() {
        let el = element_with_divergence(vec![-3.0, 1.0, 2.0, -0.5]);
        let r = local_residual(&[el], 0, ResidualNorm::LInf);
        assert_eq!(r, vec![3.0]);
    }

    #[test]
    fn l2_norm_is_the_root_mean_square() {
        let el = element_with_divergence(vec![1.0, -1.0, 1.0, -1.0]);
        let r = local_residual(&[el], 0, ResidualNorm::L2);
        assert!((r[0] - 1.0).abs() < 1e-12);
    }
}
