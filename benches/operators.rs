//! Manual timing harness for `operators::build::build_operators` and the
//! operator cache (`[[bench]] harness = false` in Cargo.toml): builds the
//! dense extrapolation/gradient/divergence matrices for a spread of
//! element kinds and orders, and reports the cache's amortized lookup cost
//! once those bundles are warm.

use std::time::Instant;

use flurry::basis::PointSet;
use flurry::element::kind::ElementKind;
use flurry::operators::build::build_operators;
use flurry::operators::cache::OperatorCache;

fn time_it<F: FnMut()>(label: &str, iters: usize, mut f: F) {
    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    let elapsed = start.elapsed();
    println!("{label}: {:?} total, {:?} / iter", elapsed, elapsed / iters as u32);
}

fn main() {
    for &order in &[1usize, 2, 3, 4] {
        time_it(&format!("build_operators(Quad, {order})"), 20, || {
            let _ = build_operators(ElementKind::Quad, order, PointSet::GaussLegendre);
        });
    }

    for &order in &[1usize, 2, 3] {
        time_it(&format!("build_operators(Hex, {order})"), 20, || {
            let _ = build_operators(ElementKind::Hex, order, PointSet::GaussLegendre);
        });
    }

    let cache = OperatorCache::new(PointSet::GaussLegendre);
    cache.get(ElementKind::Quad, 3);
    time_it("OperatorCache::get (warm)", 10_000, || {
        let _ = cache.get(ElementKind::Quad, 3);
    });
}
