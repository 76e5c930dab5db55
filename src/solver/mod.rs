//! Orchestration of the residual pipeline and the RK update (§4.3): `Solver`
//! owns every `Element` and `Face` in the local partition and drives them
//! through one RK stage at a time. Parallel-over-elements phases use
//! `rayon`'s data-parallel iterators, matching how the teacher's own compute
//! layer hands independent work to the global thread pool; the face loop
//! stays sequential because neighboring faces can alias the same mutable
//! element.

pub mod diagnostics;
pub mod rk;

use std::collections::HashMap;

use log::warn;
use rayon::prelude::*;

use crate::element::state::Element;
use crate::face::{Face, FaceKernel};
use crate::face::mpi::{self, MpiFaceKey};
use crate::face::overset;
use crate::transport::comm::Communicator;
use rk::RkScheme;

/// `dtType` (§6): a single fixed value, one value recomputed from the
/// global CFL target every step, or a per-element local value (only valid
/// alongside steady-state residual smoothing, since it breaks time
/// accuracy).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DtPolicy {
    Fixed(f64),
    GlobalCfl(f64),
    LocalCfl(f64),
}

/// Which local element, if any, a face's right-hand side reads from. `None`
/// means the face synthesizes or transports its right state instead of
/// reading a neighbor directly (a non-periodic boundary, an MPI face, or an
/// overset face).
#[derive(Clone, Copy, Debug)]
pub struct FaceTopology {
    pub left: usize,
    pub right: Option<usize>,
}

/// Positivity-preserving squeeze configuration (§4.1, §6 `squeeze`).
#[derive(Clone, Copy, Debug)]
pub struct SqueezeConfig {
    pub enabled: bool,
    pub tol: f64,
    pub entropy_s0: f64,
}

pub struct Solver {
    pub elements: Vec<Element>,
    pub faces: Vec<Face>,
    pub topology: Vec<FaceTopology>,
    pub rk: RkScheme,
    pub dt_policy: DtPolicy,
    pub squeeze: SqueezeConfig,
    pub riemann: crate::face::RiemannType,
    pub ldg: crate::face::LdgParams,

    /// `(local face index, peer rank)` for every MPI face, in the same
    /// order they appear in `faces`/`topology` — built by the (out-of-scope)
    /// geometry service from the partition's ghost-exchange map.
    mpi_peers: Vec<(usize, usize)>,
    /// `local face index` for every overset face, in the same order as
    /// `faces`/`topology`.
    overset_faces: Vec<usize>,

    pub time: f64,
    pub iteration: usize,
}

impl Solver {
    pub fn new(
        elements: Vec<Element>,
        faces: Vec<Face>,
        topology: Vec<FaceTopology>,
        rk: RkScheme,
        dt_policy: DtPolicy,
        squeeze: SqueezeConfig,
        riemann: crate::face::RiemannType,
        ldg: crate::face::LdgParams,
        mpi_peers: Vec<(usize, usize)>,
        overset_faces: Vec<usize>,
    ) -> Self {
        assert_eq!(faces.len(), topology.len(), "one topology entry per face");
        Solver { elements, faces, topology, rk, dt_policy, squeeze, riemann, ldg, mpi_peers, overset_faces, time: 0.0, iteration: 0 }
    }

    /// `dt` for the whole partition under the configured policy. `comm` is
    /// consulted (via `all_reduce`) only for `GlobalCfl`, to fold the
    /// per-rank minimum into the true global minimum (§5).
    pub fn time_step(&self, comm: Option<&dyn Communicator>) -> f64 {
        match self.dt_policy {
            DtPolicy::Fixed(dt) => dt,
            DtPolicy::GlobalCfl(cfl) => {
                let local_min = self.elements.iter().map(|e| e.local_dt(cfl)).fold(f64::INFINITY, f64::min);
                match comm {
                    Some(comm) => {
                        let bytes = local_min.to_le_bytes().to_vec();
                        let reduced = comm.all_reduce(|a, b| {
                            let x = f64::from_le_bytes(a.try_into().unwrap());
                            let y = f64::from_le_bytes(b.try_into().unwrap());
                            x.min(y).to_le_bytes().to_vec()
                        }, bytes);
                        f64::from_le_bytes(reduced.try_into().unwrap())
                    }
                    None => local_min,
                }
            }
            DtPolicy::LocalCfl(cfl) => self.elements.iter().map(|e| e.local_dt(cfl)).fold(f64::INFINITY, f64::min),
        }
    }

    fn local_dt_for(&self, idx: usize, global_dt: f64) -> f64 {
        match self.dt_policy {
            DtPolicy::LocalCfl(cfl) => self.elements[idx].local_dt(cfl),
            _ => global_dt,
        }
    }

    /// `calcResidual(step)` (§4.3): one RK stage's worth of flux evaluation
    /// and divergence assembly. `dt` is only used by the local-CFL branch of
    /// `time_step_a`/`time_step_b`, which this function does not call —
    /// `update` applies those once the divergence tensor here is ready.
    pub fn calc_residual(&mut self, stage: usize, comm: Option<&dyn Communicator>) {
        self.elements.par_iter_mut().for_each(|el| el.extrapolate_to_fpts());

        if self.squeeze.enabled {
            for el in &mut self.elements {
                let stats = el.squeeze(self.squeeze.tol, self.squeeze.entropy_s0);
                if stats.density_triggered || stats.entropy_triggered {
                    warn!("squeeze activated on element (counter = {})", el.squeeze_counter);
                }
            }
        }

        let any_viscous = self.elements.iter().any(|el| el.equation.is_viscous());
        if any_viscous {
            // LDG needs the common interface state at every flux point
            // before the reference gradient can be corrected, so this runs
            // as its own pass ahead of `calc_gradients`/`calc_transformed_fluxes`
            // rather than folding into the existing flux pass below.
            for i in 0..self.faces.len() {
                self.write_common_state_local(i);
            }
            self.exchange_mpi_common_state(comm);
            self.finish_overset_common_state();
        }

        self.elements.par_iter_mut().for_each(|el| {
            if el.equation.is_viscous() || el.moving {
                el.calc_gradients();
            }
            if el.equation.is_viscous() {
                el.calc_corrected_gradients();
            }
        });

        self.elements.par_iter_mut().for_each(|el| el.calc_transformed_fluxes());

        // §4.3 step 8: common flux on every interior/boundary face first,
        // then the MPI faces (their `get_left_state` runs here too, the
        // send/receive itself happens right after), then overset.
        for i in 0..self.faces.len() {
            self.evaluate_local_face(i);
        }
        self.exchange_mpi_traces(comm);
        self.finish_overset_trace_exchange();

        self.elements.par_iter_mut().for_each(|el| {
            el.calc_disc_normal_flux();
            el.calc_divergence(stage);
            el.apply_correction(stage);
        });
    }

    /// Runs `setupFace`/`getLeftState`/`getRightState`/`calcInviscidFlux`/
    /// `calcViscousFlux`/`setRightState` inline for interior and (non-MPI,
    /// non-overset) boundary faces, the synchronous half of §4.3 step 8.
    /// MPI and overset faces get only `get_left_state` here; their
    /// `set_right_state` runs once their trace has arrived.
    fn evaluate_local_face(&mut self, i: usize) {
        let topo = self.topology[i];
        let riemann = self.riemann;
        let ldg = self.ldg;

        match topo.right {
            Some(right) if right != topo.left => {
                let (lo, hi) = if topo.left < right { (topo.left, right) } else { (right, topo.left) };
                let (left_slice, right_slice) = self.elements.split_at_mut(hi);
                let (left_el, right_el) = if topo.left == lo {
                    (&mut left_slice[lo], &mut right_slice[0])
                } else {
                    (&mut right_slice[0], &mut left_slice[lo])
                };
                self.faces[i].setup_face(left_el, Some(right_el));
                self.faces[i].get_left_state(left_el);
                self.faces[i].get_right_state(Some(right_el));
                self.faces[i].calc_inviscid_flux(riemann);
                self.faces[i].calc_viscous_flux(ldg);
                self.faces[i].set_right_state(left_el, Some(right_el));
            }
            _ => {
                let left_el = &mut self.elements[topo.left];
                match &mut self.faces[i] {
                    Face::Mpi(_) | Face::Overset(_) => {
                        self.faces[i].setup_face(left_el, None);
                        self.faces[i].get_left_state(left_el);
                    }
                    _ => {
                        self.faces[i].setup_face(left_el, None);
                        self.faces[i].get_left_state(left_el);
                        self.faces[i].get_right_state(None);
                        self.faces[i].calc_inviscid_flux(riemann);
                        self.faces[i].calc_viscous_flux(ldg);
                        self.faces[i].set_right_state(left_el, None);
                    }
                }
            }
        }
    }

    /// Viscous-only pre-pass (§4.2): run `write_common_state` for one local
    /// (interior or boundary) face. A no-op on MPI/overset faces — their
    /// common state is written by `exchange_mpi_common_state`/
    /// `finish_overset_common_state` instead, once their trace has arrived.
    fn write_common_state_local(&mut self, i: usize) {
        let topo = self.topology[i];
        match topo.right {
            Some(right) if right != topo.left => {
                let (lo, hi) = if topo.left < right { (topo.left, right) } else { (right, topo.left) };
                let (left_slice, right_slice) = self.elements.split_at_mut(hi);
                let (left_el, right_el) = if topo.left == lo {
                    (&mut left_slice[lo], &mut right_slice[0])
                } else {
                    (&mut right_slice[0], &mut left_slice[lo])
                };
                self.faces[i].write_common_state(left_el, Some(right_el));
            }
            _ => {
                let left_el = &mut self.elements[topo.left];
                self.faces[i].write_common_state(left_el, None);
            }
        }
    }

    /// Viscous-only pre-pass, MPI branch: a second send/receive round ahead
    /// of `exchange_mpi_traces`'s own exchange, so the LDG common state is
    /// available before `calc_corrected_gradients` runs. Costs an extra
    /// round-trip on viscous runs only; `setup_face` never resets
    /// `MpiFace::ur`, so the trace `exchange_mpi_traces` receives later is
    /// the same value re-sent, not a second distinct exchange of content.
    fn exchange_mpi_common_state(&mut self, comm: Option<&dyn Communicator>) {
        use crate::automaton::{Automaton, Status};

        if self.mpi_peers.is_empty() {
            return;
        }
        let comm = match comm {
            Some(comm) => comm,
            None => return,
        };

        let mut by_key = HashMap::new();
        for &(face_idx, peer_rank) in &self.mpi_peers {
            if let Face::Mpi(f) = &self.faces[face_idx] {
                let (peer_key, ul) = f.messages().into_iter().next().expect("an MPI face always addresses its peer");
                by_key.insert(f.key(), face_idx);
                let bytes = rmp_serde::to_vec(&(peer_key, ul)).expect("mpi trace serializes");
                comm.send(peer_rank, bytes);
            }
        }

        for _ in 0..self.mpi_peers.len() {
            let bytes = comm.recv();
            let (key, ur): (MpiFaceKey, Vec<Vec<f64>>) = rmp_serde::from_slice(&bytes).expect("mpi trace deserializes");
            let face_idx = match by_key.get(&key) {
                Some(&idx) => idx,
                None => {
                    comm.requeue_recv(bytes);
                    continue;
                }
            };
            let left = self.topology[face_idx].left;
            if let Face::Mpi(f) = &mut self.faces[face_idx] {
                if matches!(f.receive(ur), Status::Eligible) {
                    mpi::resolve_common_state(f, &mut self.elements[left]);
                }
            }
        }
    }

    /// Viscous-only pre-pass, overset branch: resolve the common state from
    /// whatever donor interpolation has already arrived. The donor state
    /// isn't re-fed here — `feed_overset_donor` is the caller's job, same as
    /// for `finish_overset_trace_exchange` — so this only runs for donor
    /// state that was already pushed in ahead of this `calc_residual` call.
    fn finish_overset_common_state(&mut self) {
        for &face_idx in &self.overset_faces {
            let left = self.topology[face_idx].left;
            if let Face::Overset(f) = &mut self.faces[face_idx] {
                if f.has_donor_state() {
                    overset::resolve_common_state(f, &mut self.elements[left]);
                }
            }
        }
    }

    /// §4.3 step 6/8 (MPI branch): send every MPI face's `UL` trace, tagged
    /// with its peer's key, to its peer rank (non-blocking — `send` must
    /// return immediately, §5). Then receive one message per outstanding
    /// face and dispatch each by key rather than arrival order, since
    /// nothing about `Communicator::recv` guarantees messages arrive in the
    /// order they were addressed. Once a face's trace has arrived, resolve
    /// its common flux now that the owning element is available too.
    /// No-op on a single-rank run (`comm` is `None`).
    fn exchange_mpi_traces(&mut self, comm: Option<&dyn Communicator>) {
        use crate::automaton::{Automaton, Status};

        if self.mpi_peers.is_empty() {
            return;
        }
        let comm = match comm {
            Some(comm) => comm,
            None => return,
        };

        let mut by_key = HashMap::new();
        for &(face_idx, peer_rank) in &self.mpi_peers {
            if let Face::Mpi(f) = &self.faces[face_idx] {
                let (peer_key, ul) = f.messages().into_iter().next().expect("an MPI face always addresses its peer");
                by_key.insert(f.key(), face_idx);
                let bytes = rmp_serde::to_vec(&(peer_key, ul)).expect("mpi trace serializes");
                comm.send(peer_rank, bytes);
            }
        }

        for _ in 0..self.mpi_peers.len() {
            let bytes = comm.recv();
            let (key, ur): (MpiFaceKey, Vec<Vec<f64>>) = rmp_serde::from_slice(&bytes).expect("mpi trace deserializes");
            let face_idx = match by_key.get(&key) {
                Some(&idx) => idx,
                None => {
                    comm.requeue_recv(bytes);
                    continue;
                }
            };
            let left = self.topology[face_idx].left;
            if let Face::Mpi(f) = &mut self.faces[face_idx] {
                if matches!(f.receive(ur), Status::Eligible) {
                    mpi::resolve_mpi_flux(f, &self.elements[left]);
                    f.set_right_state(&mut self.elements[left], None);
                }
            }
        }
    }

    /// §4.3 step 8 (overset branch), skipped when the overset method is
    /// field interpolation. The donor interpolation itself is the
    /// out-of-scope overset communicator's job (§6); `feed_overset_donor`
    /// is how the caller injects it once available.
    fn finish_overset_trace_exchange(&mut self) {
        for &face_idx in &self.overset_faces {
            let left = self.topology[face_idx].left;
            if let Face::Overset(f) = &mut self.faces[face_idx] {
                if f.has_donor_state() {
                    overset::resolve_overset_flux(f, &self.elements[left]);
                    f.set_right_state(&mut self.elements[left], None);
                }
            }
        }
    }

    /// Feed an externally-resolved donor interpolation into one overset
    /// face, ahead of the next `calc_residual` call.
    pub fn feed_overset_donor(&mut self, face_idx: usize, donor_state: Vec<Vec<f64>>) {
        use crate::automaton::Automaton;
        if let Face::Overset(f) = &mut self.faces[face_idx] {
            f.receive(donor_state);
        }
    }

    /// `update()` (§4.3): `S` RK stages. Stages `0..S-2` call `timeStepA`;
    /// after the final stage `U <- U0` is restored once and `timeStepB` is
    /// applied for every stage, then `time` advances by `dt`.
    pub fn update(&mut self, comm: Option<&dyn Communicator>) {
        let dt = self.time_step(comm);
        let stages = self.rk.num_stages();

        for el in &mut self.elements {
            el.snapshot();
        }

        for stage in 0..stages {
            self.calc_residual(stage, comm);
            if stage + 1 < stages {
                let a = self.rk.a[stage];
                for (idx, el) in self.elements.iter_mut().enumerate() {
                    let local_dt = self.local_dt_for(idx, dt);
                    el.time_step_a(stage, a, local_dt);
                }
            }
        }

        if stages > 1 {
            for el in &mut self.elements {
                el.restore_u0();
            }
        }
        for stage in 0..stages {
            let b = self.rk.b[stage];
            for (idx, el) in self.elements.iter_mut().enumerate() {
                let local_dt = self.local_dt_for(idx, dt);
                el.time_step_b(stage, b, local_dt);
            }
        }

        self.time += dt;
        self.iteration += 1;
    }

    /// `monitorResFreq` (§6): log a residual report every `freq` iterations.
    pub fn maybe_report_residual(&self, freq: usize, norm: diagnostics::ResidualNorm) {
        if freq == 0 || self.iteration % freq != 0 {
            return;
        }
        let last_stage = self.rk.num_stages() - 1;
        let residual = diagnostics::local_residual(&self.elements, last_stage, norm);
        diagnostics::report(self.iteration, self.time, &residual);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::basis::PointSet;
    use crate::element::kind::ElementKind;
    use crate::element::state::Equation;
    use crate::face::{BoundaryFace, BoundaryKind, Freestream, InteriorFace, RiemannType, LdgParams, FaceSlots};
    use crate::geometry::Point;
    use crate::operators::build::build_operators;
    use crate::physics::advection_diffusion;
    use std::sync::Arc;

    fn quad(order: usize, nodes: Vec<Point>) -> Element {
        let ops = Arc::new(build_operators(ElementKind::Quad, order, PointSet::GaussLegendre));
        Element::setup(
            ElementKind::Quad,
            order,
            ops,
            nodes,
            vec![Point::zero(); 4],
            Equation::AdvectionDiffusion(advection_diffusion::AdvectionDiffusionParams {
                velocity: Point::new(1.0, 0.3, 0.0),
                diff_d: 0.0,
                lambda: 1.0,
            }),
            false,
        )
    }

    fn unit_quad_nodes(ox: f64) -> Vec<Point> {
        vec![
            Point::new(ox, 0.0, 0.0),
            Point::new(ox + 1.0, 0.0, 0.0),
            Point::new(ox + 1.0, 1.0, 0.0),
            Point::new(ox, 1.0, 0.0),
        ]
    }

    /// A two-element strip closed off with slip-wall-style boundary faces on
    /// every outer edge, driven through a handful of RK44 updates. Nothing
    /// here checks a particular numerical answer; it's a smoke test that the
    /// whole pipeline (extrapolate, flux, divergence, correction, RK stages)
    /// runs to completion without panicking or producing non-finite values.
    #[test]
    fn two_element_strip_runs_several_rk44_steps_without_blowing_up() {
        let mut left = quad(2, unit_quad_nodes(0.0));
        let mut right = quad(2, unit_quad_nodes(1.0));
        for u in left.u_spts.iter_mut().chain(right.u_spts.iter_mut()) {
            u[0] = 1.0;
        }

        let ops = left.ops.clone();
        let left_east: Vec<usize> = (ops.face_offsets[1]..ops.face_offsets[2]).collect();
        let right_west: Vec<usize> = (ops.face_offsets[3]..ops.face_offsets[4]).collect();
        let left_west: Vec<usize> = (ops.face_offsets[3]..ops.face_offsets[4]).collect();
        let left_south: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        let left_north: Vec<usize> = (ops.face_offsets[2]..ops.face_offsets[3]).collect();
        let right_east: Vec<usize> = (ops.face_offsets[1]..ops.face_offsets[2]).collect();
        let right_south: Vec<usize> = (ops.face_offsets[0]..ops.face_offsets[1]).collect();
        let right_north: Vec<usize> = (ops.face_offsets[2]..ops.face_offsets[3]).collect();

        let freestream = Freestream { rho: 1.0, u: 1.0, v: 0.3, w: 0.0, p: 1.0 };
        let riemann = RiemannType::Rusanov;
        let ldg = LdgParams { pen_fact: 1.0, tau: 1.0 };

        let interior = InteriorFace::new(
            FaceSlots { left_fpts: left_east, right_fpts: right_west },
            riemann,
            ldg,
        );
        let b = |slots: Vec<usize>| {
            Face::Boundary(BoundaryFace::new(FaceSlots { left_fpts: slots, right_fpts: vec![] }, BoundaryKind::SupersonicOutflow, freestream, riemann, ldg))
        };

        let faces = vec![
            Face::Interior(interior),
            b(left_west),
            b(left_south),
            b(left_north),
            b(right_east),
            b(right_south),
            b(right_north),
        ];
        let topology = vec![
            FaceTopology { left: 0, right: Some(1) },
            FaceTopology { left: 0, right: None },
            FaceTopology { left: 0, right: None },
            FaceTopology { left: 0, right: None },
            FaceTopology { left: 1, right: None },
            FaceTopology { left: 1, right: None },
            FaceTopology { left: 1, right: None },
        ];

        let mut solver = Solver::new(
            vec![left, right],
            faces,
            topology,
            RkScheme::from_time_scheme(rk::TimeScheme::Rk44),
            DtPolicy::Fixed(1e-3),
            SqueezeConfig { enabled: false, tol: 1e-10, entropy_s0: 1.0 },
            riemann,
            ldg,
            vec![],
            vec![],
        );

        for _ in 0..5 {
            solver.update(None);
        }

        for el in &solver.elements {
            for u in &el.u_spts {
                assert!(u[0].is_finite());
            }
        }
        assert!((solver.time - 5e-3).abs() < 1e-12);
    }
}
