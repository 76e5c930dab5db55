use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender};
use log::error;

/// One message tagged with the RK stage it belongs to. An MPI face's trace
/// exchange (§5, §4.3 step 6) can have messages from a future stage arrive
/// before the local rank has finished the current one; `Orderer` holds
/// those back instead of letting a face consume a stale or premature trace.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub iteration: usize,
    pub data: Vec<u8>,
}

/// Enforces stage ordering on incoming messages: arrivals from a future
/// stage are buffered until the local solver reaches that stage.
pub struct Orderer {
    cur_iteration: Arc<AtomicUsize>,
}

impl Orderer {
    pub fn new(initial_iteration: usize, chan: Receiver<Envelope>) -> (Orderer, Receiver<Vec<u8>>) {
        let cur_iteration = Arc::new(AtomicUsize::new(initial_iteration));
        let (buffer_in, buffer_out): (Sender<Envelope>, Receiver<Envelope>) = crossbeam_channel::unbounded();

        {
            let bc = buffer_in.clone();
            std::thread::spawn(move || {
                for env in chan {
                    bc.send(env).unwrap();
                }
            });
        }

        let (arrival_in, arrival_out) = crossbeam_channel::unbounded();
        {
            let (bic, boc) = (buffer_in.clone(), buffer_out.clone());
            let aic = arrival_in.clone();
            let c_iter = Arc::clone(&cur_iteration);

            std::thread::spawn(move || {
                for env in boc {
                    let c_iter = c_iter.load(Ordering::SeqCst);
                    if env.iteration < c_iter {
                        error!("dropping message from a past stage ({} < {})", env.iteration, c_iter);
                    } else if env.iteration == c_iter {
                        aic.send(env.data).unwrap();
                    } else {
                        bic.send(env).unwrap();
                    }
                }
            });
        }

        (Orderer { cur_iteration }, arrival_out)
    }

    pub fn next_iteration(&mut self) {
        self.cur_iteration.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_iteration(&mut self, i: usize) {
        self.cur_iteration.store(i, Ordering::SeqCst)
    }
}
