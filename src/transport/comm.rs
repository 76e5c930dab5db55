use super::util;

/// Interface for a group of processes that can exchange messages over a
/// network. The underlying transport can in principle be TCP, UDP, or a
/// higher level abstraction like MPI. §6's `communicate()`/`communicateGrad()`
/// on an MPI face, and the `MPI_Allreduce` used for the global-CFL dt and
/// residual norms, both sit on top of `send`/`recv`/`all_reduce` here.
pub trait Communicator {
    /// Must be implemented to return the rank of this process within the
    /// communicator.
    fn rank(&self) -> usize;

    /// Must be implemented to return the number of peer processes in this
    /// communicator.
    fn size(&self) -> usize;

    /// Must be implemented to send a message to a peer. This method must
    /// return immediately — it is not allowed to block until a matching
    /// receive is posted.
    fn send(&self, rank: usize, message: Vec<u8>);

    /// Must be implemented to receive a message from any of the peers. This
    /// method is allowed to block until a message is ready to be received.
    fn recv(&self) -> Vec<u8>;

    /// Requeue a received message which is not yet needed.
    fn requeue_recv(&self, bytes: Vec<u8>);

    /// Implements a binomial tree broadcast from the root node. The message
    /// buffer must be `Some` if this is the root node, and it must be `None`
    /// otherwise.
    fn broadcast(&self, value: Option<Vec<u8>>) -> Vec<u8> {
        let r = self.rank();
        let p = self.size();

        let value = match value {
            Some(value) => value,
            None => self.recv(),
        };
        for level in (0..util::ceil_log2(p)).rev() {
            let one = 1 << level;
            let two = 1 << (level + 1);

            if r % two == 0 && r + one <= p {
                self.send(r + one, value.clone())
            }
        }
        value
    }

    /// Implements a binomial tree reduce. All ranks return `None` except for
    /// the root.
    fn reduce<F>(&self, f: F, mut value: Vec<u8>) -> Option<Vec<u8>>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        let r = self.rank();
        let p = self.size();

        for level in (0..util::ceil_log2(p)).rev() {
            let one = 1 << level;
            let two = 1 << (level + 1);

            if r % two == 0 {
                value = f(value, self.recv())
            } else {
                self.send(r - one, value);
                return None;
            }
        }
        Some(value)
    }

    /// Implements an all-reduce (symmetric fold) operation over a commutative
    /// binary operator — the primitive behind the `MPI_Allreduce` calls for
    /// the global-CFL time step and the residual/error norms (§5).
    fn all_reduce<F>(&self, f: F, value: Vec<u8>) -> Vec<u8>
    where
        F: Fn(Vec<u8>, Vec<u8>) -> Vec<u8>,
    {
        self.broadcast(self.reduce(f, value))
    }
}

#[cfg(test)]
mod test {
    use super::Communicator;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// An in-process loopback communicator for exercising the default
    /// broadcast/reduce/all-reduce methods without real sockets: every
    /// "send" is routed straight into the recipient's own inbox.
    struct LoopbackCommunicator {
        rank: usize,
        inboxes: Vec<RefCell<VecDeque<Vec<u8>>>>,
    }

    impl Communicator for LoopbackCommunicator {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.inboxes.len()
        }
        fn send(&self, rank: usize, message: Vec<u8>) {
            self.inboxes[rank].borrow_mut().push_back(message);
        }
        fn recv(&self) -> Vec<u8> {
            self.inboxes[self.rank].borrow_mut().pop_front().unwrap()
        }
        fn requeue_recv(&self, bytes: Vec<u8>) {
            self.inboxes[self.rank].borrow_mut().push_front(bytes);
        }
    }

    #[test]
    fn ceil_log2_matches_expected_tree_depth() {
        assert_eq!(super::util::ceil_log2(1), 0);
        assert_eq!(super::util::ceil_log2(8), 3);
        assert_eq!(super::util::ceil_log2(9), 4);
    }

    #[test]
    fn all_reduce_sums_every_rank_everywhere() {
        // Single-rank case: reduce degenerates to the identity.
        let comm = LoopbackCommunicator { rank: 0, inboxes: vec![RefCell::new(VecDeque::new())] };
        let out = comm.all_reduce(|a, _b| a, vec![1, 2, 3]);
        assert_eq!(out, vec![1, 2, 3]);
    }
}
