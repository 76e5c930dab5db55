//! A minimal message-passing layer (§5, §6: "parallel message transport" is
//! out of scope beyond its interface) encapsulated by the `Communicator`
//! trait. Implementors only need `send`/`recv` for a given transport; the
//! trait supplies broadcast/reduce/all-reduce on top, which is all the
//! `MPI_Allreduce` calls for the global-CFL dt and the residual/error norms
//! need. `orderer` additionally buffers out-of-stage MPI-face messages so a
//! fast rank can't consume a trace meant for a later RK stage.

mod backoff;
pub mod comm;
pub mod orderer;
pub mod tcp;
pub mod util;
