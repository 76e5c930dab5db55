pub mod advection_diffusion;
pub mod error;
pub mod euler2d;
pub mod euler3d;

pub use error::Error;
pub use euler2d::NsParams;
