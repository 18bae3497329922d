//! Small numeric helpers

mod index_range;
mod real3d;
mod tensor;

pub use index_range::*;
pub use real3d::*;
pub use tensor::*;
