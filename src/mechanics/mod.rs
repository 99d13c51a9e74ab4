pub mod control;
pub mod matrix;
pub mod stoch;

pub use control::*;
pub use matrix::Matrix;
