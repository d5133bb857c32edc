pub use log::{debug, info, warn};
pub use ndarray::prelude::*;
pub use ndarray::Zip;
pub use rand::Rng;
pub use rand_distr::{Distribution, StandardNormal};

/// Dense real matrix; every weight, activation, and data matrix
pub type Mat = Array2<f64>;
