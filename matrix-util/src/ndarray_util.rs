pub use ndarray::prelude::*;
pub use rand::distr::StandardUniform;
pub use rand::Rng;
pub use rand_distr::{Distribution, StandardNormal};

use crate::traits::*;
use num_traits::{Float, FromPrimitive};

impl<T> SampleOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive,
{
    type Mat = Self;

    fn runif_using<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((dd, nn), || {
            let x: f64 = StandardUniform.sample(rng);
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }

    fn rnorm_using<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((dd, nn), || {
            let x: f64 = StandardNormal.sample(rng);
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }
}

impl<T> MatOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive,
{
    /// Standardize each column to zero mean and unit variance;
    /// constant columns are only centred
    fn scale_columns_inplace(&mut self) {
        if self.nrows() == 0 {
            return;
        }
        let mu = self.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(self.ncols()));
        let sig = self.std_axis(Axis(0), T::zero());

        for (j, mut x_j) in self.columns_mut().into_iter().enumerate() {
            if sig[j] > T::zero() {
                x_j.mapv_inplace(|x| (x - mu[j]) / sig[j]);
            } else {
                x_j.mapv_inplace(|x| x - mu[j]);
            }
        }
    }
}

impl<T> SelectOps for ndarray::Array2<T>
where
    T: Clone,
{
    type Mat = Self;

    fn select_rows(&self, rows: &[usize]) -> anyhow::Result<Self::Mat> {
        if let Some(&bad) = rows.iter().find(|&&i| i >= self.nrows()) {
            anyhow::bail!("row index {} out of range (nrows = {})", bad, self.nrows());
        }
        Ok(self.select(Axis(0), rows))
    }

    fn select_columns(&self, columns: &[usize]) -> anyhow::Result<Self::Mat> {
        if let Some(&bad) = columns.iter().find(|&&j| j >= self.ncols()) {
            anyhow::bail!(
                "column index {} out of range (ncols = {})",
                bad,
                self.ncols()
            );
        }
        Ok(self.select(Axis(1), columns))
    }
}
