use crate::common_io::Delimiter;
use rand::Rng;

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    /// Read a delimited matrix, skipping `skip` leading lines if given
    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat>;

    /// Read a delimited matrix whose first line holds column names
    fn read_file_delim_header(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<(Self::Mat, Vec<Box<str>>)>;

    fn from_tsv(tsv_file: &str, skip: Option<usize>) -> anyhow::Result<Self::Mat> {
        Self::read_file_delim(tsv_file, "\t", skip)
    }

    fn write_file_delim(
        &self,
        file: &str,
        delim: &str,
        column_names: Option<&[Box<str>]>,
    ) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t", None)
    }
}

/// Operations to sample random matrices from a caller-supplied
/// random source, so that results are reproducible under a seed
pub trait SampleOps {
    type Mat;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif_using<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm_using<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;
}

/// Standardize columns in place
pub trait MatOps {
    fn scale_columns_inplace(&mut self);
}

/// Take a subset of rows or columns, in the order given
pub trait SelectOps {
    type Mat;

    fn select_rows(&self, rows: &[usize]) -> anyhow::Result<Self::Mat>;
    fn select_columns(&self, columns: &[usize]) -> anyhow::Result<Self::Mat>;
}

/// Accumulate elementwise statistics over a stream of arrays
pub trait RunningStatOps<T> {
    type Output;

    fn clear(&mut self);
    fn count(&self) -> Self::Output;
    fn mean(&self) -> Self::Output;
    fn variance(&self) -> Self::Output;
    fn std(&self) -> Self::Output;
}
