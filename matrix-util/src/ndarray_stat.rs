use crate::common_io::write_lines;
use crate::traits::RunningStatOps;
use ndarray::{ArrayBase, Axis, Data, Dimension, OwnedRepr, RemoveAxis, Zip};

/// A container to keep track of elementwise first and second moments
/// over a stream of arrays of the same shape
///
/// Moments are updated with Welford's recurrence, so a stream of
/// identical arrays has exactly that array as its mean and an exact
/// zero variance. Non-finite entries are skipped per element.
///
/// # Type parameters
/// - `S` : The shape of the array
///
#[derive(Clone)]
pub struct RunningStatistics<S>
where
    S: Dimension + RemoveAxis,
{
    n: ArrayBase<OwnedRepr<f64>, S>,
    mu: ArrayBase<OwnedRepr<f64>, S>,
    m2: ArrayBase<OwnedRepr<f64>, S>,
}

impl<S> RunningStatistics<S>
where
    S: Dimension + RemoveAxis,
{
    /// Create a new RunningStatistics object
    ///
    /// # Examples
    ///
    /// ```
    /// use matrix_util::ndarray_stat::RunningStatistics;
    /// use ndarray::Ix2;
    /// RunningStatistics::new(Ix2(3, 4));
    /// ```
    ///
    pub fn new(shape: S) -> Self {
        RunningStatistics {
            n: ArrayBase::zeros(shape.clone()),
            mu: ArrayBase::zeros(shape.clone()),
            m2: ArrayBase::zeros(shape),
        }
    }

    pub fn add<V>(&mut self, xx: &ArrayBase<V, S>) -> anyhow::Result<()>
    where
        V: Data<Elem = f64>,
    {
        if xx.shape() != self.n.shape() {
            anyhow::bail!(
                "shape mismatch: {:?} vs. {:?}",
                xx.shape(),
                self.n.shape()
            );
        }

        Zip::from(&mut self.n)
            .and(&mut self.mu)
            .and(&mut self.m2)
            .and(xx)
            .for_each(|n, mu, m2, &x| {
                if x.is_finite() {
                    *n += 1.0;
                    let delta = x - *mu;
                    *mu += delta / *n;
                    *m2 += delta * (x - *mu);
                }
            });
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        self.n.shape()
    }

    /// One line per slice along the first axis, `name` followed by
    /// `mu` and `sig` of each element in the slice
    pub fn to_string_vec(&self, names: &[Box<str>], sep: &str) -> anyhow::Result<Vec<Box<str>>> {
        if names.len() != self.shape()[0] {
            anyhow::bail!(
                "The number of names does not match the number of the first dimension of the statistics"
            );
        }

        let mu = self.mean();
        let sig = self.std();

        Ok(mu
            .axis_iter(Axis(0))
            .zip(sig.axis_iter(Axis(0)))
            .zip(names.iter())
            .map(|((m, s), name)| {
                let mut fields = vec![name.to_string()];
                for (mv, sv) in m.iter().zip(s.iter()) {
                    fields.push(format!("{:.6}", mv));
                    fields.push(format!("{:.6}", sv));
                }
                fields.join(sep).into_boxed_str()
            })
            .collect())
    }

    /// Save the statistics to a text file (gzipped if `.gz`)
    pub fn save(&self, filename: &str, names: &[Box<str>], sep: &str) -> anyhow::Result<()> {
        let mut out = self.to_string_vec(names, sep)?;
        out.insert(0, format!("#name{}mu{}sig", sep, sep).into_boxed_str());
        write_lines(&out, filename)
    }
}

impl<S> RunningStatOps<f64> for RunningStatistics<S>
where
    S: Dimension + RemoveAxis,
{
    type Output = ArrayBase<OwnedRepr<f64>, S>;

    fn clear(&mut self) {
        self.n.fill(0.0);
        self.mu.fill(0.0);
        self.m2.fill(0.0);
    }

    fn count(&self) -> Self::Output {
        self.n.clone()
    }

    fn mean(&self) -> Self::Output {
        self.mu.clone()
    }

    /// Population variance (divided by the number of finite values)
    fn variance(&self) -> Self::Output {
        let mut var = self.m2.clone();
        Zip::from(&mut var).and(&self.n).for_each(|v, &n| {
            *v = if n > 0.0 { (*v / n).max(0.0) } else { 0.0 };
        });
        var
    }

    fn std(&self) -> Self::Output {
        self.variance().mapv(f64::sqrt)
    }
}
