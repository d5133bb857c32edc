use crate::common_io::{read_lines_of_words_delim, write_lines, Delimiter};
use crate::traits::IoOps;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::fmt::{Debug, Display};
use std::str::FromStr;

fn parse_rows<T>(lines_of_words: Vec<Vec<Box<str>>>, file: &str) -> anyhow::Result<Array2<T>>
where
    T: FromStr + Send,
    <T as FromStr>::Err: Debug,
{
    if lines_of_words.is_empty() {
        return Err(anyhow::anyhow!("No data in file {}", file));
    }

    let nrows = lines_of_words.len();
    let ncols = lines_of_words[0].len();

    if let Some(i) = lines_of_words.iter().position(|w| w.len() != ncols) {
        anyhow::bail!(
            "{}: row {} has {} fields, expected {}",
            file,
            i,
            lines_of_words[i].len(),
            ncols
        );
    }

    let rows = lines_of_words
        .par_iter()
        .enumerate()
        .map(|(i, words)| {
            words
                .iter()
                .map(|v| {
                    v.parse::<T>()
                        .map_err(|e| anyhow::anyhow!("{}: row {}, `{}`: {:?}", file, i, v, e))
                })
                .collect::<anyhow::Result<Vec<T>>>()
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let data = rows.into_iter().flatten().collect::<Vec<_>>();
    Ok(Array2::from_shape_vec((nrows, ncols), data)?)
}

impl<T> IoOps for Array2<T>
where
    T: FromStr + Send + Sync + Display,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let hdr_line = match skip {
            Some(skip) if skip > 0 => skip as i64 - 1,
            _ => -1, // no skipping
        };
        let out = read_lines_of_words_delim(file, delim, hdr_line)?;
        parse_rows(out.lines, file)
    }

    fn read_file_delim_header(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<(Self::Mat, Vec<Box<str>>)> {
        let out = read_lines_of_words_delim(file, delim, 0)?;
        let mat: Array2<T> = parse_rows(out.lines, file)?;
        if out.header.len() != mat.ncols() {
            anyhow::bail!(
                "{}: header has {} names but the data have {} columns",
                file,
                out.header.len(),
                mat.ncols()
            );
        }
        Ok((mat, out.header))
    }

    fn write_file_delim(
        &self,
        file: &str,
        delim: &str,
        column_names: Option<&[Box<str>]>,
    ) -> anyhow::Result<()> {
        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.nrows() + 1);

        if let Some(names) = column_names {
            if names.len() != self.ncols() {
                anyhow::bail!(
                    "{} column names for a matrix with {} columns",
                    names.len(),
                    self.ncols()
                );
            }
            lines.push(names.join(delim).into_boxed_str());
        }

        lines.extend(self.rows().into_iter().map(|row| {
            row.iter()
                .map(|x| format!("{}", *x))
                .collect::<Vec<String>>()
                .join(delim)
                .into_boxed_str()
        }));

        write_lines(&lines, file)
    }
}
