//! Dense matrix utilities shared across the workspace.

/// Reading and writing (optionally gzipped) text files
pub mod common_io;

/// Delimited text I/O for `ndarray::Array2`
pub mod ndarray_io;

/// Running elementwise statistics over a stream of arrays
pub mod ndarray_stat;

/// Random matrices, column scaling, row/column selection
pub mod ndarray_util;

pub mod traits;
