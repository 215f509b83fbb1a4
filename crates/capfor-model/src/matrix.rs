//! Row-major feature matrix of shape (n_samples, n_features).

use capfor_core::{CapforError, CapforResult};

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Stack feature columns into a matrix. Column order is preserved; it
    /// determines which model importance corresponds to which channel.
    pub fn from_columns(columns: &[Vec<f64>]) -> CapforResult<Self> {
        let first = columns
            .first()
            .ok_or_else(|| CapforError::Other("at least one feature column is required".into()))?;
        let rows = first.len();
        for column in columns {
            if column.len() != rows {
                return Err(CapforError::ShapeMismatch {
                    expected: rows,
                    got: column.len(),
                });
            }
        }
        let cols = columns.len();
        let mut data = vec![0.0; rows * cols];
        for (j, column) in columns.iter().enumerate() {
            for (i, &value) in column.iter().enumerate() {
                data[i * cols + j] = value;
            }
        }
        Ok(Self { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// A new matrix containing the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }
}
