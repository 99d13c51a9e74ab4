//! Dense row-major matrix of `f64`.
//!
//! Arithmetic returns new matrices. Only the row appends mutate in place;
//! they grow the backing `Vec` amortized so a dataset can be built one
//! sample at a time.

use crate::error::{ControllerError, Result};
use crate::systems::sample::{FEATURE_COUNT, Sample};

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, values: vec![0.0; rows * cols] }
    }

    /// Empty matrix with a fixed column count and room for `capacity` rows.
    pub fn with_capacity(cols: usize, capacity: usize) -> Self {
        Self { rows: 0, cols, values: Vec::with_capacity(cols * capacity) }
    }

    /// Build from a row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(ControllerError::ShapeMismatch {
                op: "from_vec",
                left: (rows, cols),
                right: (values.len(), 1),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Single-column vector.
    pub fn column(values: &[f64]) -> Self {
        Self { rows: values.len(), cols: 1, values: values.to_vec() }
    }

    /// One row per sample, one column per feature.
    pub fn features(samples: &[Sample]) -> Self {
        let mut m = Self::with_capacity(FEATURE_COUNT, samples.len());
        for s in samples {
            m.values.extend_from_slice(&s.features);
            m.rows += 1;
        }
        m
    }

    /// Cost column for the same samples.
    pub fn costs(samples: &[Sample]) -> Self {
        Self {
            rows: samples.len(),
            cols: 1,
            values: samples.iter().map(|s| s.cost).collect(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, row: usize) -> Result<&[f64]> {
        if row >= self.rows {
            return Err(self.out_of_range(row, 0));
        }
        Ok(&self.values[row * self.cols..(row + 1) * self.cols])
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        if row >= self.rows || col >= self.cols {
            return Err(self.out_of_range(row, col));
        }
        Ok(self.values[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(self.out_of_range(row, col));
        }
        self.values[row * self.cols + col] = value;
        Ok(())
    }

    /// Matrix product `self * other`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(self.mismatch("multiply", other));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            let lhs = &self.values[i * self.cols..(i + 1) * self.cols];
            for (k, &a) in lhs.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let rhs = &other.values[k * other.cols..(k + 1) * other.cols];
                let dst = &mut out.values[i * other.cols..(i + 1) * other.cols];
                for (d, &b) in dst.iter_mut().zip(rhs) {
                    *d += a * b;
                }
            }
        }
        Ok(out)
    }

    /// Element-wise scale.
    pub fn scale(&self, k: f64) -> Matrix {
        self.map(|v| v * k)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with("add", other, |a, b| a + b)
    }

    pub fn add_scalar(&self, k: f64) -> Matrix {
        self.map(|v| v + k)
    }

    pub fn subtract(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with("subtract", other, |a, b| a - b)
    }

    /// Element-wise power.
    pub fn power(&self, exponent: f64) -> Matrix {
        if exponent == 2.0 {
            self.map(|v| v * v)
        } else {
            self.map(|v| v.powf(exponent))
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.values[j * self.rows + i] = self.values[i * self.cols + j];
            }
        }
        out
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Append one row in place.
    pub fn append_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.cols {
            return Err(ControllerError::ShapeMismatch {
                op: "append_row",
                left: self.shape(),
                right: (1, row.len()),
            });
        }
        self.values.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    /// Append every row of `other` in place.
    pub fn append_rows(&mut self, other: &Matrix) -> Result<()> {
        if other.cols != self.cols {
            return Err(self.mismatch("append_rows", other));
        }
        self.values.extend_from_slice(&other.values);
        self.rows += other.rows;
        Ok(())
    }

    /// Remove and return one row, shifting the rest up.
    pub fn remove_row(&mut self, row: usize) -> Result<Vec<f64>> {
        if row >= self.rows {
            return Err(self.out_of_range(row, 0));
        }
        let start = row * self.cols;
        let removed = self.values.drain(start..start + self.cols).collect();
        self.rows -= 1;
        Ok(removed)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    fn zip_with(&self, op: &'static str, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(self.mismatch(op, other));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().zip(&other.values).map(|(&a, &b)| f(a, b)).collect(),
        })
    }

    fn mismatch(&self, op: &'static str, other: &Matrix) -> ControllerError {
        ControllerError::ShapeMismatch { op, left: self.shape(), right: other.shape() }
    }

    fn out_of_range(&self, row: usize, col: usize) -> ControllerError {
        ControllerError::IndexOutOfRange { row, col, rows: self.rows, cols: self.cols }
    }
}
