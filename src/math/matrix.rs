use rand::prelude::*;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub, Mul};

/// Dense row-major matrix of `f64`.
///
/// Storage is a single flat buffer so that the wide first layer of the image
/// classifier (64·64·3 inputs) stays one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

/// Wire form of `Matrix`, checked before it becomes one.
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = String;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        match raw.rows.checked_mul(raw.cols) {
            Some(n) if n == raw.data.len() => Ok(Matrix { rows: raw.rows, cols: raw.cols, data: raw.data }),
            _ => Err(format!(
                "matrix declares {}x{} but holds {} values",
                raw.rows, raw.cols, raw.data.len()
            )),
        }
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Wraps a flat row-major buffer.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
        assert_eq!(data.len(), rows * cols, "buffer length does not match {}x{}", rows, cols);
        Matrix { rows, cols, data }
    }

    /// A `1 × n` row vector.
    pub fn row_vector(values: Vec<f64>) -> Matrix {
        let cols = values.len();
        Matrix { rows: 1, cols, data: values }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng>(rng: &mut R) -> f64 {
        // (0, 1] keeps ln() finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal(rows: usize, cols: usize, std_dev: f64) -> Matrix {
        let mut rng = rand::thread_rng();
        let data = (0..rows * cols)
            .map(|_| Matrix::sample_standard_normal(&mut rng) * std_dev)
            .collect();
        Matrix { rows, cols, data }
    }

    /// He initialization: N(0, sqrt(2 / fan_in)), where fan_in is `rows`
    /// (weights are laid out input × output).
    pub fn he(rows: usize, cols: usize) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / rows as f64).sqrt())
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / fan_in)).
    pub fn xavier(rows: usize, cols: usize) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / rows as f64).sqrt())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Borrow of row `row` as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        self.assert_same_shape(other);
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a * b).collect(),
        }
    }

    /// `self -= other * scale`, in place.
    pub fn sub_scaled(&mut self, other: &Matrix, scale: f64) {
        self.assert_same_shape(other);
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a -= b * scale;
        }
    }

    /// `self += other`, in place.
    pub fn add_assign(&mut self, other: &Matrix) {
        self.assert_same_shape(other);
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    fn assert_same_shape(&self, other: &Matrix) {
        if self.rows != other.rows || self.cols != other.cols {
            panic!(
                "Matrices are of incorrect sizes: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Add for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: Self) -> Self::Output {
        let mut res = self.clone();
        res.add_assign(rhs);
        res
    }
}

impl Sub for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut res = self.clone();
        res.sub_scaled(rhs, 1.0);
        res
    }
}

impl Mul for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.cols != rhs.rows {
            panic!(
                "Matrices are of incorrect sizes: {}x{} * {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);

        // i-k-j order walks both operands row-wise.
        for i in 0..self.rows {
            let out = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                for (o, b) in out.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }

        res
    }
}
