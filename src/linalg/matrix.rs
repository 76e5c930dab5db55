use core::ops::{Index, IndexMut};
use nalgebra::DMatrix;

/// A row-major dense matrix over `f64`, backed by `nalgebra::DMatrix`. Shape
/// is fixed once the matrix is constructed; every operator in `operators/`
/// and every Jacobian in `element/state.rs` is an instance of this type.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    inner: DMatrix<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            inner: DMatrix::zeros(rows, cols),
        }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> f64>(rows: usize, cols: usize, mut f: F) -> Self {
        Self {
            inner: DMatrix::from_fn(rows, cols, |i, j| f(i, j)),
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            inner: DMatrix::identity(n, n),
        }
    }

    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn cols(&self) -> usize {
        self.inner.ncols()
    }

    /// A contiguous, row-major flat layout, matching the spec's assumption
    /// that operators act as dense matrix products over a flat array.
    pub fn as_row_major(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.rows() * self.cols());
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                out.push(self[(i, j)]);
            }
        }
        out
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.cols()).map(|j| self[(i, j)]).collect()
    }

    /// Dense matrix-matrix product; the element operator kernels call this
    /// with small, fixed-size operands so the generic gemm path nalgebra
    /// already provides is sufficient.
    pub fn matmul(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols(),
            other.rows(),
            "matmul shape mismatch: {}x{} * {}x{}",
            self.rows(),
            self.cols(),
            other.rows(),
            other.cols()
        );
        Matrix {
            inner: &self.inner * &other.inner,
        }
    }

    /// Apply this matrix to a column vector.
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(self.cols(), x.len());
        let v = nalgebra::DVector::from_row_slice(x);
        (&self.inner * v).as_slice().to_vec()
    }

    pub fn transpose(&self) -> Matrix {
        Matrix {
            inner: self.inner.transpose(),
        }
    }

    /// Determinant by the standard closed forms for 1x1, 2x2, 3x3 (the only
    /// sizes that arise as geometric Jacobians), falling back to nalgebra's
    /// general cofactor-expansion determinant for anything larger.
    pub fn determinant(&self) -> f64 {
        assert_eq!(self.rows(), self.cols(), "determinant of a non-square matrix");
        match self.rows() {
            0 => 1.0,
            1 => self[(0, 0)],
            2 => self[(0, 0)] * self[(1, 1)] - self[(0, 1)] * self[(1, 0)],
            3 => {
                self[(0, 0)] * (self[(1, 1)] * self[(2, 2)] - self[(1, 2)] * self[(2, 1)])
                    - self[(0, 1)] * (self[(1, 0)] * self[(2, 2)] - self[(1, 2)] * self[(2, 0)])
                    + self[(0, 2)] * (self[(1, 0)] * self[(2, 1)] - self[(1, 1)] * self[(2, 0)])
            }
            _ => self.inner.determinant(),
        }
    }

    fn minor(&self, skip_row: usize, skip_col: usize) -> Matrix {
        let n = self.rows() - 1;
        Matrix::from_fn(n, n, |i, j| {
            let si = if i < skip_row { i } else { i + 1 };
            let sj = if j < skip_col { j } else { j + 1 };
            self[(si, sj)]
        })
    }

    fn cofactor(&self, i: usize, j: usize) -> f64 {
        let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.minor(i, j).determinant()
    }

    /// The matrix of cofactors — the spec's "JGinv", i.e. `det(J) * J^-1`.
    /// For the 2x2 case this is the closed form `[[d, -b], [-c, a]]`; for
    /// larger sizes it is the general cofactor matrix (transposed adjugate).
    pub fn adjoint(&self) -> Matrix {
        assert_eq!(self.rows(), self.cols(), "adjoint of a non-square matrix");
        match self.rows() {
            2 => Matrix::from_fn(2, 2, |i, j| match (i, j) {
                (0, 0) => self[(1, 1)],
                (0, 1) => -self[(1, 0)],
                (1, 0) => -self[(0, 1)],
                (1, 1) => self[(0, 0)],
                _ => unreachable!(),
            }),
            _ => Matrix::from_fn(self.rows(), self.cols(), |i, j| self.cofactor(j, i)),
        }
    }

    pub fn scale(&self, a: f64) -> Matrix {
        Matrix {
            inner: self.inner.scale(a),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.inner[(i, j)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.inner[(i, j)]
    }
}

#[cfg(test)]
mod test {
    use super::Matrix;

    #[test]
    fn determinant_2x2_matches_closed_form() {
        let m = Matrix::from_fn(2, 2, |i, j| [[4.0, 3.0], [6.0, 3.0]][i][j]);
        assert_eq!(m.determinant(), 4.0 * 3.0 - 3.0 * 6.0);
    }

    #[test]
    fn determinant_3x3_identity_is_one() {
        assert_eq!(Matrix::identity(3).determinant(), 1.0);
    }

    #[test]
    fn adjoint_2x2_is_det_times_inverse() {
        let m = Matrix::from_fn(2, 2, |i, j| [[4.0, 3.0], [6.0, 3.0]][i][j]);
        let adj = m.adjoint();
        let prod = m.matmul(&adj);
        let det = m.determinant();
        assert!((prod[(0, 0)] - det).abs() < 1e-12);
        assert!((prod[(1, 1)] - det).abs() < 1e-12);
        assert!(prod[(0, 1)].abs() < 1e-12);
        assert!(prod[(1, 0)].abs() < 1e-12);
    }

    #[test]
    fn adjoint_3x3_is_det_times_inverse() {
        let m = Matrix::from_fn(3, 3, |i, j| {
            ((i * 3 + j) as f64 * 0.37).sin() + (i == j) as i32 as f64 * 2.0
        });
        let adj = m.adjoint();
        let prod = m.matmul(&adj);
        let det = m.determinant();
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { det } else { 0.0 };
                assert!((prod[(i, j)] - expect).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn matmul_respects_identity() {
        let m = Matrix::from_fn(2, 3, |i, j| (i * 3 + j) as f64);
        let i3 = Matrix::identity(3);
        let p = m.matmul(&i3);
        assert_eq!(p, m);
    }
}
