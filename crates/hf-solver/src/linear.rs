//! Dense linear solve behind a swappable interface.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

pub trait LinearSolver {
    /// Solve `a * x = b`.
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> SolverResult<DVector<f64>>;
}

/// Partial-pivot LU decomposition.
#[derive(Clone, Copy, Debug, Default)]
pub struct LuSolver;

impl LinearSolver for LuSolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> SolverResult<DVector<f64>> {
        if !a.is_square() || a.nrows() != b.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "linear system is {}x{} with rhs of length {}",
                    a.nrows(),
                    a.ncols(),
                    b.len()
                ),
            });
        }
        a.clone()
            .lu()
            .solve(b)
            .ok_or_else(|| SolverError::Numeric {
                what: "Jacobian solve failed".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_column_slice(&[3.0, 5.0]);
        let x = LuSolver.solve(&a, &b).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_fails() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_column_slice(&[1.0, 1.0]);
        assert!(matches!(
            LuSolver.solve(&a, &b),
            Err(SolverError::Numeric { .. })
        ));
    }

    #[test]
    fn shape_mismatch_fails() {
        let a = DMatrix::zeros(2, 3);
        let b = DVector::zeros(2);
        assert!(matches!(
            LuSolver.solve(&a, &b),
            Err(SolverError::ProblemSetup { .. })
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lu_solves_diagonally_dominant_systems(
            entries in prop::collection::vec(-1.0_f64..1.0, 16),
            rhs in prop::collection::vec(-100.0_f64..100.0, 4),
        ) {
            let mut a = DMatrix::from_row_slice(4, 4, &entries);
            for i in 0..4 {
                a[(i, i)] += 5.0_f64.copysign(a[(i, i)]);
            }
            let b = DVector::from_vec(rhs);
            let x = LuSolver.solve(&a, &b).unwrap();
            prop_assert!((&a * &x - &b).norm() < 1e-9 * (1.0 + b.norm()));
        }
    }
}
