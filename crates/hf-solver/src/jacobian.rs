//! Central-difference linearization of a trim problem.

use crate::error::{SolverError, SolverResult};
use crate::problem::TrimProblem;
use nalgebra::{DMatrix, DVector};

/// Sensitivities of a model about one operating point.
///
/// `jacobian` is the residual sensitivity to the stacked `[state; action]`
/// vector. `a`/`b` are state-derivative sensitivities to state/action and
/// `c`/`d` are observation sensitivities to state/action.
#[derive(Clone, Debug)]
pub struct Linearization {
    pub jacobian: DMatrix<f64>,
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
    pub c: DMatrix<f64>,
    pub d: DMatrix<f64>,
}

/// Perturb each unknown by `perturbation * scale` in both directions and
/// fill one column of every matrix with the central-difference slope.
pub fn linearize<P>(problem: &mut P, x: &DVector<f64>, perturbation: f64) -> SolverResult<Linearization>
where
    P: TrimProblem + ?Sized,
{
    let ns = problem.state_len();
    let na = problem.action_len();
    let n = ns + na;
    if x.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!("point has {} entries, expected {n}", x.len()),
        });
    }
    let scales = problem.scales();
    if scales.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!("{} scales for {n} unknowns", scales.len()),
        });
    }

    let base = problem.evaluate(x)?;
    let nr = base.residual.len();
    if nr != n {
        return Err(SolverError::ProblemSetup {
            what: format!("residual has {nr} entries but there are {n} unknowns"),
        });
    }
    let nd = base.state_dot.len();
    let no = base.observation.len();

    let mut jacobian = DMatrix::zeros(nr, n);
    let mut a = DMatrix::zeros(nd, ns);
    let mut b = DMatrix::zeros(nd, na);
    let mut c = DMatrix::zeros(no, ns);
    let mut d = DMatrix::zeros(no, na);

    for j in 0..n {
        let scale = if scales[j] > 0.0 { scales[j] } else { 1.0 };
        let dx = perturbation * scale;

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let plus = problem.evaluate(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let minus = problem.evaluate(&x_minus)?;

        let inv = 1.0 / (2.0 * dx);
        jacobian.set_column(j, &((&plus.residual - &minus.residual) * inv));
        let dxdot = (&plus.state_dot - &minus.state_dot) * inv;
        let dobs = (&plus.observation - &minus.observation) * inv;
        if j < ns {
            a.set_column(j, &dxdot);
            c.set_column(j, &dobs);
        } else {
            b.set_column(j - ns, &dxdot);
            d.set_column(j - ns, &dobs);
        }
    }

    Ok(Linearization {
        jacobian,
        a,
        b,
        c,
        d,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Evaluation;

    /// x' = -2x + 3u, y = x^2, residual = [x', x - 1]
    struct Scalar;

    impl TrimProblem for Scalar {
        fn state_len(&self) -> usize {
            1
        }
        fn action_len(&self) -> usize {
            1
        }
        fn scales(&self) -> DVector<f64> {
            DVector::from_element(2, 1.0)
        }
        fn evaluate(&mut self, x: &DVector<f64>) -> SolverResult<Evaluation> {
            let xdot = -2.0 * x[0] + 3.0 * x[1];
            Ok(Evaluation {
                residual: DVector::from_column_slice(&[xdot, x[0] - 1.0]),
                state_dot: DVector::from_element(1, xdot),
                observation: DVector::from_element(1, x[0] * x[0]),
            })
        }
        fn is_diverged(&self, _x: &DVector<f64>) -> bool {
            false
        }
    }

    #[test]
    fn linear_slopes() {
        let x = DVector::from_column_slice(&[3.0, 0.5]);
        let lin = linearize(&mut Scalar, &x, 1e-6).unwrap();
        assert!((lin.jacobian[(0, 0)] + 2.0).abs() < 1e-6);
        assert!((lin.jacobian[(0, 1)] - 3.0).abs() < 1e-6);
        assert!((lin.jacobian[(1, 0)] - 1.0).abs() < 1e-6);
        assert!(lin.jacobian[(1, 1)].abs() < 1e-6);
        assert!((lin.a[(0, 0)] + 2.0).abs() < 1e-6);
        assert!((lin.b[(0, 0)] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn quadratic_observation() {
        // dy/dx = 2x
        let x = DVector::from_column_slice(&[3.0, 0.0]);
        let lin = linearize(&mut Scalar, &x, 1e-6).unwrap();
        assert!((lin.c[(0, 0)] - 6.0).abs() < 1e-5);
        assert!(lin.d[(0, 0)].abs() < 1e-6);
    }

    #[test]
    fn wrong_point_length_is_rejected() {
        let x = DVector::from_column_slice(&[3.0]);
        assert!(matches!(
            linearize(&mut Scalar, &x, 1e-6),
            Err(SolverError::ProblemSetup { .. })
        ));
    }
}
