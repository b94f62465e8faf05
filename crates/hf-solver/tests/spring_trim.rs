//! Integration test: trim a spring-mass-damper to a commanded position.
//!
//! States: position, velocity. Action: applied force.
//! Residual: [velocity, acceleration, position - target].

use hf_solver::{Evaluation, LuSolver, SolverResult, TrimConfig, TrimProblem, damped_newton};
use nalgebra::DVector;

struct SpringMass {
    k: f64,
    c: f64,
    m: f64,
    target: f64,
    evaluations: usize,
}

impl TrimProblem for SpringMass {
    fn state_len(&self) -> usize {
        2
    }

    fn action_len(&self) -> usize {
        1
    }

    fn scales(&self) -> DVector<f64> {
        DVector::from_column_slice(&[10.0, 1.0, 100.0])
    }

    fn evaluate(&mut self, x: &DVector<f64>) -> SolverResult<Evaluation> {
        self.evaluations += 1;
        let (pos, vel, force) = (x[0], x[1], x[2]);
        let acc = (force - self.k * pos - self.c * vel) / self.m;
        Ok(Evaluation {
            residual: DVector::from_column_slice(&[vel, acc, pos - self.target]),
            state_dot: DVector::from_column_slice(&[vel, acc]),
            observation: DVector::from_column_slice(&[pos, self.k * pos]),
        })
    }

    fn is_diverged(&self, x: &DVector<f64>) -> bool {
        x[0].abs() > 200.0
    }
}

#[test]
fn spring_reaches_commanded_position() {
    let mut model = SpringMass {
        k: 40.0,
        c: 3.0,
        m: 2.0,
        target: 1.5,
        evaluations: 0,
    };
    let report = damped_newton(
        &mut model,
        DVector::from_column_slice(&[0.0, 0.3, 0.0]),
        &LuSolver,
        &TrimConfig::default(),
    )
    .unwrap();

    assert!(report.converged(), "status {:?}", report.status);
    assert!((report.x[0] - 1.5).abs() < 1e-9);
    assert!(report.x[1].abs() < 1e-9);
    assert!((report.x[2] - 60.0).abs() < 1e-6);
    assert!(report.iterations <= 3);
    assert!(model.evaluations > 0);

    let lin = report.linearization.expect("linearization kept");
    // A = [[0, 1], [-k/m, -c/m]], B = [[0], [1/m]]
    assert!((lin.a[(0, 1)] - 1.0).abs() < 1e-6);
    assert!((lin.a[(1, 0)] + 20.0).abs() < 1e-5);
    assert!((lin.a[(1, 1)] + 1.5).abs() < 1e-5);
    assert!((lin.b[(1, 0)] - 0.5).abs() < 1e-6);
    // C = [[1, 0], [k, 0]], D = 0
    assert!((lin.c[(1, 0)] - 40.0).abs() < 1e-5);
    assert!(lin.d.iter().all(|v| v.abs() < 1e-6));
}
