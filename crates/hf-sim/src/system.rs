//! DynamicSystem: owns the spaces of one model and drives it.

use crate::error::{SimError, SimResult};
use crate::integrator::{Rk4, STAGE_FRACTIONS};
use crate::model::{DynamicModel, EvalMode, Registrar};
use hf_core::{EPS, NORM_LIMIT, Real, Space};
use hf_solver::{
    Evaluation, LinearSolver, LuSolver, SolverError, SolverResult, TrimConfig, TrimProblem,
    TrimReport, damped_newton,
};
use nalgebra::DVector;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

/// Engine tuning.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Normalized magnitude beyond which the state counts as diverged
    pub norm_limit: Real,
    pub trim: TrimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            norm_limit: NORM_LIMIT,
            trim: TrimConfig::default(),
        }
    }
}

/// A model plus the spaces, RK4 scratch and readiness bookkeeping around it.
///
/// `ready` starts false, becomes true after a successful trim (or a reset
/// for models without a trim residual) and drops back to false as soon as a
/// live write to the state space leaves the normalized limit. A system that
/// is not ready must be reset before stepping again.
pub struct DynamicSystem<M: DynamicModel> {
    model: M,
    dt: Real,
    config: EngineConfig,

    state: Space,
    state_dot: Space,
    action: Space,
    observation: Space,
    state0: Space,
    action0: Space,
    stages: [Space; 4],

    ready: bool,
    trimming: bool,
    rng: StdRng,
    solver: Box<dyn LinearSolver + Send + Sync>,
    last_trim: Option<TrimReport>,
}

impl<M: DynamicModel> DynamicSystem<M> {
    pub fn new(model: M, dt: Real) -> SimResult<Self> {
        Self::with_config(model, dt, EngineConfig::default())
    }

    pub fn with_config(mut model: M, dt: Real, config: EngineConfig) -> SimResult<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }

        let mut state = Space::new("State");
        let mut action = Space::new("Action");
        let mut observation = Space::new("Observation");
        {
            let mut reg = Registrar {
                state: &mut state,
                action: &mut action,
                observation: &mut observation,
            };
            model.register_states(&mut reg)?;
            model.register_actions(&mut reg)?;
            model.register_observations(&mut reg)?;
        }
        if let Some(expected) = model.observation_count() {
            if expected != observation.len() {
                return Err(SimError::Model {
                    what: format!(
                        "model declares {expected} observations but registered {}",
                        observation.len()
                    ),
                });
            }
        }
        let residual_len = model.trim_residual_len();
        if residual_len != 0 && residual_len != state.len() + action.len() {
            return Err(SimError::Model {
                what: format!(
                    "trim residual has {residual_len} entries for {} states and {} actions",
                    state.len(),
                    action.len()
                ),
            });
        }

        for space in [&mut state, &mut action, &mut observation] {
            space.set_limit(config.norm_limit);
        }
        state.set_guarded(true);

        let mut state_dot = state.scaled(1.0);
        state_dot.fill_zero();
        let state0 = state.scaled(1.0);
        let action0 = action.scaled(1.0);
        let stages = [
            state_dot.clone(),
            state_dot.clone(),
            state_dot.clone(),
            state_dot.clone(),
        ];

        model.precompute()?;
        info!(
            states = state.len(),
            actions = action.len(),
            observations = observation.len(),
            dt,
            "dynamic system created"
        );

        Ok(Self {
            model,
            dt,
            config,
            state,
            state_dot,
            action,
            observation,
            state0,
            action0,
            stages,
            ready: false,
            trimming: false,
            rng: StdRng::from_entropy(),
            solver: Box::new(LuSolver),
            last_trim: None,
        })
    }

    /// Replace the dense solve used by the trim.
    pub fn with_solver(mut self, solver: Box<dyn LinearSolver + Send + Sync>) -> Self {
        self.solver = solver;
        self
    }

    /// Reseed the noise generator for reproducible runs.
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn set_dt(&mut self, dt: Real) -> SimResult<()> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        self.dt = dt;
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_trimming(&self) -> bool {
        self.trimming
    }

    pub fn state(&self) -> &Space {
        &self.state
    }

    pub fn state_dot(&self) -> &Space {
        &self.state_dot
    }

    pub fn action(&self) -> &Space {
        &self.action
    }

    pub fn observation(&self) -> &Space {
        &self.observation
    }

    pub fn observation_count(&self) -> usize {
        self.observation.len()
    }

    pub fn last_trim(&self) -> Option<&TrimReport> {
        self.last_trim.as_ref()
    }

    /// Write one state sub-vector. Divergence clears readiness.
    pub fn set_state(&mut self, name: &str, values: &[Real]) -> SimResult<()> {
        self.state.set(name, values)?;
        self.refresh_ready();
        Ok(())
    }

    pub fn set_action(&mut self, name: &str, values: &[Real]) -> SimResult<()> {
        self.action.set(name, values)?;
        Ok(())
    }

    pub fn parameter(&self, node: &str, field: &str) -> SimResult<Real> {
        self.model.parameter(node, field)
    }

    /// Change one parameter and refresh the model's derived constants.
    pub fn set_parameter(&mut self, node: &str, field: &str, value: Real) -> SimResult<()> {
        self.model.set_parameter(node, field, value)?;
        self.model.precompute()
    }

    fn refresh_ready(&mut self) {
        if self.state.take_tripped() && !self.trimming {
            if self.ready {
                warn!("state diverged, system needs a reset");
            }
            self.ready = false;
        }
    }

    fn evaluate_stage(&mut self, index: usize) -> SimResult<()> {
        self.model.load_states(&self.state)?;
        self.model.dynamics(EvalMode::Step)?;
        self.model.store_state_dots(&mut self.state_dot)?;
        self.stages[index].assign(&self.state_dot)?;
        Ok(())
    }

    /// Advance one timestep with `action`. Returns readiness afterwards.
    ///
    /// The step stops after the first stage that leaves the state diverged;
    /// the spaces then hold whatever that stage produced.
    pub fn step(&mut self, action: &[Real]) -> SimResult<bool> {
        self.action.assign_values(action)?;
        self.model.load_actions(&self.action)?;
        self.model.pre_step(self.dt, &mut self.rng);
        self.model.store_actions(&mut self.action)?;

        self.state0.assign(&self.state)?;

        self.evaluate_stage(0)?;
        self.refresh_ready();
        if !self.ready {
            return Ok(false);
        }

        for (i, fraction) in STAGE_FRACTIONS.iter().enumerate() {
            let next = Rk4::advance(&self.state0, &self.stages[i], fraction * self.dt)?;
            self.state.assign(&next)?;
            self.refresh_ready();
            if !self.ready {
                return Ok(false);
            }
            self.evaluate_stage(i + 1)?;
        }

        let slope = Rk4::slope(&self.stages)?;
        let next = Rk4::advance(&self.state0, &slope, self.dt)?;
        self.state.assign(&next)?;
        self.state_dot.assign(&Rk4::rate(&self.stages)?)?;

        self.model.load_states(&self.state)?;
        self.model.post_step();
        self.model.store_states(&mut self.state)?;
        self.refresh_ready();
        if !self.ready {
            return Ok(false);
        }

        self.model.store_observations(&mut self.observation)?;
        Ok(true)
    }

    /// Return to defaults, let the model randomize, then trim.
    pub fn reset(&mut self) -> SimResult<bool> {
        self.ready = false;
        self.model.precompute()?;

        self.state.set_guarded(false);
        self.state.to_default();
        self.state.set_guarded(true);
        self.state.take_tripped();
        self.state_dot.fill_zero();
        self.action.to_default();
        self.observation.to_default();

        self.model.load_states(&self.state)?;
        self.model.load_actions(&self.action)?;
        self.model.on_reset(&mut self.rng)?;
        self.model.pre_step(self.dt, &mut self.rng);

        if self.model.trim_residual_len() == 0 {
            self.model.dynamics(EvalMode::Step)?;
            self.model.store_state_dots(&mut self.state_dot)?;
            self.model.store_observations(&mut self.observation)?;
            self.ready = !self.state.is_diverged();
        } else {
            self.trim()?;
        }
        info!(ready = self.ready, "system reset");
        Ok(self.ready)
    }

    /// Search for an equilibrium from the current state and action.
    ///
    /// The accepted point becomes the new baseline whether or not it
    /// converged; readiness is set only on convergence.
    pub fn trim(&mut self) -> SimResult<&TrimReport> {
        let ns = self.state.len();
        let na = self.action.len();
        if self.model.trim_residual_len() == 0 {
            return Err(SimError::InvalidArg {
                what: "model has no trim residual",
            });
        }

        self.ready = false;
        self.trimming = true;
        self.state.set_guarded(false);
        self.state0.assign(&self.state)?;
        self.action0.assign(&self.action)?;

        let mut x0 = DVector::zeros(ns + na);
        x0.rows_mut(0, ns).copy_from(self.state.values());
        x0.rows_mut(ns, na).copy_from(self.action.values());

        let result = {
            let mut session = TrimSession {
                model: &mut self.model,
                state: &mut self.state,
                action: &mut self.action,
                state_dot: &mut self.state_dot,
                observation: &mut self.observation,
                limit: self.config.norm_limit,
            };
            damped_newton(&mut session, x0, self.solver.as_ref(), &self.config.trim)
                .and_then(|report| session.evaluate(&report.x).map(|_| report))
        };

        self.trimming = false;
        self.state.set_guarded(true);
        self.state.take_tripped();

        let report = match result {
            Ok(report) => report,
            Err(SolverError::Model { what }) => return Err(SimError::Model { what }),
            Err(e) => return Err(e.into()),
        };

        self.model.store_state_dots(&mut self.state_dot)?;
        self.model.store_observations(&mut self.observation)?;
        self.ready = report.converged() && !self.state.is_diverged();

        if self.ready {
            info!(iterations = report.iterations, cost = report.cost, "trim converged");
        } else {
            warn!(
                status = ?report.status,
                iterations = report.iterations,
                cost = report.cost,
                "trim left the system not ready"
            );
        }
        let report = self.last_trim.insert(report);
        Ok(&*report)
    }

    /// Trim residual at the current state and action, without moving either.
    pub fn trim_residual(&mut self) -> SimResult<DVector<Real>> {
        let n = self.model.trim_residual_len();
        let mut out = DVector::zeros(n);
        self.model.load_states(&self.state)?;
        self.model.load_actions(&self.action)?;
        self.model.dynamics(EvalMode::Trim)?;
        self.model.trim_residual(out.as_mut_slice())?;
        debug!(cost = out.norm_squared(), "trim residual evaluated");
        Ok(out)
    }
}

/// Mutable view of an engine exposed to the trim solver.
struct TrimSession<'a, M: DynamicModel> {
    model: &'a mut M,
    state: &'a mut Space,
    action: &'a mut Space,
    state_dot: &'a mut Space,
    observation: &'a mut Space,
    limit: Real,
}

impl<M: DynamicModel> TrimSession<'_, M> {
    fn run(&mut self, x: &DVector<Real>) -> Result<Evaluation, SimError> {
        let ns = self.state.len();
        self.state.assign_values(&x.as_slice()[..ns])?;
        self.action.assign_values(&x.as_slice()[ns..])?;
        self.model.load_states(self.state)?;
        self.model.load_actions(self.action)?;
        self.model.dynamics(EvalMode::Trim)?;
        self.model.store_state_dots(self.state_dot)?;
        self.model.store_observations(self.observation)?;

        let mut residual = DVector::zeros(self.model.trim_residual_len());
        self.model.trim_residual(residual.as_mut_slice())?;
        Ok(Evaluation {
            residual,
            state_dot: self.state_dot.values().clone(),
            observation: self.observation.values().clone(),
        })
    }
}

impl<M: DynamicModel> TrimProblem for TrimSession<'_, M> {
    fn state_len(&self) -> usize {
        self.state.len()
    }

    fn action_len(&self) -> usize {
        self.action.len()
    }

    fn scales(&self) -> DVector<Real> {
        let ns = self.state.len();
        let na = self.action.len();
        let mut scales = DVector::zeros(ns + na);
        scales
            .rows_mut(0, ns)
            .copy_from(&self.state.normalizer().map(|k| k + EPS));
        scales
            .rows_mut(ns, na)
            .copy_from(&self.action.normalizer().map(|k| k + EPS));
        scales
    }

    fn evaluate(&mut self, x: &DVector<Real>) -> SolverResult<Evaluation> {
        self.run(x).map_err(|e| SolverError::Model {
            what: e.to_string(),
        })
    }

    fn is_diverged(&self, x: &DVector<Real>) -> bool {
        let ns = self.state.len();
        x.rows(0, ns)
            .iter()
            .zip(self.state.normalizer().iter())
            .any(|(v, k)| !((v / (k + EPS)).abs() <= self.limit))
    }
}
