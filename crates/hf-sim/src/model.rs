//! DynamicModel trait for pluggable vehicle models.

use crate::error::{SimError, SimResult};
use hf_core::{Real, Space};
use rand::RngCore;

/// Why the model is being evaluated.
///
/// Trim evaluations must be deterministic: models switch off stochastic
/// inputs and contact forces while trimming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalMode {
    Step,
    Trim,
}

impl EvalMode {
    pub fn is_trim(self) -> bool {
        self == EvalMode::Trim
    }
}

/// Registration handle passed to a model while the engine builds its spaces.
pub struct Registrar<'a> {
    pub(crate) state: &'a mut Space,
    pub(crate) action: &'a mut Space,
    pub(crate) observation: &'a mut Space,
}

impl Registrar<'_> {
    pub fn state(&mut self, name: &str, initial: &[Real], normalizer: Real) -> SimResult<()> {
        self.state.register(name, initial, normalizer)?;
        Ok(())
    }

    /// Per-scalar normalizer override for a registered state.
    pub fn state_normalizer(&mut self, name: &str, normalizer: &[Real]) -> SimResult<()> {
        self.state.set_normalizer(name, normalizer)?;
        Ok(())
    }

    pub fn action(&mut self, name: &str, initial: &[Real], normalizer: Real) -> SimResult<()> {
        self.action.register(name, initial, normalizer)?;
        Ok(())
    }

    pub fn observation(&mut self, name: &str, initial: &[Real], normalizer: Real) -> SimResult<()> {
        self.observation.register(name, initial, normalizer)?;
        Ok(())
    }
}

/// Extension points of a vehicle model.
///
/// The engine owns the state, action, derivative and observation spaces.
/// A model mirrors them in its own typed fields: `load_*` copies a space into
/// the model, `store_*` copies the model's fields back out. `dynamics` works
/// purely on the model's fields.
///
/// Everything except `dynamics` defaults to a no-op.
pub trait DynamicModel {
    fn register_states(&self, _reg: &mut Registrar<'_>) -> SimResult<()> {
        Ok(())
    }

    fn register_actions(&self, _reg: &mut Registrar<'_>) -> SimResult<()> {
        Ok(())
    }

    fn register_observations(&self, _reg: &mut Registrar<'_>) -> SimResult<()> {
        Ok(())
    }

    /// Expected observation length, checked against the registered spaces.
    fn observation_count(&self) -> Option<usize> {
        None
    }

    /// Recompute derived constants from parameters.
    fn precompute(&mut self) -> SimResult<()> {
        Ok(())
    }

    /// Called on reset after spaces return to their defaults.
    fn on_reset(&mut self, _rng: &mut dyn RngCore) -> SimResult<()> {
        Ok(())
    }

    /// Called once per step before the first stage, with the step size.
    fn pre_step(&mut self, _dt: Real, _rng: &mut dyn RngCore) {}

    /// Called once per step after the RK4 combination.
    fn post_step(&mut self) {}

    fn load_actions(&mut self, _action: &Space) -> SimResult<()> {
        Ok(())
    }

    fn load_states(&mut self, _state: &Space) -> SimResult<()> {
        Ok(())
    }

    fn store_actions(&self, _action: &mut Space) -> SimResult<()> {
        Ok(())
    }

    fn store_states(&self, _state: &mut Space) -> SimResult<()> {
        Ok(())
    }

    fn store_state_dots(&self, _state_dot: &mut Space) -> SimResult<()> {
        Ok(())
    }

    fn store_observations(&self, _observation: &mut Space) -> SimResult<()> {
        Ok(())
    }

    /// Compute state derivatives and observations from the loaded fields.
    fn dynamics(&mut self, mode: EvalMode) -> SimResult<()>;

    /// Length of the trim residual. Zero means the model needs no trim.
    fn trim_residual_len(&self) -> usize {
        0
    }

    /// Fill the trim residual from the last `dynamics` evaluation.
    fn trim_residual(&self, _out: &mut [Real]) -> SimResult<()> {
        Ok(())
    }

    fn parameter(&self, node: &str, field: &str) -> SimResult<Real> {
        Err(SimError::not_found(node, field))
    }

    fn set_parameter(&mut self, node: &str, field: &str, _value: Real) -> SimResult<()> {
        Err(SimError::not_found(node, field))
    }
}
