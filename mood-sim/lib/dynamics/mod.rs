//! Constructs describing the driven, damped mood system and its initial
//! states.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    config::SimParams,
    error::{ SimError, SimResult },
    hilbert::{ Basis, Mood },
};

pub mod coupling;
pub use coupling::{ Channel, Coupling, Trigger, build_couplings };

pub mod hamiltonian;
pub use hamiltonian::{ DrivenTerm, HBuild, HBuilderMood };

pub mod lindbladian;
pub use lindbladian::{ JumpOperator, LOp, LOperatorMood };

pub mod initial;
pub use initial::{ BlendMode, InitialWeights };

/// Maximum number of triggers accepted by a single run.
pub const MAX_TRIGGERS: usize = 5;

/// Everything needed to integrate one run: the time-dependent Hamiltonian,
/// the dissipator, and the initial state.
#[derive(Clone, Debug)]
pub struct MoodModel {
    pub hamiltonian: HBuilderMood,
    pub loperator: LOperatorMood,
    pub weights: InitialWeights,
    pub psi0: nd::Array1<C64>,
    pub rho0: nd::Array2<C64>,
}

impl MoodModel {
    /// Assemble the model from run parameters.
    ///
    /// Only the trigger count is checked here; call [`SimParams::validate`]
    /// for the full set of domain checks.
    pub fn assemble(params: &SimParams) -> SimResult<Self> {
        let triggers = params.resolved_triggers();
        if triggers.len() > MAX_TRIGGERS {
            return Err(SimError::TooManyTriggers(triggers.len()));
        }
        let couplings = build_couplings(&triggers, params.resilience);
        let hamiltonian = HBuilderMood::new(params.g0, couplings);
        let loperator = LOperatorMood::new(
            params.gamma_ug, params.gamma_dg, params.gamma_gg);
        let weights = InitialWeights::from_blend(params.initial_state);
        let psi0 = weights.state_vector(hamiltonian.basis(), params.blend);
        let rho0 = weights.density(hamiltonian.basis(), params.blend);
        debug!(
            g0 = params.g0,
            n_triggers = triggers.len(),
            %weights,
            "assembled mood model"
        );
        Ok(Self { hamiltonian, loperator, weights, psi0, rho0 })
    }

    /// Get a reference to the basis.
    pub fn basis(&self) -> &Basis<Mood> { self.hamiltonian.basis() }

    /// Projectors onto each basis state, in basis order.
    pub fn projectors(&self) -> [nd::Array2<C64>; 3] {
        let basis = self.basis();
        let n = basis.len();
        Mood::ALL.map(|s| {
            basis.get_projector(&s)
                .unwrap_or_else(|| nd::Array2::zeros((n, n)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn assemble_defaults() {
        let params = SimParams::default();
        let model = MoodModel::assemble(&params).unwrap();
        assert_eq!(model.hamiltonian.terms().len(), 3);
        assert_eq!(model.loperator.jumps().len(), 3);
        assert_eq!(model.hamiltonian.trigger_times(), vec![7.0, 14.0, 21.0]);
        assert_abs_diff_eq!(model.rho0[[0, 0]].re, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn default_triggers_use_run_horizon() {
        let params = SimParams::from_toml_str("t_max = 100.0").unwrap();
        let model = MoodModel::assemble(&params).unwrap();
        assert_eq!(model.hamiltonian.trigger_times(), vec![25.0, 50.0, 75.0]);
    }

    #[test]
    fn assemble_rejects_too_many_triggers() {
        let params = SimParams {
            triggers: Some(vec![Trigger::new(1.0, 1.0); MAX_TRIGGERS + 1]),
            ..SimParams::default()
        };
        assert!(matches!(
            MoodModel::assemble(&params),
            Err(SimError::TooManyTriggers(6)),
        ));
    }

    #[test]
    fn projectors_sum_to_identity() {
        let model = MoodModel::assemble(&SimParams::default()).unwrap();
        let total
            = model.projectors().iter()
            .fold(nd::Array2::<C64>::zeros((3, 3)), |acc, p| acc + p);
        assert_eq!(total, nd::Array2::eye(3));
    }
}
