//! The end-to-end pipeline: validate parameters, assemble the model, integrate
//! and collect populations.

use ndarray as nd;
use tracing::{ debug, info, warn };
use crate::{
    config::SimParams,
    dynamics::{ HBuild, MoodModel, Trigger },
    error::SimResult,
    hilbert::Mood,
    solve::{ StepStats, expectation, lindblad::evolve_adaptive_reduced_op },
};

// populations summing further than this from 1 are reported
const NORM_DRIFT_WARN: f64 = 1e-4;

/// Populations of the three mood states over the output grid.
///
/// All sequences are paired index-wise with `times`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    pub times: Vec<f64>,
    pub p_neutral: Vec<f64>,
    pub p_euphoric: Vec<f64>,
    pub p_depressive: Vec<f64>,
    /// Triggers of the run, in input order, for marking on plots.
    pub triggers: Vec<Trigger>,
    /// Integrator work counters.
    pub stats: StepStats,
}

impl SimulationResult {
    /// Number of output points.
    pub fn len(&self) -> usize { self.times.len() }

    /// Return `true` if there are no output points.
    pub fn is_empty(&self) -> bool { self.times.is_empty() }

    /// Population curve of a single state.
    pub fn population(&self, state: Mood) -> &[f64] {
        match state {
            Mood::Neutral => &self.p_neutral,
            Mood::Euphoric => &self.p_euphoric,
            Mood::Depressive => &self.p_depressive,
        }
    }

    /// Sum of the three populations at every output time.
    pub fn total(&self) -> Vec<f64> {
        self.p_neutral.iter()
            .zip(self.p_euphoric.iter())
            .zip(self.p_depressive.iter())
            .map(|((g, u), d)| g + u + d)
            .collect()
    }

    /// Largest deviation of the summed populations from 1.
    ///
    /// The integrator does not renormalize, so this measures its accumulated
    /// trace error.
    pub fn population_drift(&self) -> f64 {
        self.total().iter()
            .map(|s| (s - 1.0).abs())
            .fold(0.0, f64::max)
    }

    /// Populations at the last output time, in basis order.
    pub fn final_populations(&self) -> Option<[f64; 3]> {
        Some([
            *self.p_neutral.last()?,
            *self.p_euphoric.last()?,
            *self.p_depressive.last()?,
        ])
    }

    /// Stack the curves into a `(len, 4)` array with columns `time`,
    /// `p_neutral`, `p_euphoric`, `p_depressive`.
    pub fn to_array(&self) -> nd::Array2<f64> {
        nd::Array2::from_shape_fn((self.len(), 4), |(k, j)| {
            match j {
                0 => self.times[k],
                1 => self.p_neutral[k],
                2 => self.p_euphoric[k],
                _ => self.p_depressive[k],
            }
        })
    }
}

/// Run a full simulation.
///
/// Parameters are validated first; nothing is clamped. The Lindblad equation
/// is integrated adaptively over `params.time_grid()`, with trigger times as
/// breakpoints, and the population of each basis state is recorded at every
/// grid point.
pub fn simulate(params: &SimParams) -> SimResult<SimulationResult> {
    params.validate()?;
    let model = MoodModel::assemble(params)?;
    let time = params.time_grid();
    let [P_g, P_u, P_d] = model.projectors();
    let breakpoints = model.hamiltonian.breakpoints();
    debug!(
        t_max = params.t_max,
        t_points = params.t_points,
        n_breakpoints = breakpoints.len(),
        "integrating master equation"
    );

    let (pops, stats) = evolve_adaptive_reduced_op(
        &model.rho0,
        |t| model.hamiltonian.build_at(t),
        &model.loperator,
        &time,
        &breakpoints,
        &params.solver,
        |rho| [expectation(&P_g, rho), expectation(&P_u, rho), expectation(&P_d, rho)],
    )?;

    let mut p_neutral: Vec<f64> = Vec::with_capacity(pops.len());
    let mut p_euphoric: Vec<f64> = Vec::with_capacity(pops.len());
    let mut p_depressive: Vec<f64> = Vec::with_capacity(pops.len());
    for [g, u, d] in pops.into_iter() {
        p_neutral.push(g);
        p_euphoric.push(u);
        p_depressive.push(d);
    }
    let result = SimulationResult {
        times: time.to_vec(),
        p_neutral,
        p_euphoric,
        p_depressive,
        triggers: params.resolved_triggers(),
        stats,
    };

    let drift = result.population_drift();
    if drift > NORM_DRIFT_WARN {
        warn!(drift, "populations drifted from unit total");
    }
    info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        rhs_evals = stats.rhs_evals,
        "simulation finished"
    );
    Ok(result)
}
