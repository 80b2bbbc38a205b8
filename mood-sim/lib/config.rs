//! Run parameters, loadable from TOML.
//!
//! Every field has a default, so a run file only needs the values that differ:
//! ```toml
//! g0 = 0.5
//! initial_state = -0.4
//!
//! [[triggers]]
//! time = 4.0
//! intensity = 1.5
//!
//! [solver]
//! rtol = 1e-9
//! ```

use std::{ fs, path::Path, time::Duration };
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    dynamics::{
        MAX_TRIGGERS,
        coupling::{ DEFAULT_RESILIENCE, Trigger },
        initial::BlendMode,
    },
    error::{ SimError, SimResult },
};

/// Tolerances and budgets for the adaptive integrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Relative tolerance per step.
    pub rtol: f64,
    /// Absolute tolerance per step.
    pub atol: f64,
    /// Maximum number of attempted steps over the whole run.
    pub max_steps: usize,
    /// First trial step; estimated from the initial state if absent.
    pub initial_step: Option<f64>,
    /// Wall-clock budget in seconds; unlimited if absent.
    pub max_wall_time_secs: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-10,
            max_steps: 1_000_000,
            initial_step: None,
            max_wall_time_secs: None,
        }
    }
}

impl SolverConfig {
    /// Wall-clock budget as a `Duration`.
    pub fn max_wall_time(&self) -> Option<Duration> {
        self.max_wall_time_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Check that tolerances and budgets are usable.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(SimError::out_of_range(
                "solver.rtol", self.rtol, "must be positive and finite"));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(SimError::out_of_range(
                "solver.atol", self.atol, "must be positive and finite"));
        }
        if self.max_steps == 0 {
            return Err(SimError::out_of_range(
                "solver.max_steps", 0.0, "must be at least 1"));
        }
        if let Some(h0) = self.initial_step {
            if !(h0.is_finite() && h0 > 0.0) {
                return Err(SimError::out_of_range(
                    "solver.initial_step", h0, "must be positive and finite"));
            }
        }
        if let Some(secs) = self.max_wall_time_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(SimError::out_of_range(
                    "solver.max_wall_time_secs",
                    secs,
                    "must be non-negative and finite",
                ));
            }
        }
        Ok(())
    }
}

/// All inputs to a single simulation run.
///
/// Rates are in inverse days and times in days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimParams {
    /// Energy splitting between neutral and the excited states.
    pub g0: f64,
    /// Euphoric → neutral decay rate.
    pub gamma_ug: f64,
    /// Depressive → neutral decay rate.
    pub gamma_dg: f64,
    /// Neutral → euphoric/depressive excitation rate.
    pub gamma_gg: f64,
    /// Simulation horizon.
    pub t_max: f64,
    /// Number of output grid points, including both endpoints.
    pub t_points: usize,
    /// Blend coefficient `v` in `[-1, 1]`.
    pub initial_state: f64,
    /// How the blend weights become amplitudes.
    pub blend: BlendMode,
    /// Geometric damping `r` of later triggers.
    pub resilience: f64,
    /// Trigger events, in input order.
    ///
    /// When absent, [`DEFAULT_NUM_TRIGGERS`] evenly spaced triggers are placed
    /// against the final `t_max`; an empty list means no triggers at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<Trigger>>,
    /// Integrator tolerances and budgets.
    pub solver: SolverConfig,
}

/// Number of triggers placed when a run does not list any.
pub const DEFAULT_NUM_TRIGGERS: usize = 3;

/// Intensity of the triggers placed when a run does not list any.
pub const DEFAULT_INTENSITY: f64 = 1.0;

impl Default for SimParams {
    fn default() -> Self {
        Self {
            g0: 0.3,
            gamma_ug: 0.01,
            gamma_dg: 0.01,
            gamma_gg: 0.0005,
            t_max: 30.0,
            t_points: 1000,
            triggers: None,
            initial_state: 0.0,
            blend: BlendMode::default(),
            resilience: DEFAULT_RESILIENCE,
            solver: SolverConfig::default(),
        }
    }
}

fn check_finite(field: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::out_of_range(field, value, "must be finite"))
    }
}

fn check_rate(field: &'static str, value: f64) -> SimResult<()> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(SimError::out_of_range(field, value, "must be non-negative"));
    }
    Ok(())
}

impl SimParams {
    /// Parse parameters from a TOML string.
    pub fn from_toml_str(s: &str) -> SimResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load parameters from a TOML file.
    pub fn load<P>(path: P) -> SimResult<Self>
    where P: AsRef<Path>
    {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Render parameters as TOML.
    pub fn to_toml_string(&self) -> String {
        // every field is a plain number, string, table or array of tables
        toml::to_string_pretty(self)
            .unwrap_or_else(|err| format!("# could not render parameters: {err}\n"))
    }

    /// Trigger events for this run.
    ///
    /// Explicit triggers are returned as given; otherwise the default set is
    /// spaced over `t_max` as it stands now.
    pub fn resolved_triggers(&self) -> Vec<Trigger> {
        match &self.triggers {
            Some(triggers) => triggers.clone(),
            None => Trigger::evenly_spaced(
                DEFAULT_NUM_TRIGGERS, self.t_max, DEFAULT_INTENSITY),
        }
    }

    /// Check every field against its admissible domain.
    ///
    /// Nothing is clamped; the first violation is returned.
    pub fn validate(&self) -> SimResult<()> {
        check_rate("g0", self.g0)?;
        check_rate("gamma_ug", self.gamma_ug)?;
        check_rate("gamma_dg", self.gamma_dg)?;
        check_rate("gamma_gg", self.gamma_gg)?;
        check_finite("t_max", self.t_max)?;
        if self.t_max <= 0.0 {
            return Err(SimError::out_of_range(
                "t_max", self.t_max, "must be positive"));
        }
        if self.t_points < 2 {
            return Err(SimError::out_of_range(
                "t_points", self.t_points as f64, "must be at least 2"));
        }
        let triggers = self.resolved_triggers();
        if triggers.len() > MAX_TRIGGERS {
            return Err(SimError::TooManyTriggers(triggers.len()));
        }
        for trigger in triggers.iter() {
            check_finite("trigger.time", trigger.time)?;
            if trigger.time < 0.0 {
                return Err(SimError::out_of_range(
                    "trigger.time", trigger.time, "must be non-negative"));
            }
            check_finite("trigger.intensity", trigger.intensity)?;
            if trigger.intensity <= 0.0 {
                return Err(SimError::out_of_range(
                    "trigger.intensity", trigger.intensity, "must be positive"));
            }
        }
        check_finite("initial_state", self.initial_state)?;
        if !(-1.0..=1.0).contains(&self.initial_state) {
            return Err(SimError::out_of_range(
                "initial_state", self.initial_state, "must lie in [-1, 1]"));
        }
        check_finite("resilience", self.resilience)?;
        if !(self.resilience > 0.0 && self.resilience <= 1.0) {
            return Err(SimError::out_of_range(
                "resilience", self.resilience, "must lie in (0, 1]"));
        }
        self.solver.validate()
    }

    /// Output times: `t_points` evenly spaced values from 0 to `t_max`.
    ///
    /// The last point is exactly `t_max`.
    pub fn time_grid(&self) -> nd::Array1<f64> {
        let mut grid = nd::Array1::linspace(0.0, self.t_max, self.t_points);
        if let Some(last) = grid.last_mut() {
            *last = self.t_max;
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = SimParams::default();
        params.validate().unwrap();
        let triggers = params.resolved_triggers();
        assert_eq!(triggers.len(), 3);
        assert_eq!(triggers[0], Trigger::new(7.0, 1.0));
        assert_eq!(triggers[2], Trigger::new(21.0, 1.0));
        assert_eq!(params.time_grid().len(), 1000);
        assert_eq!(params.time_grid()[999], 30.0);
    }

    #[test]
    fn default_triggers_follow_t_max() {
        let params = SimParams::from_toml_str("t_max = 100.0").unwrap();
        assert_eq!(params.triggers, None);
        let times: Vec<f64>
            = params.resolved_triggers().iter().map(|tr| tr.time).collect();
        assert_eq!(times, vec![25.0, 50.0, 75.0]);

        let params = SimParams { t_max: 100.0, ..SimParams::default() };
        assert_eq!(params.resolved_triggers()[1], Trigger::new(50.0, 1.0));

        let none = SimParams::from_toml_str("t_max = 100.0\ntriggers = []").unwrap();
        assert!(none.resolved_triggers().is_empty());
    }

    #[test]
    fn time_grid_ends_at_t_max() {
        for (t_max, t_points) in [(30.0, 200), (30.0, 1000), (365.0, 997), (0.7, 3)] {
            let params = SimParams { t_max, t_points, ..SimParams::default() };
            let grid = params.time_grid();
            assert_eq!(grid.len(), t_points);
            assert_eq!(grid[0], 0.0);
            assert_eq!(grid[t_points - 1], t_max);
            assert!(grid.iter().zip(grid.iter().skip(1)).all(|(a, b)| b > a));
        }
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let params = SimParams::from_toml_str(
            r#"
            g0 = 0.5
            initial_state = -0.4
            blend = "amplitude"
            triggers = [ { time = 4.0, intensity = 1.5 } ]

            [solver]
            rtol = 1e-9
            max_wall_time_secs = 2.5
            "#
        )
        .unwrap();
        assert_eq!(params.g0, 0.5);
        assert_eq!(params.gamma_ug, 0.01);
        assert_eq!(params.blend, BlendMode::Amplitude);
        assert_eq!(params.triggers, Some(vec![Trigger::new(4.0, 1.5)]));
        assert_eq!(params.solver.rtol, 1e-9);
        assert_eq!(params.solver.atol, 1e-10);
        assert_eq!(params.solver.max_wall_time(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let res = SimParams::from_toml_str("gamma = 0.1");
        assert!(matches!(res, Err(SimError::Config(_))));
    }

    #[test]
    fn toml_round_trip() {
        let params = SimParams { triggers: Some(vec![]), ..SimParams::default() };
        let back = SimParams::from_toml_str(&params.to_toml_string()).unwrap();
        assert_eq!(back, params);
        let params = SimParams { t_max: 50.0, ..SimParams::default() };
        let back = SimParams::from_toml_str(&params.to_toml_string()).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.resolved_triggers()[0].time, 12.0);
    }

    #[test]
    fn out_of_range_fields() {
        let cases: Vec<(SimParams, &str)> = vec![
            (SimParams { g0: -0.1, ..SimParams::default() }, "g0"),
            (SimParams { gamma_dg: -1e-3, ..SimParams::default() }, "gamma_dg"),
            (SimParams { t_max: 0.0, ..SimParams::default() }, "t_max"),
            (SimParams { t_points: 1, ..SimParams::default() }, "t_points"),
            (SimParams { initial_state: 1.2, ..SimParams::default() }, "initial_state"),
            (SimParams { resilience: 0.0, ..SimParams::default() }, "resilience"),
            (SimParams { g0: f64::NAN, ..SimParams::default() }, "g0"),
            (
                SimParams {
                    triggers: Some(vec![Trigger::new(1.0, 0.0)]),
                    ..SimParams::default()
                },
                "trigger.intensity",
            ),
            (
                SimParams {
                    triggers: Some(vec![Trigger::new(-1.0, 1.0)]),
                    ..SimParams::default()
                },
                "trigger.time",
            ),
            (
                SimParams {
                    solver: SolverConfig { rtol: 0.0, ..SolverConfig::default() },
                    ..SimParams::default()
                },
                "solver.rtol",
            ),
        ];
        for (params, expected) in cases {
            match params.validate() {
                Err(SimError::InputOutOfRange { field, .. }) => {
                    assert_eq!(field, expected);
                },
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn trigger_count_limit() {
        let ok = SimParams {
            triggers: Some(Trigger::evenly_spaced(MAX_TRIGGERS, 30.0, 1.0)),
            ..SimParams::default()
        };
        ok.validate().unwrap();
        let too_many = SimParams {
            triggers: Some(Trigger::evenly_spaced(MAX_TRIGGERS + 1, 30.0, 1.0)),
            ..SimParams::default()
        };
        assert!(matches!(too_many.validate(), Err(SimError::TooManyTriggers(6))));
    }

    #[test]
    fn zero_triggers_is_valid() {
        let params = SimParams { triggers: Some(vec![]), ..SimParams::default() };
        params.validate().unwrap();
        assert!(params.resolved_triggers().is_empty());
    }
}
