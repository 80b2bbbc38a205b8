#![allow(non_snake_case)]

//! End-to-end runs of representative configurations.

use approx::{ assert_abs_diff_eq, assert_relative_eq };
use ndarray as nd;
use mood_sim::{
    Mood,
    MoodModel,
    SimError,
    SimParams,
    SolverConfig,
    Trigger,
    dynamics::{ Channel, HBuild, build_couplings },
    simulate,
    solve::{ expectation, lindblad::{ evolve_fn_reduced_op, lindblad_superop, rhs_op } },
};

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn neutral_start_relaxes_symmetrically() {
    let params = SimParams {
        g0: 0.3,
        triggers: Some(vec![]),
        initial_state: 0.0,
        t_max: 30.0,
        ..SimParams::default()
    };
    let res = simulate(&params).unwrap();
    assert_eq!(res.len(), 1000);
    assert_eq!(res.p_neutral[0], 1.0);
    let [g, u, d] = res.final_populations().unwrap();
    // u and d are exchanged by a symmetry of H and of the jump operators
    assert_abs_diff_eq!(u, d, epsilon = 1e-6);
    assert!(g < 1.0);
    assert!(u > 0.0);
    for (pu, pd) in res.p_euphoric.iter().zip(res.p_depressive.iter()) {
        assert_abs_diff_eq!(pu, pd, epsilon = 1e-6);
    }
}

#[test]
fn default_triggers_break_the_symmetry() {
    let res = simulate(&SimParams::default()).unwrap();
    let diff: f64
        = res.p_euphoric.iter().zip(res.p_depressive.iter())
        .map(|(u, d)| (u - d).abs())
        .fold(0.0, f64::max);
    assert!(diff > 1e-3);
    let times: Vec<f64> = res.triggers.iter().map(|tr| tr.time).collect();
    assert_eq!(times, vec![7.0, 14.0, 21.0]);
}

#[test]
fn default_triggers_scale_with_horizon() {
    let params = SimParams::from_toml_str("t_max = 100.0\nt_points = 101").unwrap();
    let res = simulate(&params).unwrap();
    let times: Vec<f64> = res.triggers.iter().map(|tr| tr.time).collect();
    assert_eq!(times, vec![25.0, 50.0, 75.0]);
    assert_eq!(res.times[100], 100.0);
}

// ---------------------------------------------------------------------------
// Trigger ordering
// ---------------------------------------------------------------------------

#[test]
fn trigger_weight_follows_input_order() {
    let a = Trigger::new(1.0, 0.5);
    let b = Trigger::new(2.0, 1.5);
    let forward = build_couplings(&[a, b], 0.9);
    let swapped = build_couplings(&[b, a], 0.9);
    let t = 2.2;
    for (f, s) in forward.iter().zip(swapped.iter()) {
        assert_eq!(f.channel(), s.channel());
        assert!((f.eval(t) - s.eval(t)).abs() > 1e-6, "{} unchanged", f.channel());
    }
    // before the second trigger fires only the first one counts, at weight
    // 1 or r depending on its position
    let ud_f = forward[2].eval(1.5);
    let ud_s = swapped[2].eval(1.5);
    assert_eq!(forward[2].channel(), Channel::UD);
    assert_relative_eq!(0.05 - ud_s, 0.9 * (0.05 - ud_f), max_relative = 1e-12);

    let params_f = SimParams { triggers: Some(vec![a, b]), t_max: 10.0, ..SimParams::default() };
    let params_s = SimParams { triggers: Some(vec![b, a]), t_max: 10.0, ..SimParams::default() };
    let res_f = simulate(&params_f).unwrap();
    let res_s = simulate(&params_s).unwrap();
    let pf = res_f.population(Mood::Neutral);
    let ps = res_s.population(Mood::Neutral);
    assert!((pf[pf.len() - 1] - ps[ps.len() - 1]).abs() > 1e-6);
}

// ---------------------------------------------------------------------------
// Integrator cross-checks
// ---------------------------------------------------------------------------

#[test]
fn closed_system_matches_fixed_step_reference() {
    let params = SimParams {
        g0: 0.0,
        gamma_ug: 0.0,
        gamma_dg: 0.0,
        gamma_gg: 0.0,
        triggers: Some(vec![]),
        initial_state: 0.6,
        t_max: 10.0,
        t_points: 101,
        ..SimParams::default()
    };
    let res = simulate(&params).unwrap();

    let model = MoodModel::assemble(&params).unwrap();
    let P_u = model.basis().get_projector(&Mood::Euphoric).unwrap();
    let fine = nd::Array1::linspace(0.0, 10.0, 10001);
    let reference = evolve_fn_reduced_op(
        &model.rho0,
        |t| model.hamiltonian.build_at(t),
        &model.loperator,
        &fine,
        |rho| expectation(&P_u, rho),
    );
    for (k, p) in res.p_euphoric.iter().enumerate() {
        assert_abs_diff_eq!(*p, reference[100 * k], epsilon = 1e-6);
    }
}

#[test]
fn superoperator_generates_the_same_flow() {
    let params = SimParams::default();
    let model = MoodModel::assemble(&params).unwrap();
    let rho = &model.rho0;
    for t in [0.0, 7.0, 7.3, 15.0] {
        let H = model.hamiltonian.build_at(t);
        let S = lindblad_superop(&H, model.loperator.jumps());
        let dv = S.dot(&rho.iter().copied().collect::<nd::Array1<_>>());
        let drho = rhs_op(&H, &model.loperator, rho);
        for (a, b) in dv.iter().zip(drho.iter()) {
            assert_abs_diff_eq!((a - b).norm(), 0.0, epsilon = 1e-14);
        }
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn step_budget_failure_is_reported() {
    let params = SimParams {
        solver: SolverConfig { max_steps: 10, ..SolverConfig::default() },
        ..SimParams::default()
    };
    assert!(matches!(simulate(&params), Err(SimError::IntegrationFailure { .. })));
}

#[test]
fn wall_clock_failure_is_reported() {
    let params = SimParams {
        solver: SolverConfig {
            max_wall_time_secs: Some(0.0),
            ..SolverConfig::default()
        },
        ..SimParams::default()
    };
    assert!(matches!(simulate(&params), Err(SimError::Timeout { .. })));
}

#[test]
fn too_many_triggers_is_reported() {
    let params = SimParams {
        triggers: Some(Trigger::evenly_spaced(6, 30.0, 1.0)),
        ..SimParams::default()
    };
    assert!(matches!(simulate(&params), Err(SimError::TooManyTriggers(6))));
}

#[test]
fn run_file_round_trip() {
    let dir = std::env::temp_dir()
        .join(format!("mood-sim-scenarios-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.toml");
    let params = SimParams {
        g0: 0.45,
        triggers: Some(vec![Trigger::new(3.0, 0.8)]),
        ..SimParams::default()
    };
    std::fs::write(&path, params.to_toml_string()).unwrap();
    let loaded = SimParams::load(&path).unwrap();
    assert_eq!(loaded, params);
    assert!(matches!(
        SimParams::load(dir.join("missing.toml")),
        Err(SimError::Io(_)),
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}
