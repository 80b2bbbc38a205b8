//! Embedded Dormand-Prince 5(4) integration with step-size control.
//!
//! The solver advances the state from one output time to the next, landing
//! exactly on every requested time and on every breakpoint. Breakpoints mark
//! times where the right-hand side may jump; no step straddles one, and stage
//! evaluations at the end of a step that stops on a breakpoint use the
//! left-hand limit.

use std::time::Instant;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::{ debug, trace };
use crate::{
    config::SolverConfig,
    error::{ SimError, SimResult },
};

// Dormand-Prince tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;

const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;

const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;

const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;

const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// fifth-order weights; also the last row of the tableau (FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// difference between fifth- and fourth-order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;

/// Counters describing the work done by one integration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Steps whose error estimate passed.
    pub accepted: usize,
    /// Steps that were retried with a smaller size.
    pub rejected: usize,
    /// Evaluations of the right-hand side.
    pub rhs_evals: usize,
}

impl StepStats {
    /// Total number of attempted steps.
    pub fn attempted(&self) -> usize { self.accepted + self.rejected }
}

// weighted RMS norm used for both the error estimate and the initial step
fn scaled_rms<'a, I>(pairs: I, atol: f64, rtol: f64) -> f64
where I: Iterator<Item = (&'a C64, f64)>
{
    let mut acc: f64 = 0.0;
    let mut n: usize = 0;
    for (v, scale_ref) in pairs {
        let sc = atol + rtol * scale_ref;
        acc += (v.norm() / sc).powi(2);
        n += 1;
    }
    if n == 0 { 0.0 } else { (acc / n as f64).sqrt() }
}

// smallest representable step at time `t`
fn min_step(t: f64) -> f64 { 16.0 * f64::EPSILON * t.abs().max(1.0) }

// largest float strictly below a positive `t`
fn left_limit(t: f64) -> f64 {
    if t > 0.0 { f64::from_bits(t.to_bits() - 1) } else { t }
}

fn initial_step<D>(
    z: &nd::Array<C64, D>,
    f: &nd::Array<C64, D>,
    span: f64,
    config: &SolverConfig,
) -> f64
where D: nd::Dimension
{
    if let Some(h0) = config.initial_step {
        return h0.min(span);
    }
    let d0 = scaled_rms(
        z.iter().zip(z.iter().map(|v| v.norm())), config.atol, config.rtol);
    let d1 = scaled_rms(
        f.iter().zip(z.iter().map(|v| v.norm())), config.atol, config.rtol);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
    h0.min(span)
}

/// Output times plus breakpoints, as integration segment ends.
///
/// Each entry is `(time, is_output, is_breakpoint)`; entries at or before
/// `t[0]` are dropped.
fn segment_ends(t: &nd::Array1<f64>, breakpoints: &[f64])
    -> Vec<(f64, bool, bool)>
{
    let t0 = t[0];
    let tol = |x: f64| 4.0 * f64::EPSILON * x.abs().max(1.0);
    let mut bps: Vec<f64>
        = breakpoints.iter().copied()
        .filter(|b| b.is_finite() && *b > t0)
        .collect();
    bps.sort_by(|a, b| a.total_cmp(b));
    bps.dedup();
    let mut ends: Vec<(f64, bool, bool)>
        = Vec::with_capacity(t.len() + bps.len());
    let mut bp_iter = bps.into_iter().peekable();
    for &tk in t.iter().skip(1) {
        while let Some(&b) = bp_iter.peek() {
            if (b - tk).abs() <= tol(tk) {
                break;
            } else if b < tk {
                ends.push((b, false, true));
                bp_iter.next();
            } else {
                break;
            }
        }
        let on_breakpoint
            = bp_iter.peek().is_some_and(|&b| (b - tk).abs() <= tol(tk));
        if on_breakpoint { bp_iter.next(); }
        ends.push((tk, true, on_breakpoint));
    }
    ends
}

/// Adaptive Dormand-Prince integration with reduced output.
///
/// Generic over the dimension of the quantum state array and the RHS of the
/// ODE being solved. `h` gives the Hamiltonian at a time; `x` is applied to
/// the state at every time in `t`, including `t[0]`.
///
/// Fails if the step budget is exhausted, the step size underflows, or the
/// wall-clock budget in `config` runs out.
pub(crate) fn do_evolve_adaptive_reduced<D, H, F, X, T>(
    z0: &nd::Array<C64, D>,
    h: H,
    rhs: F,
    t: &nd::Array1<f64>,
    breakpoints: &[f64],
    config: &SolverConfig,
    x: X,
) -> SimResult<(Vec<T>, StepStats)>
where
    D: nd::Dimension,
    H: Fn(f64) -> nd::Array2<C64>,
    F: Fn(&nd::Array2<C64>, &nd::Array<C64, D>) -> nd::Array<C64, D>,
    X: Fn(&nd::Array<C64, D>) -> T,
{
    let mut stats = StepStats::default();
    let mut x_t: Vec<T> = Vec::with_capacity(t.len());
    let mut z: nd::Array<C64, D> = z0.clone();
    x_t.push(x(&z));
    if t.len() < 2 { return Ok((x_t, stats)); }

    let started = Instant::now();
    let wall_budget = config.max_wall_time();
    let ends = segment_ends(t, breakpoints);
    debug!(
        n_out = t.len(),
        n_segments = ends.len(),
        rtol = config.rtol,
        atol = config.atol,
        "starting adaptive integration"
    );

    let f = |tk: f64, zk: &nd::Array<C64, D>, stats: &mut StepStats| {
        stats.rhs_evals += 1;
        rhs(&h(tk), zk)
    };

    let mut tk: f64 = t[0];
    let mut k1 = f(tk, &z, &mut stats);
    let mut h_step = initial_step(&z, &k1, t[t.len() - 1] - tk, config);
    let mut k2: nd::Array<C64, D>;
    let mut k3: nd::Array<C64, D>;
    let mut k4: nd::Array<C64, D>;
    let mut k5: nd::Array<C64, D>;
    let mut k6: nd::Array<C64, D>;
    let mut k7: nd::Array<C64, D>;
    let mut z_new: nd::Array<C64, D>;
    let mut err_vec: nd::Array<C64, D>;
    let mut err: f64;

    for (target, is_output, is_breakpoint) in ends {
        // stage times are capped just short of a breakpoint
        let t_cap = if is_breakpoint { left_limit(target) } else { target };
        let mut rejected_last = false;
        while tk < target {
            if target - tk <= min_step(target) {
                tk = target;
                break;
            }
            if stats.attempted() >= config.max_steps {
                return Err(SimError::IntegrationFailure {
                    t: tk,
                    reason: format!(
                        "step budget of {} exhausted", config.max_steps),
                });
            }
            if let Some(budget) = wall_budget {
                let elapsed = started.elapsed();
                if elapsed > budget {
                    return Err(SimError::Timeout { t: tk, elapsed });
                }
            }

            let remaining = target - tk;
            let last = h_step >= remaining;
            let hs = if last { remaining } else { h_step };
            if hs < min_step(tk) {
                return Err(SimError::IntegrationFailure {
                    t: tk,
                    reason: format!("step size underflow (h = {:e})", hs),
                });
            }
            let ts = |c: f64| (tk + c * hs).min(t_cap);

            k2 = f(ts(C2), &(&z + &k1 * (hs * A21)), &mut stats);
            k3 = f(
                ts(C3),
                &(&z + (&k1 * A31 + &k2 * A32) * hs),
                &mut stats,
            );
            k4 = f(
                ts(C4),
                &(&z + (&k1 * A41 + &k2 * A42 + &k3 * A43) * hs),
                &mut stats,
            );
            k5 = f(
                ts(C5),
                &(&z + (&k1 * A51 + &k2 * A52 + &k3 * A53 + &k4 * A54) * hs),
                &mut stats,
            );
            k6 = f(
                ts(1.0),
                &(
                    &z
                    + (
                        &k1 * A61 + &k2 * A62 + &k3 * A63 + &k4 * A64
                        + &k5 * A65
                    ) * hs
                ),
                &mut stats,
            );
            z_new
                = &z
                + (&k1 * B1 + &k3 * B3 + &k4 * B4 + &k5 * B5 + &k6 * B6) * hs;
            k7 = f(ts(1.0), &z_new, &mut stats);

            err_vec
                = (
                    &k1 * E1 + &k3 * E3 + &k4 * E4 + &k5 * E5 + &k6 * E6
                    + &k7 * E7
                ) * hs;
            err = scaled_rms(
                err_vec.iter()
                    .zip(z.iter().zip(z_new.iter()).map(|(a, b)| a.norm().max(b.norm()))),
                config.atol,
                config.rtol,
            );
            if !err.is_finite() { err = f64::INFINITY; }

            if err <= 1.0 {
                stats.accepted += 1;
                tk = if last { target } else { tk + hs };
                z = z_new;
                k1 = k7;
                let mut fac
                    = if err == 0.0 {
                        FAC_MAX
                    } else {
                        (SAFETY * err.powf(-0.2)).clamp(FAC_MIN, FAC_MAX)
                    };
                if rejected_last { fac = fac.min(1.0); }
                rejected_last = false;
                if !last || hs * fac > h_step { h_step = hs * fac; }
            } else {
                stats.rejected += 1;
                trace!(t = tk, h = hs, err, "step rejected");
                let fac = (SAFETY * err.powf(-0.2)).clamp(FAC_MIN, 1.0);
                h_step = if err.is_infinite() { hs * FAC_MIN } else { hs * fac };
                rejected_last = true;
            }
        }
        if is_breakpoint {
            // right-hand limit for the next segment
            k1 = f(tk, &z, &mut stats);
        }
        if is_output { x_t.push(x(&z)); }
    }

    debug!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        rhs_evals = stats.rhs_evals,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "adaptive integration finished"
    );
    Ok((x_t, stats))
}
