//! Lindblad master equation right-hand side and its integration.
//!
//! ```text
//! d rho / dt = -i [H, rho] + \sum_k \gamma_k (L_k rho L_k^\dagger - 1/2 {L_k^\dagger L_k, rho})
//! ```

use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use crate::{
    config::SolverConfig,
    dynamics::lindbladian::{ JumpOperator, LOp },
    error::SimResult,
    solve::{
        adaptive::{ StepStats, do_evolve_adaptive_reduced },
        commutator,
        do_evolve_fn_reduced,
    },
};

/// Right-hand side of the master equation for a Hamiltonian `H` and a
/// dissipator `L`.
pub fn rhs_op<LO>(H: &nd::Array2<C64>, L: &LO, rho: &nd::Array2<C64>)
    -> nd::Array2<C64>
where LO: LOp + ?Sized
{
    -C64::i() * commutator(H, rho) + L.op(rho)
}

/// Integrate with fixed-step fourth-order Runge-Kutta, one step per interval
/// of `t`, applying `x` to the density matrix at each time.
pub fn evolve_fn_reduced_op<HF, LO, X, T>(
    rho0: &nd::Array2<C64>,
    H: HF,
    L: &LO,
    t: &nd::Array1<f64>,
    x: X,
) -> Vec<T>
where
    HF: Fn(f64) -> nd::Array2<C64>,
    LO: LOp + ?Sized,
    X: Fn(&nd::Array2<C64>) -> T,
{
    do_evolve_fn_reduced(rho0, H, |h, rho| rhs_op(h, L, rho), t, x)
}

/// Integrate with the adaptive Dormand-Prince method, applying `x` to the
/// density matrix at each time in `t`.
///
/// `breakpoints` are times where `H` may jump; the integrator never steps
/// across one.
pub fn evolve_adaptive_reduced_op<HF, LO, X, T>(
    rho0: &nd::Array2<C64>,
    H: HF,
    L: &LO,
    t: &nd::Array1<f64>,
    breakpoints: &[f64],
    config: &SolverConfig,
    x: X,
) -> SimResult<(Vec<T>, StepStats)>
where
    HF: Fn(f64) -> nd::Array2<C64>,
    LO: LOp + ?Sized,
    X: Fn(&nd::Array2<C64>) -> T,
{
    do_evolve_adaptive_reduced(
        rho0, H, |h, rho| rhs_op(h, L, rho), t, breakpoints, config, x)
}

/// Build the Liouvillian superoperator acting on row-major vectorized density
/// matrices, so that `vec(d rho / dt) = S vec(rho)`.
pub fn lindblad_superop(H: &nd::Array2<C64>, jumps: &[JumpOperator])
    -> nd::Array2<C64>
{
    let n = H.nrows();
    let eye: nd::Array2<C64> = nd::Array2::eye(n);
    let mut S: nd::Array2<C64>
        = (kron(H, &eye) - kron(&eye, &H.t())) * (-C64::i());
    for jump in jumps.iter() {
        if jump.rate() == 0.0 { continue; }
        let l = jump.unscaled();
        let ldl = jump.number_op();
        let term
            = kron(l, &l.mapv(|z| z.conj()))
            - kron(ldl, &eye) * 0.5
            - kron(&eye, &ldl.t()) * 0.5;
        S.scaled_add(C64::from(jump.rate()), &term);
    }
    S
}
