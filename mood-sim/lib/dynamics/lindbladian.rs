//! Dissipation channels for the mood system.
//!
//! Each channel contributes
//! ```text
//! D[L](rho) = \gamma (L rho L^\dagger - 1/2 {L^\dagger L, rho})
//! ```
//! to the right-hand side of the master equation.

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    hilbert::{ Basis, Mood },
    solve::anti_commutator,
};

/// Basic requirements for any implementation of a Lindbladian operator.
pub trait LOp {
    /// Operate on a density matrix.
    fn op(&self, rho: &nd::Array2<C64>) -> nd::Array2<C64>;

    /// Return a reference to the basis.
    fn get_basis(&self) -> &Basis<Mood>;
}

/// A single jump operator `sqrt(rate) * L` with its `L^\dagger` and
/// `L^\dagger L` cached.
#[derive(Clone)]
pub struct JumpOperator {
    label: &'static str,
    rate: f64,
    l: nd::Array2<C64>,
    l_dag: nd::Array2<C64>,
    l_dag_l: nd::Array2<C64>,
}

impl fmt::Debug for JumpOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "JumpOperator {{ label: {:?}, rate: {:?}, l: {:?} }}",
            self.label, self.rate, self.l,
        )
    }
}

impl JumpOperator {
    /// Create a new `JumpOperator` from an unscaled operator and its rate.
    pub fn new(label: &'static str, rate: f64, l: nd::Array2<C64>) -> Self {
        let l_dag = l.t().mapv(|z| z.conj());
        let l_dag_l = l_dag.dot(&l);
        Self { label, rate, l, l_dag, l_dag_l }
    }

    /// Short channel name.
    pub fn label(&self) -> &'static str { self.label }

    /// Decay rate `\gamma`.
    pub fn rate(&self) -> f64 { self.rate }

    /// The unscaled operator `L`.
    pub fn unscaled(&self) -> &nd::Array2<C64> { &self.l }

    /// The full jump operator `sqrt(\gamma) L`.
    pub fn matrix(&self) -> nd::Array2<C64> {
        &self.l * C64::from(self.rate.sqrt())
    }

    /// `L^\dagger L`, unscaled.
    pub fn number_op(&self) -> &nd::Array2<C64> { &self.l_dag_l }

    /// Compute this channel's dissipator acting on a density matrix.
    pub fn dissipator(&self, rho: &nd::Array2<C64>) -> nd::Array2<C64> {
        if self.rate == 0.0 {
            return nd::Array2::zeros(rho.raw_dim());
        }
        let jump = self.l.dot(rho).dot(&self.l_dag);
        (jump - anti_commutator(&self.l_dag_l, rho) * 0.5) * self.rate
    }
}

/// Implements the Lindbladian operator for the mood system.
///
/// Channels, in order:
/// - `ug`: euphoric → neutral at `gamma_ug`
/// - `dg`: depressive → neutral at `gamma_dg`
/// - `gg`: neutral → euphoric and neutral → depressive, as a single coherent
///   channel, at `gamma_gg`
#[derive(Clone, Debug)]
pub struct LOperatorMood {
    basis: Basis<Mood>,
    jumps: Vec<JumpOperator>,
}

impl LOperatorMood {
    /// Create a new `LOperatorMood`.
    pub fn new(gamma_ug: f64, gamma_dg: f64, gamma_gg: f64) -> Self {
        use Mood::*;
        let basis = Basis::mood();
        let transition = |from: Mood, to: Mood| {
            basis.get_transition(&from, &to)
                .expect("LOperatorMood::new: mood basis is complete")
        };
        let jumps = vec![
            JumpOperator::new("ug", gamma_ug, transition(Euphoric, Neutral)),
            JumpOperator::new("dg", gamma_dg, transition(Depressive, Neutral)),
            JumpOperator::new(
                "gg",
                gamma_gg,
                transition(Neutral, Depressive) + transition(Neutral, Euphoric),
            ),
        ];
        Self { basis, jumps }
    }

    /// Get a reference to the basis.
    pub fn basis(&self) -> &Basis<Mood> { &self.basis }

    /// Return the jump operators.
    pub fn jumps(&self) -> &[JumpOperator] { &self.jumps }

    /// Perform the operator action on a density matrix.
    pub fn op(&self, rho: &nd::Array2<C64>) -> nd::Array2<C64> {
        self.jumps.iter()
            .fold(
                nd::Array2::zeros(rho.raw_dim()),
                |acc, jump| acc + jump.dissipator(rho),
            )
    }
}

impl LOp for LOperatorMood {
    fn op(&self, rho: &nd::Array2<C64>) -> nd::Array2<C64> { self.op(rho) }

    fn get_basis(&self) -> &Basis<Mood> { self.basis() }
}
