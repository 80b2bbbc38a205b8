//! Initial states from the single blend coefficient.

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    hilbert::{ Basis, Mood, outer_prod },
    solve::StateNorm,
};

/// How blend weights are turned into state amplitudes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Weights are occupation probabilities; amplitudes are their square
    /// roots. Initial populations equal the weights.
    #[default]
    Probability,
    /// Weights are used directly as amplitudes, then normalized.
    Amplitude,
}

/// Weights of the three basis states derived from a blend coefficient
/// `v` in `[-1, 1]`.
///
/// `v = -1` is purely depressive, `v = 0` purely neutral and `v = 1` purely
/// euphoric; the weights always sum to 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InitialWeights {
    pub depressive: f64,
    pub neutral: f64,
    pub euphoric: f64,
}

impl InitialWeights {
    /// Compute weights from the blend coefficient.
    pub fn from_blend(v: f64) -> Self {
        Self {
            depressive: (-v).max(0.0),
            neutral: 1.0 - v.abs(),
            euphoric: v.max(0.0),
        }
    }

    /// Weight of a particular basis state.
    pub fn get(&self, state: Mood) -> f64 {
        match state {
            Mood::Neutral => self.neutral,
            Mood::Euphoric => self.euphoric,
            Mood::Depressive => self.depressive,
        }
    }

    /// Build the normalized initial state vector in `basis`.
    pub fn state_vector(&self, basis: &Basis<Mood>, mode: BlendMode)
        -> nd::Array1<C64>
    {
        let mut psi
            = basis.get_vector_weighted(|s, _, _| {
                let w = self.get(*s);
                match mode {
                    BlendMode::Probability => C64::from(w.sqrt()),
                    BlendMode::Amplitude => C64::from(w),
                }
            });
        let norm = psi.norm();
        psi /= norm;
        psi
    }

    /// Build the initial density matrix `|psi0><psi0|` in `basis`.
    pub fn density(&self, basis: &Basis<Mood>, mode: BlendMode)
        -> nd::Array2<C64>
    {
        let psi = self.state_vector(basis, mode);
        outer_prod(&psi, &psi)
    }
}

impl fmt::Display for InitialWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "depressive = {:.2}, neutral = {:.2}, euphoric = {:.2}",
            self.depressive, self.neutral, self.euphoric,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_one() {
        for k in 0..=200 {
            let v = -1.0 + 0.01 * k as f64;
            let w = InitialWeights::from_blend(v);
            assert_abs_diff_eq!(w.depressive + w.neutral + w.euphoric, 1.0, epsilon = 1e-15);
            assert!(w.depressive >= 0.0 && w.neutral >= 0.0 && w.euphoric >= 0.0);
        }
    }

    #[test]
    fn endpoints_are_pure() {
        let basis = Basis::mood();
        for (v, s) in [(-1.0, Mood::Depressive), (0.0, Mood::Neutral), (1.0, Mood::Euphoric)] {
            for mode in [BlendMode::Probability, BlendMode::Amplitude] {
                let psi = InitialWeights::from_blend(v).state_vector(&basis, mode);
                assert_eq!(psi, basis.get_vector(&s).unwrap());
            }
        }
    }

    #[test]
    fn probability_mode_reproduces_weights() {
        let basis = Basis::mood();
        let w = InitialWeights::from_blend(-0.3);
        let rho = w.density(&basis, BlendMode::Probability);
        assert_abs_diff_eq!(rho[[0, 0]].re, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(rho[[1, 1]].re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rho[[2, 2]].re, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn amplitude_mode_is_normalized() {
        let basis = Basis::mood();
        let w = InitialWeights::from_blend(0.5);
        let psi = w.state_vector(&basis, BlendMode::Amplitude);
        assert_abs_diff_eq!(psi.norm().re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(psi[0].re, psi[1].re, epsilon = 1e-15);
    }

    #[test]
    fn display_matches_two_decimals() {
        let w = InitialWeights::from_blend(0.25);
        assert_eq!(w.to_string(), "depressive = 0.00, neutral = 0.75, euphoric = 0.25");
    }
}
