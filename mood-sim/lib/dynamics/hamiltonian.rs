//! Hamiltonian builder for the driven three-level mood system.
//!
//! The Hamiltonian is a sum of fixed ladder operators scaled by time-dependent
//! couplings, plus a constant splitting:
//! ```text
//! H(t) = \sum_c f_c(t) (|a_c><b_c| + |b_c><a_c|) + g0 \Sigma_z
//! ```

use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    dynamics::coupling::Coupling,
    hilbert::{ Basis, Mood },
};

/// Basic requirements for any Hamiltonian builder.
pub trait HBuild {
    /// Build a time-independent Hamiltonian matrix, if possible.
    fn build_static(&self) -> Option<nd::Array2<C64>>;

    /// Build the Hamiltonian matrix at a given time.
    fn build_at(&self, t: f64) -> nd::Array2<C64>;

    /// Build the Hamiltonian array, with the last axis corresponding to time.
    fn build(&self, time: &nd::Array1<f64>) -> nd::Array3<C64>;

    /// Times at which the Hamiltonian may jump discontinuously.
    fn breakpoints(&self) -> Vec<f64>;

    /// Return a reference to the basis.
    fn get_basis(&self) -> &Basis<Mood>;
}

/// A fixed operator paired with the coupling that scales it.
#[derive(Clone, Debug)]
pub struct DrivenTerm {
    pub op: nd::Array2<C64>,
    pub coupling: Coupling,
}

/// Hamiltonian builder for the mood system.
#[derive(Clone, Debug)]
pub struct HBuilderMood {
    basis: Basis<Mood>,
    g0: f64,
    terms: Vec<DrivenTerm>,
    constant: nd::Array2<C64>,
}

impl HBuilderMood {
    /// Create a new `HBuilderMood` from the base splitting and one coupling per
    /// channel.
    ///
    /// Terms are laid out in the order of the basis' coupled pairs, whatever
    /// the order of `couplings`; a pair with no coupling gets no term.
    pub fn new<I>(g0: f64, couplings: I) -> Self
    where I: IntoIterator<Item = Coupling>
    {
        let basis = Basis::mood();
        let mut couplings: Vec<Coupling> = couplings.into_iter().collect();
        let terms: Vec<DrivenTerm>
            = basis.coupled_pairs().into_iter()
            .filter_map(|(a, b)| {
                let k
                    = couplings.iter()
                    .position(|c| c.channel().states() == (*a, *b))?;
                let coupling = couplings.swap_remove(k);
                let op = basis.get_ladder(a, b)?;
                Some(DrivenTerm { op, coupling })
            })
            .collect();
        let constant = basis.level_operator() * C64::from(g0);
        Self { basis, g0, terms, constant }
    }

    /// Get a reference to the basis.
    pub fn basis(&self) -> &Basis<Mood> { &self.basis }

    /// Return the base splitting.
    pub fn g0(&self) -> f64 { self.g0 }

    /// Return the driven terms.
    pub fn terms(&self) -> &[DrivenTerm] { &self.terms }

    /// Return the constant `g0 \Sigma_z` term.
    pub fn constant(&self) -> &nd::Array2<C64> { &self.constant }

    /// Compute the Hamiltonian if every coupling is constant.
    pub fn gen_static(&self) -> Option<nd::Array2<C64>> {
        self.terms.iter().all(|term| term.coupling.is_constant())
            .then(|| self.gen_at(0.0))
    }

    /// Compute the time-dependent Hamiltonian at a given time as a 2D array.
    pub fn gen_at(&self, t: f64) -> nd::Array2<C64> {
        let mut H: nd::Array2<C64> = self.constant.clone();
        for DrivenTerm { op, coupling } in self.terms.iter() {
            H.scaled_add(C64::from(coupling.eval(t)), op);
        }
        H
    }

    /// Compute the time-dependent Hamiltonian as a 3D array, with the last axis
    /// corresponding to time.
    pub fn gen(&self, time: &nd::Array1<f64>) -> nd::Array3<C64> {
        let n = self.basis.len();
        let nt = time.len();
        let mut H: nd::Array3<C64> = nd::Array3::zeros((n, n, nt));
        for (k, &t) in time.iter().enumerate() {
            H.slice_mut(s![.., .., k]).assign(&self.gen_at(t));
        }
        H
    }

    /// Sorted, de-duplicated trigger times across all couplings.
    pub fn trigger_times(&self) -> Vec<f64> {
        let mut times: Vec<f64>
            = self.terms.iter()
            .flat_map(|term| term.coupling.triggers().iter().map(|tr| tr.time))
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup();
        times
    }
}

impl HBuild for HBuilderMood {
    fn build_static(&self) -> Option<nd::Array2<C64>> { self.gen_static() }

    fn build_at(&self, t: f64) -> nd::Array2<C64> { self.gen_at(t) }

    fn build(&self, time: &nd::Array1<f64>) -> nd::Array3<C64> {
        self.gen(time)
    }

    fn breakpoints(&self) -> Vec<f64> { self.trigger_times() }

    fn get_basis(&self) -> &Basis<Mood> { self.basis() }
}
