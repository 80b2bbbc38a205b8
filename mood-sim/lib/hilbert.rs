//! Definitions to describe states, bases, and the operators built from them.

use std::{ fmt, hash::Hash, ops::Deref };
use ndarray as nd;
use indexmap::IndexMap;
use itertools::Itertools;
use num_complex::Complex64 as C64;
use num_traits::{ Zero, One };

/* States *********************************************************************/

/// A single basis state.
pub trait BasisState: Clone + Eq + Hash + fmt::Debug {
    /// Return `true` if two states can be coupled by the drive.
    ///
    /// This method should be reflexive in its inputs.
    fn couples_to(&self, other: &Self) -> bool;
}

/// The three basis states of the mood model.
///
/// Index order in every array representation is (neutral, euphoric,
/// depressive).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mood {
    /// `|g>`
    Neutral,
    /// `|u>`
    Euphoric,
    /// `|d>`
    Depressive,
}

impl Mood {
    /// All states, in basis order.
    pub const ALL: [Mood; 3] = [Self::Neutral, Self::Euphoric, Self::Depressive];

    /// Return the appropriate `\Sigma_z` eigenvalue.
    pub fn sz(&self) -> f64 {
        match *self {
            Self::Neutral    =>  1.0,
            Self::Euphoric   => -1.0,
            Self::Depressive => -1.0,
        }
    }

    /// Position of the state in the standard basis ordering.
    pub fn index(&self) -> usize {
        match *self {
            Self::Neutral    => 0,
            Self::Euphoric   => 1,
            Self::Depressive => 2,
        }
    }

    /// Single-letter label used for channel names (`g`, `u`, `d`).
    pub fn letter(&self) -> char {
        match *self {
            Self::Neutral    => 'g',
            Self::Euphoric   => 'u',
            Self::Depressive => 'd',
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Neutral    => write!(f, "neutral"),
            Self::Euphoric   => write!(f, "euphoric"),
            Self::Depressive => write!(f, "depressive"),
        }
    }
}

impl BasisState for Mood {
    fn couples_to(&self, other: &Self) -> bool { self != other }
}

/// Compute the outer product of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    let na = a.len();
    let nb = b.len();
    nd::Array2::from_shape_fn((na, nb), |(i, j)| a[i] * b[j].conj())
}

/* Bases **********************************************************************/

#[derive(Clone)]
pub struct States<'a, S> {
    iter: indexmap::map::Keys<'a, S, f64>
}

impl<'a, S> Iterator for States<'a, S> {
    type Item = &'a S;

    fn next(&mut self) -> Option<Self::Item> { self.iter.next() }
}

pub trait StateIter<'a> {
    type State;

    fn num_states(&'a self) -> usize;

    fn state_iter(&'a self) -> States<'a, Self::State>;
}

/// A collection of unique [`BasisState`]s with associated level offsets, in
/// units of the base splitting `g0`.
///
/// This collection is backed by a single [`IndexMap`], which can be accessed
/// via [`AsRef`] and [`Deref`]. Its insertion order fixes the array index of
/// each state.
#[derive(Clone, Debug, PartialEq)]
pub struct Basis<S>
where S: Clone + Eq + Hash
{
    levels: IndexMap<S, f64>,
}

impl<S> AsRef<IndexMap<S, f64>> for Basis<S>
where S: Clone + Eq + Hash
{
    fn as_ref(&self) -> &IndexMap<S, f64> { &self.levels }
}

impl<S> Deref for Basis<S>
where S: Clone + Eq + Hash
{
    type Target = IndexMap<S, f64>;

    fn deref(&self) -> &Self::Target { &self.levels }
}

impl<S> Default for Basis<S>
where S: Clone + Eq + Hash
{
    fn default() -> Self { Self { levels: IndexMap::default() } }
}

impl<S> FromIterator<(S, f64)> for Basis<S>
where S: Clone + Eq + Hash
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self { levels: iter.into_iter().collect() }
    }
}

impl<'a, S> StateIter<'a> for Basis<S>
where S: Clone + Eq + Hash
{
    type State = S;

    fn num_states(&'a self) -> usize { self.levels.len() }

    fn state_iter(&'a self) -> States<'a, Self::State> {
        States { iter: self.levels.keys() }
    }
}

impl Basis<Mood> {
    /// The standard mood basis, with each state's level given by its
    /// `\Sigma_z` eigenvalue.
    pub fn mood() -> Self {
        Mood::ALL.iter().map(|s| (*s, s.sz())).collect()
    }
}

impl<S> Basis<S>
where S: Clone + Eq + Hash
{
    /// Create a new, empty basis.
    pub fn new() -> Self { Self::default() }

    /// Get the level offset of a particular basis state.
    pub fn get_level(&self, state: &S) -> Option<f64> {
        self.levels.get(state).copied()
    }

    /// Get an array representation of a particular basis state.
    ///
    /// The array is sized to match the number of states currently in `self`.
    pub fn get_vector(&self, state: &S) -> Option<nd::Array1<C64>> {
        self.levels.get_index_of(state)
            .and_then(|k| self.get_vector_index(k))
    }

    /// Get an array representation of a particular basis state by index.
    ///
    /// The array is sized to match the number of states currently in `self`.
    pub fn get_vector_index(&self, index: usize) -> Option<nd::Array1<C64>> {
        let n = self.levels.len();
        (index < n).then(|| {
            (0..n).map(|j| if j == index { C64::one() } else { C64::zero() })
                .collect()
        })
    }

    /// Get an array representation of a linear combination of basis states,
    /// with weights determined by a weighting function.
    ///
    /// The weighting function will be passed a state, its index, and its
    /// level. The result is not normalized.
    pub fn get_vector_weighted<F>(&self, weights: F) -> nd::Array1<C64>
    where F: Fn(&S, usize, f64) -> C64
    {
        self.levels.iter().enumerate()
            .map(|(index, (state, level))| weights(state, index, *level))
            .collect()
    }

    /// Get the projector `|s><s|` onto a particular basis state, which is also
    /// its density matrix.
    pub fn get_projector(&self, state: &S) -> Option<nd::Array2<C64>> {
        self.get_vector(state)
            .map(|diag| nd::Array2::from_diag(&diag))
    }

    /// Get the transition operator `|to><from|` taking `from` to `to`.
    pub fn get_transition(&self, from: &S, to: &S) -> Option<nd::Array2<C64>> {
        let a = self.get_vector(to)?;
        let b = self.get_vector(from)?;
        Some(outer_prod(&a, &b))
    }

    /// Get the symmetric ladder operator `|a><b| + |b><a|` between two states.
    pub fn get_ladder(&self, a: &S, b: &S) -> Option<nd::Array2<C64>> {
        Some(self.get_transition(a, b)? + self.get_transition(b, a)?)
    }

    /// Get the diagonal operator whose entries are the level offsets.
    pub fn level_operator(&self) -> nd::Array2<C64> {
        let diag: nd::Array1<C64>
            = self.levels.values().map(|l| C64::from(*l)).collect();
        nd::Array2::from_diag(&diag)
    }

    /// Get all pairs of distinct states that couple, each pair once, in basis
    /// order.
    pub fn coupled_pairs(&self) -> Vec<(&S, &S)>
    where S: BasisState
    {
        self.levels.keys().enumerate()
            .cartesian_product(self.levels.keys().enumerate())
            .filter(|((i, s1), (j, s2))| i < j && s1.couples_to(s2))
            .map(|((_, s1), (_, s2))| (s1, s2))
            .collect()
    }
}
