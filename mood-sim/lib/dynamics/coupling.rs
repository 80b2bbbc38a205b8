//! Time-dependent coupling strengths shaped by trigger events.
//!
//! Each coupling channel has a constant baseline that is pulled down by every
//! trigger that has already fired:
//! ```text
//! f_c(t) = b_c - \sum_{i : t_i <= t} r^i s_c(I_i, t) exp(-2 I_i (t - t_i)^2)
//! ```
//! where `r` is the resilience factor and `i` is the trigger's position in the
//! input list. The weighting follows input order, not firing order.

use std::fmt;
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::hilbert::Mood;

/// Default resilience factor `r`.
pub const DEFAULT_RESILIENCE: f64 = 0.9;

/// A discrete event perturbing the couplings from `time` onward.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Firing time, in days.
    pub time: f64,
    /// Intensity; must be positive.
    pub intensity: f64,
}

impl Trigger {
    /// Create a new `Trigger`.
    pub fn new(time: f64, intensity: f64) -> Self { Self { time, intensity } }

    /// Place `n` triggers of equal intensity at whole-day multiples of
    /// `floor(t_max / (n + 1))`.
    pub fn evenly_spaced(n: usize, t_max: f64, intensity: f64) -> Vec<Self> {
        let spacing = (t_max / (n + 1) as f64).floor();
        (1..=n)
            .map(|k| Self::new(spacing * k as f64, intensity))
            .collect()
    }

    /// Gaussian envelope `exp(-2 I (t - t_i)^2)` if the trigger has fired by
    /// time `t`, zero otherwise.
    pub fn envelope(&self, t: f64) -> f64 {
        if t >= self.time {
            (-2.0 * self.intensity * (t - self.time).powi(2)).exp()
        } else {
            0.0
        }
    }
}

/// Names one of the three drive channels between pairs of mood states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Neutral ↔ euphoric.
    GU,
    /// Neutral ↔ depressive.
    GD,
    /// Euphoric ↔ depressive.
    UD,
}

impl Channel {
    /// All channels, in the order their terms enter the Hamiltonian.
    pub const ALL: [Channel; 3] = [Self::GU, Self::GD, Self::UD];

    /// Coupling strength in the absence of triggers.
    pub fn baseline(&self) -> f64 {
        match *self {
            Self::GU => 0.10,
            Self::GD => 0.10,
            Self::UD => 0.05,
        }
    }

    /// Channel-specific modulation of a trigger's contribution.
    pub fn shape(&self, intensity: f64, t: f64) -> f64 {
        match *self {
            Self::GU => (intensity / 2.0 * t).cos(),
            Self::GD => (intensity / 2.0 * t).sin(),
            Self::UD => intensity.sqrt(),
        }
    }

    /// The pair of states linked by the channel.
    pub fn states(&self) -> (Mood, Mood) {
        match *self {
            Self::GU => (Mood::Neutral, Mood::Euphoric),
            Self::GD => (Mood::Neutral, Mood::Depressive),
            Self::UD => (Mood::Euphoric, Mood::Depressive),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.states();
        write!(f, "{}{}", a.letter(), b.letter())
    }
}

/// A single coupling function `f_c(t)`.
///
/// Owns a copy of the trigger list, so it can be evaluated independently of
/// whatever produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Coupling {
    channel: Channel,
    triggers: Vec<Trigger>,
    resilience: f64,
}

impl Coupling {
    /// Create a new `Coupling`.
    pub fn new(channel: Channel, triggers: &[Trigger], resilience: f64) -> Self {
        Self { channel, triggers: triggers.to_vec(), resilience }
    }

    /// Return the channel.
    pub fn channel(&self) -> Channel { self.channel }

    /// Return the triggers, in input order.
    pub fn triggers(&self) -> &[Trigger] { &self.triggers }

    /// Return the resilience factor.
    pub fn resilience(&self) -> f64 { self.resilience }

    /// Return `true` if the coupling never departs from its baseline.
    pub fn is_constant(&self) -> bool { self.triggers.is_empty() }

    /// Evaluate the coupling at time `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let mut weight: f64 = 1.0;
        let mut effect: f64 = 0.0;
        for trigger in self.triggers.iter() {
            if t >= trigger.time {
                effect
                    += weight
                    * self.channel.shape(trigger.intensity, t)
                    * trigger.envelope(t);
            }
            weight *= self.resilience;
        }
        self.channel.baseline() - effect
    }

    /// Evaluate the coupling over an array of times.
    pub fn eval_grid(&self, time: &nd::Array1<f64>) -> nd::Array1<f64> {
        time.mapv(|t| self.eval(t))
    }
}

/// Build the three coupling functions, in [`Channel::ALL`] order.
pub fn build_couplings(triggers: &[Trigger], resilience: f64) -> [Coupling; 3] {
    Channel::ALL.map(|channel| Coupling::new(channel, triggers, resilience))
}
