#![allow(non_snake_case)]

//! Time evolution of a three-level "mood" open quantum system.
//!
//! A neutral state `|g>` is coupled to euphoric `|u>` and depressive `|d>`
//! states by drive terms whose strengths are knocked down by discrete trigger
//! events, and relaxes through three dissipation channels. The density matrix
//! is evolved under the Lindblad master equation and the population of each
//! state is reported on a uniform time grid.
//!
//! ```no_run
//! use mood_sim::{ SimParams, simulate };
//!
//! let params = SimParams::default();
//! let result = simulate(&params)?;
//! println!("{:?}", result.final_populations());
//! # Ok::<(), mood_sim::SimError>(())
//! ```

pub mod error;
pub mod utils;
pub mod config;
pub mod hilbert;
pub mod dynamics;
pub mod solve;
pub mod sim;

pub use error::{ SimError, SimResult };
pub use config::{ SimParams, SolverConfig };
pub use hilbert::{ Basis, Mood };
pub use dynamics::{ BlendMode, InitialWeights, MoodModel, Trigger, MAX_TRIGGERS };
pub use solve::StepStats;
pub use sim::{ SimulationResult, simulate };
