//! # ht-optimizer
//!
//! Search-space sampling and trial bookkeeping for Hypertune.
//!
//! Provides expression trees describing a search space, a capability-driven
//! evaluator that samples them with a single threaded random state, the
//! domain adapter that normalizes objective results, and the trial store
//! that search algorithms query for the best configuration so far.

mod capabilities;
mod config;
mod domain;
mod evaluator;
mod expr;
mod trials;

pub use capabilities::{choice, literal, loguniform, quniform, randint, standard_registry, uniform};
pub use config::ExperimentConfig;
pub use domain::{normalize_result, Domain, FnObjective, Objective};
pub use evaluator::{Capability, CapabilityRegistry, Evaluator};
pub use expr::{Expr, Params, CAPABILITY_KEY};
pub use trials::Trials;
