//! Bayesian assignment of PSI distributions to modalities.
//!
//! A closed family of Beta models scores each PSI vector; the selector picks
//! the best-supported one and the engine does so for every (event, group).

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod selector;
pub mod table;

pub use config::{FamilyParams, ModalityConfig};
pub use engine::{events_by_group, AssignmentRun, Failure, ModalityEngine};
pub use error::ModalityError;
pub use model::{log_likelihood, BetaModel, Modality, ModelFamily};
pub use selector::{Call, ModelScore, Outcome, Selector, Shortfall};
pub use table::{Assignment, EventGroup, ModalityTable};
