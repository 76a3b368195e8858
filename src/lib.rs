//! weaklabel: a label model for programmatic weak supervision.
//!
//! This crate estimates the reliability of multiple noisy labeling sources
//! (labeling functions) from their votes alone, with no ground-truth labels,
//! and combines the estimated reliabilities into probabilistic labels for
//! each data point. Sources are assumed conditionally independent given the
//! true label and unipolar (each source votes for at most one class per
//! task).
//!
//! The design favors small, testable modules: the overlaps estimator, the
//! momentum-SGD fitter, and the posterior predictor are separable and each
//! covered by its own tests.
pub mod config;
pub mod error;
pub mod label_model;
pub mod multitask;
pub mod optim;
pub mod overlaps;
pub mod synthetic;

pub use config::{LabelModelConfig, SgdConfig, TrainConfig};
pub use error::LabelModelError;
pub use label_model::{LabelModel, TrainReport};
pub use multitask::MultiTask;
