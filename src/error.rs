use std::error::Error;
use std::fmt;

/// Custom error type for label-model input validation failures.
///
/// Every variant is fatal: the model never attempts local recovery, and
/// validation runs eagerly at the train/predict entry points before any
/// parameter state is allocated or mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelModelError {
    /// A labeling source cast more than one distinct non-abstain vote value
    /// on a single task, violating the unipolar assumption.
    NonUnipolar {
        source: usize,
        task: usize,
        values: Vec<usize>,
    },
    /// A task's vote matrix disagrees with the others on the number of data
    /// points or sources.
    ShapeMismatch {
        task: usize,
        found: usize,
        expected: usize,
    },
    /// A vote value exceeds the task's declared label cardinality.
    CardinalityViolation {
        task: usize,
        cardinality: usize,
        max_value: usize,
    },
    /// The label map was omitted while more than one task was supplied, so
    /// task cardinalities cannot be inferred unambiguously.
    AmbiguousLabelMap,
}

impl fmt::Display for LabelModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LabelModelError::NonUnipolar {
                source,
                task,
                values,
            } => write!(
                f,
                "source {} on task {} is non-unipolar: votes for classes {:?}",
                source, task, values
            ),
            LabelModelError::ShapeMismatch {
                task,
                found,
                expected,
            } => write!(
                f,
                "vote matrix for task {} has dimension {}, but should have {}",
                task, found, expected
            ),
            LabelModelError::CardinalityViolation {
                task,
                cardinality,
                max_value,
            } => write!(
                f,
                "task {} has cardinality {}, but its vote matrix has max value {}",
                task, cardinality, max_value
            ),
            LabelModelError::AmbiguousLabelMap => write!(
                f,
                "label map cannot be inferred when more than one task is supplied"
            ),
        }
    }
}

impl Error for LabelModelError {}
