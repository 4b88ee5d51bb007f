//! Model input preparation.
//!
//! Builds the fixed-shape sequence tensor the pretrained classifier expects
//! from one identity's row history. Preparation happens in two literal
//! stages that together form the model's input contract:
//!
//! 1. hold-last replication: histories shorter than [`HOLD_LAST_TARGET`]
//!    rows are extended by repeating the final observed row;
//! 2. fixed-length windowing: the sequence is cut to [`SEQUENCE_LEN`] steps,
//!    truncating at the back when longer and zero-filling at the back when
//!    shorter.
//!
//! The two targets disagree (93 vs 72); the trained model was fitted against
//! exactly this preprocessing, so both stages stay as they are.

use tracing::debug;

use crate::error::DashboardError;
use crate::table::RecordTable;

/// Number of time steps the classifier consumes.
pub const SEQUENCE_LEN: usize = 72;

/// Number of features per time step (metric columns in the export).
pub const MODEL_FEATURES: usize = 51;

/// Target length for hold-last replication, applied before windowing.
pub const HOLD_LAST_TARGET: usize = 93;

/// Single-sample numeric tensor of shape `(1, steps, features)`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceTensor {
    steps: usize,
    features: usize,
    data: Vec<f64>,
}

impl SequenceTensor {
    pub(crate) fn from_steps(steps: Vec<Vec<f64>>, features: usize) -> Self {
        let step_count = steps.len();
        let mut data = Vec::with_capacity(step_count * features);
        for step in steps {
            data.extend(step);
        }
        Self {
            steps: step_count,
            features,
            data,
        }
    }

    /// Tensor shape as `(batch, steps, features)`; batch is always 1.
    pub fn shape(&self) -> (usize, usize, usize) {
        (1, self.steps, self.features)
    }

    /// Feature vector at time step `t`.
    pub fn step(&self, t: usize) -> &[f64] {
        let start = t * self.features;
        &self.data[start..start + self.features]
    }

    /// Flat row-major view of the whole sample.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Build the classifier input for one identity from the full table.
///
/// The identity must have at least one row; the table must carry exactly
/// [`MODEL_FEATURES`] metric columns.
pub fn build_model_input(
    table: &RecordTable,
    identity: &str,
) -> Result<SequenceTensor, DashboardError> {
    let rows = table.rows_for(identity);
    if rows.is_empty() {
        return Err(DashboardError::UnknownIdentity(identity.to_string()));
    }

    let features = table.metric_columns().len();
    if features != MODEL_FEATURES {
        return Err(DashboardError::FeatureMismatch {
            expected: MODEL_FEATURES,
            actual: features,
        });
    }

    let steps: Vec<Vec<f64>> = rows.iter().map(|row| row.metrics.clone()).collect();
    let steps = hold_last_replicate(steps);
    let steps = window_post(steps, features);
    let tensor = SequenceTensor::from_steps(steps, features);

    debug!(identity, shape = ?tensor.shape(), "model input prepared");
    Ok(tensor)
}

/// Extend a history to [`HOLD_LAST_TARGET`] rows by repeating the last real
/// row. Histories already at or past the target are left untouched (the
/// repeat count clamps to zero, never negative).
fn hold_last_replicate(mut steps: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    if steps.len() < HOLD_LAST_TARGET {
        let last = steps[steps.len() - 1].clone();
        let repeats = HOLD_LAST_TARGET - steps.len();
        for _ in 0..repeats {
            steps.push(last.clone());
        }
    }
    steps
}

/// Cut or fill the sequence to [`SEQUENCE_LEN`] steps at the back: keep the
/// first `SEQUENCE_LEN` rows when longer, append zero rows when shorter.
fn window_post(mut steps: Vec<Vec<f64>>, features: usize) -> Vec<Vec<f64>> {
    steps.truncate(SEQUENCE_LEN);
    while steps.len() < SEQUENCE_LEN {
        steps.push(vec![0.0; features]);
    }
    steps
}
