//! Classifier adapter.
//!
//! The pretrained sequence classifier is an opaque external artifact; the
//! dashboard depends only on the narrow [`SequenceClassifier`] seam (tensor
//! in, probability vector out) so the real model can be swapped or mocked.
//! Inference is one sample per synchronous call, with no retries and no
//! batching.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DashboardError;
use crate::sequence::SequenceTensor;

/// Number of risk classes the model predicts over.
pub const CLASS_COUNT: usize = 3;

/// Cognitive-risk category, in the model's output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Normal,
    Mild,
    Dementia,
}

impl RiskClass {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(RiskClass::Normal),
            1 => Some(RiskClass::Mild),
            2 => Some(RiskClass::Dementia),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            RiskClass::Normal => 0,
            RiskClass::Mild => 1,
            RiskClass::Dementia => 2,
        }
    }

    /// Display label in the export locale.
    pub fn label(self) -> &'static str {
        match self {
            RiskClass::Normal => "정상",
            RiskClass::Mild => "경증",
            RiskClass::Dementia => "치매",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskClass::Normal => "normal",
            RiskClass::Mild => "mild",
            RiskClass::Dementia => "dementia",
        }
    }
}

/// Result of one classification: the argmax class and how sure the model was.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class: RiskClass,
    /// Raw argmax probability in `[0, 1]`.
    pub probability: f64,
    /// `probability × 100` rounded to two decimals, as displayed.
    pub confidence_pct: f64,
}

impl Prediction {
    /// Fold a probability vector into a prediction. The first maximum wins
    /// on ties.
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self, DashboardError> {
        if probabilities.len() != CLASS_COUNT {
            return Err(DashboardError::ModelOutput(format!(
                "expected {CLASS_COUNT} class probabilities, got {}",
                probabilities.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(DashboardError::ModelOutput(
                "probability vector contains a non-finite value".to_string(),
            ));
        }

        let mut best_index = 0;
        for (index, &p) in probabilities.iter().enumerate() {
            if p > probabilities[best_index] {
                best_index = index;
            }
        }
        let probability = probabilities[best_index];
        let class = RiskClass::from_index(best_index).ok_or_else(|| {
            DashboardError::ModelOutput(format!("no class for index {best_index}"))
        })?;

        Ok(Self {
            class,
            probability,
            confidence_pct: (probability * 100.0 * 100.0).round() / 100.0,
        })
    }

    /// Readout line for the dashboard, in the export locale.
    pub fn result_text(&self) -> String {
        format!(
            "분석결과 {:.2}% 확률로 {} 입니다.",
            self.confidence_pct,
            self.class.label()
        )
    }
}

/// Narrow seam to the pretrained model: one prepared sample in, one
/// probability vector over [`CLASS_COUNT`] classes out.
pub trait SequenceClassifier {
    fn class_probabilities(&self, input: &SequenceTensor) -> Result<Vec<f64>, DashboardError>;
}

/// Run one sample through a classifier and fold the result.
pub fn classify(
    classifier: &dyn SequenceClassifier,
    input: &SequenceTensor,
) -> Result<Prediction, DashboardError> {
    let probabilities = classifier.class_probabilities(input)?;
    debug!(?probabilities, "classifier returned");
    Prediction::from_probabilities(&probabilities)
}

/// Fixed-response classifier for tests and offline runs.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    probabilities: Vec<f64>,
}

impl StaticClassifier {
    pub fn new(probabilities: Vec<f64>) -> Self {
        Self { probabilities }
    }
}

impl SequenceClassifier for StaticClassifier {
    fn class_probabilities(&self, _input: &SequenceTensor) -> Result<Vec<f64>, DashboardError> {
        Ok(self.probabilities.clone())
    }
}

/// Request written to the inference program's stdin.
#[derive(Serialize)]
struct InferenceRequest<'a> {
    shape: [usize; 3],
    data: Vec<&'a [f64]>,
}

/// Response expected on the inference program's stdout.
#[derive(Deserialize)]
struct InferenceResponse {
    probabilities: Vec<f64>,
}

/// Classifier that shells out to the external inference program owning the
/// pretrained artifact.
///
/// The program is invoked as `<program> <model-path>` once per sample; the
/// sample travels as JSON on stdin (`{"shape": [1, 72, 51], "data": [...]}`)
/// and the program must print `{"probabilities": [p0, p1, p2]}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: PathBuf,
    model_path: PathBuf,
}

impl CommandClassifier {
    pub fn new(program: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            model_path: model_path.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SequenceClassifier for CommandClassifier {
    fn class_probabilities(&self, input: &SequenceTensor) -> Result<Vec<f64>, DashboardError> {
        let (batch, steps, features) = input.shape();
        let request = InferenceRequest {
            shape: [batch, steps, features],
            data: (0..steps).map(|t| input.step(t)).collect(),
        };
        let payload = serde_json::to_vec(&request)?;

        debug!(program = %self.program.display(), model = %self.model_path.display(), "invoking classifier");
        let mut child = Command::new(&self.program)
            .arg(&self.model_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DashboardError::ModelInvocation(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            DashboardError::ModelInvocation("inference program stdin unavailable".to_string())
        })?;
        stdin
            .write_all(&payload)
            .map_err(|e| DashboardError::ModelInvocation(format!("failed to write sample: {e}")))?;
        drop(stdin);

        let output = child.wait_with_output().map_err(|e| {
            DashboardError::ModelInvocation(format!("failed to wait for inference program: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DashboardError::ModelInvocation(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let response: InferenceResponse =
            serde_json::from_slice(&output.stdout).map_err(|e| {
                DashboardError::ModelOutput(format!("invalid probability payload: {e}"))
            })?;
        Ok(response.probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{MODEL_FEATURES, SEQUENCE_LEN};
    use std::io::Write as _;

    fn zero_tensor() -> SequenceTensor {
        SequenceTensor::from_steps(
            vec![vec![0.0; MODEL_FEATURES]; SEQUENCE_LEN],
            MODEL_FEATURES,
        )
    }

    #[test]
    fn class_mapping_is_fixed() {
        assert_eq!(RiskClass::from_index(0), Some(RiskClass::Normal));
        assert_eq!(RiskClass::from_index(1), Some(RiskClass::Mild));
        assert_eq!(RiskClass::from_index(2), Some(RiskClass::Dementia));
        assert_eq!(RiskClass::from_index(3), None);
        assert_eq!(RiskClass::Normal.label(), "정상");
        assert_eq!(RiskClass::Mild.label(), "경증");
        assert_eq!(RiskClass::Dementia.label(), "치매");
        assert_eq!(RiskClass::Dementia.index(), 2);
    }

    #[test]
    fn prediction_takes_argmax_and_rounds_the_percentage() {
        let prediction = Prediction::from_probabilities(&[0.1, 0.0772, 0.8228]).unwrap();
        assert_eq!(prediction.class, RiskClass::Dementia);
        assert_eq!(prediction.probability, 0.8228);
        assert_eq!(prediction.confidence_pct, 82.28);
    }

    #[test]
    fn first_maximum_wins_on_ties() {
        let prediction = Prediction::from_probabilities(&[0.4, 0.4, 0.2]).unwrap();
        assert_eq!(prediction.class, RiskClass::Normal);
    }

    #[test]
    fn wrong_vector_length_is_an_error() {
        let err = Prediction::from_probabilities(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, DashboardError::ModelOutput(_)));
    }

    #[test]
    fn non_finite_probability_is_an_error() {
        let err = Prediction::from_probabilities(&[0.5, f64::NAN, 0.5]).unwrap_err();
        assert!(matches!(err, DashboardError::ModelOutput(_)));
    }

    #[test]
    fn classify_folds_the_static_classifier_output() {
        let classifier = StaticClassifier::new(vec![0.2, 0.7, 0.1]);
        let prediction = classify(&classifier, &zero_tensor()).unwrap();
        assert_eq!(prediction.class, RiskClass::Mild);
        assert_eq!(prediction.confidence_pct, 70.0);
    }

    #[cfg(unix)]
    fn script_classifier(body: &str) -> (CommandClassifier, tempfile::TempPath) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        let path = file.into_temp_path();
        (CommandClassifier::new("sh", path.to_path_buf()), path)
    }

    #[cfg(unix)]
    #[test]
    fn command_classifier_round_trips_through_a_subprocess() {
        let (classifier, _guard) = script_classifier(
            "cat > /dev/null\necho '{\"probabilities\": [0.05, 0.15, 0.8]}'\n",
        );
        let prediction = classify(&classifier, &zero_tensor()).unwrap();
        assert_eq!(prediction.class, RiskClass::Dementia);
        assert_eq!(prediction.confidence_pct, 80.0);
    }

    #[cfg(unix)]
    #[test]
    fn command_classifier_surfaces_a_failing_program() {
        let (classifier, _guard) =
            script_classifier("cat > /dev/null\necho 'model file missing' >&2\nexit 3\n");
        let err = classifier.class_probabilities(&zero_tensor()).unwrap_err();
        match err {
            DashboardError::ModelInvocation(message) => {
                assert!(message.contains("model file missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn command_classifier_rejects_malformed_output() {
        let (classifier, _guard) = script_classifier("cat > /dev/null\necho 'not json'\n");
        let err = classifier.class_probabilities(&zero_tensor()).unwrap_err();
        assert!(matches!(err, DashboardError::ModelOutput(_)));
    }
}
