use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};


#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to read classifier artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse classifier artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid classifier artifact: {0}")]
    InvalidArtifact(String),

    #[error("Input dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Classifier produced non-finite probabilities")]
    NonFinite,
}


/// Secondary department classifier over symptom embeddings.
pub trait Classifier: Send + Sync {
    fn classes(&self) -> &[String];

    /// Probabilities aligned with [`Classifier::classes`].
    fn predict_proba(&self, embedding: &[f32]) -> Result<Vec<f64>, ClassifierError>;
}


/// Offline-trained logistic regression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionArtifact {
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}


#[derive(Debug, Clone)]
pub struct LogisticRegressionClassifier {
    artifact: LogisticRegressionArtifact,
    dimension: usize,
}

impl LogisticRegressionClassifier {
    pub fn from_artifact(artifact: LogisticRegressionArtifact) -> Result<Self, ClassifierError> {
        let n_classes = artifact.classes.len();
        if n_classes < 2 {
            return Err(ClassifierError::InvalidArtifact(format!(
                "need at least two classes, got {}",
                n_classes
            )));
        }

        let rows = artifact.coef.len();
        let binary = n_classes == 2 && rows == 1;
        if rows != n_classes && !binary {
            return Err(ClassifierError::InvalidArtifact(format!(
                "{} coefficient rows for {} classes",
                rows, n_classes
            )));
        }
        if artifact.intercept.len() != rows {
            return Err(ClassifierError::InvalidArtifact(format!(
                "{} intercepts for {} coefficient rows",
                artifact.intercept.len(),
                rows
            )));
        }

        let dimension = artifact.coef[0].len();
        if dimension == 0 || artifact.coef.iter().any(|row| row.len() != dimension) {
            return Err(ClassifierError::InvalidArtifact(
                "coefficient rows must share one non-zero width".to_string(),
            ));
        }

        Ok(Self { artifact, dimension })
    }

    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = std::fs::read_to_string(path)?;
        let artifact: LogisticRegressionArtifact = serde_json::from_str(&raw)?;
        let classifier = Self::from_artifact(artifact)?;
        info!(
            "Classifier loaded from {}: classes={}, dims={}",
            path.display(),
            classifier.artifact.classes.len(),
            classifier.dimension
        );
        Ok(classifier)
    }

    /// Loads the artifact when present. A missing or broken artifact only
    /// disables hybrid fusion.
    pub fn load_optional(path: Option<&Path>) -> Option<Arc<dyn Classifier>> {
        let path = path?;
        if !path.exists() {
            info!("No classifier artifact at {}, running semantic-only", path.display());
            return None;
        }

        match Self::load(path) {
            Ok(classifier) => Some(Arc::new(classifier)),
            Err(e) => {
                warn!("Ignoring classifier artifact {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn logits(&self, x: &[f32]) -> Vec<f64> {
        self.artifact
            .coef
            .iter()
            .zip(&self.artifact.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * f64::from(*v)).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LogisticRegressionClassifier {
    fn classes(&self) -> &[String] {
        &self.artifact.classes
    }

    fn predict_proba(&self, embedding: &[f32]) -> Result<Vec<f64>, ClassifierError> {
        if embedding.len() != self.dimension {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let logits = self.logits(embedding);
        let probabilities = if logits.len() == 1 {
            let p = sigmoid(logits[0]);
            vec![1.0 - p, p]
        } else {
            softmax(&logits)
        };

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::NonFinite);
        }
        Ok(probabilities)
    }
}


fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn three_class() -> LogisticRegressionArtifact {
        LogisticRegressionArtifact {
            classes: vec!["Cardiology".into(), "Dermatology".into(), "Neurology".into()],
            coef: vec![vec![2.0, 0.0], vec![0.0, 2.0], vec![0.0, 0.0]],
            intercept: vec![0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_softmax_probabilities_sum_to_one() {
        let classifier = LogisticRegressionClassifier::from_artifact(three_class()).unwrap();
        let probs = classifier.predict_proba(&[1.0, 0.0]).unwrap();

        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[1]);
        assert!((probs[1] - probs[2]).abs() < 1e-12);
    }

    #[test]
    fn test_binary_single_row_uses_sigmoid() {
        let artifact = LogisticRegressionArtifact {
            classes: vec!["General Medicine".into(), "Emergency".into()],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };
        let classifier = LogisticRegressionClassifier::from_artifact(artifact).unwrap();
        let probs = classifier.predict_proba(&[0.0]).unwrap();
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn test_rejects_malformed_artifacts() {
        let mut artifact = three_class();
        artifact.intercept.pop();
        assert!(matches!(
            LogisticRegressionClassifier::from_artifact(artifact),
            Err(ClassifierError::InvalidArtifact(_))
        ));

        let mut ragged = three_class();
        ragged.coef[1] = vec![1.0];
        assert!(LogisticRegressionClassifier::from_artifact(ragged).is_err());

        let single = LogisticRegressionArtifact {
            classes: vec!["Only".into()],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };
        assert!(LogisticRegressionClassifier::from_artifact(single).is_err());
    }

    #[test]
    fn test_dimension_mismatch_at_predict_time() {
        let classifier = LogisticRegressionClassifier::from_artifact(three_class()).unwrap();
        assert!(matches!(
            classifier.predict_proba(&[1.0, 2.0, 3.0]),
            Err(ClassifierError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_load_optional_handles_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(LogisticRegressionClassifier::load_optional(Some(&missing)).is_none());
        assert!(LogisticRegressionClassifier::load_optional(None).is_none());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert!(LogisticRegressionClassifier::load_optional(Some(&broken)).is_none());

        let good = dir.path().join("classifier.json");
        let mut file = std::fs::File::create(&good).unwrap();
        file.write_all(serde_json::to_string(&three_class()).unwrap().as_bytes()).unwrap();
        let loaded = LogisticRegressionClassifier::load_optional(Some(&good)).unwrap();
        assert_eq!(loaded.classes().len(), 3);
    }
}
