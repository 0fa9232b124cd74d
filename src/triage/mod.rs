//! Department recommendation, emergency detection and risk scoring.

pub mod classifier;
pub mod emergency;
pub mod engine;
pub mod fusion;
pub mod risk;
pub mod vitals;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{Classifier, ClassifierError, LogisticRegressionArtifact, LogisticRegressionClassifier};
pub use emergency::{EmergencyDetector, EmergencyMatch};
pub use engine::{Provenance, Recommendation, Screening, SimilarCase, TriageEngine};
pub use fusion::DepartmentScore;
pub use risk::{OverrideTrigger, RiskAssessment, RiskLevel, RiskPolicy, RiskScorer};
pub use vitals::VitalsSnapshot;
