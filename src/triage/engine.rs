use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::classifier::Classifier;
use super::emergency::{EmergencyDetector, EmergencyMatch};
use super::fusion::{DepartmentScore, distance_percentages, fuse, rank, top_classes};
use super::risk::{RiskAssessment, RiskScorer};
use super::vitals::VitalsSnapshot;
use crate::core::config::{FusionConfig, TriageConfig};
use crate::core::error::{Result, TriageError};
use crate::knowledge::{DepartmentEntry, KnowledgeIndex, TrainingCase, default_departments, default_training_cases};
use crate::llm::embeddings::{Embedding, EmbeddingProvider};


/// Which scoring pathway produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provenance {
    Semantic,
    Hybrid,
    Unavailable,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarCase {
    pub example_text: String,
    pub department: String,
    pub distance: f32,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub departments: Vec<DepartmentScore>,
    pub similar_cases: Vec<SimilarCase>,
    pub provenance: Provenance,
}

impl Recommendation {
    fn empty(provenance: Provenance) -> Self {
        Self {
            departments: Vec::new(),
            similar_cases: Vec::new(),
            provenance,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.provenance == Provenance::Unavailable
    }
}


/// Outcome of [`TriageEngine::screen`].
#[derive(Debug, Clone, PartialEq)]
pub enum Screening {
    Emergency(EmergencyMatch),
    Routine(Recommendation),
}


struct LoadedIndexes {
    departments: KnowledgeIndex<DepartmentEntry>,
    cases: Option<KnowledgeIndex<TrainingCase>>,
    emergency: EmergencyDetector,
}

enum EngineState {
    Ready(LoadedIndexes),
    Unavailable(String),
}


/// Department recommendation and risk assessment over a fixed knowledge
/// table. Built once at startup and shared behind an `Arc`. Model loading
/// happens exactly once, on [`TriageEngine::warm_up`] or the first request.
pub struct TriageEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: Option<Arc<dyn Classifier>>,
    departments: Vec<DepartmentEntry>,
    cases: Vec<TrainingCase>,
    fusion: FusionConfig,
    scorer: RiskScorer,
    state: OnceCell<EngineState>,
}

impl TriageEngine {
    /// Engine over the built-in department and case tables.
    pub fn new(
        config: &TriageConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self> {
        Self::with_tables(config, default_departments(), default_training_cases(), embedder, classifier)
    }

    pub fn with_tables(
        config: &TriageConfig,
        departments: Vec<DepartmentEntry>,
        cases: Vec<TrainingCase>,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self> {
        config.validate()?;
        if departments.is_empty() {
            return Err(TriageError::EmptyKnowledgeTable("department table"));
        }

        info!(
            "Triage engine configured: departments={}, cases={}, classifier={}, policy={}",
            departments.len(),
            cases.len(),
            classifier.is_some(),
            config.risk.policy
        );

        Ok(Self {
            embedder,
            classifier,
            departments,
            cases,
            fusion: config.fusion.clone(),
            scorer: RiskScorer::new(config.risk.clone()),
            state: OnceCell::new(),
        })
    }

    /// Forces the one-time load. Returns whether the engine is usable.
    pub async fn warm_up(&self) -> bool {
        matches!(self.state().await, EngineState::Ready(_))
    }

    pub async fn is_ready(&self) -> bool {
        self.warm_up().await
    }

    /// Reason the load failed, if it did.
    pub async fn unavailable_reason(&self) -> Option<String> {
        match self.state().await {
            EngineState::Ready(_) => None,
            EngineState::Unavailable(reason) => Some(reason.clone()),
        }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn departments(&self) -> &[DepartmentEntry] {
        &self.departments
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    async fn state(&self) -> &EngineState {
        self.state.get_or_init(|| self.load()).await
    }

    async fn load(&self) -> EngineState {
        match self.try_load().await {
            Ok(indexes) => {
                info!(
                    "Triage engine ready: model={}, dims={}",
                    self.embedder.model_name(),
                    indexes.departments.dimension()
                );
                EngineState::Ready(indexes)
            }
            Err(e) => {
                error!("Triage engine unavailable: {}", e);
                EngineState::Unavailable(e.to_string())
            }
        }
    }

    async fn try_load(&self) -> Result<LoadedIndexes> {
        self.embedder.load().await?;
        let embedder = self.embedder.as_ref();

        let departments = KnowledgeIndex::build(self.departments.clone(), embedder).await?;
        let cases = if self.cases.is_empty() {
            None
        } else {
            Some(KnowledgeIndex::build(self.cases.clone(), embedder).await?)
        };

        let risk = self.scorer.config();
        let emergency =
            EmergencyDetector::build(&risk.emergency_phrases, risk.emergency_similarity_threshold, embedder).await?;

        Ok(LoadedIndexes {
            departments,
            cases,
            emergency,
        })
    }

    /// Ranked department recommendation for free-text symptoms. Never fails:
    /// an unusable embedder yields [`Provenance::Unavailable`] and empty text
    /// yields an empty list.
    pub async fn recommend(&self, symptom_text: &str) -> Recommendation {
        let (indexes, query) = match self.embed_query(symptom_text).await {
            Ok(embedded) => embedded,
            Err(rec) => return rec,
        };
        self.recommend_embedded(indexes, &query)
    }

    /// Emergency guard followed by recommendation, encoding the text once.
    /// The recommendation is skipped when an emergency phrase matches.
    pub async fn screen(&self, symptom_text: &str) -> Screening {
        let (indexes, query) = match self.embed_query(symptom_text).await {
            Ok(embedded) => embedded,
            Err(rec) => return Screening::Routine(rec),
        };

        match indexes.emergency.best_match(&query).filter(|m| m.triggered) {
            Some(hit) => Screening::Emergency(hit),
            None => Screening::Routine(self.recommend_embedded(indexes, &query)),
        }
    }

    /// Provenance reported when the engine is usable.
    pub fn mode(&self) -> Provenance {
        if self.classifier.is_some() {
            Provenance::Hybrid
        } else {
            Provenance::Semantic
        }
    }

    /// Loaded indexes plus the query embedding, or the empty recommendation
    /// to return instead.
    async fn embed_query(
        &self,
        symptom_text: &str,
    ) -> std::result::Result<(&LoadedIndexes, Embedding), Recommendation> {
        let EngineState::Ready(indexes) = self.state().await else {
            return Err(Recommendation::empty(Provenance::Unavailable));
        };

        let text = symptom_text.trim();
        if text.is_empty() {
            return Err(Recommendation::empty(self.mode()));
        }

        match self.embedder.encode(text).await {
            Ok(query) => Ok((indexes, query)),
            Err(e) => {
                warn!("Failed to encode symptoms, recommendation unavailable: {}", e);
                Err(Recommendation::empty(Provenance::Unavailable))
            }
        }
    }

    fn recommend_embedded(&self, indexes: &LoadedIndexes, query: &Embedding) -> Recommendation {
        let neighbors = match indexes.departments.search(query, self.fusion.search_k) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!("Department search failed: {}", e);
                return Recommendation::empty(Provenance::Unavailable);
            }
        };

        let distances: Vec<f32> = neighbors.iter().map(|n| n.distance).collect();
        let semantic: Vec<DepartmentScore> = neighbors
            .iter()
            .zip(distance_percentages(&distances))
            .filter_map(|(n, percent)| {
                indexes
                    .departments
                    .get(n.position)
                    .map(|d| DepartmentScore::new(d.name.clone(), percent))
            })
            .collect();

        let similar_cases = self.similar_cases(indexes, query);

        let (departments, provenance) = match self.classify(query) {
            Some(classified) => (fuse(&semantic, &classified, &self.fusion), Provenance::Hybrid),
            None => (rank(semantic, self.fusion.top_n), Provenance::Semantic),
        };

        debug!(
            "Recommendation ({}): {:?}",
            provenance,
            departments.iter().map(|d| d.department.as_str()).collect::<Vec<_>>()
        );

        Recommendation {
            departments,
            similar_cases,
            provenance,
        }
    }

    fn classify(&self, query: &[f32]) -> Option<Vec<DepartmentScore>> {
        let classifier = self.classifier.as_ref()?;
        let classes = classifier.classes();
        match classifier.predict_proba(query) {
            Ok(probabilities) if probabilities.len() == classes.len() => {
                Some(top_classes(classes, &probabilities, self.fusion.search_k))
            }
            Ok(probabilities) => {
                warn!(
                    "Classifier returned {} probabilities for {} classes, using semantic scores only",
                    probabilities.len(),
                    classes.len()
                );
                None
            }
            Err(e) => {
                warn!("Classifier failed, using semantic scores only: {}", e);
                None
            }
        }
    }

    fn similar_cases(&self, indexes: &LoadedIndexes, query: &Embedding) -> Vec<SimilarCase> {
        let Some(cases) = &indexes.cases else {
            return Vec::new();
        };

        match cases.search(query, self.fusion.similar_cases_k) {
            Ok(neighbors) => neighbors
                .into_iter()
                .filter_map(|n| {
                    cases.get(n.position).map(|case| SimilarCase {
                        example_text: case.text.clone(),
                        department: case.department.clone(),
                        distance: n.distance,
                    })
                })
                .collect(),
            Err(e) => {
                warn!("Similar case lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Closest emergency phrase for `text`. `None` when the engine is
    /// unavailable, the text is empty or encoding fails.
    pub async fn detect_emergency(&self, text: &str) -> Option<EmergencyMatch> {
        let EngineState::Ready(indexes) = self.state().await else {
            return None;
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match self.embedder.encode(text).await {
            Ok(query) => indexes.emergency.best_match(&query),
            Err(e) => {
                warn!("Emergency check skipped, encoding failed: {}", e);
                None
            }
        }
    }

    /// Risk level for a vitals snapshot. The semantic emergency check is
    /// included when the embedder is usable; rule-based checks always run.
    pub async fn assess_risk(&self, vitals: &VitalsSnapshot) -> RiskAssessment {
        let similarity = self.detect_emergency(&vitals.symptoms).await.map(|m| m.similarity);
        self.scorer.assess(vitals, similarity)
    }
}
