use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{Result, TriageError};
use crate::triage::risk::RiskPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "medtriage.toml";
pub const ENV_PREFIX: &str = "MEDTRIAGE";

pub const DEFAULT_CRITICAL_KEYWORDS: &[&str] = &[
    "chest pain",
    "cardiac",
    "heart attack",
    "unconscious",
    "difficulty breathing",
    "shortness of breath",
    "severe bleeding",
    "stroke",
    "paralysis",
    "sudden vision loss",
    "severe headache",
    "high fever",
];

pub const DEFAULT_EMERGENCY_PHRASES: &[&str] = &[
    "heart attack",
    "stroke",
    "severe bleeding",
    "unconscious",
    "difficulty breathing",
];


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub fusion: FusionConfig,
    pub risk: RiskConfig,
    pub classifier: ClassifierConfig,
    pub geo: GeoConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8010".to_string(),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `onnx` (in-process MiniLM), `hashing`, `ollama` or `openai`.
    pub provider: String,
    pub model: String,
    /// Directory holding `model.onnx` and `tokenizer.json` for `onnx`.
    pub model_dir: PathBuf,
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub fallback_enabled: bool,
    pub fallback_url: String,
    pub fallback_model: String,
    pub hashing_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "onnx".to_string(),
            model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            model_dir: PathBuf::from(crate::DEFAULT_ONNX_MODEL_DIR),
            url: crate::DEFAULT_OLLAMA_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            cache_size: crate::DEFAULT_CACHE_SIZE,
            cache_ttl_secs: crate::DEFAULT_CACHE_TTL,
            fallback_enabled: true,
            fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            fallback_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            hashing_dimension: crate::DEFAULT_EMBEDDING_DIM,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `groq` or `ollama`. Empty disables the assistant endpoints.
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub fallback_enabled: bool,
    pub fallback_url: String,
    pub fallback_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: crate::DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 300,
            timeout_secs: 60,
            fallback_enabled: false,
            fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            fallback_model: "llama3.2".to_string(),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub semantic_weight: f64,
    pub classifier_weight: f64,
    /// Neighbours pulled from the department index.
    pub search_k: usize,
    /// Length cap of the returned recommendation list.
    pub top_n: usize,
    pub similar_cases_k: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            classifier_weight: 0.4,
            search_k: 3,
            top_n: 3,
            similar_cases_k: 3,
        }
    }
}


/// Vital-sign limits beyond which a High verdict is forced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalLimits {
    pub heart_rate_max: f64,
    pub heart_rate_min: f64,
    pub systolic_max: f64,
    pub systolic_min: f64,
    pub temperature_max: f64,
}

impl Default for VitalLimits {
    fn default() -> Self {
        Self {
            heart_rate_max: 120.0,
            heart_rate_min: 40.0,
            systolic_max: 180.0,
            systolic_min: 90.0,
            temperature_max: 39.5,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub policy: RiskPolicy,
    pub high_threshold: f64,
    pub medium_threshold: f64,
    pub emergency_similarity_threshold: f64,
    pub limits: VitalLimits,
    pub critical_keywords: Vec<String>,
    pub emergency_phrases: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            policy: RiskPolicy::Weighted,
            high_threshold: 20.0,
            medium_threshold: 10.0,
            emergency_similarity_threshold: 0.6,
            limits: VitalLimits::default(),
            critical_keywords: DEFAULT_CRITICAL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            emergency_phrases: DEFAULT_EMERGENCY_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub artifact_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            artifact_path: Some(PathBuf::from("models/trained_model/classifier.json")),
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub google_api_key: Option<String>,
    pub google_places_url: String,
    pub overpass_url: String,
    pub radius_m: u32,
    pub google_timeout_secs: u64,
    pub overpass_timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_places_url: "https://maps.googleapis.com/maps/api/place/textsearch/json".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            radius_m: 5000,
            google_timeout_secs: 5,
            overpass_timeout_secs: 10,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("medical_ai.db"),
        }
    }
}

impl TriageConfig {

    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Layers built-in defaults, the optional file at `path` and
    /// `MEDTRIAGE_*` variables (nested keys joined with `__`).
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.apply_conventional_env();
        config.validate()?;

        debug!(
            "Configuration loaded: embedding={}/{}, llm={}/{}, policy={:?}",
            config.embedding.provider,
            config.embedding.model,
            config.llm.provider,
            config.llm.model,
            config.risk.policy
        );

        Ok(config)
    }

    /// Keys the frontend deployment already ships under their usual names.
    fn apply_conventional_env(&mut self) {
        if self.llm.api_key.is_none() {
            if let Ok(key) = std::env::var("GROQ_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
        if self.geo.google_api_key.is_none() {
            if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
                self.geo.google_api_key = Some(key);
            }
        }
        if self.embedding.api_key.is_none() && self.embedding.provider == "openai" {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.embedding.api_key = Some(key);
            }
        }
    }


    pub fn validate(&self) -> Result<()> {
        let fusion = &self.fusion;
        if fusion.semantic_weight < 0.0 || fusion.classifier_weight < 0.0 {
            return Err(TriageError::Config("fusion weights must be non-negative".to_string()));
        }
        if fusion.semantic_weight + fusion.classifier_weight > 1.0 + f64::EPSILON {
            return Err(TriageError::Config(format!(
                "fusion weights sum to {} (> 1.0)",
                fusion.semantic_weight + fusion.classifier_weight
            )));
        }
        if fusion.search_k == 0 || fusion.top_n == 0 {
            return Err(TriageError::Config("search_k and top_n must be at least 1".to_string()));
        }

        let risk = &self.risk;
        if risk.medium_threshold > risk.high_threshold {
            return Err(TriageError::Config(format!(
                "medium threshold {} exceeds high threshold {}",
                risk.medium_threshold, risk.high_threshold
            )));
        }
        if !(0.0..=1.0).contains(&risk.emergency_similarity_threshold) {
            return Err(TriageError::Config(
                "emergency_similarity_threshold must lie in [0, 1]".to_string(),
            ));
        }

        let uses_hashing = matches!(self.embedding.provider.as_str(), "hashing" | "onnx");
        if uses_hashing && self.embedding.hashing_dimension == 0 {
            return Err(TriageError::Config("hashing_dimension must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = TriageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fusion.semantic_weight, 0.6);
        assert_eq!(config.fusion.classifier_weight, 0.4);
        assert_eq!(config.risk.high_threshold, 20.0);
        assert_eq!(config.risk.medium_threshold, 10.0);
        assert!(config.risk.critical_keywords.iter().any(|k| k == "severe headache"));
        assert_eq!(config.risk.emergency_phrases.len(), 5);
        assert_eq!(config.embedding.provider, "onnx");
        assert_eq!(config.embedding.model_dir, PathBuf::from("models/all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_rejects_overweight_fusion() {
        let mut config = TriageConfig::default();
        config.fusion.classifier_weight = 0.7;
        assert!(matches!(config.validate(), Err(TriageError::Config(_))));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = TriageConfig::default();
        config.fusion.semantic_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = TriageConfig::default();
        config.risk.medium_threshold = 25.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_top_n() {
        let mut config = TriageConfig::default();
        config.fusion.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medtriage.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[embedding]
provider = "hashing"
hashing_dimension = 64

[fusion]
semantic_weight = 0.7
classifier_weight = 0.3

[risk]
policy = "threshold"
"#
        )
        .unwrap();

        let config = TriageConfig::load_from(&path).unwrap();
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.embedding.hashing_dimension, 64);
        assert_eq!(config.fusion.semantic_weight, 0.7);
        assert_eq!(config.fusion.top_n, 3);
        assert_eq!(config.risk.policy, RiskPolicy::Threshold);
        assert_eq!(config.storage.database_path, PathBuf::from("medical_ai.db"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TriageConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8010");
        assert_eq!(config.fusion.search_k, 3);
    }
}
