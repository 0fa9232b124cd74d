

pub mod config;
pub mod error;

pub use config::{
    ClassifierConfig, EmbeddingConfig, FusionConfig, GeoConfig, LlmConfig, RiskConfig,
    ServerConfig, StorageConfig, TriageConfig, VitalLimits,
};
pub use error::{Result, TriageError};
