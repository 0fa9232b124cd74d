pub mod api;
pub mod core;
pub mod geo;
pub mod knowledge;
pub mod llm;
pub mod storage;
pub mod triage;
pub mod utils;

pub use utils::{round2, safe_truncate, safe_truncate_ellipsis};


pub use core::config::TriageConfig;
pub use core::error::{Result, TriageError};
pub use llm::embeddings::{EmbeddingGenerator, EmbeddingProvider};
pub use triage::{Recommendation, RiskAssessment, RiskLevel, TriageEngine, VitalsSnapshot};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";


pub const DEFAULT_EMBEDDING_DIM: usize = 384;


pub const DEFAULT_ONNX_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";


pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
