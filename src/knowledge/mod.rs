//! Static knowledge used by the recommendation engine: the department
//! table, the example case table and the flat index over their embeddings.

pub mod cases;
pub mod departments;
pub mod index;

pub use cases::{TRAINING_CASES, TrainingCase, default_training_cases};
pub use departments::{DEPARTMENT_TABLE, DepartmentEntry, default_departments};
pub use index::{IndexText, KnowledgeIndex, Neighbor};
