//! SQLite prediction log and the aggregate analytics read from it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::triage::{DepartmentScore, Provenance};

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
     CREATE TABLE IF NOT EXISTS predictions (
         id INTEGER PRIMARY KEY AUTOINCREMENT,
         created_at TEXT NOT NULL,
         symptoms TEXT NOT NULL,
         department_1 TEXT,
         confidence_1 REAL,
         department_2 TEXT,
         confidence_2 REAL,
         department_3 TEXT,
         confidence_3 REAL,
         emergency INTEGER NOT NULL DEFAULT 0,
         provenance TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_predictions_emergency ON predictions(emergency);
     INSERT INTO schema_version (version) VALUES (1);",
)];


#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration v{version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },
}


/// One logged `/predict` outcome. Only the first three departments are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub symptoms: String,
    pub departments: Vec<DepartmentScore>,
    pub emergency: bool,
    pub provenance: Provenance,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_predictions: u64,
    pub emergency_cases: u64,
    pub department_frequency: BTreeMap<String, u64>,
}


#[derive(Clone)]
pub struct PredictionStore {
    conn: Arc<Mutex<Connection>>,
}

impl PredictionStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        info!("Prediction store opened at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn record(&self, record: &PredictionRecord) -> Result<i64, StorageError> {
        let slot = |i: usize| record.departments.get(i);
        let name = |i: usize| slot(i).map(|d| d.department.as_str());
        let confidence = |i: usize| slot(i).map(|d| d.confidence_percent);

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO predictions (created_at, symptoms, department_1, confidence_1, department_2,
                 confidence_2, department_3, confidence_3, emergency, provenance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Utc::now().to_rfc3339(),
                record.symptoms,
                name(0),
                confidence(0),
                name(1),
                confidence(1),
                name(2),
                confidence(2),
                record.emergency,
                record.provenance.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Prediction logged: id={}, emergency={}", id, record.emergency);
        Ok(id)
    }

    /// Totals plus how often each department appears in any of the three
    /// slots. Empty slots are skipped.
    pub fn analytics(&self) -> Result<AnalyticsSummary, StorageError> {
        let conn = self.conn.lock();

        let (total, emergencies): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(emergency), 0) FROM predictions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT department, COUNT(*) FROM (
                 SELECT department_1 AS department FROM predictions
                 UNION ALL SELECT department_2 FROM predictions
                 UNION ALL SELECT department_3 FROM predictions
             )
             WHERE department IS NOT NULL AND department != '' AND department != 'None'
             GROUP BY department",
        )?;
        let department_frequency = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(AnalyticsSummary {
            total_predictions: total as u64,
            emergency_cases: emergencies as u64,
            department_frequency,
        })
    }
}


fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = current_version(conn)?;
    for (version, sql) in MIGRATIONS {
        if *version > current {
            info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })?;
        }
    }
    Ok(())
}

fn current_version(conn: &Connection) -> Result<i64, StorageError> {
    let exists = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .is_some();
    if !exists {
        return Ok(0);
    }
    let version: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(departments: &[&str], emergency: bool) -> PredictionRecord {
        PredictionRecord {
            symptoms: "fever, cough".to_string(),
            departments: departments
                .iter()
                .map(|d| DepartmentScore::new(*d, 33.3))
                .collect(),
            emergency,
            provenance: if emergency {
                Provenance::Unavailable
            } else {
                Provenance::Semantic
            },
        }
    }

    #[test]
    fn test_empty_store_analytics() {
        let store = PredictionStore::open_in_memory().unwrap();
        assert_eq!(store.analytics().unwrap(), AnalyticsSummary::default());
    }

    #[test]
    fn test_analytics_counts_all_slots() {
        let store = PredictionStore::open_in_memory().unwrap();
        store
            .record(&record(&["Pulmonology", "General Medicine", "Cardiology"], false))
            .unwrap();
        store.record(&record(&["Cardiology"], false)).unwrap();
        store.record(&record(&[], true)).unwrap();

        let summary = store.analytics().unwrap();
        assert_eq!(summary.total_predictions, 3);
        assert_eq!(summary.emergency_cases, 1);
        assert_eq!(summary.department_frequency["Cardiology"], 2);
        assert_eq!(summary.department_frequency["Pulmonology"], 1);
        assert_eq!(summary.department_frequency.len(), 3);
    }

    #[test]
    fn test_record_returns_increasing_ids() {
        let store = PredictionStore::open_in_memory().unwrap();
        let first = store.record(&record(&["Neurology"], false)).unwrap();
        let second = store.record(&record(&["Neurology"], false)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_reopen_keeps_rows_and_skips_applied_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medical_ai.db");

        {
            let store = PredictionStore::open(&path).unwrap();
            store.record(&record(&["Dermatology"], false)).unwrap();
        }

        let reopened = PredictionStore::open(&path).unwrap();
        let summary = reopened.analytics().unwrap();
        assert_eq!(summary.total_predictions, 1);
        assert_eq!(summary.department_frequency["Dermatology"], 1);
    }
}
