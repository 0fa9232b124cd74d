use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use super::emergency::exceeds;
use super::vitals::VitalsSnapshot;
use crate::core::config::RiskConfig;


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Scoring applied when no hard override fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskPolicy {
    /// Multi-factor accumulation over age, pressure, pulse, temperature,
    /// oxygen saturation and symptom count.
    #[default]
    Weighted,
    /// Blood-pressure / temperature / pulse cut-offs only.
    Threshold,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideTrigger {
    HeartRate { value: f64 },
    SystolicPressure { value: f64 },
    Temperature { value: f64 },
    CriticalKeyword { keyword: String },
    EmergencySimilarity { score: f64 },
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// True when a hard override decided the level.
    pub forced: bool,
    pub triggers: Vec<OverrideTrigger>,
    /// Accumulated score; present only when the weighted policy ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub policy: RiskPolicy,
}

// Weighted accumulation contributions.
const AGE_OVER_65: f64 = 3.0;
const AGE_50_TO_65: f64 = 1.5;
const AGE_UNDER_5: f64 = 2.0;
const BP_CRISIS: f64 = 5.0;
const BP_ELEVATED: f64 = 2.5;
const HR_EXTREME: f64 = 4.0;
const HR_ELEVATED: f64 = 2.0;
const TEMP_VERY_HIGH: f64 = 4.0;
const TEMP_FEVER: f64 = 2.0;
const SPO2_CRITICAL: f64 = 6.0;
const SPO2_LOW: f64 = 3.0;
const PER_SYMPTOM: f64 = 1.5;


pub struct RiskScorer {
    config: RiskConfig,
    keywords: Vec<String>,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        let keywords = config
            .critical_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { config, keywords }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Every hard-override rule that fires for this snapshot.
    /// `emergency_similarity` is the best match against the emergency
    /// phrases, when the embedder could compute one.
    pub fn override_triggers(
        &self,
        vitals: &VitalsSnapshot,
        emergency_similarity: Option<f64>,
    ) -> Vec<OverrideTrigger> {
        let limits = &self.config.limits;
        let mut triggers = Vec::new();

        let hr = vitals.heart_rate;
        if hr > 0.0 && (hr > limits.heart_rate_max || hr < limits.heart_rate_min) {
            triggers.push(OverrideTrigger::HeartRate { value: hr });
        }

        let systolic = vitals.systolic_bp;
        if systolic > 0.0 && (systolic > limits.systolic_max || systolic < limits.systolic_min) {
            triggers.push(OverrideTrigger::SystolicPressure { value: systolic });
        }

        if vitals.temperature > limits.temperature_max {
            triggers.push(OverrideTrigger::Temperature {
                value: vitals.temperature,
            });
        }

        let symptoms = vitals.symptoms.to_lowercase();
        if let Some(keyword) = self.keywords.iter().find(|k| symptoms.contains(k.as_str())) {
            triggers.push(OverrideTrigger::CriticalKeyword {
                keyword: keyword.clone(),
            });
        }

        if let Some(score) = emergency_similarity {
            if exceeds(score, self.config.emergency_similarity_threshold) {
                triggers.push(OverrideTrigger::EmergencySimilarity { score });
            }
        }

        triggers
    }


    pub fn assess(&self, vitals: &VitalsSnapshot, emergency_similarity: Option<f64>) -> RiskAssessment {
        let triggers = self.override_triggers(vitals, emergency_similarity);
        if !triggers.is_empty() {
            warn!(
                "Safety override triggered: {}",
                triggers
                    .iter()
                    .map(|t| format!("{:?}", t))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return RiskAssessment {
                level: RiskLevel::High,
                forced: true,
                triggers,
                score: None,
                policy: self.config.policy,
            };
        }

        let (level, score) = match self.config.policy {
            RiskPolicy::Weighted => {
                let score = weighted_score(vitals);
                (self.level_for_score(score), Some(score))
            }
            RiskPolicy::Threshold => (threshold_level(vitals), None),
        };

        debug!("Risk assessed: level={}, score={:?}, policy={}", level, score, self.config.policy);

        RiskAssessment {
            level,
            forced: false,
            triggers,
            score,
            policy: self.config.policy,
        }
    }


    pub fn level_for_score(&self, score: f64) -> RiskLevel {
        if score >= self.config.high_threshold {
            RiskLevel::High
        } else if score >= self.config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}


pub fn weighted_score(vitals: &VitalsSnapshot) -> f64 {
    let mut score = 0.0;

    score += match vitals.age {
        a if a > 65 => AGE_OVER_65,
        50..=65 => AGE_50_TO_65,
        a if a < 5 => AGE_UNDER_5,
        _ => 0.0,
    };

    let (sys, dia) = (vitals.systolic_bp, vitals.diastolic_bp);
    if sys > 180.0 || dia > 120.0 {
        score += BP_CRISIS;
    } else if sys > 140.0 || dia > 90.0 {
        score += BP_ELEVATED;
    }

    let hr = vitals.heart_rate;
    if hr > 120.0 || (hr > 0.0 && hr < 50.0) {
        score += HR_EXTREME;
    } else if hr > 100.0 {
        score += HR_ELEVATED;
    }

    if vitals.temperature > 39.5 {
        score += TEMP_VERY_HIGH;
    } else if vitals.temperature > 38.0 {
        score += TEMP_FEVER;
    }

    match vitals.oxygen_saturation {
        Some(spo2) if spo2 > 0.0 && spo2 < 90.0 => score += SPO2_CRITICAL,
        Some(spo2) if spo2 > 0.0 && spo2 < 95.0 => score += SPO2_LOW,
        _ => {}
    }

    score + PER_SYMPTOM * vitals.symptom_count() as f64
}


pub fn threshold_level(vitals: &VitalsSnapshot) -> RiskLevel {
    let (sys, dia, temp, hr) = (
        vitals.systolic_bp,
        vitals.diastolic_bp,
        vitals.temperature,
        vitals.heart_rate,
    );

    if sys > 140.0 || dia > 90.0 || temp > 38.0 || hr > 140.0 {
        RiskLevel::High
    } else if sys > 130.0 || dia > 85.0 || temp > 37.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> RiskScorer {
        RiskScorer::new(RiskConfig::default())
    }

    fn ideal(symptoms: &str) -> VitalsSnapshot {
        VitalsSnapshot {
            age: 30,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            heart_rate: 72.0,
            temperature: 37.0,
            oxygen_saturation: None,
            symptoms: symptoms.to_string(),
        }
    }

    #[test]
    fn test_tachycardia_forces_high() {
        let vitals = VitalsSnapshot {
            heart_rate: 150.0,
            ..ideal("mild cough")
        };
        let assessment = scorer().assess(&vitals, None);

        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.forced);
        assert_eq!(assessment.triggers, vec![OverrideTrigger::HeartRate { value: 150.0 }]);
        assert!(assessment.score.is_none());
    }

    #[test]
    fn test_missing_vitals_do_not_trigger_override() {
        let vitals = VitalsSnapshot {
            heart_rate: 0.0,
            systolic_bp: 0.0,
            ..ideal("runny nose")
        };
        let assessment = scorer().assess(&vitals, None);
        assert!(!assessment.forced);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn test_bradycardia_and_hypotension_force_high() {
        let vitals = VitalsSnapshot {
            heart_rate: 35.0,
            systolic_bp: 85.0,
            ..ideal("")
        };
        let assessment = scorer().assess(&vitals, None);
        assert!(assessment.forced);
        assert_eq!(assessment.triggers.len(), 2);
    }

    #[test]
    fn test_high_temperature_forces_high() {
        let vitals = VitalsSnapshot {
            temperature: 39.8,
            ..ideal("")
        };
        assert_eq!(scorer().assess(&vitals, None).level, RiskLevel::High);
    }

    #[test]
    fn test_keyword_override_is_case_insensitive() {
        let assessment = scorer().assess(&ideal("Severe Headache since morning"), None);
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.forced);
        assert_eq!(
            assessment.triggers,
            vec![OverrideTrigger::CriticalKeyword {
                keyword: "severe headache".to_string()
            }]
        );
    }

    #[test]
    fn test_emergency_similarity_above_threshold_forces_high() {
        let assessment = scorer().assess(&ideal("my dad collapsed"), Some(0.72));
        assert!(assessment.forced);
        assert_eq!(assessment.triggers, vec![OverrideTrigger::EmergencySimilarity { score: 0.72 }]);

        let below = scorer().assess(&ideal("my dad collapsed"), Some(0.6));
        assert!(!below.forced);
    }

    #[test]
    fn test_emergency_similarity_at_f32_threshold_does_not_force() {
        let at_threshold = f64::from(0.6f32);
        assert!(at_threshold > 0.6);

        let assessment = scorer().assess(&ideal("my dad collapsed"), Some(at_threshold));
        assert!(!assessment.forced);
        assert!(assessment.triggers.is_empty());
    }

    #[test]
    fn test_weighted_fallback_medium() {
        let vitals = VitalsSnapshot {
            age: 70,
            systolic_bp: 150.0,
            diastolic_bp: 80.0,
            heart_rate: 105.0,
            temperature: 38.2,
            oxygen_saturation: Some(93.0),
            symptoms: "fatigue, dizziness".to_string(),
        };
        let assessment = scorer().assess(&vitals, None);

        assert_eq!(assessment.score, Some(15.5));
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert!(!assessment.forced);
        assert_eq!(assessment.policy, RiskPolicy::Weighted);
    }

    #[test]
    fn test_weighted_accumulation_can_reach_high_without_override() {
        let vitals = VitalsSnapshot {
            age: 70,
            systolic_bp: 170.0,
            diastolic_bp: 125.0,
            heart_rate: 110.0,
            temperature: 39.0,
            oxygen_saturation: Some(85.0),
            symptoms: "fatigue, nausea".to_string(),
        };
        let assessment = scorer().assess(&vitals, None);

        assert_eq!(assessment.score, Some(21.0));
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(!assessment.forced);
    }

    #[test]
    fn test_weighted_low_for_healthy_adult() {
        let assessment = scorer().assess(&ideal("sneezing"), None);
        assert_eq!(assessment.score, Some(1.5));
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn test_age_brackets() {
        assert_eq!(weighted_score(&VitalsSnapshot { age: 3, ..ideal("") }), 2.0);
        assert_eq!(weighted_score(&VitalsSnapshot { age: 50, ..ideal("") }), 1.5);
        assert_eq!(weighted_score(&VitalsSnapshot { age: 65, ..ideal("") }), 1.5);
        assert_eq!(weighted_score(&VitalsSnapshot { age: 66, ..ideal("") }), 3.0);
        assert_eq!(weighted_score(&VitalsSnapshot { age: 30, ..ideal("") }), 0.0);
    }

    #[test]
    fn test_threshold_policy() {
        let config = RiskConfig {
            policy: RiskPolicy::Threshold,
            ..Default::default()
        };
        let scorer = RiskScorer::new(config);

        let high = VitalsSnapshot { diastolic_bp: 95.0, ..ideal("") };
        let medium = VitalsSnapshot { temperature: 37.8, ..ideal("") };
        assert_eq!(scorer.assess(&high, None).level, RiskLevel::High);
        assert_eq!(scorer.assess(&medium, None).level, RiskLevel::Medium);

        let low = scorer.assess(&ideal(""), None);
        assert_eq!(low.level, RiskLevel::Low);
        assert!(low.score.is_none());
        assert_eq!(low.policy, RiskPolicy::Threshold);
    }

    #[test]
    fn test_risk_level_strings() {
        assert_eq!(RiskLevel::High.to_string(), "High");
        assert_eq!("Medium".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"Low\"");
        assert_eq!(serde_json::to_string(&RiskPolicy::Weighted).unwrap(), "\"weighted\"");
    }
}
