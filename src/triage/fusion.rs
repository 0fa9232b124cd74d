//! Score conversion and weighted fusion of the semantic and classifier
//! rankings. Everything here is pure.

use serde::{Deserialize, Serialize};

use crate::core::config::FusionConfig;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentScore {
    pub department: String,
    pub confidence_percent: f64,
}

impl DepartmentScore {
    pub fn new(department: impl Into<String>, confidence_percent: f64) -> Self {
        Self {
            department: department.into(),
            confidence_percent,
        }
    }
}


/// Converts squared distances to shares of 100 via `1 / (1 + d)`.
pub fn distance_percentages(distances: &[f32]) -> Vec<f64> {
    let similarities: Vec<f64> = distances
        .iter()
        .map(|d| 1.0 / (1.0 + f64::from(d.max(0.0))))
        .collect();
    let total: f64 = similarities.iter().sum();
    if total <= 0.0 {
        return vec![0.0; similarities.len()];
    }
    similarities.iter().map(|s| s / total * 100.0).collect()
}

/// Top `k` classes by probability, as percentages. Equal probabilities keep
/// class order.
pub fn top_classes(classes: &[String], probabilities: &[f64], k: usize) -> Vec<DepartmentScore> {
    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .filter_map(|(i, p)| classes.get(i).map(|name| DepartmentScore::new(name.clone(), p * 100.0)))
        .collect()
}


/// Weighted union of the two rankings. A department missing from one side
/// keeps only the other side's weighted share. Ties keep the order in which
/// departments were first seen, semantic side first.
pub fn fuse(semantic: &[DepartmentScore], classifier: &[DepartmentScore], config: &FusionConfig) -> Vec<DepartmentScore> {
    let mut combined: Vec<DepartmentScore> = Vec::with_capacity(semantic.len() + classifier.len());

    let mut add = |department: &str, contribution: f64| {
        match combined.iter_mut().find(|c| c.department == department) {
            Some(existing) => existing.confidence_percent += contribution,
            None => combined.push(DepartmentScore::new(department, contribution)),
        }
    };

    for score in semantic {
        add(&score.department, score.confidence_percent * config.semantic_weight);
    }
    for score in classifier {
        add(&score.department, score.confidence_percent * config.classifier_weight);
    }

    rank(combined, config.top_n)
}

/// Stable descending sort, truncation and clamping into `[0, 100]`.
pub fn rank(mut scores: Vec<DepartmentScore>, top_n: usize) -> Vec<DepartmentScore> {
    scores.sort_by(|a, b| b.confidence_percent.total_cmp(&a.confidence_percent));
    scores.truncate(top_n);
    for score in &mut scores {
        score.confidence_percent = score.confidence_percent.clamp(0.0, 100.0);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_distance_percentages_sum_to_100() {
        let percents = distance_percentages(&[0.0, 1.0, 4.0]);
        assert!(approx(percents.iter().sum(), 100.0));
        assert!(approx(percents[0], 58.8235));
        assert!(approx(percents[1], 29.4118));
        assert!(approx(percents[2], 11.7647));
    }

    #[test]
    fn test_distance_percentages_empty() {
        assert!(distance_percentages(&[]).is_empty());
    }

    #[test]
    fn test_top_classes_breaks_ties_by_class_order() {
        let classes = vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()];
        let top = top_classes(&classes, &[0.1, 0.4, 0.1, 0.4], 3);
        let names: Vec<_> = top.iter().map(|s| s.department.as_str()).collect();
        assert_eq!(names, vec!["B", "D", "A"]);
        assert!(approx(top[0].confidence_percent, 40.0));
    }

    #[test]
    fn test_fuse_weights_each_source_without_renormalizing() {
        let semantic = vec![
            DepartmentScore::new("Cardiology", 50.0),
            DepartmentScore::new("Neurology", 30.0),
            DepartmentScore::new("Dermatology", 20.0),
        ];
        let classifier = vec![
            DepartmentScore::new("Pulmonology", 60.0),
            DepartmentScore::new("Cardiology", 30.0),
            DepartmentScore::new("Neurology", 10.0),
        ];

        let fused = fuse(&semantic, &classifier, &FusionConfig::default());

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].department, "Cardiology");
        assert!(approx(fused[0].confidence_percent, 42.0));
        assert_eq!(fused[1].department, "Pulmonology");
        assert!(approx(fused[1].confidence_percent, 24.0));
        assert_eq!(fused[2].department, "Neurology");
        assert!(approx(fused[2].confidence_percent, 22.0));
    }

    #[test]
    fn test_fuse_ties_keep_semantic_order() {
        let semantic = vec![DepartmentScore::new("First", 50.0), DepartmentScore::new("Second", 50.0)];
        let fused = fuse(&semantic, &[], &FusionConfig::default());
        assert_eq!(fused[0].department, "First");
        assert_eq!(fused[1].department, "Second");
    }

    #[test]
    fn test_rank_is_sorted_and_bounded() {
        let ranked = rank(
            vec![
                DepartmentScore::new("a", 10.0),
                DepartmentScore::new("b", 120.0),
                DepartmentScore::new("c", 40.0),
                DepartmentScore::new("d", 5.0),
            ],
            3,
        );
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].confidence_percent, 100.0);
        assert!(ranked.windows(2).all(|w| w[0].confidence_percent >= w[1].confidence_percent));
    }
}
