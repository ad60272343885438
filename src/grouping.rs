use std::collections::BTreeMap;

use crate::error::{GradeError, Result};
use crate::models::{ClassAverage, GradeRecord, LearnerSummary};
use crate::scoring::{mean, ScoresByType};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupAverage<K> {
    pub key: K,
    pub avg: f64,
}

/// Pools every score of the records sharing a key, then scores each group once.
///
/// Groups come back sorted by key. Empty input gives an empty result; deciding
/// whether that is a lookup failure is up to the caller.
pub fn group_and_score<K, F>(records: &[GradeRecord], key_fn: F) -> Vec<GroupAverage<K>>
where
    K: Ord,
    F: Fn(&GradeRecord) -> K,
{
    let mut groups: BTreeMap<K, ScoresByType> = BTreeMap::new();

    for record in records {
        groups
            .entry(key_fn(record))
            .or_default()
            .extend(&record.scores);
    }

    groups
        .into_iter()
        .map(|(key, scores)| GroupAverage {
            key,
            avg: scores.weighted_average(),
        })
        .collect()
}

pub fn class_averages(records: &[GradeRecord]) -> Vec<ClassAverage> {
    group_and_score(records, |record| record.class_id)
        .into_iter()
        .map(|group| ClassAverage {
            class_id: group.key,
            avg: group.avg,
        })
        .collect()
}

/// Unweighted mean of a learner's class averages; each class counts once.
pub fn overall_average(records: &[GradeRecord]) -> Result<f64> {
    if records.is_empty() {
        return Err(GradeError::NotFound("no grade records".to_string()));
    }

    let averages: Vec<f64> = class_averages(records)
        .into_iter()
        .map(|class| class.avg)
        .collect();
    Ok(mean(&averages))
}

/// One summary per learner, scores pooled across all of that learner's classes.
pub fn learner_summaries(records: &[GradeRecord]) -> Vec<LearnerSummary> {
    group_and_score(records, |record| record.learner_id)
        .into_iter()
        .map(|group| LearnerSummary {
            learner_id: group.key,
            weighted_avg: group.avg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreEntry, ScoreType};
    use ScoreType::{Exam, Homework, Quiz};

    fn record(learner_id: i64, class_id: i32, scores: &[(ScoreType, f64)]) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: scores
                .iter()
                .map(|(score_type, score)| ScoreEntry::new(*score_type, *score))
                .collect(),
        }
    }

    #[test]
    fn groups_by_class_in_key_order() {
        let records = vec![
            record(1, 220, &[(Exam, 80.0), (Quiz, 90.0), (Homework, 100.0)]),
            record(1, 12, &[(Exam, 60.0), (Quiz, 70.0), (Homework, 120.0)]),
        ];

        let averages = class_averages(&records);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].class_id, 12);
        assert!((averages[0].avg - 75.0).abs() < 1e-9);
        assert_eq!(averages[1].class_id, 220);
        assert!((averages[1].avg - 87.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_records_accumulate_into_one_group() {
        let records = vec![
            record(3, 40, &[(Exam, 100.0)]),
            record(3, 40, &[(Exam, 50.0), (Quiz, 90.0)]),
        ];

        let averages = class_averages(&records);
        assert_eq!(averages.len(), 1);
        let expected = 0.5 * 75.0 + 0.3 * 90.0;
        assert!((averages[0].avg - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups = group_and_score(&[], |record| record.class_id);
        assert!(groups.is_empty());
    }

    #[test]
    fn group_and_score_is_idempotent() {
        let records = vec![
            record(1, 5, &[(Exam, 61.0), (Homework, 77.0)]),
            record(2, 5, &[(Quiz, 88.0)]),
            record(1, 9, &[(Quiz, 42.5)]),
        ];

        let first = group_and_score(&records, |record| record.learner_id);
        let second = group_and_score(&records, |record| record.learner_id);
        assert_eq!(first, second);
    }

    #[test]
    fn overall_average_weighs_classes_equally() {
        // 87.0 for class 1, 73.0 for class 2
        let records = vec![
            record(7, 1, &[(Exam, 80.0), (Quiz, 90.0), (Homework, 100.0)]),
            record(7, 2, &[(Exam, 70.0), (Quiz, 70.0), (Homework, 85.0)]),
            record(7, 2, &[(Exam, 70.0)]),
        ];

        let overall = overall_average(&records).unwrap();
        assert!((overall - 80.0).abs() < 1e-9);
    }

    #[test]
    fn overall_average_without_records_is_not_found() {
        assert!(matches!(overall_average(&[]), Err(GradeError::NotFound(_))));
    }

    #[test]
    fn learner_with_empty_score_lists_averages_zero() {
        let records = vec![record(4, 10, &[]), record(4, 11, &[])];
        assert_eq!(overall_average(&records).unwrap(), 0.0);
    }

    #[test]
    fn learner_summaries_pool_scores_across_classes() {
        let records = vec![
            record(1, 10, &[(Exam, 100.0)]),
            record(1, 20, &[(Exam, 50.0), (Quiz, 60.0)]),
        ];

        let summaries = learner_summaries(&records);
        assert_eq!(summaries.len(), 1);
        // pooled: exam mean 75, quiz mean 60, no homework
        let expected = 0.5 * 75.0 + 0.3 * 60.0;
        assert!((summaries[0].weighted_avg - expected).abs() < 1e-9);

        // per-class then averaged would differ: (50 + (25 + 18)) / 2
        let per_class = overall_average(&records).unwrap();
        assert!((per_class - 46.5).abs() < 1e-9);
    }
}
