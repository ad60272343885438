use crate::grouping::learner_summaries;
use crate::models::{GradeRecord, LearnerSummary, PopulationStats};

pub const DEFAULT_THRESHOLD: f64 = 70.0;

pub fn population_stats(records: &[GradeRecord], threshold: f64) -> PopulationStats {
    summarize_population(&learner_summaries(records), threshold)
}

/// Counts learners strictly above `threshold`.
pub fn summarize_population(summaries: &[LearnerSummary], threshold: f64) -> PopulationStats {
    let total_learners = summaries.len();
    let num_above_threshold = summaries
        .iter()
        .filter(|summary| summary.weighted_avg > threshold)
        .count();

    PopulationStats {
        num_above_threshold,
        total_learners,
        percentage_above_threshold: percentage(num_above_threshold, total_learners),
        threshold,
    }
}

pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * part as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreEntry, ScoreType};

    fn exam_only(learner_id: i64, class_id: i32, exam: f64) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: vec![ScoreEntry::new(ScoreType::Exam, exam)],
        }
    }

    fn summary(learner_id: i64, weighted_avg: f64) -> LearnerSummary {
        LearnerSummary {
            learner_id,
            weighted_avg,
        }
    }

    #[test]
    fn empty_population_is_all_zero() {
        let stats = population_stats(&[], DEFAULT_THRESHOLD);
        assert_eq!(stats.num_above_threshold, 0);
        assert_eq!(stats.total_learners, 0);
        assert_eq!(stats.percentage_above_threshold, 0.0);
    }

    #[test]
    fn counts_learners_above_threshold() {
        let summaries = vec![summary(1, 72.0), summary(2, 65.0), summary(3, 80.0)];
        let stats = summarize_population(&summaries, 70.0);
        assert_eq!(stats.num_above_threshold, 2);
        assert_eq!(stats.total_learners, 3);
        assert!((stats.percentage_above_threshold - 66.666667).abs() < 1e-6);
    }

    #[test]
    fn threshold_is_strict() {
        let summaries = vec![summary(1, 70.0), summary(2, 70.000001)];
        let stats = summarize_population(&summaries, 70.0);
        assert_eq!(stats.num_above_threshold, 1);
    }

    #[test]
    fn learners_are_counted_once_across_classes() {
        // exam-only learners: weighted average is half the exam mean
        let records = vec![
            exam_only(1, 10, 150.0),
            exam_only(1, 11, 150.0),
            exam_only(2, 10, 100.0),
        ];
        let stats = population_stats(&records, 70.0);
        assert_eq!(stats.total_learners, 2);
        assert_eq!(stats.num_above_threshold, 1);
        assert_eq!(stats.percentage_above_threshold, 50.0);
    }

    #[test]
    fn percentage_stays_within_bounds() {
        for above in 0..=5 {
            let summaries: Vec<LearnerSummary> = (0..5)
                .map(|i| summary(i, if i < above { 90.0 } else { 10.0 }))
                .collect();
            let stats = summarize_population(&summaries, 50.0);
            assert!((0.0..=100.0).contains(&stats.percentage_above_threshold));
            assert_eq!(stats.num_above_threshold, above as usize);
        }
    }
}
