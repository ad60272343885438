use std::fmt::Write;

use chrono::NaiveDate;

use crate::grouping::{group_and_score, learner_summaries};
use crate::models::{GradeRecord, LearnerSummary};
use crate::scoring::mean;
use crate::stats::summarize_population;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub class_id: i32,
    pub learner_count: usize,
    pub mean_avg: f64,
}

/// Per class: how many learners it has and the mean of their weighted
/// averages within that class.
pub fn summarize_by_class(records: &[GradeRecord]) -> Vec<ClassSummary> {
    let per_learner = group_and_score(records, |record| (record.class_id, record.learner_id));
    let mut summaries: Vec<ClassSummary> = Vec::new();

    for group in per_learner {
        let (class_id, _) = group.key;
        match summaries.last_mut() {
            Some(last) if last.class_id == class_id => {
                // running mean; keys arrive sorted so classes are contiguous
                last.learner_count += 1;
                last.mean_avg += (group.avg - last.mean_avg) / last.learner_count as f64;
            }
            _ => summaries.push(ClassSummary {
                class_id,
                learner_count: 1,
                mean_avg: group.avg,
            }),
        }
    }

    summaries
}

pub fn build_report(generated_on: NaiveDate, threshold: f64, records: &[GradeRecord]) -> String {
    let mut learners = learner_summaries(records);
    let stats = summarize_population(&learners, threshold);
    let classes = summarize_by_class(records);

    learners.sort_by(|a, b| {
        b.weighted_avg
            .partial_cmp(&a.weighted_avg)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.learner_id.cmp(&b.learner_id))
    });

    let mut output = String::new();

    let _ = writeln!(output, "# Learner Grade Report");
    let _ = writeln!(output, "Generated on {generated_on} (threshold {threshold:.1})");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Population");

    if stats.total_learners == 0 {
        let _ = writeln!(output, "No grade records found.");
        return output;
    }

    let _ = writeln!(
        output,
        "- {} of {} learners above {:.1} ({:.2}%)",
        stats.num_above_threshold,
        stats.total_learners,
        threshold,
        stats.percentage_above_threshold
    );
    let all_avgs: Vec<f64> = learners.iter().map(|l| l.weighted_avg).collect();
    let _ = writeln!(output, "- Mean weighted average {:.2}", mean(&all_avgs));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Learners");
    for learner in learners.iter().take(10) {
        write_learner(&mut output, learner);
    }

    let at_or_below: Vec<&LearnerSummary> = learners
        .iter()
        .rev()
        .filter(|l| l.weighted_avg <= threshold)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## At or Below Threshold");

    if at_or_below.is_empty() {
        let _ = writeln!(output, "Every learner is above the threshold.");
    } else {
        for learner in at_or_below {
            write_learner(&mut output, learner);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Classes");
    for class in classes.iter() {
        let _ = writeln!(
            output,
            "- Class {}: {} learners, mean weighted average {:.2}",
            class.class_id, class.learner_count, class.mean_avg
        );
    }

    output
}

fn write_learner(output: &mut String, learner: &LearnerSummary) {
    let _ = writeln!(
        output,
        "- Learner {}: weighted average {:.2}",
        learner.learner_id, learner.weighted_avg
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScoreEntry, ScoreType};

    fn record(learner_id: i64, class_id: i32, exam: f64, quiz: f64, homework: f64) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: vec![
                ScoreEntry::new(ScoreType::Exam, exam),
                ScoreEntry::new(ScoreType::Quiz, quiz),
                ScoreEntry::new(ScoreType::Homework, homework),
            ],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn class_summary_averages_learners() {
        let records = vec![
            record(1, 10, 80.0, 90.0, 100.0),
            record(2, 10, 60.0, 60.0, 60.0),
            record(2, 30, 50.0, 50.0, 50.0),
        ];

        let classes = summarize_by_class(&records);
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].class_id, 10);
        assert_eq!(classes[0].learner_count, 2);
        assert!((classes[0].mean_avg - 73.5).abs() < 1e-9);
        assert_eq!(classes[1].learner_count, 1);
        assert!((classes[1].mean_avg - 50.0).abs() < 1e-9);
    }

    #[test]
    fn report_lists_population_and_learners() {
        let records = vec![
            record(1, 10, 80.0, 90.0, 100.0),
            record(2, 10, 60.0, 60.0, 60.0),
        ];

        let report = build_report(date(), 70.0, &records);
        assert!(report.starts_with("# Learner Grade Report"));
        assert!(report.contains("Generated on 2026-03-02"));
        assert!(report.contains("- 1 of 2 learners above 70.0 (50.00%)"));
        assert!(report.contains("- Learner 1: weighted average 87.00"));
        assert!(report.contains("## At or Below Threshold\n- Learner 2: weighted average 60.00"));
        assert!(report.contains("- Class 10: 2 learners, mean weighted average 73.50"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report(date(), 70.0, &[]);
        assert!(report.contains("No grade records found."));
        assert!(!report.contains("## Top Learners"));
    }
}
