use crate::models::{ScoreEntry, ScoreType};

pub const EXAM_WEIGHT: f64 = 0.5;
pub const QUIZ_WEIGHT: f64 = 0.3;
pub const HOMEWORK_WEIGHT: f64 = 0.2;

pub fn weight(score_type: ScoreType) -> f64 {
    match score_type {
        ScoreType::Exam => EXAM_WEIGHT,
        ScoreType::Quiz => QUIZ_WEIGHT,
        ScoreType::Homework => HOMEWORK_WEIGHT,
    }
}

/// Arithmetic mean, 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Scores pooled per type for one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoresByType {
    pub exam: Vec<f64>,
    pub quiz: Vec<f64>,
    pub homework: Vec<f64>,
}

impl ScoresByType {
    pub fn push(&mut self, entry: &ScoreEntry) {
        self.bucket_mut(entry.score_type).push(entry.score);
    }

    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a ScoreEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn get(&self, score_type: ScoreType) -> &[f64] {
        match score_type {
            ScoreType::Exam => &self.exam,
            ScoreType::Quiz => &self.quiz,
            ScoreType::Homework => &self.homework,
        }
    }

    fn bucket_mut(&mut self, score_type: ScoreType) -> &mut Vec<f64> {
        match score_type {
            ScoreType::Exam => &mut self.exam,
            ScoreType::Quiz => &mut self.quiz,
            ScoreType::Homework => &mut self.homework,
        }
    }

    pub fn weighted_average(&self) -> f64 {
        weighted_average(self)
    }
}

/// Combines per-type means with the fixed exam/quiz/homework weights.
///
/// A type with no scores contributes a mean of 0 rather than being dropped
/// from the weighting.
pub fn weighted_average(scores: &ScoresByType) -> f64 {
    ScoreType::ALL
        .iter()
        .map(|score_type| mean(scores.get(*score_type)) * weight(*score_type))
        .sum()
}
