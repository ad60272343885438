use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GradeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    Exam,
    Quiz,
    Homework,
}

impl ScoreType {
    pub const ALL: [ScoreType; 3] = [ScoreType::Exam, ScoreType::Quiz, ScoreType::Homework];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Exam => "exam",
            ScoreType::Quiz => "quiz",
            ScoreType::Homework => "homework",
        }
    }
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreType {
    type Err = GradeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exam" => Ok(ScoreType::Exam),
            "quiz" => Ok(ScoreType::Quiz),
            "homework" => Ok(ScoreType::Homework),
            other => Err(GradeError::InvalidInput(format!(
                "unknown score type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub score_type: ScoreType,
    pub score: f64,
}

impl ScoreEntry {
    pub fn new(score_type: ScoreType, score: f64) -> Self {
        Self { score_type, score }
    }
}

/// One learner's scores in one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub learner_id: i64,
    pub class_id: i32,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class_id: i32,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerSummary {
    pub learner_id: i64,
    pub weighted_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallAverage {
    #[serde(rename = "overallAverage")]
    pub overall_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationStats {
    pub num_above_threshold: usize,
    pub total_learners: usize,
    pub percentage_above_threshold: f64,
    pub threshold: f64,
}
