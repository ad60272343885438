use tracing::debug;

use crate::error::{GradeError, Result};
use crate::grouping::{class_averages, overall_average};
use crate::models::{ClassAverage, OverallAverage, PopulationStats};
use crate::source::RecordSource;
use crate::stats::population_stats;

pub const MAX_CLASS_ID: i32 = 300;

pub fn parse_learner_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 0)
        .ok_or_else(|| {
            GradeError::InvalidInput(format!("learner id '{raw}' must be a non-negative integer"))
        })
}

pub fn parse_class_id(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| (0..=MAX_CLASS_ID).contains(id))
        .ok_or_else(|| {
            GradeError::InvalidInput(format!(
                "class id '{raw}' must be an integer between 0 and {MAX_CLASS_ID}"
            ))
        })
}

pub fn check_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err(GradeError::InvalidInput(format!("threshold {threshold} must be a finite number")))
    }
}

/// Request-level operations: validate keys, fetch a snapshot, aggregate it.
pub struct GradeQueries<S> {
    source: S,
}

impl<S: RecordSource> GradeQueries<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[cfg(test)]
    fn source(&self) -> &S {
        &self.source
    }

    pub async fn class_averages(&self, learner: &str) -> Result<Vec<ClassAverage>> {
        let learner_id = parse_learner_id(learner)?;
        let records = self.source.fetch_by_learner(learner_id).await?;
        debug!(learner_id, records = records.len(), "Fetched learner records");

        if records.is_empty() {
            return Err(learner_not_found(learner_id));
        }
        Ok(class_averages(&records))
    }

    pub async fn overall_average(&self, learner: &str) -> Result<OverallAverage> {
        let learner_id = parse_learner_id(learner)?;
        let records = self.source.fetch_by_learner(learner_id).await?;
        debug!(learner_id, records = records.len(), "Fetched learner records");

        let overall_average = overall_average(&records).map_err(|err| match err {
            GradeError::NotFound(_) => learner_not_found(learner_id),
            other => other,
        })?;
        Ok(OverallAverage { overall_average })
    }

    pub async fn population_stats(&self, threshold: f64) -> Result<PopulationStats> {
        let threshold = check_threshold(threshold)?;
        let records = self.source.fetch_all().await?;
        debug!(records = records.len(), threshold, "Fetched all records");

        Ok(population_stats(&records, threshold))
    }

    pub async fn class_stats(&self, class: &str, threshold: f64) -> Result<PopulationStats> {
        let class_id = parse_class_id(class)?;
        let threshold = check_threshold(threshold)?;
        let records = self.source.fetch_by_class(class_id).await?;
        debug!(class_id, records = records.len(), threshold, "Fetched class records");

        if records.is_empty() {
            return Err(GradeError::NotFound(format!("no grades recorded for class {class_id}")));
        }
        Ok(population_stats(&records, threshold))
    }
}

fn learner_not_found(learner_id: i64) -> GradeError {
    GradeError::NotFound(format!("no grades recorded for learner {learner_id}"))
}
