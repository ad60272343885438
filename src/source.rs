//! Where grade records come from.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::GradeRecord;

/// Supplies materialized snapshots of grade records.
///
/// Implementations trust their own storage constraints (class ids in
/// 0..=300, non-negative learner ids); callers do not re-validate records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All records for one learner, across every class
    async fn fetch_by_learner(&self, learner_id: i64) -> Result<Vec<GradeRecord>>;

    /// All records for one class, across every learner
    async fn fetch_by_class(&self, class_id: i32) -> Result<Vec<GradeRecord>>;

    /// Every record
    async fn fetch_all(&self) -> Result<Vec<GradeRecord>>;
}

/// Record source backed by a vector, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<GradeRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<GradeRecord>) -> Self {
        Self { records }
    }

    fn filtered(&self, keep: impl Fn(&GradeRecord) -> bool) -> Vec<GradeRecord> {
        self.records.iter().filter(|r| keep(r)).cloned().collect()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch_by_learner(&self, learner_id: i64) -> Result<Vec<GradeRecord>> {
        Ok(self.filtered(|record| record.learner_id == learner_id))
    }

    async fn fetch_by_class(&self, class_id: i32) -> Result<Vec<GradeRecord>> {
        Ok(self.filtered(|record| record.class_id == class_id))
    }

    async fn fetch_all(&self) -> Result<Vec<GradeRecord>> {
        Ok(self.records.clone())
    }
}
