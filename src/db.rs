use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{GradeRecord, ScoreEntry, ScoreType};
use crate::query::MAX_CLASS_ID;
use crate::source::RecordSource;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Grade schema, constraints and indexes ready");
    Ok(())
}

/// A grade record paired with the key that makes its insert idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub source_key: String,
    pub record: GradeRecord,
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    use ScoreType::{Exam, Homework, Quiz};

    let rows: Vec<(&str, i64, i32, Vec<(ScoreType, f64)>)> = vec![
        ("seed-001", 1, 101, vec![(Exam, 80.0), (Quiz, 90.0), (Homework, 100.0)]),
        ("seed-002", 1, 205, vec![(Exam, 70.0), (Quiz, 70.0), (Homework, 85.0)]),
        ("seed-003", 2, 101, vec![(Exam, 64.0), (Quiz, 71.0), (Homework, 58.0), (Homework, 66.0)]),
        ("seed-004", 3, 101, vec![(Exam, 91.0), (Quiz, 84.0), (Quiz, 88.0), (Homework, 95.0)]),
        ("seed-005", 3, 17, vec![(Exam, 77.0), (Homework, 81.0)]),
        ("seed-006", 4, 205, vec![(Quiz, 55.0), (Homework, 92.0)]),
    ];

    let records: Vec<KeyedRecord> = rows
        .into_iter()
        .map(|(key, learner_id, class_id, scores)| KeyedRecord {
            source_key: key.to_string(),
            record: GradeRecord {
                learner_id,
                class_id,
                scores: scores
                    .into_iter()
                    .map(|(score_type, score)| ScoreEntry::new(score_type, score))
                    .collect(),
            },
        })
        .collect();

    insert_records(pool, &records).await
}

/// Reads `learner_id,class_id,score_type,score[,source_key]` rows.
///
/// Rows sharing a source key (or, without one, sharing learner and class)
/// become one record, scores kept in file order. A source key reused for a
/// different learner or class is rejected. Every row is validated before
/// anything is returned.
pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<KeyedRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        learner_id: i64,
        class_id: i32,
        score_type: String,
        score: f64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records: Vec<KeyedRecord> = Vec::new();
    // source keys are unique in storage, so one key maps to one record
    let mut keyed: HashMap<String, usize> = HashMap::new();
    let mut unkeyed: HashMap<(i64, i32), usize> = HashMap::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = line + 2;
        let row = result.with_context(|| format!("malformed row on line {line}"))?;

        if row.learner_id < 0 {
            bail!("line {line}: learner_id must be >= 0, got {}", row.learner_id);
        }
        if !(0..=MAX_CLASS_ID).contains(&row.class_id) {
            bail!(
                "line {line}: class_id must be between 0 and {MAX_CLASS_ID}, got {}",
                row.class_id
            );
        }
        if !row.score.is_finite() {
            bail!("line {line}: score must be a finite number");
        }
        let score_type: ScoreType = row
            .score_type
            .parse()
            .with_context(|| format!("line {line}: bad score_type"))?;

        let source_key = row.source_key.filter(|key| !key.trim().is_empty());
        let existing = match &source_key {
            Some(key) => keyed.get(key).copied(),
            None => unkeyed.get(&(row.learner_id, row.class_id)).copied(),
        };

        let slot = match existing {
            Some(slot) => {
                let record = &records[slot].record;
                if (record.learner_id, record.class_id) != (row.learner_id, row.class_id) {
                    bail!(
                        "line {line}: source_key '{}' already used for learner {} in class {}",
                        records[slot].source_key,
                        record.learner_id,
                        record.class_id
                    );
                }
                slot
            }
            None => {
                let slot = records.len();
                let key = match source_key {
                    Some(key) => {
                        keyed.insert(key.clone(), slot);
                        key
                    }
                    None => {
                        unkeyed.insert((row.learner_id, row.class_id), slot);
                        format!("import-{}", Uuid::new_v4())
                    }
                };
                records.push(KeyedRecord {
                    source_key: key,
                    record: GradeRecord {
                        learner_id: row.learner_id,
                        class_id: row.class_id,
                        scores: Vec::new(),
                    },
                });
                slot
            }
        };

        records[slot]
            .record
            .scores
            .push(ScoreEntry::new(score_type, row.score));
    }

    Ok(records)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let records = read_csv(csv_path)?;
    info!(records = records.len(), path = %csv_path.display(), "Parsed grade CSV");
    insert_records(pool, &records).await
}

/// Inserts records in one transaction, skipping source keys already stored.
pub async fn insert_records(pool: &PgPool, records: &[KeyedRecord]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await.context("failed to start transaction")?;
    let mut inserted = 0usize;

    for keyed in records {
        let grade_id: Option<Uuid> = sqlx::query(
            r#"
            INSERT INTO learner_grades.grades (id, learner_id, class_id, source_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_key) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(keyed.record.learner_id)
        .bind(keyed.record.class_id)
        .bind(&keyed.source_key)
        .fetch_optional(&mut *tx)
        .await?
        .map(|row| row.get("id"));

        let Some(grade_id) = grade_id else {
            debug!(source_key = %keyed.source_key, "Grade record already stored");
            continue;
        };

        for (position, entry) in keyed.record.scores.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO learner_grades.grade_scores (grade_id, position, score_type, score)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(grade_id)
            .bind(position as i32)
            .bind(entry.score_type.as_str())
            .bind(entry.score)
            .execute(&mut *tx)
            .await?;
        }
        inserted += 1;
    }

    tx.commit().await.context("failed to commit grade records")?;
    info!(inserted, "Grade records stored");
    Ok(inserted)
}

/// One joined grade/score row; `score_type` and `score` are null for a
/// record without scores.
#[derive(Debug, Clone)]
pub struct ScoreRow {
    pub grade_id: Uuid,
    pub learner_id: i64,
    pub class_id: i32,
    pub score_type: Option<String>,
    pub score: Option<f64>,
}

/// Folds joined rows back into records, keeping first-seen record order.
pub fn assemble_records(rows: Vec<ScoreRow>) -> Vec<GradeRecord> {
    let mut records: Vec<GradeRecord> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.grade_id).or_insert_with(|| {
            records.push(GradeRecord {
                learner_id: row.learner_id,
                class_id: row.class_id,
                scores: Vec::new(),
            });
            records.len() - 1
        });

        let (Some(raw_type), Some(score)) = (row.score_type, row.score) else {
            continue;
        };
        match raw_type.parse::<ScoreType>() {
            Ok(score_type) => records[slot]
                .scores
                .push(ScoreEntry::new(score_type, score)),
            Err(_) => warn!(
                grade_id = %row.grade_id,
                score_type = %raw_type,
                "Skipping unknown score type"
            ),
        }
    }

    records
}

enum Filter {
    Learner(i64),
    Class(i32),
    All,
}

pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, filter: Filter) -> Result<Vec<GradeRecord>> {
        let mut query = String::from(
            "SELECT g.id AS grade_id, g.learner_id, g.class_id, s.score_type, s.score \
             FROM learner_grades.grades g \
             LEFT JOIN learner_grades.grade_scores s ON s.grade_id = g.id",
        );

        match filter {
            Filter::Learner(_) => query.push_str(" WHERE g.learner_id = $1"),
            Filter::Class(_) => query.push_str(" WHERE g.class_id = $1"),
            Filter::All => {}
        }
        query.push_str(" ORDER BY g.learner_id, g.class_id, g.created_at, g.id, s.position");

        let mut rows = sqlx::query(&query);
        match filter {
            Filter::Learner(id) => rows = rows.bind(id),
            Filter::Class(id) => rows = rows.bind(id),
            Filter::All => {}
        }

        let fetched = rows.fetch_all(&self.pool).await?;
        let mut score_rows = Vec::with_capacity(fetched.len());

        for row in fetched {
            score_rows.push(ScoreRow {
                grade_id: row.try_get("grade_id")?,
                learner_id: row.try_get("learner_id")?,
                class_id: row.try_get("class_id")?,
                score_type: row.try_get("score_type")?,
                score: row.try_get("score")?,
            });
        }

        let records = assemble_records(score_rows);
        debug!(records = records.len(), "Loaded grade records");
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    async fn fetch_by_learner(&self, learner_id: i64) -> Result<Vec<GradeRecord>> {
        self.fetch(Filter::Learner(learner_id)).await
    }

    async fn fetch_by_class(&self, class_id: i32) -> Result<Vec<GradeRecord>> {
        self.fetch(Filter::Class(class_id)).await
    }

    async fn fetch_all(&self) -> Result<Vec<GradeRecord>> {
        self.fetch(Filter::All).await
    }
}
