//! Weighted grade aggregation over per-learner, per-class score records.
//!
//! The engine (`scoring`, `grouping`, `stats`) is pure and holds no state;
//! `source` and `db` supply record snapshots, `query` validates request keys.

pub mod config;
pub mod db;
pub mod error;
pub mod grouping;
pub mod models;
pub mod query;
pub mod report;
pub mod scoring;
pub mod source;
pub mod stats;

pub use error::{GradeError, Result};
