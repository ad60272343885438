use std::num::NonZeroU32;

use anyhow::Context;

use crate::stats::DEFAULT_THRESHOLD;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub threshold: f64,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let max_connections = match lookup("GRADES_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroU32>()
                .map(NonZeroU32::get)
                .with_context(|| {
                    format!("GRADES_MAX_CONNECTIONS must be a positive integer, got '{raw}'")
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let threshold = match lookup("GRADES_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("GRADES_THRESHOLD must be a number, got '{raw}'"))?,
            None => DEFAULT_THRESHOLD,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections,
            threshold,
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }
}
