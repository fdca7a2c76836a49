//! # Embedding Backfill
//!
//! Fills in vector embeddings for training rows that were inserted without one.
//! Rows are processed one at a time with a fixed pause in between to stay under
//! the embedding API's rate limits.

use crate::{
    errors::BackfillError,
    providers::{ai::EmbeddingProvider, db::storage::TrainingData},
};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_BACKFILL_LIMIT: u32 = 20;
pub const DEFAULT_BACKFILL_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
pub struct BackfillOptions {
    /// Maximum number of rows fetched in one run.
    pub limit: u32,
    /// Pause between two rows.
    pub delay: Duration,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_BACKFILL_LIMIT,
            delay: DEFAULT_BACKFILL_DELAY,
        }
    }
}

/// The outcome of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub found: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Embeds up to `options.limit` rows lacking an embedding and writes the vectors back.
///
/// A failing row is logged and counted; it never aborts the run. Only a failure to
/// list the rows is returned as an error.
pub async fn backfill_embeddings(
    data: &dyn TrainingData,
    embedder: &dyn EmbeddingProvider,
    options: BackfillOptions,
) -> Result<BackfillReport, BackfillError> {
    let rows = data.rows_missing_embedding(options.limit).await?;
    let mut report = BackfillReport {
        found: rows.len(),
        ..Default::default()
    };
    info!("Found {} records to embed", report.found);

    for (index, row) in rows.iter().enumerate() {
        if index > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }

        if row.text.trim().is_empty() {
            warn!("Skipping row ID {} with empty text", row.id);
            report.failed += 1;
            continue;
        }

        let result = match embedder.embed(&row.text).await {
            Ok(vector) => data.update_embedding(row.id, &vector).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("Updated row ID {}", row.id);
                report.updated += 1;
            }
            Err(e) => {
                error!("Error on row {}: {e}", row.id);
                report.failed += 1;
            }
        }
    }

    info!(
        found = report.found,
        updated = report.updated,
        failed = report.failed,
        "Backfill finished"
    );
    Ok(report)
}
