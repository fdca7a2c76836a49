//! # Embedding Backfill Tests

use admitrag::{
    backfill_embeddings, providers::db::storage::SemanticRetriever, BackfillOptions,
    BackfillReport,
};
use admitrag_test_utils::{MockEmbedder, TestSetup};
use anyhow::Result;
use std::time::Duration;

fn no_delay(limit: u32) -> BackfillOptions {
    BackfillOptions {
        limit,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_backfill_embeds_missing_rows_only() -> Result<()> {
    let setup = TestSetup::new().await?;
    let provider = &setup.provider;
    provider
        .insert_training_text("already embedded", Some(&[1.0, 0.0]))
        .await?;
    provider.insert_training_text("WFA basics", None).await?;
    provider.insert_training_text("WFR advanced", None).await?;

    let embedder = MockEmbedder::new(vec![0.0, 1.0]);
    let report = backfill_embeddings(provider, &embedder, no_delay(20)).await?;

    assert_eq!(
        report,
        BackfillReport {
            found: 2,
            updated: 2,
            failed: 0
        }
    );
    assert_eq!(embedder.inputs(), vec!["WFA basics", "WFR advanced"]);

    // The backfilled rows are now searchable.
    let chunks = provider.match_chunks(&[0.0, 1.0], 3).await?;
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].text, "already embedded");

    // A second run finds nothing left to do.
    let again = backfill_embeddings(provider, &embedder, no_delay(20)).await?;
    assert_eq!(again, BackfillReport::default());
    Ok(())
}

#[tokio::test]
async fn test_backfill_respects_limit() -> Result<()> {
    let setup = TestSetup::new().await?;
    for i in 0..5 {
        setup
            .provider
            .insert_training_text(&format!("row {i}"), None)
            .await?;
    }

    let embedder = MockEmbedder::new(vec![1.0]);
    let report = backfill_embeddings(&setup.provider, &embedder, no_delay(2)).await?;

    assert_eq!(report.found, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(embedder.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_backfill_counts_failures_without_aborting() -> Result<()> {
    let setup = TestSetup::new().await?;
    setup.provider.insert_training_text("one", None).await?;
    setup.provider.insert_training_text("   ", None).await?;
    setup.provider.insert_training_text("three", None).await?;

    let embedder = MockEmbedder::new(vec![1.0, 0.0]);
    embedder.fail_with("quota exceeded");
    let report = backfill_embeddings(&setup.provider, &embedder, no_delay(20)).await?;

    assert_eq!(
        report,
        BackfillReport {
            found: 3,
            updated: 0,
            failed: 3
        }
    );
    // The blank row is skipped before reaching the embedder.
    assert_eq!(embedder.call_count(), 2);
    Ok(())
}
