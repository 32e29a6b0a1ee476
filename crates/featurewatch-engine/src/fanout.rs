//! Batch fan-out handler: turns one periodic trigger into a
//! `RefreshSearchCommand` per saved search at the triggered frequency.
//!
//! Lists searches in pages so memory use doesn't scale with the number of
//! saved searches; a publish failure partway through a batch fails the
//! whole batch transiently, since re-running the fan-out after the
//! transport retries is harmless — the producer's idempotency absorbs the
//! redelivery.

use featurewatch_errors::FwError;
use featurewatch_transport::contracts::{CommandPublisher, SavedSearchLister};
use featurewatch_transport::envelopes::{CommandEnvelope, RefreshSearchCommand};
use featurewatch_types::Frequency;
use std::sync::Arc;

/// The collaborators the fan-out handler needs.
#[derive(Clone)]
pub struct FanoutContext {
    pub saved_search_lister: Arc<dyn SavedSearchLister>,
    pub command_publisher: Arc<dyn CommandPublisher>,
}

/// Fan a `BatchRefreshTrigger` out into one `RefreshSearchCommand` per
/// saved search scheduled at `frequency`.
///
/// `generated_at` is the timestamp stamped onto every resulting command;
/// it is taken as a parameter rather than read from the clock here so the
/// same trigger fans out identically across retries.
pub async fn process_batch_update(
    ctx: &FanoutContext,
    frequency: Frequency,
    generated_at: chrono::DateTime<chrono::Utc>,
) -> Result<usize, FwError> {
    let mut page_token = None;
    let mut published = 0usize;

    loop {
        let (page, next_token) = ctx
            .saved_search_lister
            .list_saved_searches(frequency, page_token)
            .await?;

        for search in &page {
            let command = CommandEnvelope::RefreshSearch(RefreshSearchCommand {
                search_id: search.search_id.clone(),
                query: search.query.clone(),
                frequency,
                timestamp: generated_at,
            });
            ctx.command_publisher.publish(command).await.map_err(|e| {
                e.with_op("fanout.process_batch_update")
                    .with_search_id(search.search_id.clone())
            })?;
            published += 1;
        }

        match next_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(published)
}
