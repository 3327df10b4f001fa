//! Recovery sweep for claims abandoned by a crashed or killed dispatch run.

use crate::demand::history::GenerationHistoryRecord;
use crate::demand::item::QueueItem;
use crate::error::ApiError;
use crate::store::{HistoryLog, QueueFilter, QueueStore, Transition};
use crate::types::QueueStatus;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

const STALE_CLAIM_ERROR: &str = "reclaimed: stale in-progress claim";

/// Move every `in_progress` item whose last attempt started before
/// `now - older_than` back to `pending`. Returns the reclaimed rows.
///
/// Each reclaim only applies if the row still carries the batch id seen
/// during the scan, so an item a live run finishes meanwhile is left alone.
pub fn reclaim_stale<S>(
    store: &S,
    older_than: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<QueueItem>, ApiError>
where
    S: QueueStore + HistoryLog + ?Sized,
{
    let cutoff = now.checked_sub_signed(older_than).ok_or_else(|| {
        ApiError::InvalidRequest(format!(
            "stale age of {} minutes reaches past the earliest representable time",
            older_than.num_minutes()
        ))
    })?;
    let stale: Vec<QueueItem> = store
        .list(&QueueFilter::default().with_status(QueueStatus::InProgress))?
        .into_iter()
        .filter(|item| item.last_attempt_at.unwrap_or(item.updated_at) < cutoff)
        .collect();

    let mut reclaimed = Vec::new();
    for item in stale {
        let held_by = item.batch_id.clone();
        let outcome = store.transition(&item.id, &mut |row| row.reclaim(held_by.as_deref(), now))?;
        let Transition::Applied(row) = outcome else {
            continue;
        };
        let record = GenerationHistoryRecord::failure(
            &row,
            held_by.as_deref().unwrap_or(""),
            row.attempts,
            None,
            None,
            STALE_CLAIM_ERROR,
        );
        if let Err(e) = store.append(&record) {
            error!(queue_item_id = %row.id, error = %e, "Failed to record reclaimed attempt");
        }
        info!(
            queue_item_id = %row.id,
            batch_id = held_by.as_deref().unwrap_or(""),
            attempts = row.attempts,
            "Reclaimed stale in-progress item"
        );
        reclaimed.push(row);
    }
    Ok(reclaimed)
}
