// src/services.rs
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{PollError, PollResult};
use crate::grid;
use crate::models::PollRecord;
use crate::slot::SlotKey;
use crate::store::{CasOutcome, RecordStore};

/// Bounds the optimistic read-modify-write loop on submit.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub version: i64,
    pub attempts: u32,
    pub stored_slots: usize,
}

/// Replaces one participant's slot set, leaving everyone else untouched.
///
/// Each attempt reads the record, swaps in this participant's entry and
/// writes back only if nobody else wrote in between. A lost race re-reads
/// and tries again, so concurrent participants never overwrite each other.
pub async fn submit(
    store: &dyn RecordStore,
    policy: RetryPolicy,
    poll_id: &str,
    participant_id: &str,
    slot_keys: &[SlotKey],
) -> PollResult<SubmitOutcome> {
    // Ids match by exact string; only an all-blank id is refused.
    let participant = participant_id;
    if participant.trim().is_empty() {
        return Err(PollError::validation("participant id must not be empty"));
    }
    let slots: BTreeSet<SlotKey> = slot_keys.iter().copied().collect();
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let Some(mut stored) = store.get(poll_id).await? else {
            return Err(PollError::NotFound(poll_id.to_string()));
        };

        if attempt == 1 {
            warn_out_of_grid(&stored.record, participant, &slots);
        }

        stored.record.availabilities.insert(participant.to_string(), slots.clone());

        match store.compare_and_set(poll_id, stored.version, &stored.record).await? {
            CasOutcome::Written { version } => {
                tracing::info!(
                    poll_id,
                    participant,
                    slots = slots.len(),
                    attempt,
                    version,
                    "availability stored"
                );
                return Ok(SubmitOutcome {
                    version,
                    attempts: attempt,
                    stored_slots: slots.len(),
                });
            }
            CasOutcome::Missing => return Err(PollError::NotFound(poll_id.to_string())),
            CasOutcome::Conflict => {
                tracing::debug!(poll_id, participant, attempt, "write conflict, retrying");
                if attempt < max_attempts {
                    tokio::time::sleep(backoff_for(&policy, attempt)).await;
                }
            }
        }
    }

    tracing::warn!(poll_id, participant, attempts = max_attempts, "giving up on submit");
    Err(PollError::ConcurrentUpdateConflict {
        poll_id: poll_id.to_string(),
        attempts: max_attempts,
    })
}

/// Linear backoff, saturating instead of overflowing.
fn backoff_for(policy: &RetryPolicy, attempt: u32) -> Duration {
    policy.backoff.saturating_mul(attempt)
}

fn warn_out_of_grid(record: &PollRecord, participant: &str, slots: &BTreeSet<SlotKey>) {
    let Ok(cells) = record.grid() else {
        return;
    };
    let keys = grid::grid_keys(&cells);
    let stray = slots.iter().filter(|k| !keys.contains(k)).count();
    if stray > 0 {
        tracing::warn!(poll_id = %record.id, participant, stray, "slot keys outside the poll grid");
    }
}
