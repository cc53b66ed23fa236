// src/poll.rs
use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::{PollError, PollResult};
use crate::grid::{self, GridCell};
use crate::models::{NewPoll, PollRecord, WallTime};
use crate::slot::{self, SlotError, SLOT_MINUTES};
use crate::store::RecordStore;

/// Longest date range a poll may span.
pub const MAX_POLL_DAYS: i64 = 62;

impl PollRecord {
    pub fn base_zone(&self) -> Result<Tz, SlotError> {
        slot::parse_zone(Some(&self.base_time_zone))
    }

    /// The selectable grid, anchored in the base zone.
    pub fn grid(&self) -> Result<Vec<GridCell>, SlotError> {
        grid::build_grid(&self.date_range, &self.daily_window, self.base_zone()?)
    }
}

fn check_aligned(time: WallTime) -> Result<(), SlotError> {
    if time.minutes() % SLOT_MINUTES != 0 {
        return Err(SlotError::UnalignedSlot(time.minutes()));
    }
    Ok(())
}

/// Checks a create request and returns the zone it resolves to.
pub fn validate(new: &NewPoll) -> PollResult<Tz> {
    let range = &new.date_range;
    let window = &new.daily_window;

    if range.start_date > range.end_date {
        return Err(PollError::validation(format!(
            "start date {} is after end date {}",
            range.start_date, range.end_date
        )));
    }
    if range.day_count() > MAX_POLL_DAYS {
        return Err(PollError::validation(format!(
            "date range spans {} days, at most {MAX_POLL_DAYS} allowed",
            range.day_count()
        )));
    }
    if window.start_time >= window.end_time {
        return Err(PollError::validation(format!(
            "start time {} must be before end time {}",
            window.start_time, window.end_time
        )));
    }
    check_aligned(window.start_time)?;
    check_aligned(window.end_time)?;

    let zone = slot::parse_zone(new.base_time_zone.as_deref())?;
    grid::build_grid(range, window, zone)?;
    Ok(zone)
}

/// Validates and persists a new poll with no availabilities.
pub async fn create(store: &dyn RecordStore, new: NewPoll) -> PollResult<PollRecord> {
    let zone = validate(&new)?;

    let record = PollRecord {
        id: Uuid::new_v4().to_string(),
        date_range: new.date_range,
        daily_window: new.daily_window,
        base_time_zone: zone.name().to_string(),
        availabilities: Default::default(),
        created_at: Utc::now(),
    };
    store.insert(&record).await?;

    tracing::info!(
        poll_id = %record.id,
        start = %record.date_range.start_date,
        end = %record.date_range.end_date,
        from = %record.daily_window.start_time,
        to = %record.daily_window.end_time,
        zone = %record.base_time_zone,
        "poll created"
    );
    Ok(record)
}

pub async fn get(store: &dyn RecordStore, id: &str) -> PollResult<PollRecord> {
    store
        .get(id)
        .await?
        .map(|stored| stored.record)
        .ok_or_else(|| PollError::NotFound(id.to_string()))
}
