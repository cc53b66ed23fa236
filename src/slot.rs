// src/slot.rs
//! Canonical slot keys.
//!
//! A slot key counts 30-minute buckets since the Unix epoch. It is computed
//! from the absolute instant a local wall time denotes in a zone, so the same
//! moment always yields the same key no matter which zone anchored it.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

pub type SlotKey = i64;

pub const SLOT_MINUTES: u32 = 30;
pub const SLOT_MILLIS: i64 = SLOT_MINUTES as i64 * 60 * 1000;
pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("unknown time zone: {0:?}")]
    InvalidTimeZone(String),

    #[error("{0} minutes from midnight is not on a 30-minute boundary")]
    UnalignedSlot(u32),

    #[error("{0} minutes from midnight is past the end of the day")]
    MinutesOutOfRange(u32),

    #[error("slot key {0} does not map to a representable instant")]
    KeyOutOfRange(SlotKey),

    #[error("{0} has no representable instant in this zone")]
    DateOutOfRange(NaiveDateTime),
}

/// Resolves an IANA zone identifier. Missing or blank means UTC.
pub fn parse_zone(name: Option<&str>) -> Result<Tz, SlotError> {
    match name.map(str::trim) {
        None | Some("") => Ok(Tz::UTC),
        Some(id) => id
            .parse::<Tz>()
            .map_err(|_| SlotError::InvalidTimeZone(id.to_string())),
    }
}

/// Maps a local wall time on `date` in `zone` to its canonical slot key.
pub fn to_slot_key(date: NaiveDate, minutes: u32, zone: Tz) -> Result<SlotKey, SlotError> {
    if minutes % SLOT_MINUTES != 0 {
        return Err(SlotError::UnalignedSlot(minutes));
    }
    let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .ok_or(SlotError::MinutesOutOfRange(minutes))?;

    let local = date.and_time(time);
    let instant = resolve_local(local, zone).ok_or(SlotError::DateOutOfRange(local))?;
    Ok(instant.timestamp_millis().div_euclid(SLOT_MILLIS))
}

/// Converts a zone-local wall time to an absolute instant.
///
/// The offset is read at a first guess (the wall time taken as UTC) and then
/// re-read at the instant that guess produced. Wall times inside a
/// spring-forward gap or a fall-back overlap land on one instant either way.
/// `None` only at the edges of the calendar, where the shift overflows.
pub fn resolve_local(local: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    let first = offset_at(zone, local);
    let guess = local.checked_sub_signed(first)?;
    let second = offset_at(zone, guess);

    let resolved = if second == first {
        guess
    } else {
        local.checked_sub_signed(second)?
    };
    Some(resolved.and_utc())
}

fn offset_at(zone: Tz, utc: NaiveDateTime) -> TimeDelta {
    let seconds = zone.offset_from_utc_datetime(&utc).fix().local_minus_utc();
    TimeDelta::seconds(i64::from(seconds))
}

/// Start instant of the bucket a key names.
pub fn from_slot_key(key: SlotKey) -> Result<DateTime<Utc>, SlotError> {
    key.checked_mul(SLOT_MILLIS)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(SlotError::KeyOutOfRange(key))
}

/// Human label for an instant as seen in `zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotLabel {
    pub date: NaiveDate,
    pub time: String,
    pub zone: String,
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.date, self.time, self.zone)
    }
}

/// Display projection. Never feed the result back into key computation.
pub fn format_in_zone(instant: DateTime<Utc>, zone: Tz) -> SlotLabel {
    let local = instant.with_timezone(&zone);
    SlotLabel {
        date: local.date_naive(),
        time: local.format("%H:%M").to_string(),
        zone: local.format("%Z").to_string(),
    }
}

/// Label for a slot key in `zone`.
pub fn label_key(key: SlotKey, zone: Tz) -> Result<SlotLabel, SlotError> {
    Ok(format_in_zone(from_slot_key(key)?, zone))
}
