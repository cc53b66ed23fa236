// src/models.rs
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::slot::{SlotKey, MINUTES_PER_DAY};

/// Local wall-clock time as minutes from midnight, written `"HH:MM"`.
///
/// `"24:00"` is accepted so a window can run to the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime(u32);

impl WallTime {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        if minute >= 60 {
            return None;
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for WallTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("invalid time {s:?}, expected HH:MM");
        let (h, m) = s.split_once(':').ok_or_else(bad)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(bad());
        }
        let hour: u32 = h.parse().map_err(|_| bad())?;
        let minute: u32 = m.parse().map_err(|_| bad())?;
        Self::hm(hour, minute).ok_or_else(bad)
    }
}

impl Serialize for WallTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive calendar dates in the poll's base zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Every date from start to end, both included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date;
        std::iter::successors(Some(self.start_date), |d| d.succ_opt())
            .take_while(move |d| *d <= end)
    }

    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Daily window applied to every date in the range. End is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWindow {
    pub start_time: WallTime,
    pub end_time: WallTime,
}

fn default_zone() -> String {
    "UTC".to_string()
}

/// The stored poll. Date range and daily window sit flat in the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub id: String,
    #[serde(flatten)]
    pub date_range: DateRange,
    #[serde(flatten)]
    pub daily_window: DailyWindow,
    #[serde(default = "default_zone")]
    pub base_time_zone: String,
    #[serde(default)]
    pub availabilities: BTreeMap<String, BTreeSet<SlotKey>>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/poll`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    #[serde(flatten)]
    pub date_range: DateRange,
    #[serde(flatten)]
    pub daily_window: DailyWindow,
    #[serde(default)]
    pub base_time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoll {
    pub poll_id: String,
}

/// Body of `PUT /api/poll`. Accepts the older `email`/`availability` names.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub poll_id: String,
    #[serde(alias = "email")]
    pub participant_id: String,
    #[serde(alias = "availability")]
    pub slot_keys: Vec<SlotKey>,
    #[serde(default, alias = "timezone")]
    pub display_time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoneQuery {
    pub tz: Option<String>,
}
