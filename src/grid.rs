// src/grid.rs
use std::collections::BTreeSet;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::{DailyWindow, DateRange};
use crate::slot::{self, SlotError, SlotKey, SlotLabel, SLOT_MINUTES};

/// One selectable cell: a date column and a half-hour row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub date: NaiveDate,
    pub slot_index: u32,
    pub minutes: u32,
    pub slot_key: SlotKey,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledCell {
    #[serde(flatten)]
    pub cell: GridCell,
    pub display: SlotLabel,
    pub base: SlotLabel,
}

/// Number of half-hour rows per day. An empty or inverted window has none.
pub fn buckets_per_day(window: &DailyWindow) -> u32 {
    let start = window.start_time.minutes();
    let end = window.end_time.minutes();
    if end <= start {
        0
    } else {
        (end - start) / SLOT_MINUTES
    }
}

/// Enumerates the grid, date-major.
///
/// Every day gets the same rows. On a day with a DST change a row simply maps
/// to whatever instant its wall time resolves to, so rows inside a
/// spring-forward gap share a key with the rows they resolve onto.
pub fn build_grid(range: &DateRange, window: &DailyWindow, base: Tz) -> Result<Vec<GridCell>, SlotError> {
    let per_day = buckets_per_day(window);
    let start = window.start_time.minutes();
    let mut cells = Vec::new();

    for date in range.days() {
        for slot_index in 0..per_day {
            let minutes = start + slot_index * SLOT_MINUTES;
            cells.push(GridCell {
                date,
                slot_index,
                minutes,
                slot_key: slot::to_slot_key(date, minutes, base)?,
            });
        }
    }

    Ok(cells)
}

/// Distinct keys in the grid.
pub fn grid_keys(cells: &[GridCell]) -> BTreeSet<SlotKey> {
    cells.iter().map(|c| c.slot_key).collect()
}

/// Attaches labels for the viewer's zone and the organizer's zone.
pub fn label_grid(cells: &[GridCell], display: Tz, base: Tz) -> Result<Vec<LabeledCell>, SlotError> {
    cells
        .iter()
        .map(|cell| -> Result<LabeledCell, SlotError> {
            let instant = slot::from_slot_key(cell.slot_key)?;
            Ok(LabeledCell {
                cell: *cell,
                display: slot::format_in_zone(instant, display),
                base: slot::format_in_zone(instant, base),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WallTime;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange {
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    fn window(start: &str, end: &str) -> DailyWindow {
        DailyWindow {
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
        }
    }

    #[test]
    fn size_is_days_times_buckets() {
        let r = range((2024, 1, 1), (2024, 1, 7));
        let w = window("08:00", "17:30");
        let cells = build_grid(&r, &w, Tz::UTC).unwrap();
        assert_eq!(buckets_per_day(&w), 19);
        assert_eq!(cells.len(), 7 * 19);
        assert_eq!(grid_keys(&cells).len(), 7 * 19);
    }

    #[test]
    fn two_days_two_slots() {
        let cells = build_grid(
            &range((2024, 1, 1), (2024, 1, 2)),
            &window("09:00", "10:00"),
            Tz::UTC,
        )
        .unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].slot_index, 0);
        assert_eq!(cells[1].minutes, 570);
        assert_eq!(cells[1].slot_key, cells[0].slot_key + 1);
        // next day starts 48 buckets after the first
        assert_eq!(cells[2].slot_key, cells[0].slot_key + 48);
    }

    #[test]
    fn inverted_window_is_empty() {
        let r = range((2024, 1, 1), (2024, 1, 3));
        assert!(build_grid(&r, &window("10:00", "10:00"), Tz::UTC).unwrap().is_empty());
        assert!(build_grid(&r, &window("12:00", "09:00"), Tz::UTC).unwrap().is_empty());
    }

    #[test]
    fn unaligned_start_is_rejected() {
        let r = range((2024, 1, 1), (2024, 1, 1));
        let w = DailyWindow {
            start_time: WallTime::hm(9, 15).unwrap(),
            end_time: WallTime::hm(10, 15).unwrap(),
        };
        assert_eq!(build_grid(&r, &w, Tz::UTC), Err(SlotError::UnalignedSlot(555)));
    }

    #[test]
    fn window_to_midnight() {
        let r = range((2024, 1, 1), (2024, 1, 1));
        let cells = build_grid(&r, &window("23:00", "24:00"), Tz::UTC).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].minutes, 23 * 60 + 30);
    }

    #[test]
    fn last_representable_date_has_full_rows() {
        let r = DateRange { start_date: NaiveDate::MAX, end_date: NaiveDate::MAX };
        let cells = build_grid(&r, &window("09:00", "10:00"), Tz::UTC).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].slot_key, cells[0].slot_key + 1);
    }

    #[test]
    fn dst_day_keeps_row_count() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let r = range((2024, 3, 30), (2024, 3, 31));
        let w = window("01:00", "05:00");
        let cells = build_grid(&r, &w, berlin).unwrap();
        assert_eq!(cells.len(), 16);

        let sunday: Vec<_> = cells.iter().filter(|c| c.date == r.end_date).collect();
        assert_eq!(sunday.len(), 8);
        // 02:00 and 02:30 do not exist; they alias 03:00 and 03:30
        assert_eq!(sunday[2].slot_key, sunday[4].slot_key);
        assert_eq!(sunday[3].slot_key, sunday[5].slot_key);
        assert_eq!(grid_keys(&cells).len(), 14);
    }

    #[test]
    fn labels_follow_display_zone() {
        let la: Tz = "America/Los_Angeles".parse().unwrap();
        let cells = build_grid(
            &range((2024, 1, 1), (2024, 1, 1)),
            &window("17:00", "18:00"),
            Tz::UTC,
        )
        .unwrap();
        let labeled = label_grid(&cells, la, Tz::UTC).unwrap();
        assert_eq!(labeled[0].display.time, "09:00");
        assert_eq!(labeled[0].base.time, "17:00");
        assert_eq!(labeled[1].display.to_string(), "2024-01-01 09:30 PST");
    }
}
