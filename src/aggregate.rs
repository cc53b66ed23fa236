// src/aggregate.rs
use std::collections::{BTreeMap, BTreeSet};

use chrono_tz::Tz;
use serde::Serialize;

use crate::grid::GridCell;
use crate::models::PollRecord;
use crate::slot::{self, SlotError, SlotKey, SlotLabel};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotTally {
    pub count: usize,
    pub respondents: BTreeSet<String>,
}

/// Per-slot response counts. Slots nobody picked are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub per_slot: BTreeMap<SlotKey, SlotTally>,
    pub total_participants: usize,
}

impl Aggregate {
    pub fn count(&self, key: SlotKey) -> usize {
        self.per_slot.get(&key).map_or(0, |t| t.count)
    }

    pub fn percentage(&self, key: SlotKey) -> f64 {
        percentage(self.count(key), self.total_participants)
    }

    pub fn level(&self, key: SlotKey) -> u8 {
        coverage_level(self.count(key), self.total_participants)
    }
}

pub fn aggregate(record: &PollRecord) -> Aggregate {
    let mut per_slot: BTreeMap<SlotKey, SlotTally> = BTreeMap::new();
    for (participant, keys) in &record.availabilities {
        for key in keys {
            let tally = per_slot.entry(*key).or_default();
            tally.count += 1;
            tally.respondents.insert(participant.clone());
        }
    }
    Aggregate {
        per_slot,
        total_participants: record.availabilities.len(),
    }
}

pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * count as f64 / total as f64
}

/// Heat-map bucket 0..=5.
///
/// 100% is 5, then 75%, 50% and 25% open levels 4, 3 and 2. Anything above
/// zero but under 25% is 1. Compared in integers so 3 of 4 is exactly 75.
pub fn coverage_level(count: usize, total: usize) -> u8 {
    if count == 0 || total == 0 {
        return 0;
    }
    let scaled = count * 100;
    if scaled >= total * 100 {
        5
    } else if scaled >= total * 75 {
        4
    } else if scaled >= total * 50 {
        3
    } else if scaled >= total * 25 {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatCell {
    #[serde(flatten)]
    pub cell: GridCell,
    pub count: usize,
    pub percentage: f64,
    pub level: u8,
    pub respondents: Vec<String>,
    pub display: SlotLabel,
    pub base: SlotLabel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatMap {
    pub poll_id: String,
    pub base_time_zone: String,
    pub display_time_zone: String,
    pub total_participants: usize,
    /// Distinct keys sharing the highest non-zero count.
    pub best_slots: Vec<SlotKey>,
    pub cells: Vec<HeatCell>,
}

/// Display-ready results: every grid cell, labelled in the viewer's zone and
/// in the poll's base zone.
pub fn heat_map(record: &PollRecord, display: Tz) -> Result<HeatMap, SlotError> {
    let base = record.base_zone()?;
    let summary = aggregate(record);
    let grid = record.grid()?;

    let mut cells = Vec::with_capacity(grid.len());
    for cell in grid {
        let instant = slot::from_slot_key(cell.slot_key)?;
        let tally = summary.per_slot.get(&cell.slot_key);
        cells.push(HeatCell {
            cell,
            count: summary.count(cell.slot_key),
            percentage: summary.percentage(cell.slot_key),
            level: summary.level(cell.slot_key),
            respondents: tally
                .map(|t| t.respondents.iter().cloned().collect())
                .unwrap_or_default(),
            display: slot::format_in_zone(instant, display),
            base: slot::format_in_zone(instant, base),
        });
    }

    let top = cells.iter().map(|c| c.count).max().unwrap_or(0);
    let mut best_slots = Vec::new();
    if top > 0 {
        for c in cells.iter().filter(|c| c.count == top) {
            if !best_slots.contains(&c.cell.slot_key) {
                best_slots.push(c.cell.slot_key);
            }
        }
    }

    Ok(HeatMap {
        poll_id: record.id.clone(),
        base_time_zone: record.base_time_zone.clone(),
        display_time_zone: display.name().to_string(),
        total_participants: summary.total_participants,
        best_slots,
        cells,
    })
}
