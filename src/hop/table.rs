//! Off-peak half-hour slots and their provider interval numbers

use crate::error::{EkiwiError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Number of half-hour slots enumerated when building the table
pub const SLOT_COUNT: usize = 47;

/// Slot indices excluded as peak time (starts 06:30-08:30 and 16:30-20:30)
pub const PEAK_SLOTS: [RangeInclusive<usize>; 2] = [13..=17, 33..=41];

static TABLE: Lazy<HourOfPowerTable> = Lazy::new(HourOfPowerTable::build);

/// One selectable Hour of Power window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopSlot {
    /// Raw half-hour index of the day (0 = 00:00)
    pub slot_index: usize,
    /// `HH:MM` start time
    pub label: String,
    /// Provider interval number, 1-based over off-peak slots only
    pub interval: u32,
}

/// Bidirectional label <-> interval map restricted to off-peak slots
#[derive(Debug, Clone)]
pub struct HourOfPowerTable {
    slots: Vec<HopSlot>,
    by_label: HashMap<String, usize>,
    by_interval: HashMap<u32, usize>,
}

impl HourOfPowerTable {
    /// Process-wide table, built on first use
    pub fn global() -> &'static HourOfPowerTable {
        &TABLE
    }

    /// Build the table from the slot enumeration
    pub fn build() -> Self {
        let mut slots = Vec::with_capacity(SLOT_COUNT);
        let mut next_interval = 1u32;
        for slot_index in (0..SLOT_COUNT).filter(|i| !is_peak_slot(*i)) {
            slots.push(HopSlot {
                slot_index,
                label: slot_label(slot_index),
                interval: next_interval,
            });
            next_interval += 1;
        }

        let by_label = slots
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.label.clone(), pos))
            .collect();
        let by_interval = slots
            .iter()
            .enumerate()
            .map(|(pos, s)| (s.interval, pos))
            .collect();

        Self {
            slots,
            by_label,
            by_interval,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[HopSlot] {
        &self.slots
    }

    /// Ordered off-peak labels
    pub fn all_labels(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.label.clone()).collect()
    }

    /// Interval numbers in the same order as [`Self::all_labels`]
    pub fn all_intervals(&self) -> Vec<u32> {
        self.slots.iter().map(|s| s.interval).collect()
    }

    pub fn label_to_interval(&self, label: &str) -> Result<u32> {
        self.by_label
            .get(label.trim())
            .map(|pos| self.slots[*pos].interval)
            .ok_or_else(|| {
                EkiwiError::not_found(format!(
                    "No off-peak Hour of Power slot starts at '{}'",
                    label
                ))
            })
    }

    pub fn interval_to_label(&self, interval: u32) -> Result<&str> {
        self.by_interval
            .get(&interval)
            .map(|pos| self.slots[*pos].label.as_str())
            .ok_or_else(|| {
                EkiwiError::not_found(format!("Unknown Hour of Power interval {}", interval))
            })
    }
}

impl Default for HourOfPowerTable {
    fn default() -> Self {
        Self::build()
    }
}

/// Whether a raw half-hour index falls in a peak window
pub fn is_peak_slot(slot_index: usize) -> bool {
    PEAK_SLOTS.iter().any(|r| r.contains(&slot_index))
}

/// `HH:MM` label for the start of a raw half-hour index
pub fn slot_label(slot_index: usize) -> String {
    let minutes = 30 * slot_index;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
