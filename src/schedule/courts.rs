use std::collections::{HashMap, HashSet};

use chrono::Weekday;

use super::types::{CourtRecord, SeasonPlan, SlotKey};

/// The externally supplied court supply, grouped per slot.
#[derive(Debug, Clone, Default)]
pub struct CourtInventory {
    /// Slots in chronological order; courts in input order.
    slots: Vec<(SlotKey, Vec<String>)>,
    positions: HashMap<SlotKey, usize>,
}

impl CourtInventory {
    pub fn new(records: &[CourtRecord]) -> Self {
        let mut slots: Vec<(SlotKey, Vec<String>)> = Vec::new();
        let mut positions: HashMap<SlotKey, usize> = HashMap::new();
        for record in records {
            let position = *positions.entry(record.slot.clone()).or_insert_with(|| {
                slots.push((record.slot.clone(), Vec::new()));
                slots.len() - 1
            });
            let courts = &mut slots[position].1;
            if !courts.contains(&record.court) {
                courts.push(record.court.clone());
            }
        }

        slots.sort_by(|a, b| a.0.order_key().cmp(&b.0.order_key()));
        let positions = slots
            .iter()
            .enumerate()
            .map(|(i, (slot, _))| (slot.clone(), i))
            .collect();
        Self { slots, positions }
    }

    pub fn slots(&self) -> impl Iterator<Item = (&SlotKey, &[String])> {
        self.slots.iter().map(|(slot, courts)| (slot, courts.as_slice()))
    }

    /// Slots on one weekday, by start time then location.
    pub fn slots_on(&self, day: Weekday) -> impl Iterator<Item = (&SlotKey, &[String])> {
        self.slots().filter(move |(slot, _)| slot.day == day)
    }

    pub fn courts_at(&self, slot: &SlotKey) -> &[String] {
        self.positions
            .get(slot)
            .map(|&i| self.slots[i].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, slot: &SlotKey) -> bool {
        self.positions.contains_key(slot)
    }

    pub fn court_count(&self) -> usize {
        self.slots.iter().map(|(_, courts)| courts.len()).sum()
    }
}

/// Which (week, slot, court) combinations are taken.
#[derive(Debug, Clone, Default)]
pub struct CourtLedger {
    booked: HashSet<(u32, SlotKey, String)>,
}

impl CourtLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the ledger from the assignments of a plan.
    pub fn from_plan(plan: &SeasonPlan) -> Self {
        let mut ledger = Self::new();
        for assignment in plan.iter() {
            ledger.book(assignment.week, &assignment.slot, &assignment.court);
        }
        ledger
    }

    /// Books a court. Returns false if it was already taken.
    pub fn book(&mut self, week: u32, slot: &SlotKey, court: &str) -> bool {
        self.booked.insert((week, slot.clone(), court.to_string()))
    }

    pub fn release(&mut self, week: u32, slot: &SlotKey, court: &str) {
        self.booked.remove(&(week, slot.clone(), court.to_string()));
    }

    pub fn is_free(&self, week: u32, slot: &SlotKey, court: &str) -> bool {
        !self.booked.contains(&(week, slot.clone(), court.to_string()))
    }

    /// Courts at `slot` still free in `week`, in inventory order.
    pub fn free_courts<'a>(
        &self,
        inventory: &'a CourtInventory,
        week: u32,
        slot: &SlotKey,
    ) -> Vec<&'a str> {
        inventory
            .courts_at(slot)
            .iter()
            .filter(|court| self.is_free(week, slot, court))
            .map(String::as_str)
            .collect()
    }

    pub fn first_free_court<'a>(
        &self,
        inventory: &'a CourtInventory,
        week: u32,
        slot: &SlotKey,
    ) -> Option<&'a str> {
        inventory
            .courts_at(slot)
            .iter()
            .find(|court| self.is_free(week, slot, court))
            .map(String::as_str)
    }
}
