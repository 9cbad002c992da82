use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::Weekday;
use serde::Serialize;

use super::slot_utils::{weekday_name, TimeInterval, WeeklyAvailability};

/// Players per group.
pub const GROUP_SIZE: usize = 4;

/// Stable player identifier, taken verbatim from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlayerId(pub String);

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        PlayerId(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Maps the free-text gender field onto the two known values.
    pub fn parse(raw: &str) -> Option<Gender> {
        match raw.trim().to_lowercase().as_str() {
            "m" | "man" | "jongen" | "male" | "heer" => Some(Gender::Male),
            "v" | "vrouw" | "meisje" | "f" | "female" | "dame" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// One registered player. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<Gender>,
    pub level: Option<f64>,
    pub age: Option<u32>,
    pub preferred_location: String,
    pub availability: WeeklyAvailability,
    /// Normalized partner names as written by the player.
    pub wishes: Vec<String>,
    /// Wishes that resolved to another player on the roster.
    pub partners: BTreeSet<PlayerId>,
    /// Wishes naming nobody on the roster.
    pub dangling_wishes: usize,
    pub stays_in_group: bool,
}

impl Player {
    pub fn new(id: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            id: PlayerId::from(id),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            gender: None,
            level: None,
            age: None,
            preferred_location: String::new(),
            availability: WeeklyAvailability::new(),
            wishes: Vec::new(),
            partners: BTreeSet::new(),
            dangling_wishes: 0,
            stays_in_group: false,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.preferred_location = location.to_string();
        self
    }

    pub fn with_availability(mut self, day: Weekday, raw: &str) -> Self {
        self.availability = self.availability.with_day(day, raw);
        self
    }

    pub fn with_wish(mut self, name: &str) -> Self {
        self.wishes.push(crate::names::normalize_name(name));
        self
    }

    pub fn staying(mut self) -> Self {
        self.stays_in_group = true;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Level with the configured offset applied to female players.
    pub fn corrected_level(&self, female_offset: f64) -> Option<f64> {
        self.level.map(|level| match self.gender {
            Some(Gender::Female) => level + female_offset,
            _ => level,
        })
    }

    pub fn has_wishes(&self) -> bool {
        !self.wishes.is_empty()
    }

    pub fn wants(&self, other: &PlayerId) -> bool {
        self.partners.contains(other)
    }

    /// Whether the player can take part in a group at `slot`.
    ///
    /// One of the player's intervals on that weekday must overlap the slot,
    /// and the slot must be at the preferred location unless the location
    /// policy is flexible and the player holds a partner wish.
    pub fn available_at(&self, slot: &SlotKey, location_flexible: bool) -> bool {
        if !self.availability.overlaps(slot.day, &slot.interval) {
            return false;
        }
        self.preferred_location == slot.location || (location_flexible && self.has_wishes())
    }
}

/// A bookable (day, location, time interval) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub day: Weekday,
    pub location: String,
    pub interval: TimeInterval,
}

impl SlotKey {
    pub fn new(day: Weekday, location: &str, interval: TimeInterval) -> Self {
        Self {
            day,
            location: location.to_string(),
            interval,
        }
    }

    /// Chronological ordering key: weekday, start time, then location.
    pub fn order_key(&self) -> (u32, u32, &str) {
        (
            self.day.num_days_from_monday(),
            self.interval.start,
            self.location.as_str(),
        )
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            weekday_name(self.day),
            self.interval,
            self.location
        )
    }
}

/// One bookable court unit at a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CourtRecord {
    pub slot: SlotKey,
    pub court: String,
}

/// One availability entry of a trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerAvailability {
    pub trainer: String,
    pub slot: SlotKey,
}

/// A historical group with its original slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyRecord {
    pub group_id: String,
    /// Member names as written in the historical record.
    pub members: Vec<String>,
    pub slot: SlotKey,
}

/// How an assignment came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    New,
    LegacyFull,
    LegacyPartial,
}

impl Provenance {
    pub fn is_legacy(self) -> bool {
        !matches!(self, Provenance::New)
    }

    pub fn label(self) -> &'static str {
        match self {
            Provenance::New => "new",
            Provenance::LegacyFull => "legacy-full",
            Provenance::LegacyPartial => "legacy-partial",
        }
    }
}

/// A trainer identity, real or a generated placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrainerId {
    pub name: String,
    pub synthetic: bool,
}

/// The staffing state of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainerSlot {
    /// Trainer assignment has not run yet.
    Pending,
    Assigned(TrainerId),
    NoneAvailable,
}

impl TrainerSlot {
    pub fn label(&self) -> &str {
        match self {
            TrainerSlot::Pending => "",
            TrainerSlot::Assigned(trainer) => &trainer.name,
            TrainerSlot::NoneAvailable => "none available",
        }
    }
}

/// The atomic schedulable unit: one group on one court in one week.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub week: u32,
    pub slot: SlotKey,
    pub court: String,
    pub players: Vec<PlayerId>,
    pub provenance: Provenance,
    pub score: f64,
    pub trainer: TrainerSlot,
}

impl Assignment {
    pub fn new(
        week: u32,
        slot: SlotKey,
        court: &str,
        players: Vec<PlayerId>,
        provenance: Provenance,
        score: f64,
    ) -> Self {
        Self {
            week,
            slot,
            court: court.to_string(),
            players,
            provenance,
            score,
            trainer: TrainerSlot::Pending,
        }
    }
}

/// Stable handle into a [`SeasonPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentId(pub usize);

/// Per-week bookkeeping of who got a place.
#[derive(Debug, Clone, Default)]
pub struct WeekSummary {
    pub week: u32,
    pub scheduled: BTreeSet<PlayerId>,
    pub unscheduled: Vec<PlayerId>,
}

/// The complete multi-week plan.
///
/// Assignments live in an arena and are addressed by [`AssignmentId`];
/// the optimizer mutates them in place through these handles.
#[derive(Debug, Clone, Default)]
pub struct SeasonPlan {
    assignments: Vec<Assignment>,
    pub weeks: BTreeMap<u32, WeekSummary>,
}

impl SeasonPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, assignment: Assignment) -> AssignmentId {
        self.assignments.push(assignment);
        AssignmentId(self.assignments.len() - 1)
    }

    pub fn get(&self, id: AssignmentId) -> &Assignment {
        &self.assignments[id.0]
    }

    pub fn get_mut(&mut self, id: AssignmentId) -> &mut Assignment {
        &mut self.assignments[id.0]
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = AssignmentId> {
        (0..self.assignments.len()).map(AssignmentId)
    }

    /// Handles of one week's assignments, in creation order.
    pub fn ids_in_week(&self, week: u32) -> Vec<AssignmentId> {
        self.ids().filter(|id| self.get(*id).week == week).collect()
    }

    /// Handles ordered by week, weekday, start time, location and court.
    pub fn chronological_ids(&self) -> Vec<AssignmentId> {
        let mut ids: Vec<AssignmentId> = self.ids().collect();
        ids.sort_by(|a, b| {
            let (a, b) = (self.get(*a), self.get(*b));
            (a.week, a.slot.order_key(), a.court.as_str())
                .cmp(&(b.week, b.slot.order_key(), b.court.as_str()))
        });
        ids
    }

    pub fn total_score(&self) -> f64 {
        self.assignments.iter().map(|a| a.score).sum()
    }

    pub fn average_score(&self) -> f64 {
        if self.assignments.is_empty() {
            0.0
        } else {
            self.total_score() / self.assignments.len() as f64
        }
    }
}
