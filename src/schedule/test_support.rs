//! Fixtures shared by the scheduling tests.

use chrono::Weekday;

use super::slot_utils::TimeInterval;
use super::types::{CourtRecord, Gender, Player, SlotKey};
use crate::roster::Roster;

pub const HOME: &str = "North";

/// A player at the home location, available Monday 18:00-22:00, age 35.
/// The full name is "P<id> Test".
pub fn player(id: &str, gender: Gender, level: f64) -> Player {
    Player::new(id, &format!("P{}", id), "Test")
        .with_gender(gender)
        .with_level(level)
        .with_age(35)
        .with_location(HOME)
        .with_availability(Weekday::Mon, "18:00-22:00")
}

pub fn man(id: &str, level: f64) -> Player {
    player(id, Gender::Male, level)
}

pub fn woman(id: &str, level: f64) -> Player {
    player(id, Gender::Female, level)
}

pub fn name_of(id: &str) -> String {
    format!("P{} Test", id)
}

pub fn slot(day: Weekday, location: &str, raw: &str) -> SlotKey {
    SlotKey::new(day, location, TimeInterval::parse(raw).unwrap())
}

pub fn court(day: Weekday, location: &str, raw: &str, name: &str) -> CourtRecord {
    CourtRecord {
        slot: slot(day, location, raw),
        court: name.to_string(),
    }
}

/// Monday 18:00-19:00 at the home location.
pub fn home_slot() -> SlotKey {
    slot(Weekday::Mon, HOME, "18:00-19:00")
}

pub fn refs(players: &[Player]) -> Vec<&Player> {
    players.iter().collect()
}

/// Builds a roster so partner wishes are resolved.
pub fn roster(players: Vec<Player>) -> Roster {
    Roster::new(players)
}
