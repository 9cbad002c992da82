use std::collections::HashMap;
use std::path::Path;

use chrono::Weekday;
use csv::{ReaderBuilder, StringRecord};
use log::{info, warn};

use crate::error::PlannerError;
use crate::names::split_name_list;
use crate::schedule::slot_utils::{parse_availability, parse_weekday, weekday_dutch_name, weekday_name, TimeInterval, ALL_DAYS};
use crate::schedule::types::{CourtRecord, Gender, LegacyRecord, Player, SlotKey, TrainerAvailability};

/// Finds a column by any of its accepted header names, ignoring case.
fn column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let header = h.trim().trim_start_matches('\u{feff}').to_lowercase();
        names.iter().any(|name| header == name.to_lowercase())
    })
}

fn required_column(headers: &StringRecord, names: &[&str], file: &Path) -> Result<usize, PlannerError> {
    column(headers, names).ok_or_else(|| PlannerError::MissingColumn {
        file: file.display().to_string(),
        column: names[0].to_string(),
    })
}

fn cell(record: &StringRecord, col: Option<usize>) -> &str {
    col.and_then(|c| record.get(c)).unwrap_or("").trim()
}

/// Parses a yes/no-like value; Dutch and English spellings are accepted.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "ja" | "true" | "1" | "y" | "j" | "waar"
    )
}

/// Parses a level, accepting a decimal comma. Invalid values are absent.
fn parse_level(value: &str) -> Option<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|level| level.is_finite())
}

fn parse_age(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

fn parse_slot(day: &str, location: &str, time: &str) -> Option<SlotKey> {
    let day = parse_weekday(day)?;
    let interval = TimeInterval::parse(time)?;
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    Some(SlotKey::new(day, location, interval))
}

struct SlotColumns {
    day: usize,
    location: usize,
    time: usize,
}

impl SlotColumns {
    fn find(headers: &StringRecord, file: &Path) -> Result<Self, PlannerError> {
        Ok(Self {
            day: required_column(headers, &["Dag", "day"], file)?,
            location: required_column(headers, &["Locatie", "location"], file)?,
            time: required_column(headers, &["Tijdslot", "time"], file)?,
        })
    }

    fn slot(&self, record: &StringRecord) -> Option<SlotKey> {
        parse_slot(
            cell(record, Some(self.day)),
            cell(record, Some(self.location)),
            cell(record, Some(self.time)),
        )
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, PlannerError> {
    Ok(ReaderBuilder::new().flexible(true).from_path(path)?)
}

/// Loads the player roster.
///
/// A later row with an id seen before replaces the earlier row in place.
/// Rows without an id are skipped. Unparsable levels, ages and genders
/// become absent; unparsable availability becomes "not available".
pub fn load_players<P: AsRef<Path>>(path: P) -> Result<Vec<Player>, PlannerError> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();

    let id_col = required_column(&headers, &["SpelerID", "player_id"], path)?;
    let first_name_col = column(&headers, &["Voornaam", "first_name"]);
    let last_name_col = column(&headers, &["Achternaam", "last_name"]);
    let gender_col = column(&headers, &["Geslacht", "gender"]);
    let level_col = column(&headers, &["Niveau", "level"]);
    let age_col = column(&headers, &["Leeftijd", "age"]);
    let location_col = column(&headers, &["LocatieVoorkeur", "preferred_location"]);
    let wishes_col = column(&headers, &["SamenMet", "play_with"]);
    let stays_col = column(&headers, &["BlijftInHuidigeGroep", "stays_in_group"]);
    let day_cols: Vec<(Weekday, Option<usize>)> = ALL_DAYS
        .iter()
        .map(|day| (*day, column(&headers, &[weekday_dutch_name(*day), weekday_name(*day)])))
        .collect();

    let mut players: Vec<Player> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let id = cell(&record, Some(id_col));
        if id.is_empty() {
            warn!("{}: row {} has no player id, skipped", path.display(), line + 2);
            continue;
        }

        let mut player = Player::new(id, cell(&record, first_name_col), cell(&record, last_name_col));
        player.gender = Gender::parse(cell(&record, gender_col));
        player.level = parse_level(cell(&record, level_col));
        player.age = parse_age(cell(&record, age_col));
        player.preferred_location = cell(&record, location_col).to_string();
        player.wishes = split_name_list(cell(&record, wishes_col));
        player.stays_in_group = parse_flag(cell(&record, stays_col));
        for (day, col) in &day_cols {
            player.availability.set_day(*day, parse_availability(cell(&record, *col)));
        }

        match positions.get(id) {
            Some(&position) => {
                warn!("{}: player {} appears again, using the later row", path.display(), id);
                players[position] = player;
            }
            None => {
                positions.insert(id.to_string(), players.len());
                players.push(player);
            }
        }
    }

    if players.is_empty() {
        return Err(PlannerError::EmptyInput {
            what: "players".to_string(),
        });
    }
    info!("Loaded {} players from {}", players.len(), path.display());
    Ok(players)
}

/// Loads the court supply. Only rows marked available are kept; a missing
/// availability column means every row is available.
pub fn load_courts<P: AsRef<Path>>(path: P) -> Result<Vec<CourtRecord>, PlannerError> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();

    let slot_cols = SlotColumns::find(&headers, path)?;
    let court_col = required_column(&headers, &["BaanNaam", "court"], path)?;
    let available_col = column(&headers, &["Beschikbaar", "available"]);

    let mut courts = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        if available_col.is_some() && !parse_flag(cell(&record, available_col)) {
            continue;
        }
        let court = cell(&record, Some(court_col));
        match slot_cols.slot(&record) {
            Some(slot) if !court.is_empty() => courts.push(CourtRecord {
                slot,
                court: court.to_string(),
            }),
            _ => warn!("{}: row {} has no usable day, location, time or court", path.display(), line + 2),
        }
    }

    if courts.is_empty() {
        return Err(PlannerError::EmptyInput {
            what: "courts".to_string(),
        });
    }
    info!("Loaded {} available court slots from {}", courts.len(), path.display());
    Ok(courts)
}

pub fn load_trainers<P: AsRef<Path>>(path: P) -> Result<Vec<TrainerAvailability>, PlannerError> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();

    let trainer_col = required_column(&headers, &["Trainer", "trainer"], path)?;
    let slot_cols = SlotColumns::find(&headers, path)?;

    let mut entries = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let trainer = cell(&record, Some(trainer_col));
        match slot_cols.slot(&record) {
            Some(slot) if !trainer.is_empty() => entries.push(TrainerAvailability {
                trainer: trainer.to_string(),
                slot,
            }),
            _ => warn!("{}: row {} has no usable trainer or slot", path.display(), line + 2),
        }
    }
    info!("Loaded {} trainer availability entries from {}", entries.len(), path.display());
    Ok(entries)
}

pub fn load_legacy_groups<P: AsRef<Path>>(path: P) -> Result<Vec<LegacyRecord>, PlannerError> {
    let path = path.as_ref();
    let mut reader = reader(path)?;
    let headers = reader.headers()?.clone();

    let group_col = column(&headers, &["GroepID", "group_id"]);
    let members_col = required_column(&headers, &["Spelers", "members"], path)?;
    let slot_cols = SlotColumns::find(&headers, path)?;

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let Some(slot) = slot_cols.slot(&record) else {
            warn!("{}: row {} has no usable slot, skipped", path.display(), line + 2);
            continue;
        };
        let group_id = match cell(&record, group_col) {
            "" => format!("row {}", line + 2),
            id => id.to_string(),
        };
        records.push(LegacyRecord {
            group_id,
            members: split_name_list(cell(&record, Some(members_col))),
            slot,
        });
    }
    info!("Loaded {} legacy groups from {}", records.len(), path.display());
    Ok(records)
}
