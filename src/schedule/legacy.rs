//! Re-seats historical groups at their original slot before new groups form.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use super::courts::{CourtInventory, CourtLedger};
use super::scoring::Scorer;
use super::types::{Assignment, Gender, LegacyRecord, Player, PlayerId, Provenance, SeasonPlan, GROUP_SIZE};
use crate::config::PlannerConfig;
use crate::roster::Roster;

/// Why a historical group could not be re-seated in a given week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyFailure {
    TooFewRetained,
    NotEnoughCandidates,
    NotAvailableAtOriginalSlot,
    HardFilterFailed,
    NoCourtAvailable,
    UnknownSlot,
}

impl LegacyFailure {
    pub fn describe(self) -> &'static str {
        match self {
            LegacyFailure::TooFewRetained => "too few retained",
            LegacyFailure::NotEnoughCandidates => "not enough candidates",
            LegacyFailure::NotAvailableAtOriginalSlot => "not available at original slot",
            LegacyFailure::HardFilterFailed => "hard filter failed",
            LegacyFailure::NoCourtAvailable => "no court available",
            LegacyFailure::UnknownSlot => "unknown slot",
        }
    }
}

impl fmt::Display for LegacyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Placements and failures summed over the season.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacyStats {
    pub placed_full: usize,
    pub placed_partial: usize,
    pub failures: BTreeMap<LegacyFailure, usize>,
}

impl LegacyStats {
    pub fn placed(&self) -> usize {
        self.placed_full + self.placed_partial
    }

    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    #[cfg(test)]
    pub fn failures_of(&self, reason: LegacyFailure) -> usize {
        self.failures.get(&reason).copied().unwrap_or(0)
    }
}

/// True if a group with `men` and `women` can still end as 4/0, 0/4 or 2/2.
fn balanced_completion_reachable(men: usize, women: usize) -> bool {
    if men + women > GROUP_SIZE {
        return false;
    }
    [(GROUP_SIZE, 0), (0, GROUP_SIZE), (GROUP_SIZE / 2, GROUP_SIZE / 2)]
        .iter()
        .any(|&(m, f)| men <= m && women <= f)
}

pub struct LegacyPlanner<'a> {
    config: &'a PlannerConfig,
    roster: &'a Roster,
    inventory: &'a CourtInventory,
    scorer: Scorer<'a>,
}

impl<'a> LegacyPlanner<'a> {
    pub fn new(config: &'a PlannerConfig, roster: &'a Roster, inventory: &'a CourtInventory) -> Self {
        Self {
            config,
            roster,
            inventory,
            scorer: Scorer::new(config),
        }
    }

    /// Logs historical member names that match nobody on the roster.
    pub fn report_unresolved(&self, records: &[LegacyRecord]) -> usize {
        let mut unresolved = 0;
        for record in records {
            for name in &record.members {
                if self.roster.find_by_name(name).is_none() {
                    warn!("Legacy group {}: member '{}' is not on the roster", record.group_id, name);
                    unresolved += 1;
                }
            }
        }
        unresolved
    }

    /// Places every record it can for `week`, booking courts and marking
    /// members scheduled. Failures are counted in `stats`.
    pub fn plan_week(
        &self,
        week: u32,
        records: &[LegacyRecord],
        plan: &mut SeasonPlan,
        ledger: &mut CourtLedger,
        scheduled: &mut BTreeSet<PlayerId>,
        stats: &mut LegacyStats,
    ) {
        for record in records {
            match self.place(week, record, ledger, scheduled) {
                Ok(assignment) => {
                    debug!(
                        "Week {}: legacy group {} seated at {} on {} ({}, score {:.2})",
                        week,
                        record.group_id,
                        assignment.slot,
                        assignment.court,
                        assignment.provenance.label(),
                        assignment.score
                    );
                    match assignment.provenance {
                        Provenance::LegacyFull => stats.placed_full += 1,
                        _ => stats.placed_partial += 1,
                    }
                    scheduled.extend(assignment.players.iter().cloned());
                    plan.push(assignment);
                }
                Err(reason) => {
                    debug!("Week {}: legacy group {} not placed: {}", week, record.group_id, reason);
                    *stats.failures.entry(reason).or_insert(0) += 1;
                }
            }
        }
    }

    fn place(
        &self,
        week: u32,
        record: &LegacyRecord,
        ledger: &mut CourtLedger,
        scheduled: &BTreeSet<PlayerId>,
    ) -> Result<Assignment, LegacyFailure> {
        let slot = &record.slot;
        if !self.inventory.contains(slot) {
            return Err(LegacyFailure::UnknownSlot);
        }

        let flexible = self.config.location_is_flexible();
        let mut group: Vec<&Player> = Vec::with_capacity(GROUP_SIZE);
        let mut unavailable = 0;
        for name in &record.members {
            if let Some(player) = self.roster.find_by_name(name) {
                let fresh = !group.iter().any(|p| p.id == player.id);
                if !player.stays_in_group || !fresh || scheduled.contains(&player.id) {
                    continue;
                }
                if player.available_at(slot, flexible) {
                    group.push(player);
                } else {
                    unavailable += 1;
                }
            }
        }
        if group.len() < self.config.legacy.min_retained {
            // Stayers exist but cannot make the slot
            if group.len() + unavailable >= self.config.legacy.min_retained {
                return Err(LegacyFailure::NotAvailableAtOriginalSlot);
            }
            return Err(LegacyFailure::TooFewRetained);
        }
        group.truncate(GROUP_SIZE);
        let retained = group.len();

        while group.len() < GROUP_SIZE {
            let addition = self
                .best_addition(&group, record, scheduled)
                .ok_or(LegacyFailure::NotEnoughCandidates)?;
            group.push(addition);
        }

        if !group.iter().all(|p| p.available_at(slot, flexible)) {
            return Err(LegacyFailure::NotAvailableAtOriginalSlot);
        }

        let location = Some(slot.location.as_str());
        if retained < self.config.legacy.waive_hard_filters_from
            && !self.scorer.passes_hard_filters(&group, location)
        {
            return Err(LegacyFailure::HardFilterFailed);
        }
        let score = self.scorer.score_legacy(&group, location, retained);
        if score <= 0.0 {
            return Err(LegacyFailure::HardFilterFailed);
        }

        let court = ledger
            .first_free_court(self.inventory, week, slot)
            .ok_or(LegacyFailure::NoCourtAvailable)?;
        ledger.book(week, slot, court);

        let provenance = if retained >= GROUP_SIZE {
            Provenance::LegacyFull
        } else {
            Provenance::LegacyPartial
        };
        let players = group.iter().map(|p| p.id.clone()).collect();
        Ok(Assignment::new(week, slot.clone(), court, players, provenance, score))
    }

    /// Picks the unscheduled player who best completes `group` at the record's slot.
    fn best_addition(
        &self,
        group: &[&Player],
        record: &LegacyRecord,
        scheduled: &BTreeSet<PlayerId>,
    ) -> Option<&'a Player> {
        let offset = self.config.gender.female_level_offset;
        let flexible = self.config.location_is_flexible();

        let levels: Vec<f64> = group.iter().filter_map(|p| p.corrected_level(offset)).collect();
        let mean = if levels.is_empty() {
            None
        } else {
            Some(levels.iter().sum::<f64>() / levels.len() as f64)
        };
        let men = group.iter().filter(|p| p.gender == Some(Gender::Male)).count();
        let women = group.iter().filter(|p| p.gender == Some(Gender::Female)).count();

        let rank = |player: &Player| {
            let keeps_balance = match player.gender {
                Some(Gender::Male) => balanced_completion_reachable(men + 1, women),
                Some(Gender::Female) => balanced_completion_reachable(men, women + 1),
                None => false,
            };
            let distance = match (mean, player.corrected_level(offset)) {
                (Some(mean), Some(level)) => (level - mean).abs(),
                _ => f64::MAX,
            };
            (!keeps_balance, distance)
        };

        self.roster
            .players()
            .iter()
            .filter(|p| !scheduled.contains(&p.id))
            .filter(|p| !group.iter().any(|member| member.id == p.id))
            .filter(|p| p.available_at(&record.slot, flexible))
            .map(|p| (rank(p), p))
            .min_by(|(a, _), (b, _)| {
                a.0.cmp(&b.0)
                    .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            })
            .map(|(_, p)| p)
    }
}
