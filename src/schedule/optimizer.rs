//! Post-pass improvement of a filled season plan.
//!
//! Every round runs three sweeps in order: relocation, pairwise swap, and
//! reassembly of poor groups. A change is accepted only if it raises the
//! score of the affected assignments by more than `min_improvement`, so the
//! total plan score never decreases. Legacy assignments are never touched.

use std::collections::BTreeSet;

use chrono::Weekday;
use log::{debug, info};
use serde::Serialize;

use super::courts::{CourtInventory, CourtLedger};
use super::group_builder::GroupBuilder;
use super::scoring::Scorer;
use super::types::{AssignmentId, Player, PlayerId, SeasonPlan, SlotKey, GROUP_SIZE};
use crate::config::PlannerConfig;
use crate::roster::Roster;

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationStats {
    pub rounds: usize,
    pub relocations: usize,
    pub swaps: usize,
    pub reassemblies: usize,
    pub score_before: f64,
    pub score_after: f64,
}

impl OptimizationStats {
    pub fn changes(&self) -> usize {
        self.relocations + self.swaps + self.reassemblies
    }

    pub fn improvement(&self) -> f64 {
        self.score_after - self.score_before
    }
}

struct SwapCandidate {
    index_a: usize,
    index_b: usize,
    score_a: f64,
    score_b: f64,
    gain: f64,
}

pub struct Optimizer<'a> {
    config: &'a PlannerConfig,
    roster: &'a Roster,
    inventory: &'a CourtInventory,
    scorer: Scorer<'a>,
    builder: GroupBuilder<'a>,
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a PlannerConfig, roster: &'a Roster, inventory: &'a CourtInventory) -> Self {
        Self {
            config,
            roster,
            inventory,
            scorer: Scorer::new(config),
            builder: GroupBuilder::new(config),
        }
    }

    pub fn optimize(&self, plan: &mut SeasonPlan) -> OptimizationStats {
        let mut stats = OptimizationStats {
            score_before: plan.total_score(),
            ..OptimizationStats::default()
        };
        let mut ledger = CourtLedger::from_plan(plan);

        for round in 1..=self.config.optimizer.max_rounds {
            let relocations = self.relocate(plan, &mut ledger);
            let swaps = self.swap(plan);
            let reassemblies = self.reassemble(plan);

            stats.rounds = round;
            stats.relocations += relocations;
            stats.swaps += swaps;
            stats.reassemblies += reassemblies;
            info!(
                "Optimizer round {}: {} relocation(s), {} swap(s), {} reassembly(s), total score {:.2}",
                round,
                relocations,
                swaps,
                reassemblies,
                plan.total_score()
            );
            if relocations + swaps + reassemblies == 0 {
                break;
            }
        }

        stats.score_after = plan.total_score();
        stats
    }

    fn members(&self, ids: &[PlayerId]) -> Vec<&'a Player> {
        self.roster.members(ids)
    }

    fn weeks(plan: &SeasonPlan) -> BTreeSet<u32> {
        plan.iter().map(|a| a.week).collect()
    }

    fn all_available(&self, members: &[&Player], slot: &SlotKey) -> bool {
        let flexible = self.config.location_is_flexible();
        members.iter().all(|p| p.available_at(slot, flexible))
    }

    /// Moves low-scoring groups to a free court where they score better.
    fn relocate(&self, plan: &mut SeasonPlan, ledger: &mut CourtLedger) -> usize {
        let settings = &self.config.optimizer;
        let weekdays: Vec<Weekday> = self.config.weekdays();

        let mut ids: Vec<AssignmentId> = plan
            .ids()
            .filter(|id| {
                let a = plan.get(*id);
                !a.provenance.is_legacy() && a.score < settings.excellent_threshold
            })
            .collect();
        ids.sort_by(|a, b| plan.get(*a).score.total_cmp(&plan.get(*b).score));

        let mut moved = 0;
        for id in ids {
            let (week, current_slot, current_court, current_score, members) = {
                let a = plan.get(id);
                (a.week, a.slot.clone(), a.court.clone(), a.score, self.members(&a.players))
            };
            if members.len() != GROUP_SIZE {
                continue;
            }

            let mut best: Option<(&SlotKey, &str, f64)> = None;
            for (slot, _) in self.inventory.slots() {
                if *slot == current_slot || !weekdays.contains(&slot.day) {
                    continue;
                }
                if !self.all_available(&members, slot) {
                    continue;
                }
                let Some(court) = ledger.first_free_court(self.inventory, week, slot) else {
                    continue;
                };
                let score = self.scorer.score(&members, Some(slot.location.as_str()));
                if best.map_or(true, |(_, _, s)| score > s) {
                    best = Some((slot, court, score));
                }
            }

            if let Some((slot, court, score)) = best {
                if score > current_score + settings.min_improvement {
                    debug!(
                        "Week {}: moved group from {} to {} ({:.2} -> {:.2})",
                        week, current_slot, slot, current_score, score
                    );
                    ledger.release(week, &current_slot, &current_court);
                    ledger.book(week, slot, court);
                    let assignment = plan.get_mut(id);
                    assignment.slot = slot.clone();
                    assignment.court = court.to_string();
                    assignment.score = score;
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Exchanges single players between two groups of the same week.
    fn swap(&self, plan: &mut SeasonPlan) -> usize {
        let limit = self.config.optimizer.max_swaps_per_week;
        let mut total = 0;

        for week in Self::weeks(plan) {
            let ids: Vec<AssignmentId> = plan
                .ids_in_week(week)
                .into_iter()
                .filter(|id| !plan.get(*id).provenance.is_legacy())
                .collect();

            let mut accepted = 0;
            'pairs: for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    if accepted >= limit {
                        break 'pairs;
                    }
                    let (id_a, id_b) = (ids[i], ids[j]);
                    let Some(candidate) = self.best_swap(plan, id_a, id_b) else {
                        continue;
                    };

                    let player_a = plan.get(id_a).players[candidate.index_a].clone();
                    let player_b = plan.get(id_b).players[candidate.index_b].clone();
                    debug!(
                        "Week {}: swapped {} and {} (gain {:.2})",
                        week, player_a, player_b, candidate.gain
                    );
                    let a = plan.get_mut(id_a);
                    a.players[candidate.index_a] = player_b;
                    a.score = candidate.score_a;
                    let b = plan.get_mut(id_b);
                    b.players[candidate.index_b] = player_a;
                    b.score = candidate.score_b;
                    accepted += 1;
                }
            }
            total += accepted;
        }
        total
    }

    fn best_swap(&self, plan: &SeasonPlan, id_a: AssignmentId, id_b: AssignmentId) -> Option<SwapCandidate> {
        let settings = &self.config.optimizer;
        let flexible = self.config.location_is_flexible();
        let (a, b) = (plan.get(id_a), plan.get(id_b));
        let members_a = self.members(&a.players);
        let members_b = self.members(&b.players);
        if members_a.len() != GROUP_SIZE || members_b.len() != GROUP_SIZE {
            return None;
        }

        let before = a.score + b.score;
        let mut best: Option<SwapCandidate> = None;
        for index_a in 0..GROUP_SIZE {
            for index_b in 0..GROUP_SIZE {
                let (from_a, from_b) = (members_a[index_a], members_b[index_b]);
                if !from_a.available_at(&b.slot, flexible) || !from_b.available_at(&a.slot, flexible) {
                    continue;
                }

                let mut new_a = members_a.clone();
                new_a[index_a] = from_b;
                let mut new_b = members_b.clone();
                new_b[index_b] = from_a;
                let score_a = self.scorer.score(&new_a, Some(a.slot.location.as_str()));
                let score_b = self.scorer.score(&new_b, Some(b.slot.location.as_str()));
                if score_a < settings.swap_quality_floor || score_b < settings.swap_quality_floor {
                    continue;
                }

                let gain = score_a + score_b - before;
                if gain > settings.min_improvement && best.as_ref().map_or(true, |c| gain > c.gain) {
                    best = Some(SwapCandidate {
                        index_a,
                        index_b,
                        score_a,
                        score_b,
                        gain,
                    });
                }
            }
        }
        best
    }

    /// Pools the poorest groups of a week and regroups them from scratch.
    fn reassemble(&self, plan: &mut SeasonPlan) -> usize {
        let settings = &self.config.optimizer;
        let mut applied = 0;

        for week in Self::weeks(plan) {
            let mut poor: Vec<AssignmentId> = plan
                .ids_in_week(week)
                .into_iter()
                .filter(|id| {
                    let a = plan.get(*id);
                    !a.provenance.is_legacy() && a.score < settings.poor_threshold
                })
                .collect();
            poor.sort_by(|a, b| plan.get(*a).score.total_cmp(&plan.get(*b).score));
            poor.truncate(settings.max_reassembly_groups);
            if poor.len() < 2 {
                continue;
            }

            let old_total: f64 = poor.iter().map(|id| plan.get(*id).score).sum();
            let pool: Vec<&Player> = poor
                .iter()
                .flat_map(|id| self.members(&plan.get(*id).players))
                .collect();
            let slots: Vec<SlotKey> = poor.iter().map(|id| plan.get(*id).slot.clone()).collect();

            let groups = self.builder.build(&pool, poor.len(), None);
            if groups.len() < poor.len() {
                continue;
            }

            let mut placed: Vec<Option<(Vec<PlayerId>, f64)>> = vec![None; slots.len()];
            for group in &groups {
                let target = slots.iter().enumerate().find_map(|(i, slot)| {
                    if placed[i].is_some() || !self.all_available(&group.members, slot) {
                        return None;
                    }
                    let score = self.scorer.score(&group.members, Some(slot.location.as_str()));
                    (score > 0.0).then_some((i, score))
                });
                if let Some((i, score)) = target {
                    placed[i] = Some((group.player_ids(), score));
                }
            }
            let Some(placed) = placed.into_iter().collect::<Option<Vec<_>>>() else {
                continue;
            };

            let new_total: f64 = placed.iter().map(|(_, score)| score).sum();
            if new_total <= old_total + settings.min_improvement {
                continue;
            }

            debug!(
                "Week {}: reassembled {} group(s) ({:.2} -> {:.2})",
                week,
                poor.len(),
                old_total,
                new_total
            );
            for (id, (players, score)) in poor.iter().zip(placed) {
                let assignment = plan.get_mut(*id);
                assignment.players = players;
                assignment.score = score;
            }
            applied += 1;
        }
        applied
    }
}
