//! Forms groups of four for one (day, location, time) bucket.
//!
//! # Algorithm
//!
//! 1. Split the eligible players by gender and sort each side by level.
//! 2. Men, then women: repeatedly take the best-scoring valid 4-combination
//!    from a window of the lowest remaining levels. A window without any
//!    valid combination slides one player up.
//! 3. Leftover men and women are bucketed by level and paired 2+2, same
//!    corrected level first, then the raw same level.
//! 4. Optionally a 3+1 fallback for courts that are still empty.
//! 5. Drop zero scores, sort by score, keep at most one group per court.
//!
//! This is greedy and bounded by the window size; it does not search for
//! the best global partition.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;

use super::scoring::Scorer;
use super::types::{Gender, Player, PlayerId, GROUP_SIZE};
use crate::config::PlannerConfig;

/// A candidate group and its score at the bucket's location.
#[derive(Debug, Clone)]
pub struct FormedGroup<'p> {
    pub members: Vec<&'p Player>,
    pub score: f64,
}

impl FormedGroup<'_> {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|p| p.id.clone()).collect()
    }
}

fn by_level(a: &&Player, b: &&Player) -> Ordering {
    a.level
        .unwrap_or(0.0)
        .partial_cmp(&b.level.unwrap_or(0.0))
        .unwrap_or(Ordering::Equal)
}

fn level_bucket(level: f64) -> i64 {
    (level * 100.0).round() as i64
}

fn remove_members(pool: &mut Vec<&Player>, used: &[&Player]) {
    let used: HashSet<&PlayerId> = used.iter().map(|p| &p.id).collect();
    pool.retain(|p| !used.contains(&p.id));
}

pub struct GroupBuilder<'a> {
    config: &'a PlannerConfig,
    scorer: Scorer<'a>,
}

impl<'a> GroupBuilder<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self {
            config,
            scorer: Scorer::new(config),
        }
    }

    /// Forms up to `court_budget` disjoint groups from `eligible`.
    ///
    /// `location` is passed to the scorer; `None` skips the location filter.
    pub fn build<'p>(
        &self,
        eligible: &[&'p Player],
        court_budget: usize,
        location: Option<&str>,
    ) -> Vec<FormedGroup<'p>> {
        if court_budget == 0 || eligible.len() < GROUP_SIZE {
            return Vec::new();
        }

        let mut men: Vec<&Player> = eligible
            .iter()
            .copied()
            .filter(|p| p.gender == Some(Gender::Male))
            .collect();
        let mut women: Vec<&Player> = eligible
            .iter()
            .copied()
            .filter(|p| p.gender == Some(Gender::Female))
            .collect();
        men.sort_by(by_level);
        women.sort_by(by_level);

        let men_budget = if women.len() < GROUP_SIZE {
            court_budget
        } else {
            court_budget.div_ceil(2)
        };
        let mut groups = self.homogeneous_groups(&mut men, men_budget, location);

        let women_budget = court_budget.saturating_sub(groups.len());
        groups.extend(self.homogeneous_groups(&mut women, women_budget, location));

        let mixed_budget = court_budget.saturating_sub(groups.len());
        groups.extend(self.mixed_groups(&mut men, &mut women, mixed_budget, location));

        if self.config.builder.uneven_mix_fallback && groups.len() < court_budget {
            let fallback_budget = court_budget - groups.len();
            groups.extend(self.uneven_groups(&mut men, &mut women, fallback_budget, location));
        }

        groups.retain(|g| g.score > 0.0);
        groups.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        groups.truncate(court_budget);
        groups
    }

    /// Best single combination of `size` players from `window`, with the
    /// players of `fixed` added to every candidate.
    fn best_combination<'p>(
        &self,
        window: &[&'p Player],
        size: usize,
        fixed: &[&'p Player],
        location: Option<&str>,
    ) -> Option<FormedGroup<'p>> {
        let mut best: Option<FormedGroup<'p>> = None;
        for combination in window.iter().copied().combinations(size) {
            let mut members = fixed.to_vec();
            members.extend(combination);
            let score = self.scorer.score(&members, location);
            if score > 0.0 && best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FormedGroup { members, score });
            }
        }
        best
    }

    /// Single-gender groups from the lowest levels upward.
    fn homogeneous_groups<'p>(
        &self,
        pool: &mut Vec<&'p Player>,
        budget: usize,
        location: Option<&str>,
    ) -> Vec<FormedGroup<'p>> {
        let window_size = self.config.builder.candidate_window.max(GROUP_SIZE);
        let mut groups = Vec::new();
        let mut start = 0;

        while groups.len() < budget && pool.len().saturating_sub(start) >= GROUP_SIZE {
            let end = (start + window_size).min(pool.len());
            match self.best_combination(&pool[start..end], GROUP_SIZE, &[], location) {
                Some(group) => {
                    remove_members(pool, &group.members);
                    groups.push(group);
                }
                None => start += 1,
            }
        }
        groups
    }

    /// 2+2 groups, pairing level buckets whose corrected levels are closest.
    fn mixed_groups<'p>(
        &self,
        men: &mut Vec<&'p Player>,
        women: &mut Vec<&'p Player>,
        budget: usize,
        location: Option<&str>,
    ) -> Vec<FormedGroup<'p>> {
        if budget == 0 || men.len() < 2 || women.len() < 2 {
            return Vec::new();
        }

        let mut men_by_level: BTreeMap<i64, Vec<&'p Player>> = BTreeMap::new();
        for man in men.iter() {
            if let Some(level) = man.level {
                men_by_level.entry(level_bucket(level)).or_default().push(man);
            }
        }
        let mut women_by_level: BTreeMap<i64, Vec<&'p Player>> = BTreeMap::new();
        for woman in women.iter() {
            if let Some(level) = woman.level {
                women_by_level.entry(level_bucket(level)).or_default().push(woman);
            }
        }

        let offset = level_bucket(self.config.gender.female_level_offset);
        let mut groups: Vec<FormedGroup<'p>> = Vec::new();

        for (woman_level, available_women) in women_by_level.iter_mut() {
            let mut man_levels = vec![woman_level + offset];
            if offset != 0 {
                man_levels.push(*woman_level);
            }
            for man_level in man_levels {
                let Some(available_men) = men_by_level.get_mut(&man_level) else {
                    continue;
                };
                while groups.len() < budget && available_men.len() >= 2 && available_women.len() >= 2 {
                    let members = vec![
                        available_men[0],
                        available_men[1],
                        available_women[0],
                        available_women[1],
                    ];
                    let score = self.scorer.score(&members, location);
                    if score <= 0.0 {
                        break;
                    }
                    available_men.drain(..2);
                    available_women.drain(..2);
                    groups.push(FormedGroup { members, score });
                }
            }
            if groups.len() >= budget {
                break;
            }
        }

        for group in &groups {
            remove_members(men, &group.members);
            remove_members(women, &group.members);
        }
        groups
    }

    /// 3+1 and 1+3 groups from whatever is left.
    fn uneven_groups<'p>(
        &self,
        men: &mut Vec<&'p Player>,
        women: &mut Vec<&'p Player>,
        budget: usize,
        location: Option<&str>,
    ) -> Vec<FormedGroup<'p>> {
        let window_size = self.config.builder.candidate_window.max(GROUP_SIZE);
        let mut groups = Vec::new();

        while groups.len() < budget && men.len() + women.len() >= GROUP_SIZE {
            let men_window = &men[..men.len().min(window_size)];
            let women_window = &women[..women.len().min(window_size)];

            let mut best: Option<FormedGroup<'p>> = None;
            for (trio_side, single_side) in [(men_window, women_window), (women_window, men_window)] {
                if trio_side.len() < 3 {
                    continue;
                }
                for single in single_side {
                    if let Some(candidate) = self.best_combination(trio_side, 3, &[*single], location) {
                        if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                            best = Some(candidate);
                        }
                    }
                }
            }

            let Some(group) = best else {
                break;
            };
            remove_members(men, &group.members);
            remove_members(women, &group.members);
            groups.push(group);
        }
        groups
    }
}
