//! Group compatibility scoring.
//!
//! A group is first checked against the hard filters; any failure scores 0.
//! A group that passes is scored on four independently capped criteria:
//!
//! | Criterion | Rule |
//! |---|---|
//! | Level homogeneity | all corrected levels equal, or exactly two levels split 2+2 |
//! | Mutual preference | tier by reciprocal pairs, plus credit per one-way wish |
//! | Gender balance | 4/0, 2/2 or 3/1 |
//! | Age match | one age bracket, or two adjacent brackets |
//!
//! Groups re-seated from a previous season are scored on retention instead
//! (see [`Scorer::score_legacy`]).
//!
//! Every function here is pure: the result depends only on the set of
//! members and the location, never on member order.

use std::collections::BTreeMap;

use itertools::Itertools;

use super::types::{Gender, Player, GROUP_SIZE};
use crate::config::PlannerConfig;

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;

const SPREAD_TOLERANCE: f64 = 1e-9;

/// Why a group failed the hard filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardFilterFailure {
    GroupSize,
    Location,
    LevelSpread,
    LevelMix,
}

impl HardFilterFailure {
    pub fn describe(self) -> &'static str {
        match self {
            HardFilterFailure::GroupSize => "group does not have exactly 4 distinct players",
            HardFilterFailure::Location => "a member prefers another location",
            HardFilterFailure::LevelSpread => "level spread exceeds the maximum",
            HardFilterFailure::LevelMix => "two levels present but not split 2+2",
        }
    }
}

/// Per-criterion view of a score, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub hard_filter: Option<HardFilterFailure>,
    pub level: f64,
    pub preference: f64,
    pub gender: f64,
    pub age: f64,
    pub mutual_pairs: usize,
    pub one_way_wishes: usize,
    pub dangling_wishes: usize,
    pub total: f64,
}

/// Levels compared on a hundredths grid so 6 and 6.0 are the same level.
fn level_key(level: f64) -> i64 {
    (level * 100.0).round() as i64
}

/// Counts per distinct level key.
fn level_histogram(levels: &[f64]) -> BTreeMap<i64, usize> {
    let mut histogram = BTreeMap::new();
    for level in levels {
        *histogram.entry(level_key(*level)).or_insert(0) += 1;
    }
    histogram
}

fn is_two_two_split(histogram: &BTreeMap<i64, usize>) -> bool {
    histogram.len() == 2 && histogram.values().all(|&count| count == 2)
}

fn has_distinct_members(members: &[&Player]) -> bool {
    members.iter().map(|p| &p.id).all_unique()
}

pub struct Scorer<'a> {
    config: &'a PlannerConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    fn corrected_levels(&self, members: &[&Player]) -> Vec<f64> {
        let offset = self.config.gender.female_level_offset;
        members
            .iter()
            .filter_map(|p| p.corrected_level(offset))
            .collect()
    }

    /// Gender-corrected level spread over the members with a known level.
    pub fn level_spread(&self, members: &[&Player]) -> f64 {
        let levels = self.corrected_levels(members);
        match (levels.iter().copied().reduce(f64::min), levels.iter().copied().reduce(f64::max)) {
            (Some(min), Some(max)) => max - min,
            _ => 0.0,
        }
    }

    /// Checks the hard filters. Unknown levels take no part in the level checks.
    pub fn check_hard_filters(
        &self,
        members: &[&Player],
        location: Option<&str>,
    ) -> Result<(), HardFilterFailure> {
        let filters = &self.config.hard_filters;
        if members.len() != GROUP_SIZE || !has_distinct_members(members) {
            return Err(HardFilterFailure::GroupSize);
        }

        if let Some(location) = location {
            if filters.strict_location && members.iter().any(|p| p.preferred_location != location) {
                return Err(HardFilterFailure::Location);
            }
        }

        if self.level_spread(members) > filters.max_level_spread + SPREAD_TOLERANCE {
            return Err(HardFilterFailure::LevelSpread);
        }

        if filters.mix_mandatory {
            let levels = self.corrected_levels(members);
            if levels.len() == GROUP_SIZE {
                let histogram = level_histogram(&levels);
                if histogram.len() == 2 && !is_two_two_split(&histogram) {
                    return Err(HardFilterFailure::LevelMix);
                }
            }
        }

        Ok(())
    }

    pub fn passes_hard_filters(&self, members: &[&Player], location: Option<&str>) -> bool {
        self.check_hard_filters(members, location).is_ok()
    }

    /// Score of a newly formed group, in [0, 10].
    pub fn score(&self, members: &[&Player], location: Option<&str>) -> f64 {
        self.breakdown(members, location).total
    }

    /// Score of a new group with every criterion itemized.
    pub fn breakdown(&self, members: &[&Player], location: Option<&str>) -> ScoreBreakdown {
        let dangling_wishes = members.iter().map(|p| p.dangling_wishes).sum();
        if let Err(failure) = self.check_hard_filters(members, location) {
            return ScoreBreakdown {
                hard_filter: Some(failure),
                dangling_wishes,
                ..ScoreBreakdown::default()
            };
        }

        let level = self.level_points(members);
        let (preference, mutual_pairs, one_way_wishes) = self.preference_points(members);
        let gender = self.gender_points(members);
        let age = self.age_points(members);
        let total = (level + preference + gender + age).clamp(0.0, MAX_SCORE);

        ScoreBreakdown {
            hard_filter: None,
            level,
            preference,
            gender,
            age,
            mutual_pairs,
            one_way_wishes,
            dangling_wishes,
            total,
        }
    }

    /// Score of a group re-seated from a historical record.
    ///
    /// `retained` is the number of members who belonged to the historical
    /// group and want to stay. Below the legacy minimum the group is scored
    /// as a new group. All four retained scores the fixed maximum. Two or
    /// three retained score `base + earned / max_earnable * residual`,
    /// where only level, gender and age count: continuity already stands
    /// in for partner preferences.
    pub fn score_legacy(&self, members: &[&Player], location: Option<&str>, retained: usize) -> f64 {
        let legacy = &self.config.legacy;
        if retained < legacy.min_retained {
            return self.score(members, location);
        }
        if members.len() != GROUP_SIZE || !has_distinct_members(members) {
            return 0.0;
        }
        if retained < legacy.waive_hard_filters_from && !self.passes_hard_filters(members, location) {
            return 0.0;
        }

        if retained >= GROUP_SIZE {
            return legacy.full_retention_score.clamp(0.0, MAX_SCORE);
        }

        let scoring = &self.config.scoring;
        let earned = self.level_points(members) + self.gender_points(members) + self.age_points(members);
        let max_earnable = scoring.level.max + scoring.gender.max + scoring.age.max;
        let fraction = if max_earnable > 0.0 {
            (earned / max_earnable).clamp(0.0, 1.0)
        } else {
            0.0
        };

        match legacy.partial(retained) {
            Some(partial) => (partial.base + fraction * partial.residual).clamp(0.0, MAX_SCORE),
            None => self.score(members, location),
        }
    }

    fn level_points(&self, members: &[&Player]) -> f64 {
        let rules = &self.config.scoring.level;
        let levels = self.corrected_levels(members);
        if levels.len() != GROUP_SIZE {
            return 0.0;
        }
        let histogram = level_histogram(&levels);
        let points = if histogram.len() == 1 {
            rules.all_equal
        } else if is_two_two_split(&histogram) {
            rules.two_two_split
        } else {
            0.0
        };
        points.min(rules.max)
    }

    /// Returns (points, mutual pairs, one-way wishes).
    fn preference_points(&self, members: &[&Player]) -> (f64, usize, usize) {
        let rules = &self.config.scoring.preference;
        let mut mutual_pairs = 0;
        let mut one_way_wishes = 0;
        for pair in members.iter().combinations(2) {
            let (a, b) = (pair[0], pair[1]);
            match (a.wants(&b.id), b.wants(&a.id)) {
                (true, true) => mutual_pairs += 1,
                (true, false) | (false, true) => one_way_wishes += 1,
                (false, false) => {}
            }
        }

        let tier = match mutual_pairs {
            0 => rules.neutral,
            1 => rules.one_pair,
            2 => rules.two_pairs,
            _ => rules.three_or_more_pairs,
        };
        let points = (tier + one_way_wishes as f64 * rules.per_one_way_wish).min(rules.max);
        (points, mutual_pairs, one_way_wishes)
    }

    fn gender_points(&self, members: &[&Player]) -> f64 {
        let rules = &self.config.scoring.gender;
        let men = members.iter().filter(|p| p.gender == Some(Gender::Male)).count();
        let women = members.iter().filter(|p| p.gender == Some(Gender::Female)).count();
        if men + women != GROUP_SIZE {
            return 0.0;
        }
        let points = match (men, women) {
            (4, 0) | (0, 4) => rules.homogeneous,
            (2, 2) => rules.two_two,
            (3, 1) | (1, 3) => rules.three_one,
            _ => 0.0,
        };
        points.min(rules.max)
    }

    fn age_points(&self, members: &[&Player]) -> f64 {
        let rules = &self.config.scoring.age;
        let brackets: Option<Vec<usize>> = members
            .iter()
            .map(|p| {
                let age = p.age?;
                self.config.age_brackets.iter().position(|b| b.contains(age))
            })
            .collect();
        let Some(brackets) = brackets else {
            return 0.0;
        };
        if brackets.len() != GROUP_SIZE {
            return 0.0;
        }

        let distinct: Vec<usize> = brackets.into_iter().sorted().dedup().collect();
        let points = match distinct.as_slice() {
            [_] => rules.same_bracket,
            [a, b] if b - a == 1 => rules.adjacent_brackets,
            _ => 0.0,
        };
        points.min(rules.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::{man, name_of, refs, roster, woman, HOME};

    fn config() -> PlannerConfig {
        PlannerConfig::default()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_four_equal_men_no_preferences() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)];
        let breakdown = scorer.breakdown(&refs(&players), Some(HOME));

        assert_eq!(breakdown.hard_filter, None);
        assert!(close(breakdown.level, 3.0));
        assert!(close(breakdown.preference, 2.0), "neutral baseline");
        assert!(close(breakdown.gender, 1.5));
        assert!(close(breakdown.age, 1.0));
        assert!(close(breakdown.total, 7.5));
    }

    #[test]
    fn test_balanced_group_with_one_mutual_pair() {
        let config = config();
        let scorer = Scorer::new(&config);
        // women at 5 correct to 6, same as the men
        let roster = roster(vec![
            man("1", 6.0).with_wish(&name_of("2")),
            man("2", 6.0).with_wish(&name_of("1")),
            woman("3", 5.0),
            woman("4", 5.0),
        ]);
        let members: Vec<&Player> = roster.players().iter().collect();
        let breakdown = scorer.breakdown(&members, Some(HOME));

        assert_eq!(breakdown.mutual_pairs, 1);
        assert!(close(breakdown.level, 3.0));
        assert!(close(breakdown.preference, 3.0));
        assert!(close(breakdown.gender, 2.0));
        assert!(close(breakdown.age, 1.0));
        assert!(close(breakdown.total, 9.0), "no clamping below the true sum");
    }

    #[test]
    fn test_level_spread_violation_scores_zero() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![man("1", 4.0), man("2", 4.0), man("3", 6.0), man("4", 6.0)];
        let members = refs(&players);
        assert_eq!(
            scorer.check_hard_filters(&members, Some(HOME)),
            Err(HardFilterFailure::LevelSpread)
        );
        assert_eq!(scorer.score(&members, Some(HOME)), 0.0);
    }

    #[test]
    fn test_mix_rule_requires_two_two_split() {
        let config = config();
        let scorer = Scorer::new(&config);
        let uneven = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 6.0)];
        assert_eq!(
            scorer.check_hard_filters(&refs(&uneven), Some(HOME)),
            Err(HardFilterFailure::LevelMix)
        );

        let even = vec![man("1", 5.0), man("2", 5.0), man("3", 6.0), man("4", 6.0)];
        let breakdown = scorer.breakdown(&refs(&even), Some(HOME));
        assert_eq!(breakdown.hard_filter, None);
        assert!(close(breakdown.level, 1.5));

        let relaxed = PlannerConfig {
            hard_filters: crate::config::HardFilterConfig {
                mix_mandatory: false,
                ..Default::default()
            },
            ..config.clone()
        };
        let scorer = Scorer::new(&relaxed);
        let breakdown = scorer.breakdown(&refs(&uneven), Some(HOME));
        assert_eq!(breakdown.hard_filter, None);
        assert_eq!(breakdown.level, 0.0);
    }

    #[test]
    fn test_strict_location() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![
            man("1", 5.0),
            man("2", 5.0),
            man("3", 5.0),
            man("4", 5.0).with_location("South"),
        ];
        let members = refs(&players);
        assert_eq!(
            scorer.check_hard_filters(&members, Some(HOME)),
            Err(HardFilterFailure::Location)
        );
        assert!(scorer.score(&members, None) > 0.0, "no location, no location filter");
    }

    #[test]
    fn test_group_size_and_duplicates() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0)];
        assert_eq!(scorer.score(&refs(&players), Some(HOME)), 0.0);

        let one = man("1", 5.0);
        let duplicated = vec![&one, &one, &one, &one];
        assert_eq!(
            scorer.check_hard_filters(&duplicated, Some(HOME)),
            Err(HardFilterFailure::GroupSize)
        );
    }

    #[test]
    fn test_score_is_order_invariant_and_pure() {
        let config = config();
        let scorer = Scorer::new(&config);
        let roster = roster(vec![
            man("1", 6.0).with_wish(&name_of("3")),
            man("2", 6.0),
            woman("3", 5.0).with_wish(&name_of("1")),
            woman("4", 5.0).with_wish(&name_of("2")).with_age(60),
        ]);
        let members: Vec<&Player> = roster.players().iter().collect();
        let expected = scorer.score(&members, Some(HOME));
        assert_eq!(scorer.score(&members, Some(HOME)), expected);

        for permutation in members.iter().copied().permutations(4) {
            assert_eq!(scorer.score(&permutation, Some(HOME)), expected);
        }
    }

    #[test]
    fn test_zero_iff_hard_filter_fails() {
        let config = config();
        let scorer = Scorer::new(&config);
        let levels = [3.0, 4.0, 5.0, 6.0];
        for a in levels {
            for b in levels {
                let players = vec![man("1", a), man("2", a), woman("3", b), woman("4", b)];
                let members = refs(&players);
                let failed = scorer.check_hard_filters(&members, Some(HOME)).is_err();
                assert_eq!(scorer.score(&members, Some(HOME)) == 0.0, failed);
            }
        }
    }

    #[test]
    fn test_one_way_wishes_earn_partial_credit() {
        let config = config();
        let scorer = Scorer::new(&config);
        let roster = roster(vec![
            man("1", 5.0).with_wish(&name_of("2")).with_wish("Ghost Player"),
            man("2", 5.0),
            man("3", 5.0).with_wish(&name_of("4")),
            man("4", 5.0),
        ]);
        let members: Vec<&Player> = roster.players().iter().collect();
        let breakdown = scorer.breakdown(&members, Some(HOME));
        assert_eq!(breakdown.mutual_pairs, 0);
        assert_eq!(breakdown.one_way_wishes, 2);
        assert_eq!(breakdown.dangling_wishes, 1);
        assert!(close(breakdown.preference, 3.0));
    }

    #[test]
    fn test_preference_is_capped() {
        let config = config();
        let scorer = Scorer::new(&config);
        let all: Vec<String> = ["1", "2", "3", "4"].iter().map(|id| name_of(id)).collect();
        let players = ["1", "2", "3", "4"]
            .iter()
            .map(|id| {
                all.iter()
                    .fold(man(id, 5.0), |player, name| player.with_wish(name))
            })
            .collect();
        let roster = roster(players);
        let members: Vec<&Player> = roster.players().iter().collect();
        let breakdown = scorer.breakdown(&members, Some(HOME));
        assert_eq!(breakdown.mutual_pairs, 6);
        assert!(close(breakdown.preference, 4.0));
        assert!(close(breakdown.total, 9.5));
    }

    #[test]
    fn test_gender_balance_values() {
        let config = config();
        let scorer = Scorer::new(&config);
        let three_one = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), woman("4", 4.0)];
        assert!(close(scorer.breakdown(&refs(&three_one), Some(HOME)).gender, 0.5));

        let unknown = vec![
            man("1", 5.0),
            man("2", 5.0),
            man("3", 5.0),
            crate::schedule::types::Player::new("4", "No", "Gender")
                .with_level(5.0)
                .with_location(HOME),
        ];
        assert_eq!(scorer.breakdown(&refs(&unknown), Some(HOME)).gender, 0.0);
    }

    #[test]
    fn test_age_brackets() {
        let config = config();
        let scorer = Scorer::new(&config);
        let adjacent = vec![
            man("1", 5.0).with_age(25),
            man("2", 5.0).with_age(28),
            man("3", 5.0).with_age(31),
            man("4", 5.0).with_age(45),
        ];
        assert!(close(scorer.breakdown(&refs(&adjacent), Some(HOME)).age, 0.5));

        let apart = vec![
            man("1", 5.0).with_age(25),
            man("2", 5.0).with_age(25),
            man("3", 5.0).with_age(55),
            man("4", 5.0).with_age(55),
        ];
        assert_eq!(scorer.breakdown(&refs(&apart), Some(HOME)).age, 0.0);

        let mut unknown_age = man("4", 5.0);
        unknown_age.age = None;
        let partial = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), unknown_age];
        assert_eq!(scorer.breakdown(&refs(&partial), Some(HOME)).age, 0.0);
    }

    #[test]
    fn test_unknown_levels_do_not_fail_filters() {
        let config = config();
        let scorer = Scorer::new(&config);
        let mut unknown = man("4", 0.0);
        unknown.level = None;
        let players = vec![man("1", 5.0), man("2", 5.0), man("3", 6.0), unknown];
        let breakdown = scorer.breakdown(&refs(&players), Some(HOME));
        assert_eq!(breakdown.hard_filter, None);
        assert_eq!(breakdown.level, 0.0, "homogeneity needs all four levels");
    }

    #[test]
    fn test_legacy_full_retention_ignores_composition() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![
            man("1", 2.0).with_location("South"),
            woman("2", 8.0).with_age(70),
            man("3", 5.0).with_age(19),
            man("4", 6.0),
        ];
        let members = refs(&players);
        assert_eq!(scorer.score(&members, Some(HOME)), 0.0);
        assert_eq!(scorer.score_legacy(&members, Some(HOME), 4), 10.0);
    }

    #[test]
    fn test_legacy_partial_between_bases() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![man("1", 6.0), man("2", 6.0), woman("3", 5.0), woman("4", 5.0)];
        let members = refs(&players);

        let two = scorer.score_legacy(&members, Some(HOME), 2);
        // level 3 + gender 2 + age 1 = 6 of 6 earnable
        assert!(close(two, 5.0 + 1.5));
        assert!(two > config.legacy.two_of_four.base && two < config.legacy.three_of_four.base);

        let three = scorer.score_legacy(&members, Some(HOME), 3);
        assert!(close(three, 9.0));
    }

    #[test]
    fn test_legacy_partial_excludes_preferences() {
        let config = config();
        let scorer = Scorer::new(&config);
        let roster = roster(vec![
            man("1", 6.0).with_wish(&name_of("2")),
            man("2", 6.0).with_wish(&name_of("1")),
            woman("3", 5.0),
            woman("4", 5.0),
        ]);
        let with_wishes: Vec<&Player> = roster.players().iter().collect();
        let plain = vec![man("1", 6.0), man("2", 6.0), woman("3", 5.0), woman("4", 5.0)];
        assert_eq!(
            scorer.score_legacy(&with_wishes, Some(HOME), 2),
            scorer.score_legacy(&refs(&plain), Some(HOME), 2)
        );
    }

    #[test]
    fn test_legacy_below_minimum_scores_as_new() {
        let config = config();
        let scorer = Scorer::new(&config);
        let players = vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)];
        let members = refs(&players);
        assert_eq!(
            scorer.score_legacy(&members, Some(HOME), 1),
            scorer.score(&members, Some(HOME))
        );
    }
}
