use std::collections::BTreeSet;

use log::debug;

use super::courts::{CourtInventory, CourtLedger};
use super::group_builder::GroupBuilder;
use super::types::{Assignment, Player, PlayerId, Provenance, SeasonPlan, WeekSummary, GROUP_SIZE};
use crate::config::PlannerConfig;
use crate::roster::Roster;

/// Fills the free courts of one week with newly formed groups.
pub struct WeeklyPlanner<'a> {
    config: &'a PlannerConfig,
    roster: &'a Roster,
    inventory: &'a CourtInventory,
    builder: GroupBuilder<'a>,
}

impl<'a> WeeklyPlanner<'a> {
    pub fn new(config: &'a PlannerConfig, roster: &'a Roster, inventory: &'a CourtInventory) -> Self {
        Self {
            config,
            roster,
            inventory,
            builder: GroupBuilder::new(config),
        }
    }

    /// Visits the planned weekdays and their buckets in order and returns
    /// the number of groups formed.
    pub fn plan_week(
        &self,
        week: u32,
        plan: &mut SeasonPlan,
        ledger: &mut CourtLedger,
        scheduled: &mut BTreeSet<PlayerId>,
    ) -> usize {
        let flexible = self.config.location_is_flexible();
        let mut formed = 0;

        for day in self.config.weekdays() {
            for (slot, _) in self.inventory.slots_on(day) {
                let free = ledger.free_courts(self.inventory, week, slot);
                if free.is_empty() {
                    continue;
                }

                let eligible: Vec<&Player> = self
                    .roster
                    .players()
                    .iter()
                    .filter(|p| !scheduled.contains(&p.id) && p.available_at(slot, flexible))
                    .collect();
                if eligible.len() < GROUP_SIZE {
                    continue;
                }

                let groups = self.builder.build(&eligible, free.len(), Some(slot.location.as_str()));
                debug!(
                    "Week {}: {} eligible at {}, {} group(s) on {} free court(s)",
                    week,
                    eligible.len(),
                    slot,
                    groups.len(),
                    free.len()
                );

                for (group, court) in groups.into_iter().zip(free) {
                    ledger.book(week, slot, court);
                    let players = group.player_ids();
                    scheduled.extend(players.iter().cloned());
                    plan.push(Assignment::new(
                        week,
                        slot.clone(),
                        court,
                        players,
                        Provenance::New,
                        group.score,
                    ));
                    formed += 1;
                }
            }
        }
        formed
    }
}

/// Scheduled and unscheduled players of `week`, unscheduled in roster order.
pub fn summarize_week(roster: &Roster, plan: &SeasonPlan, week: u32) -> WeekSummary {
    let scheduled: BTreeSet<PlayerId> = plan
        .iter()
        .filter(|a| a.week == week)
        .flat_map(|a| a.players.iter().cloned())
        .collect();
    let unscheduled = roster
        .players()
        .iter()
        .filter(|p| !scheduled.contains(&p.id))
        .map(|p| p.id.clone())
        .collect();
    WeekSummary {
        week,
        scheduled,
        unscheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::{court, man, roster, woman, HOME};
    use chrono::Weekday;

    #[test]
    fn test_single_bucket_single_group() {
        let config = PlannerConfig::default();
        let roster = roster(vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)]);
        let inventory = CourtInventory::new(&[court(Weekday::Mon, HOME, "18:00-19:00", "Court 1")]);
        let planner = WeeklyPlanner::new(&config, &roster, &inventory);

        let mut plan = SeasonPlan::new();
        let mut ledger = CourtLedger::new();
        let mut scheduled = BTreeSet::new();
        assert_eq!(planner.plan_week(1, &mut plan, &mut ledger, &mut scheduled), 1);

        let assignment = plan.iter().next().unwrap();
        assert_eq!(assignment.provenance, Provenance::New);
        assert_eq!(assignment.court, "Court 1");
        assert!((assignment.score - 7.5).abs() < 1e-9);
        assert_eq!(scheduled.len(), 4);
    }

    #[test]
    fn test_partner_flexible_admits_wishing_players_elsewhere() {
        use crate::config::{HardFilterConfig, LocationPolicy};
        use crate::schedule::test_support::name_of;

        let roster = roster(vec![
            man("1", 5.0),
            man("2", 5.0),
            man("3", 5.0),
            man("4", 5.0).with_location("South").with_wish(&name_of("1")),
            man("5", 5.0).with_location("South"),
        ]);
        let inventory = CourtInventory::new(&[court(Weekday::Mon, HOME, "18:00-19:00", "Court 1")]);
        let relaxed = HardFilterConfig {
            strict_location: false,
            ..HardFilterConfig::default()
        };

        let flexible = PlannerConfig {
            location_policy: LocationPolicy::PartnerFlexible,
            hard_filters: relaxed.clone(),
            ..PlannerConfig::default()
        };
        let mut plan = SeasonPlan::new();
        let mut scheduled = BTreeSet::new();
        WeeklyPlanner::new(&flexible, &roster, &inventory).plan_week(
            1,
            &mut plan,
            &mut CourtLedger::new(),
            &mut scheduled,
        );
        assert_eq!(plan.len(), 1);
        assert!(scheduled.contains(&PlayerId::from("4")));
        assert!(!scheduled.contains(&PlayerId::from("5")));

        let strict = PlannerConfig {
            hard_filters: relaxed,
            ..PlannerConfig::default()
        };
        let mut plan = SeasonPlan::new();
        let mut scheduled = BTreeSet::new();
        WeeklyPlanner::new(&strict, &roster, &inventory).plan_week(
            1,
            &mut plan,
            &mut CourtLedger::new(),
            &mut scheduled,
        );
        assert!(plan.is_empty(), "only three players prefer the bucket's location");
    }

    #[test]
    fn test_players_not_reused_across_buckets() {
        let config = PlannerConfig::default();
        let roster = roster(vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)]);
        let inventory = CourtInventory::new(&[
            court(Weekday::Mon, HOME, "18:00-19:00", "Court 1"),
            court(Weekday::Mon, HOME, "19:00-20:00", "Court 1"),
        ]);
        let planner = WeeklyPlanner::new(&config, &roster, &inventory);

        let mut plan = SeasonPlan::new();
        let mut ledger = CourtLedger::new();
        let mut scheduled = BTreeSet::new();
        planner.plan_week(1, &mut plan, &mut ledger, &mut scheduled);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.iter().next().unwrap().slot.interval.start, 18 * 60);
    }

    #[test]
    fn test_booked_courts_are_skipped() {
        let config = PlannerConfig::default();
        let roster = roster(vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)]);
        let record = court(Weekday::Mon, HOME, "18:00-19:00", "Court 1");
        let inventory = CourtInventory::new(&[record.clone()]);
        let planner = WeeklyPlanner::new(&config, &roster, &inventory);

        let mut plan = SeasonPlan::new();
        let mut ledger = CourtLedger::new();
        ledger.book(1, &record.slot, "Court 1");
        let mut scheduled = BTreeSet::new();
        assert_eq!(planner.plan_week(1, &mut plan, &mut ledger, &mut scheduled), 0);
    }

    #[test]
    fn test_unplanned_weekday_is_ignored() {
        let config = PlannerConfig {
            days: vec!["Tuesday".to_string()],
            ..PlannerConfig::default()
        };
        let roster = roster(vec![man("1", 5.0), man("2", 5.0), man("3", 5.0), man("4", 5.0)]);
        let inventory = CourtInventory::new(&[court(Weekday::Mon, HOME, "18:00-19:00", "Court 1")]);
        let planner = WeeklyPlanner::new(&config, &roster, &inventory);

        let mut plan = SeasonPlan::new();
        let mut scheduled = BTreeSet::new();
        planner.plan_week(1, &mut plan, &mut CourtLedger::new(), &mut scheduled);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_summarize_week() {
        let config = PlannerConfig::default();
        let roster = roster(vec![
            man("1", 5.0),
            man("2", 5.0),
            man("3", 5.0),
            man("4", 5.0),
            woman("5", 3.0),
        ]);
        let inventory = CourtInventory::new(&[court(Weekday::Mon, HOME, "18:00-19:00", "Court 1")]);
        let planner = WeeklyPlanner::new(&config, &roster, &inventory);

        let mut plan = SeasonPlan::new();
        let mut scheduled = BTreeSet::new();
        planner.plan_week(1, &mut plan, &mut CourtLedger::new(), &mut scheduled);

        let summary = summarize_week(&roster, &plan, 1);
        assert_eq!(summary.scheduled, scheduled);
        assert_eq!(summary.unscheduled, vec![PlayerId::from("5")]);
    }
}
