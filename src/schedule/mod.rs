pub mod types;
pub mod slot_utils;
pub mod courts;
pub mod scoring;
pub mod group_builder;
pub mod legacy;
pub mod weekly;
pub mod optimizer;
pub mod trainers;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::BTreeSet;

use log::info;

pub use courts::{CourtInventory, CourtLedger};
pub use legacy::{LegacyFailure, LegacyPlanner, LegacyStats};
pub use optimizer::{OptimizationStats, Optimizer};
pub use scoring::Scorer;
pub use trainers::{TrainerAssigner, TrainerStats};
pub use types::{PlayerId, SeasonPlan};
pub use weekly::{summarize_week, WeeklyPlanner};

use crate::config::PlannerConfig;
use crate::roster::Roster;
use types::{LegacyRecord, TrainerAvailability};

/// Everything a planning run produces.
#[derive(Debug, Clone, Default)]
pub struct SeasonOutcome {
    pub plan: SeasonPlan,
    pub legacy: LegacyStats,
    pub optimization: OptimizationStats,
    pub trainers: TrainerStats,
}

/// Runs the whole pipeline: legacy groups and new groups week by week,
/// then the optimizer, then trainer assignment.
pub fn plan_season(
    config: &PlannerConfig,
    roster: &Roster,
    inventory: &CourtInventory,
    trainer_availability: &[TrainerAvailability],
    legacy_records: &[LegacyRecord],
) -> SeasonOutcome {
    let legacy_planner = LegacyPlanner::new(config, roster, inventory);
    let weekly_planner = WeeklyPlanner::new(config, roster, inventory);
    legacy_planner.report_unresolved(legacy_records);

    let mut outcome = SeasonOutcome::default();
    let mut ledger = CourtLedger::new();

    for week in 1..=config.weeks {
        info!("Planning week {}", week);
        let mut scheduled: BTreeSet<PlayerId> = BTreeSet::new();
        legacy_planner.plan_week(
            week,
            legacy_records,
            &mut outcome.plan,
            &mut ledger,
            &mut scheduled,
            &mut outcome.legacy,
        );
        let formed = weekly_planner.plan_week(week, &mut outcome.plan, &mut ledger, &mut scheduled);
        info!(
            "Week {}: {} new group(s), {} player(s) scheduled, {} unscheduled",
            week,
            formed,
            scheduled.len(),
            roster.len().saturating_sub(scheduled.len())
        );
    }

    if config.optimizer.enabled {
        outcome.optimization = Optimizer::new(config, roster, inventory).optimize(&mut outcome.plan);
        info!(
            "Optimizer: {} change(s) in {} round(s), score {:.2} -> {:.2}",
            outcome.optimization.changes(),
            outcome.optimization.rounds,
            outcome.optimization.score_before,
            outcome.optimization.score_after
        );
    }

    outcome.trainers = TrainerAssigner::new(config).assign(&mut outcome.plan, trainer_availability);

    for week in 1..=config.weeks {
        let summary = summarize_week(roster, &outcome.plan, week);
        outcome.plan.weeks.insert(week, summary);
    }
    outcome
}
