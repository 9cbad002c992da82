use std::path::Path;

use itertools::Itertools;
use serde::Serialize;

use crate::error::PlannerError;
use crate::roster::Roster;
use crate::schedule::scoring::ScoreBreakdown;
use crate::schedule::slot_utils::weekday_name;
use crate::schedule::types::{Assignment, Gender, Player};
use crate::schedule::{LegacyFailure, SeasonOutcome, SeasonPlan};

/// One exported assignment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanRow {
    pub week: u32,
    pub day: String,
    pub location: String,
    pub time: String,
    pub court: String,
    pub players: String,
    pub player_ids: String,
    pub provenance: String,
    pub level: String,
    pub gender_balance: String,
    pub quality_score: String,
    pub trainer: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnscheduledRow {
    pub week: u32,
    pub player_id: String,
    pub name: String,
    pub preferred_location: String,
    pub level: String,
}

/// Prints 6.0 as "6" and 5.5 as "5.5".
pub fn format_level(level: f64) -> String {
    if level.fract() == 0.0 {
        format!("{:.0}", level)
    } else {
        format!("{}", level)
    }
}

/// "6" for a single level, "5-6 (mixed)" for several, "unknown" without any.
pub fn describe_levels(members: &[&Player]) -> String {
    let levels: Vec<f64> = members
        .iter()
        .filter_map(|p| p.level)
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup()
        .collect();
    match levels.as_slice() {
        [] => "unknown".to_string(),
        [level] => format_level(*level),
        [low, .., high] => format!("{}-{} (mixed)", format_level(*low), format_level(*high)),
    }
}

pub fn describe_gender_balance(members: &[&Player]) -> String {
    let men = members.iter().filter(|p| p.gender == Some(Gender::Male)).count();
    let women = members.iter().filter(|p| p.gender == Some(Gender::Female)).count();
    match (men, women) {
        (2, 2) => "Perfect (2M/2F)".to_string(),
        (4, 0) => "Homogeneous (4M)".to_string(),
        (0, 4) => "Homogeneous (4F)".to_string(),
        (m, f) => format!("Other (M:{}, F:{})", m, f),
    }
}

pub fn plan_row(assignment: &Assignment, roster: &Roster) -> PlanRow {
    let members = roster.members(&assignment.players);
    PlanRow {
        week: assignment.week,
        day: weekday_name(assignment.slot.day).to_string(),
        location: assignment.slot.location.clone(),
        time: assignment.slot.interval.to_string(),
        court: assignment.court.clone(),
        players: members.iter().map(|p| p.full_name()).join(", "),
        player_ids: assignment.players.iter().join(", "),
        provenance: assignment.provenance.label().to_string(),
        level: describe_levels(&members),
        gender_balance: describe_gender_balance(&members),
        quality_score: format!("{:.2}", assignment.score),
        trainer: assignment.trainer.label().to_string(),
    }
}

/// Export rows in chronological order.
pub fn plan_rows(plan: &SeasonPlan, roster: &Roster) -> Vec<PlanRow> {
    plan.chronological_ids()
        .into_iter()
        .map(|id| plan_row(plan.get(id), roster))
        .collect()
}

pub fn unscheduled_rows(plan: &SeasonPlan, roster: &Roster) -> Vec<UnscheduledRow> {
    plan.weeks
        .values()
        .flat_map(|summary| {
            summary
                .unscheduled
                .iter()
                .filter_map(|id| roster.get(id))
                .map(move |player| UnscheduledRow {
                    week: summary.week,
                    player_id: player.id.to_string(),
                    name: player.full_name(),
                    preferred_location: player.preferred_location.clone(),
                    level: player.level.map(format_level).unwrap_or_default(),
                })
        })
        .collect()
}

fn write_rows<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<(), PlannerError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_plan_csv<P: AsRef<Path>>(path: P, plan: &SeasonPlan, roster: &Roster) -> Result<usize, PlannerError> {
    let rows = plan_rows(plan, roster);
    write_rows(path, &rows)?;
    Ok(rows.len())
}

pub fn write_unscheduled_csv<P: AsRef<Path>>(
    path: P,
    plan: &SeasonPlan,
    roster: &Roster,
) -> Result<usize, PlannerError> {
    let rows = unscheduled_rows(plan, roster);
    write_rows(path, &rows)?;
    Ok(rows.len())
}

/// Counts of assignments per quality band: excellent, good, average, below.
pub fn quality_distribution(plan: &SeasonPlan) -> [usize; 4] {
    let mut bands = [0; 4];
    for assignment in plan.iter() {
        let band = match assignment.score {
            s if s > 9.0 => 0,
            s if s >= 7.0 => 1,
            s if s >= 5.0 => 2,
            _ => 3,
        };
        bands[band] += 1;
    }
    bands
}

/// Prints the end-of-run report.
pub fn print_summary(outcome: &SeasonOutcome, roster: &Roster) {
    let plan = &outcome.plan;
    println!("\n=== Season Plan ===");
    println!("Weeks planned: {}", plan.weeks.len());
    println!("Assignments: {}", plan.len());
    println!("Average quality: {:.2}", plan.average_score());

    println!("\nPer week:");
    for summary in plan.weeks.values() {
        println!(
            "  Week {}: {} scheduled, {} unscheduled",
            summary.week,
            summary.scheduled.len(),
            summary.unscheduled.len()
        );
        if !summary.unscheduled.is_empty() {
            let examples = summary
                .unscheduled
                .iter()
                .filter_map(|id| roster.get(id))
                .take(5)
                .map(|p| p.full_name())
                .join(", ");
            let more = summary.unscheduled.len().saturating_sub(5);
            if more > 0 {
                println!("    e.g. {} and {} more", examples, more);
            } else {
                println!("    e.g. {}", examples);
            }
        }
    }

    println!("\nTop groups:");
    let top = plan
        .iter()
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .take(5);
    for assignment in top {
        let row = plan_row(assignment, roster);
        println!(
            "  {:.2}  week {} {} {} {} {}: {}",
            assignment.score, row.week, row.day, row.time, row.location, row.court, row.players
        );
    }

    let [excellent, good, average, below] = quality_distribution(plan);
    println!("\nQuality distribution:");
    println!("  Excellent (> 9): {}", excellent);
    println!("  Good (7-9):      {}", good);
    println!("  Average (5-7):   {}", average);
    println!("  Below 5:         {}", below);

    let legacy = &outcome.legacy;
    println!("\nLegacy groups: {} full, {} partial", legacy.placed_full, legacy.placed_partial);
    if legacy.failed() > 0 {
        println!("  Not placed:");
        for (reason, count) in &legacy.failures {
            println!("    {}: {}", LegacyFailure::describe(*reason), count);
        }
    }

    let optimization = &outcome.optimization;
    println!(
        "\nOptimizer: {} round(s), {} relocation(s), {} swap(s), {} reassembly(s), score {:.2} -> {:.2} ({:+.2})",
        optimization.rounds,
        optimization.relocations,
        optimization.swaps,
        optimization.reassemblies,
        optimization.score_before,
        optimization.score_after,
        optimization.improvement()
    );

    let trainers = &outcome.trainers;
    println!(
        "Trainers: {} real, {} placeholder, {} none available",
        trainers.real, trainers.placeholder, trainers.none_available
    );
    println!(
        "Partner wishes: {} player(s) with wishes, {} naming nobody on the roster",
        roster.players_with_wishes(),
        roster.dangling_wishes()
    );
}

/// Prints the per-criterion score of one group.
pub fn print_breakdown(members: &[&Player], location: Option<&str>, breakdown: &ScoreBreakdown) {
    println!("\n=== Group analysis ===");
    for player in members {
        println!(
            "  {} ({}) level {} gender {} age {} location {}",
            player.full_name(),
            player.id,
            player.level.map(format_level).unwrap_or_else(|| "?".to_string()),
            match player.gender {
                Some(Gender::Male) => "M",
                Some(Gender::Female) => "F",
                None => "?",
            },
            player.age.map(|a| a.to_string()).unwrap_or_else(|| "?".to_string()),
            player.preferred_location
        );
    }
    println!("Location: {}", location.unwrap_or("(any)"));
    match breakdown.hard_filter {
        Some(failure) => println!("Hard filters: FAILED ({})", failure.describe()),
        None => println!("Hard filters: passed"),
    }
    println!("Level:      {:.2}", breakdown.level);
    println!(
        "Preference: {:.2} ({} mutual pair(s), {} one-way wish(es), {} dangling)",
        breakdown.preference, breakdown.mutual_pairs, breakdown.one_way_wishes, breakdown.dangling_wishes
    );
    println!("Gender:     {:.2} ({})", breakdown.gender, describe_gender_balance(members));
    println!("Age:        {:.2}", breakdown.age);
    println!("Total:      {:.2}", breakdown.total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::{home_slot, man, roster, woman};
    use crate::schedule::types::{PlayerId, Provenance, TrainerId, TrainerSlot, WeekSummary};
    use tempfile::tempdir;

    fn sample() -> (Roster, SeasonPlan) {
        let roster = roster(vec![man("1", 6.0), man("2", 6.0), woman("3", 5.0), woman("4", 5.0), man("5", 4.0)]);
        let mut plan = SeasonPlan::new();
        let players: Vec<PlayerId> = ["1", "2", "3", "4"].iter().map(|id| PlayerId::from(*id)).collect();
        let id = plan.push(Assignment::new(1, home_slot(), "Court 1", players, Provenance::New, 8.0));
        plan.get_mut(id).trainer = TrainerSlot::Assigned(TrainerId {
            name: "Alex".to_string(),
            synthetic: false,
        });
        plan.weeks.insert(
            1,
            WeekSummary {
                week: 1,
                scheduled: ["1", "2", "3", "4"].iter().map(|id| PlayerId::from(*id)).collect(),
                unscheduled: vec![PlayerId::from("5")],
            },
        );
        (roster, plan)
    }

    #[test]
    fn test_plan_row() {
        let (roster, plan) = sample();
        let rows = plan_rows(&plan, &roster);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.day, "Monday");
        assert_eq!(row.time, "18:00-19:00");
        assert_eq!(row.players, "P1 Test, P2 Test, P3 Test, P4 Test");
        assert_eq!(row.player_ids, "1, 2, 3, 4");
        assert_eq!(row.level, "5-6 (mixed)");
        assert_eq!(row.gender_balance, "Perfect (2M/2F)");
        assert_eq!(row.quality_score, "8.00");
        assert_eq!(row.trainer, "Alex");
    }

    #[test]
    fn test_describe_levels() {
        let players = vec![man("1", 6.0), man("2", 6.0)];
        assert_eq!(describe_levels(&players.iter().collect::<Vec<_>>()), "6");
        let unknown = vec![Player::new("1", "A", "B")];
        assert_eq!(describe_levels(&unknown.iter().collect::<Vec<_>>()), "unknown");
        assert_eq!(format_level(5.5), "5.5");
    }

    #[test]
    fn test_write_csv_outputs() {
        let (roster, plan) = sample();
        let dir = tempdir().unwrap();
        let plan_path = dir.path().join("season_plan.csv");
        let unscheduled_path = dir.path().join("unscheduled_players.csv");

        assert_eq!(write_plan_csv(&plan_path, &plan, &roster).unwrap(), 1);
        assert_eq!(write_unscheduled_csv(&unscheduled_path, &plan, &roster).unwrap(), 1);

        let written = std::fs::read_to_string(&plan_path).unwrap();
        let header = written.lines().next().unwrap();
        assert_eq!(
            header,
            "week,day,location,time,court,players,player_ids,provenance,level,gender_balance,quality_score,trainer"
        );
        let unscheduled = std::fs::read_to_string(&unscheduled_path).unwrap();
        assert!(unscheduled.contains("1,5,P5 Test,North,4"));
    }

    #[test]
    fn test_quality_distribution() {
        let (_, plan) = sample();
        assert_eq!(quality_distribution(&plan), [0, 1, 0, 0]);
    }
}
