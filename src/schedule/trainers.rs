use std::collections::{HashMap, HashSet};

use log::{debug, info};
use serde::Serialize;

use super::types::{SeasonPlan, SlotKey, TrainerAvailability, TrainerId, TrainerSlot};
use crate::config::PlannerConfig;

/// How the final plan is staffed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainerStats {
    pub real: usize,
    pub placeholder: usize,
    pub none_available: usize,
}

pub struct TrainerAssigner<'a> {
    config: &'a PlannerConfig,
}

impl<'a> TrainerAssigner<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// Real trainers per slot in input order, followed by the placeholders
    /// added to every slot the plan occupies.
    fn working_availability(
        &self,
        plan: &SeasonPlan,
        availability: &[TrainerAvailability],
    ) -> HashMap<SlotKey, Vec<TrainerId>> {
        let mut by_slot: HashMap<SlotKey, Vec<TrainerId>> = HashMap::new();
        for entry in availability {
            let trainers = by_slot.entry(entry.slot.clone()).or_default();
            if !trainers.iter().any(|t| t.name == entry.trainer) {
                trainers.push(TrainerId {
                    name: entry.trainer.clone(),
                    synthetic: false,
                });
            }
        }

        let settings = &self.config.trainers;
        let occupied: HashSet<&SlotKey> = plan.iter().map(|a| &a.slot).collect();
        for slot in occupied {
            let trainers = by_slot.entry(slot.clone()).or_default();
            for i in 1..=settings.synthetic_count {
                trainers.push(TrainerId {
                    name: format!("{} {}", settings.placeholder_prefix, i),
                    synthetic: true,
                });
            }
        }
        by_slot
    }

    /// Gives every assignment a trainer, in chronological order.
    ///
    /// A trainer is booked at most once per (week, slot). Real trainers beat
    /// placeholders; a trainer already booked for the hour before at the
    /// same location gets a continuity bonus. Ties go to the first listed.
    pub fn assign(&self, plan: &mut SeasonPlan, availability: &[TrainerAvailability]) -> TrainerStats {
        let settings = &self.config.trainers;
        let working = self.working_availability(plan, availability);
        let mut booked: HashSet<(u32, SlotKey, String)> = HashSet::new();
        let mut stats = TrainerStats::default();

        for id in plan.chronological_ids() {
            let (week, slot) = {
                let assignment = plan.get(id);
                (assignment.week, assignment.slot.clone())
            };
            let preceding = slot
                .interval
                .preceding_hour()
                .map(|interval| SlotKey::new(slot.day, &slot.location, interval));

            let mut best: Option<(&TrainerId, f64)> = None;
            for trainer in working.get(&slot).map(Vec::as_slice).unwrap_or(&[]) {
                if booked.contains(&(week, slot.clone(), trainer.name.clone())) {
                    continue;
                }
                let mut score = 0.0;
                if !trainer.synthetic {
                    score += settings.real_trainer_bonus;
                }
                if let Some(previous) = &preceding {
                    if booked.contains(&(week, previous.clone(), trainer.name.clone())) {
                        score += settings.continuity_bonus;
                    }
                }
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((trainer, score));
                }
            }

            let assignment = plan.get_mut(id);
            match best {
                Some((trainer, _)) => {
                    booked.insert((week, slot.clone(), trainer.name.clone()));
                    if trainer.synthetic {
                        stats.placeholder += 1;
                    } else {
                        stats.real += 1;
                    }
                    assignment.trainer = TrainerSlot::Assigned(trainer.clone());
                }
                None => {
                    debug!("Week {}: no trainer available at {}", week, slot);
                    stats.none_available += 1;
                    assignment.trainer = TrainerSlot::NoneAvailable;
                }
            }
        }

        info!(
            "Trainers assigned: {} real, {} placeholder, {} without trainer",
            stats.real, stats.placeholder, stats.none_available
        );
        stats
    }
}
