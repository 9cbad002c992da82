//! Planner configuration.
//!
//! Every tunable of the engine lives here. The document is JSON; every
//! section is optional and falls back to its defaults, and a missing or
//! unreadable file falls back to [`PlannerConfig::default`] with a warning.

use std::fs;
use std::path::Path;

use chrono::Weekday;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::schedule::slot_utils::{parse_weekday, weekday_name, WORKING_DAYS};

/// Which players may be considered for a bucket at a location they did not pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPolicy {
    /// Only players whose preferred location is the bucket's location.
    Strict,
    /// Players holding a partner wish are also eligible elsewhere,
    /// as long as the strict location hard filter is off.
    PartnerFlexible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardFilterConfig {
    pub strict_location: bool,
    pub max_level_spread: f64,
    pub mix_mandatory: bool,
}

impl Default for HardFilterConfig {
    fn default() -> Self {
        Self {
            strict_location: true,
            max_level_spread: 1.0,
            mix_mandatory: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderConfig {
    /// Added to a female player's level before comparing with male levels.
    pub female_level_offset: f64,
}

impl Default for GenderConfig {
    fn default() -> Self {
        Self {
            female_level_offset: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelScoring {
    pub max: f64,
    pub all_equal: f64,
    pub two_two_split: f64,
}

impl Default for LevelScoring {
    fn default() -> Self {
        Self {
            max: 3.0,
            all_equal: 3.0,
            two_two_split: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceScoring {
    pub max: f64,
    pub three_or_more_pairs: f64,
    pub two_pairs: f64,
    pub one_pair: f64,
    pub neutral: f64,
    pub per_one_way_wish: f64,
}

impl Default for PreferenceScoring {
    fn default() -> Self {
        Self {
            max: 4.0,
            three_or_more_pairs: 4.0,
            two_pairs: 3.5,
            one_pair: 3.0,
            neutral: 2.0,
            per_one_way_wish: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderScoring {
    pub max: f64,
    pub two_two: f64,
    pub homogeneous: f64,
    pub three_one: f64,
}

impl Default for GenderScoring {
    fn default() -> Self {
        Self {
            max: 2.0,
            two_two: 2.0,
            homogeneous: 1.5,
            three_one: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeScoring {
    pub max: f64,
    pub same_bracket: f64,
    pub adjacent_brackets: f64,
}

impl Default for AgeScoring {
    fn default() -> Self {
        Self {
            max: 1.0,
            same_bracket: 1.0,
            adjacent_brackets: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub level: LevelScoring,
    pub preference: PreferenceScoring,
    pub gender: GenderScoring,
    pub age: AgeScoring,
}

/// An age bracket, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBracket {
    pub name: String,
    pub min: u32,
    pub max: u32,
}

impl AgeBracket {
    pub fn new(name: &str, min: u32, max: u32) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age < self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialRetention {
    pub base: f64,
    pub residual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Staying members needed before a historical group is re-seated.
    pub min_retained: usize,
    /// Retained count from which the hard filters no longer apply.
    pub waive_hard_filters_from: usize,
    pub full_retention_score: f64,
    pub three_of_four: PartialRetention,
    pub two_of_four: PartialRetention,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            min_retained: 2,
            waive_hard_filters_from: 2,
            full_retention_score: 10.0,
            three_of_four: PartialRetention {
                base: 7.0,
                residual: 2.0,
            },
            two_of_four: PartialRetention {
                base: 5.0,
                residual: 1.5,
            },
        }
    }
}

impl Default for PartialRetention {
    fn default() -> Self {
        Self {
            base: 5.0,
            residual: 1.5,
        }
    }
}

impl LegacyConfig {
    /// Base and residual for a partially retained group.
    pub fn partial(&self, retained: usize) -> Option<&PartialRetention> {
        match retained {
            3 => Some(&self.three_of_four),
            2 => Some(&self.two_of_four),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Lowest-level candidates examined per homogeneous group.
    pub candidate_window: usize,
    /// Try 3+1 groups when homogeneous and 2+2 groups leave courts empty.
    pub uneven_mix_fallback: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            candidate_window: 8,
            uneven_mix_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub max_rounds: usize,
    /// Minimum score gain for any accepted change.
    pub min_improvement: f64,
    pub excellent_threshold: f64,
    pub poor_threshold: f64,
    pub swap_quality_floor: f64,
    pub max_swaps_per_week: usize,
    pub max_reassembly_groups: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rounds: 10,
            min_improvement: 0.1,
            excellent_threshold: 9.0,
            poor_threshold: 6.0,
            swap_quality_floor: 5.0,
            max_swaps_per_week: 10,
            max_reassembly_groups: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub synthetic_count: usize,
    pub placeholder_prefix: String,
    pub real_trainer_bonus: f64,
    pub continuity_bonus: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            synthetic_count: 2,
            placeholder_prefix: "Placeholder Trainer".to_string(),
            real_trainer_bonus: 100.0,
            continuity_bonus: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub weeks: u32,
    pub days: Vec<String>,
    pub location_policy: LocationPolicy,
    pub hard_filters: HardFilterConfig,
    pub gender: GenderConfig,
    pub scoring: ScoringConfig,
    pub age_brackets: Vec<AgeBracket>,
    pub legacy: LegacyConfig,
    pub builder: BuilderConfig,
    pub optimizer: OptimizerConfig,
    pub trainers: TrainerConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            weeks: 12,
            days: WORKING_DAYS
                .iter()
                .map(|day| weekday_name(*day).to_string())
                .collect(),
            location_policy: LocationPolicy::Strict,
            hard_filters: HardFilterConfig::default(),
            gender: GenderConfig::default(),
            scoring: ScoringConfig::default(),
            age_brackets: vec![
                AgeBracket::new("young", 18, 30),
                AgeBracket::new("middle", 30, 50),
                AgeBracket::new("senior", 50, 71),
            ],
            legacy: LegacyConfig::default(),
            builder: BuilderConfig::default(),
            optimizer: OptimizerConfig::default(),
            trainers: TrainerConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PlannerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the configuration, falling back to defaults on any problem.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Configuration file {} not found, using built-in defaults",
                path.display()
            );
            return Self::default();
        }

        let loaded = fs::read_to_string(path)
            .map_err(PlannerError::from)
            .and_then(|json| Self::from_json_str(&json));
        match loaded {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Could not load configuration {}: {}. Using built-in defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Planned weekdays in configured order; unknown names are skipped.
    pub fn weekdays(&self) -> Vec<Weekday> {
        let mut days = Vec::new();
        for raw in &self.days {
            match parse_weekday(raw) {
                Some(day) if !days.contains(&day) => days.push(day),
                Some(_) => {}
                None => warn!("Ignoring unknown weekday '{}' in configuration", raw),
            }
        }
        if days.is_empty() {
            WORKING_DAYS.to_vec()
        } else {
            days
        }
    }

    /// True if players holding a partner wish may play away from their location.
    pub fn location_is_flexible(&self) -> bool {
        self.location_policy == LocationPolicy::PartnerFlexible
            && !self.hard_filters.strict_location
    }
}
