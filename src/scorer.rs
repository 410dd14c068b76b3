use crate::config::{AppConfig, ScorerKind};
use crate::models::{Reading, RefinedData};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_anomalous: bool,
    pub fuel_drop_liters: f64,
    pub refined: RefinedData,
}

/// Classifies a single reading. Implementations must be pure and deterministic.
pub trait AnomalyScorer: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, reading: &Reading) -> Verdict;
}

/// Flags readings that sit too far below a nominal full tank.
#[derive(Debug, Clone, Copy)]
pub struct FuelDropScorer {
    pub nominal_full_level: f64,
    pub drop_threshold: f64,
}

impl Default for FuelDropScorer {
    fn default() -> Self {
        Self {
            nominal_full_level: 20.0,
            drop_threshold: 5.0,
        }
    }
}

impl AnomalyScorer for FuelDropScorer {
    fn name(&self) -> &'static str {
        "fuel_drop"
    }

    fn score(&self, reading: &Reading) -> Verdict {
        let fuel_drop_liters = (self.nominal_full_level - reading.fuel_level).max(0.0);
        let is_anomalous = fuel_drop_liters > self.drop_threshold;
        verdict(self.name(), reading, fuel_drop_liters, is_anomalous)
    }
}

/// Flags any reading under a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LowFuelScorer {
    pub threshold: f64,
}

impl AnomalyScorer for LowFuelScorer {
    fn name(&self) -> &'static str {
        "low_fuel"
    }

    fn score(&self, reading: &Reading) -> Verdict {
        let fuel_drop_liters = (self.threshold - reading.fuel_level).max(0.0);
        let is_anomalous = reading.fuel_level < self.threshold;
        verdict(self.name(), reading, fuel_drop_liters, is_anomalous)
    }
}

fn verdict(scorer: &str, reading: &Reading, fuel_drop_liters: f64, is_anomalous: bool) -> Verdict {
    Verdict {
        is_anomalous,
        fuel_drop_liters,
        refined: RefinedData {
            fuel_level: reading.fuel_level,
            fuel_drop_liters,
            is_anomalous,
            scorer: scorer.to_string(),
        },
    }
}

pub fn from_config(config: &AppConfig) -> Arc<dyn AnomalyScorer> {
    match config.scorer {
        ScorerKind::FuelDrop => Arc::new(FuelDropScorer {
            nominal_full_level: config.nominal_full_level,
            drop_threshold: config.drop_threshold,
        }),
        ScorerKind::LowFuel => Arc::new(LowFuelScorer {
            threshold: config.low_fuel_threshold,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(fuel_level: f64) -> Reading {
        Reading {
            sensor_id: "S1".to_string(),
            vehicle_id: "V1".to_string(),
            user_id: "U1".to_string(),
            fuel_level,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    #[test]
    fn fuel_drop_flags_large_drops() {
        let scorer = FuelDropScorer::default();

        let verdict = scorer.score(&reading(5.0));
        assert!(verdict.is_anomalous);
        assert_eq!(verdict.fuel_drop_liters, 15.0);
        assert_eq!(verdict.refined.scorer, "fuel_drop");
        assert_eq!(verdict.refined.fuel_level, 5.0);
    }

    #[test]
    fn fuel_drop_never_negative() {
        let verdict = FuelDropScorer::default().score(&reading(80.0));
        assert!(!verdict.is_anomalous);
        assert_eq!(verdict.fuel_drop_liters, 0.0);
    }

    #[test]
    fn fuel_drop_threshold_is_exclusive() {
        let verdict = FuelDropScorer::default().score(&reading(15.0));
        assert_eq!(verdict.fuel_drop_liters, 5.0);
        assert!(!verdict.is_anomalous);
    }

    #[test]
    fn low_fuel_uses_fixed_level() {
        let scorer = LowFuelScorer { threshold: 10.0 };
        assert!(scorer.score(&reading(9.99)).is_anomalous);
        assert!(!scorer.score(&reading(10.0)).is_anomalous);
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = FuelDropScorer::default();
        let input = reading(3.25);
        assert_eq!(scorer.score(&input), scorer.score(&input));
    }
}
