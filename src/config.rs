// src/config.rs

use crate::error::{Result, SignalError};
use crate::global_variables::*;
use crate::shared_data::{Approach, ArterialGroup, IntersectionId};
use crate::simulation_engine::intersections::grid_intersections;
use crate::simulation_engine::lanes::detector_lane_id;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// How green time is decided, chosen once for the whole network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Fixed normal green on every intersection.
    Static,
    /// Demand-driven extension and starvation override where two groups exist.
    #[default]
    Adaptive,
}

/// Which adapter query fills a controller's queue snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandSignal {
    #[default]
    HaltingCount,
    WaitingTime,
}

/// Timing parameters shared by every intersection controller. All durations are ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    pub min_green: u32,
    pub normal_green: u32,
    /// Base of the extended green before the priority factor is applied.
    pub extended_green: u32,
    /// Hard ceiling for any green target.
    pub max_green: u32,
    pub yellow_duration: u32,
    pub all_red_duration: u32,
    pub sample_interval: u64,
    pub demand_threshold: f64,
    pub pressure_margin: f64,
    pub priority_effect_cap: f64,
    pub unmanaged_grace: u32,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            min_green: MIN_GREEN,
            normal_green: NORMAL_GREEN,
            extended_green: EXTENDED_GREEN,
            max_green: MAX_GREEN,
            yellow_duration: YELLOW_DURATION,
            all_red_duration: ALL_RED_DURATION,
            sample_interval: SAMPLE_INTERVAL,
            demand_threshold: DEMAND_THRESHOLD,
            pressure_margin: PRESSURE_MARGIN,
            priority_effect_cap: PRIORITY_EFFECT_CAP,
            unmanaged_grace: UNMANAGED_GRACE,
        }
    }
}

fn unit_adjustment() -> f64 {
    1.0
}

/// Per-intersection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionConfig {
    pub id: IntersectionId,
    /// Detector lane watched for each approach. Missing approaches read as zero.
    #[serde(default)]
    pub detectors: BTreeMap<Approach, String>,
    /// Multiplier on the extended green for intersections downstream of a bottleneck.
    #[serde(default = "unit_adjustment")]
    pub corridor_adjustment: f64,
}

impl IntersectionConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: IntersectionId::from(id),
            detectors: BTreeMap::new(),
            corridor_adjustment: 1.0,
        }
    }

    pub fn with_detector(mut self, approach: Approach, lane: &str) -> Self {
        self.detectors.insert(approach, lane.to_string());
        self
    }

    pub fn with_corridor_adjustment(mut self, factor: f64) -> Self {
        self.corridor_adjustment = factor;
        self
    }
}

/// Watches one bottleneck approach and boosts a group's pressure while it stays congested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionWatch {
    pub intersection: IntersectionId,
    pub approach: Approach,
    pub boosted_group: String,
    #[serde(default = "default_congestion_queue")]
    pub queue_threshold: f64,
    #[serde(default = "default_persistence")]
    pub persistence_threshold: u32,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_congestion_queue() -> f64 {
    CONGESTION_QUEUE_THRESHOLD
}

fn default_persistence() -> u32 {
    CONGESTION_PERSISTENCE_THRESHOLD
}

fn default_multiplier() -> f64 {
    CONGESTION_MULTIPLIER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub interval: u64,
    pub bias_scale: f64,
    /// Exactly two groups; the first receives `+bias`, the second `-bias`.
    pub groups: Vec<ArterialGroup>,
    pub congestion_watch: Option<CongestionWatch>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            interval: COORDINATOR_INTERVAL,
            bias_scale: PRIORITY_BIAS_SCALE,
            groups: vec![
                ArterialGroup::new("NS", &["B1", "B2", "C1", "C2"]),
                ArterialGroup::new("EW", &["A1", "A2", "D1", "D2", "B0", "B3", "C0", "C3"]),
            ],
            congestion_watch: Some(CongestionWatch {
                intersection: IntersectionId::from("D2"),
                approach: Approach::West,
                boosted_group: "EW".to_string(),
                queue_threshold: CONGESTION_QUEUE_THRESHOLD,
                persistence_threshold: CONGESTION_PERSISTENCE_THRESHOLD,
                multiplier: CONGESTION_MULTIPLIER,
            }),
        }
    }
}

/// Complete configuration of a signal network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mode: ControlMode,
    pub demand_signal: DemandSignal,
    pub timing: SignalTiming,
    pub intersections: Vec<IntersectionConfig>,
    pub coordinator: CoordinatorConfig,
    pub progress_interval: u64,
}

impl Default for NetworkConfig {
    /// Configuration matching the built-in grid simulation.
    fn default() -> Self {
        let intersections = grid_intersections()
            .into_iter()
            .map(|layout| {
                let mut config = IntersectionConfig::new(layout.id);
                for &approach in layout.approaches {
                    config = config.with_detector(approach, &detector_lane_id(layout.id, approach));
                }
                // D2 and C3 feed the D3 bottleneck.
                if matches!(layout.id, "D2" | "C3") {
                    config = config.with_corridor_adjustment(1.4);
                }
                config
            })
            .collect();

        Self {
            mode: ControlMode::default(),
            demand_signal: DemandSignal::default(),
            timing: SignalTiming::default(),
            intersections,
            coordinator: CoordinatorConfig::default(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl NetworkConfig {
    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: NetworkConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.min_green == 0 {
            return Err(SignalError::Config("min_green must be positive".into()));
        }
        if t.min_green > t.normal_green {
            return Err(SignalError::Config(format!(
                "min_green ({}) exceeds normal_green ({})",
                t.min_green, t.normal_green
            )));
        }
        if t.normal_green > t.max_green {
            return Err(SignalError::Config(format!(
                "normal_green ({}) exceeds max_green ({})",
                t.normal_green, t.max_green
            )));
        }
        if t.yellow_duration == 0 {
            return Err(SignalError::Config("yellow_duration must be positive".into()));
        }
        if t.sample_interval == 0 {
            return Err(SignalError::Config("sample_interval must be positive".into()));
        }
        if !(0.0..=1.0).contains(&t.priority_effect_cap) {
            return Err(SignalError::Config(format!(
                "priority_effect_cap {} outside [0, 1]",
                t.priority_effect_cap
            )));
        }
        if t.demand_threshold < 0.0 || t.pressure_margin < 0.0 {
            return Err(SignalError::Config(
                "demand_threshold and pressure_margin must not be negative".into(),
            ));
        }

        let mut seen = HashSet::new();
        for intersection in &self.intersections {
            if !seen.insert(&intersection.id) {
                return Err(SignalError::Config(format!(
                    "intersection {} listed twice",
                    intersection.id
                )));
            }
            if !(intersection.corridor_adjustment > 0.0) {
                return Err(SignalError::Config(format!(
                    "corridor_adjustment of {} must be positive",
                    intersection.id
                )));
            }
        }

        let c = &self.coordinator;
        if c.interval == 0 {
            return Err(SignalError::Config("coordinator interval must be positive".into()));
        }
        if !(0.0..=1.0).contains(&c.bias_scale) {
            return Err(SignalError::Config(format!(
                "bias_scale {} outside [0, 1]",
                c.bias_scale
            )));
        }
        if c.groups.len() != 2 {
            return Err(SignalError::Config(format!(
                "coordinator needs exactly two arterial groups, got {}",
                c.groups.len()
            )));
        }
        if let Some(watch) = &c.congestion_watch {
            if !c.groups.iter().any(|g| g.name == watch.boosted_group) {
                return Err(SignalError::Config(format!(
                    "congestion watch boosts unknown group {}",
                    watch.boosted_group
                )));
            }
            if watch.multiplier < 1.0 {
                return Err(SignalError::Config(
                    "congestion multiplier must be at least 1".into(),
                ));
            }
        }
        if self.progress_interval == 0 {
            return Err(SignalError::Config("progress_interval must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.intersections.len(), 12);
        let d2 = config
            .intersections
            .iter()
            .find(|i| i.id.as_str() == "D2")
            .unwrap();
        assert_eq!(d2.corridor_adjustment, 1.4);
        assert_eq!(d2.detectors.len(), 3);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = r#"{
            "mode": "Static",
            "timing": { "min_green": 10, "normal_green": 20 },
            "intersections": [
                { "id": "X1", "detectors": { "N": "x1_north", "W": "x1_west" } }
            ]
        }"#;
        let config = NetworkConfig::from_json(raw).unwrap();
        assert_eq!(config.mode, ControlMode::Static);
        assert_eq!(config.timing.min_green, 10);
        assert_eq!(config.timing.yellow_duration, YELLOW_DURATION);
        assert_eq!(config.intersections[0].corridor_adjustment, 1.0);
        assert_eq!(
            config.intersections[0].detectors.get(&Approach::West).map(String::as_str),
            Some("x1_west")
        );
        assert_eq!(config.coordinator.groups.len(), 2);
    }

    #[test]
    fn rejects_inconsistent_timing() {
        let mut config = NetworkConfig::default();
        config.timing.min_green = 40;
        assert!(matches!(config.validate(), Err(SignalError::Config(_))));

        let mut config = NetworkConfig::default();
        config.timing.yellow_duration = 0;
        assert!(matches!(config.validate(), Err(SignalError::Config(_))));
    }

    #[test]
    fn rejects_wrong_group_count() {
        let mut config = NetworkConfig::default();
        config.coordinator.groups.pop();
        assert!(matches!(config.validate(), Err(SignalError::Config(_))));
    }

    #[test]
    fn rejects_unknown_boosted_group() {
        let mut config = NetworkConfig::default();
        if let Some(watch) = config.coordinator.congestion_watch.as_mut() {
            watch.boosted_group = "Diagonal".to_string();
        }
        assert!(matches!(config.validate(), Err(SignalError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            NetworkConfig::from_json("{ not json"),
            Err(SignalError::Json(_))
        ));
    }
}
