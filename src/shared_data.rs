// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a signalised intersection, as known to the simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntersectionId(pub String);

impl IntersectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IntersectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The four approaches a detector can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Approach {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "W")]
    West,
}

impl Approach {
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::South,
        Approach::East,
        Approach::West,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Approach::North => "N",
            Approach::South => "S",
            Approach::East => "E",
            Approach::West => "W",
        }
    }
}

/// Last sampled demand per approach. Values are halting vehicles, or accumulated
/// waiting seconds when the network samples waiting time instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl QueueSnapshot {
    pub fn get(&self, approach: Approach) -> f64 {
        match approach {
            Approach::North => self.north,
            Approach::South => self.south,
            Approach::East => self.east,
            Approach::West => self.west,
        }
    }

    pub fn set(&mut self, approach: Approach, value: f64) {
        match approach {
            Approach::North => self.north = value,
            Approach::South => self.south = value,
            Approach::East => self.east = value,
            Approach::West => self.west = value,
        }
    }

    pub fn sum(&self, approaches: &[Approach]) -> f64 {
        approaches.iter().map(|&a| self.get(a)).sum()
    }
}

/// One row of an engine phase table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// One signal character per controlled link, e.g. "GGrr".
    pub state: String,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Nominal duration in ticks.
    pub duration: f64,
}

impl PhaseDefinition {
    /// Phase with identical nominal, minimum and maximum duration.
    pub fn fixed(state: &str, duration: f64) -> Self {
        Self {
            state: state.to_string(),
            min_duration: duration,
            max_duration: duration,
            duration,
        }
    }
}

/// Ordered, cyclic phase table of one intersection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgram {
    pub phases: Vec<PhaseDefinition>,
}

impl PhaseProgram {
    pub fn new(phases: Vec<PhaseDefinition>) -> Self {
        Self { phases }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhaseDefinition> {
        self.phases.get(index)
    }
}

/// A green movement together with the clearance phases that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreenGroup {
    pub green: usize,
    pub yellow: Option<usize>,
    pub all_red: Option<usize>,
}

/// Which of the (at most two) green groups currently holds right-of-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupSlot {
    First,
    Second,
}

impl GroupSlot {
    pub fn index(self) -> usize {
        match self {
            GroupSlot::First => 0,
            GroupSlot::Second => 1,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            GroupSlot::First => GroupSlot::Second,
            GroupSlot::Second => GroupSlot::First,
        }
    }

    /// Approaches served while this group is green. The first group carries the
    /// east-west movement, the second the north-south movement.
    pub fn approaches(self) -> &'static [Approach] {
        match self {
            GroupSlot::First => &[Approach::West, Approach::East],
            GroupSlot::Second => &[Approach::North, Approach::South],
        }
    }
}

/// Named set of intersections coordinated along one travel axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArterialGroup {
    pub name: String,
    pub members: Vec<IntersectionId>,
}

impl ArterialGroup {
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|&m| IntersectionId::from(m)).collect(),
        }
    }
}

/// Point-in-time view of one controller, for progress reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub intersection_id: IntersectionId,
    pub phase: usize,
    pub elapsed_ticks: u32,
    pub queues: QueueSnapshot,
    pub priority_factor: f64,
    pub alternating: bool,
    pub inert: bool,
}
