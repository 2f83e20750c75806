use crate::error::AdapterError;
use crate::shared_data::{Approach, IntersectionId, PhaseDefinition, PhaseProgram};

/// Static description of one signalised intersection in the built-in grid.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionLayout {
    pub id: &'static str,
    /// Approaches that have an incoming lane (and a detector).
    pub approaches: &'static [Approach],
}

const FOUR_WAY: &[Approach] = &[Approach::North, Approach::South, Approach::East, Approach::West];

/// The twelve signalised intersections of the 4x4 grid. Border intersections
/// lack the approach that would come from outside the grid.
pub fn grid_intersections() -> Vec<IntersectionLayout> {
    vec![
        IntersectionLayout {
            id: "A1",
            approaches: &[Approach::North, Approach::South, Approach::East],
        },
        IntersectionLayout {
            id: "A2",
            approaches: &[Approach::North, Approach::South, Approach::East],
        },
        IntersectionLayout {
            id: "B0",
            approaches: &[Approach::West, Approach::East, Approach::South],
        },
        IntersectionLayout {
            id: "B1",
            approaches: FOUR_WAY,
        },
        IntersectionLayout {
            id: "B2",
            approaches: FOUR_WAY,
        },
        IntersectionLayout {
            id: "B3",
            approaches: &[Approach::North, Approach::West, Approach::East],
        },
        IntersectionLayout {
            id: "C0",
            approaches: &[Approach::West, Approach::East, Approach::South],
        },
        IntersectionLayout {
            id: "C1",
            approaches: FOUR_WAY,
        },
        IntersectionLayout {
            id: "C2",
            approaches: FOUR_WAY,
        },
        IntersectionLayout {
            id: "C3",
            approaches: &[Approach::North, Approach::West, Approach::East],
        },
        IntersectionLayout {
            id: "D1",
            approaches: &[Approach::North, Approach::South, Approach::West],
        },
        IntersectionLayout {
            id: "D2",
            approaches: &[Approach::North, Approach::South, Approach::West],
        },
    ]
}

/// Two-movement program in "WENS" link order: east-west green, yellow,
/// optional all-red, then north-south green, yellow, optional all-red.
pub fn standard_program(green: f64, yellow: f64, all_red: Option<f64>) -> PhaseProgram {
    let mut phases = vec![
        PhaseDefinition::fixed("GGrr", green),
        PhaseDefinition::fixed("yyrr", yellow),
    ];
    if let Some(all_red) = all_red {
        phases.push(PhaseDefinition::fixed("rrrr", all_red));
    }
    phases.push(PhaseDefinition::fixed("rrGG", green));
    phases.push(PhaseDefinition::fixed("rryy", yellow));
    if let Some(all_red) = all_red {
        phases.push(PhaseDefinition::fixed("rrrr", all_red));
    }
    PhaseProgram::new(phases)
}

/// Engine-side signal head of one intersection.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    pub program: PhaseProgram,
    pub current_phase: usize,
    /// When false, every phase command is refused.
    pub accepts_commands: bool,
}

impl Intersection {
    pub fn new(id: IntersectionId, program: PhaseProgram) -> Self {
        Self {
            id,
            program,
            current_phase: 0,
            accepts_commands: true,
        }
    }

    pub fn set_phase(&mut self, index: usize) -> Result<(), AdapterError> {
        if !self.accepts_commands {
            return Err(AdapterError::Rejected {
                intersection: self.id.clone(),
                reason: "signal head is not accepting commands".to_string(),
            });
        }
        if index >= self.program.len() {
            return Err(AdapterError::PhaseOutOfRange {
                intersection: self.id.clone(),
                index,
                len: self.program.len(),
            });
        }
        self.current_phase = index;
        Ok(())
    }

    /// Signal character currently shown to the link at `link`, if any.
    pub fn link_state(&self, link: usize) -> Option<char> {
        self.program
            .get(self.current_phase)
            .and_then(|phase| phase.state.chars().nth(link))
    }

    pub fn is_link_green(&self, link: usize) -> bool {
        matches!(self.link_state(link), Some('G') | Some('g'))
    }
}
