use crate::config::SignalTiming;
use crate::error::SignalError;
use crate::global_variables::{CLEARANCE_SLACK, GREEN_CANDIDATE_SLACK};
use crate::shared_data::{GreenGroup, GroupSlot, IntersectionId, PhaseProgram};
use crate::simulation_engine::adapter::SimulationAdapter;
use std::cmp::Ordering;

/// Semantic role of a phase, read from its signal-state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    /// Some link may go and none shows caution.
    Green,
    /// Some link shows caution and none may go.
    Yellow,
    /// Every link is stopped.
    AllRed,
    Unknown,
}

/// Classifies a signal-state string such as `"GGrr"` or `"yyrr"`.
pub fn classify(state: &str) -> PhaseKind {
    let mut go = false;
    let mut caution = false;
    let mut stop = false;
    for c in state.chars() {
        match c.to_ascii_lowercase() {
            'g' => go = true,
            'y' => caution = true,
            'r' => stop = true,
            _ => {}
        }
    }
    match (go, caution) {
        (true, false) => PhaseKind::Green,
        (false, true) => PhaseKind::Yellow,
        (false, false) if stop => PhaseKind::AllRed,
        _ => PhaseKind::Unknown,
    }
}

/// Role a phase index plays in the resolved cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseRole {
    Green(GroupSlot),
    Yellow(GroupSlot),
    AllRed(GroupSlot),
}

/// Result of analysing one intersection's phase program.
#[derive(Debug)]
pub struct PhaseTopology {
    pub program: PhaseProgram,
    /// Zero, one or two groups, in program order.
    pub groups: Vec<GreenGroup>,
    /// Why resolution failed, when it did.
    pub failure: Option<SignalError>,
    /// Green candidates dropped because no yellow clears their links.
    pub unpaired_greens: Vec<usize>,
}

impl PhaseTopology {
    /// Reads the program from the engine and resolves it. Never fails: an
    /// unknown intersection or an empty program yields zero groups.
    pub fn resolve(
        adapter: &dyn SimulationAdapter,
        intersection: &IntersectionId,
        timing: &SignalTiming,
    ) -> Self {
        if !adapter.has_intersection(intersection) {
            return Self::unresolved(intersection, "intersection unknown to the simulation");
        }
        match adapter.phase_program(intersection) {
            Ok(program) if program.is_empty() => {
                Self::unresolved(intersection, "phase program is empty")
            }
            Ok(program) => Self::from_program(program, timing),
            Err(e) => Self::unresolved(intersection, &e.to_string()),
        }
    }

    fn unresolved(intersection: &IntersectionId, reason: &str) -> Self {
        Self {
            program: PhaseProgram::default(),
            groups: Vec::new(),
            failure: Some(SignalError::ResolutionFailure {
                intersection: intersection.clone(),
                reason: reason.to_string(),
            }),
            unpaired_greens: Vec::new(),
        }
    }

    /// Picks the two longest green phases and pairs each with its yellow and all-red.
    ///
    /// Switching between two groups always passes through a yellow, so when
    /// either green has no yellow of its own only the paired group is kept and
    /// the intersection stops alternating.
    pub fn from_program(program: PhaseProgram, timing: &SignalTiming) -> Self {
        let min_candidate = timing.min_green.saturating_sub(GREEN_CANDIDATE_SLACK) as f64;

        let mut candidates: Vec<(usize, f64)> = program
            .phases
            .iter()
            .enumerate()
            .filter(|(_, phase)| {
                classify(&phase.state) == PhaseKind::Green && phase.duration >= min_candidate
            })
            .map(|(i, phase)| (i, phase.duration))
            .collect();

        // Stable sort keeps program order among equal durations.
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let mut chosen: Vec<usize> = candidates.iter().take(2).map(|&(i, _)| i).collect();
        chosen.sort_unstable();

        let mut groups: Vec<GreenGroup> = chosen
            .into_iter()
            .map(|green| {
                let yellow = find_yellow(&program, green, timing);
                let all_red = yellow.and_then(|y| find_all_red(&program, y, timing));
                GreenGroup {
                    green,
                    yellow,
                    all_red,
                }
            })
            .collect();

        let mut unpaired_greens = Vec::new();
        if groups.len() == 2 && groups.iter().any(|g| g.yellow.is_none()) {
            let keep = groups
                .iter()
                .position(|g| g.yellow.is_some())
                .unwrap_or(0);
            for (i, group) in groups.iter().enumerate() {
                if i != keep {
                    unpaired_greens.push(group.green);
                }
            }
            groups = vec![groups[keep]];
        }

        Self {
            program,
            groups,
            failure: None,
            unpaired_greens,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Two green groups exist, so the movements alternate and pressures can be compared.
    pub fn is_alternating(&self) -> bool {
        self.groups.len() >= 2
    }

    pub fn group(&self, slot: GroupSlot) -> Option<&GreenGroup> {
        self.groups.get(slot.index())
    }

    /// Role of `phase` in the cycle, or `None` if no group uses it.
    pub fn role_of(&self, phase: usize) -> Option<PhaseRole> {
        for (i, group) in self.groups.iter().enumerate() {
            let slot = if i == 0 {
                GroupSlot::First
            } else {
                GroupSlot::Second
            };
            if group.green == phase {
                return Some(PhaseRole::Green(slot));
            }
            if group.yellow == Some(phase) {
                return Some(PhaseRole::Yellow(slot));
            }
            if group.all_red == Some(phase) {
                return Some(PhaseRole::AllRed(slot));
            }
        }
        None
    }
}

fn find_yellow(program: &PhaseProgram, green: usize, timing: &SignalTiming) -> Option<usize> {
    let len = program.len();
    let limit = (timing.yellow_duration + CLEARANCE_SLACK) as f64;
    (1..len)
        .map(|offset| (green + offset) % len)
        .find(|&i| {
            let phase = &program.phases[i];
            classify(&phase.state) == PhaseKind::Yellow
                && phase.duration <= limit
                && clears(&program.phases[green].state, &phase.state)
        })
}

/// The yellow shows caution on exactly the links the green lets go.
fn clears(green: &str, yellow: &str) -> bool {
    green.len() == yellow.len()
        && green.chars().zip(yellow.chars()).all(|(g, y)| {
            matches!(g, 'G' | 'g') == matches!(y, 'y' | 'Y')
        })
}

fn find_all_red(program: &PhaseProgram, yellow: usize, timing: &SignalTiming) -> Option<usize> {
    let next = (yellow + 1) % program.len();
    let phase = program.get(next)?;
    let limit = (timing.all_red_duration + CLEARANCE_SLACK) as f64;
    (next != yellow && classify(&phase.state) == PhaseKind::AllRed && phase.duration <= limit)
        .then_some(next)
}
