use crate::error::AdapterError;
use crate::shared_data::{IntersectionId, PhaseProgram};

/// Synchronous view of the simulation engine used by the signal controllers.
///
/// Every call is one round trip to the engine. Implementations own their
/// transport and its timeouts; the controllers only see success or an
/// [`AdapterError`].
pub trait SimulationAdapter {
    /// Whether the engine knows a signalised intersection with this id.
    fn has_intersection(&self, intersection: &IntersectionId) -> bool;

    fn phase_program(&self, intersection: &IntersectionId) -> Result<PhaseProgram, AdapterError>;

    fn current_phase_index(&self, intersection: &IntersectionId) -> Result<usize, AdapterError>;

    /// Commands the engine to switch to `index`. A refusal leaves the engine's phase unchanged.
    fn set_phase_index(
        &mut self,
        intersection: &IntersectionId,
        index: usize,
    ) -> Result<(), AdapterError>;

    /// Vehicles currently halted on a lane.
    fn halting_count(&self, lane: &str) -> Result<u32, AdapterError>;

    /// Accumulated waiting time (seconds) of the vehicles on a lane.
    fn waiting_time(&self, lane: &str) -> Result<f64, AdapterError>;
}

/// The engine's clock: the one call that lets simulated time move forward.
pub trait SimulationStep {
    /// Advances the engine by one step and returns the new tick number.
    fn advance(&mut self) -> u64;
}
