//! Adaptive traffic-signal control for a simulated road network.
//!
//! Each signalised intersection gets an [`IntersectionController`] that owns
//! its phase changes. A [`PressureCoordinator`] periodically compares two
//! arterial groups and nudges their controllers' priority factors. The
//! simulator is reached only through the [`SimulationAdapter`] trait.
//!
//! [`IntersectionController`]: control_system::intersection_controller::IntersectionController
//! [`PressureCoordinator`]: control_system::pressure_coordinator::PressureCoordinator
//! [`SimulationAdapter`]: simulation_engine::adapter::SimulationAdapter

pub mod cli;
pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod shared_data;
pub mod simulation_engine;
