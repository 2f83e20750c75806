// simulation_engine/mod.rs
pub mod adapter;
pub mod intersections;
pub mod lanes;
pub mod simulation;
