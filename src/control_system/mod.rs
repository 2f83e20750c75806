// control_system/mod.rs
pub mod intersection_controller;
pub mod phase_topology;
pub mod pressure_coordinator;
pub mod signal_policy;
pub mod traffic_light_controller;
