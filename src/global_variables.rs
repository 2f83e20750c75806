// Signal timing defaults (ticks; one tick is one simulation step)
pub const MIN_GREEN: u32 = 15;
pub const NORMAL_GREEN: u32 = 30;
pub const EXTENDED_GREEN: u32 = 60;
pub const MAX_GREEN: u32 = 90;
pub const YELLOW_DURATION: u32 = 3;
pub const ALL_RED_DURATION: u32 = 2;

// Demand sampling and decision thresholds
pub const SAMPLE_INTERVAL: u64 = 5;
pub const DEMAND_THRESHOLD: f64 = 3.0;
pub const PRESSURE_MARGIN: f64 = 5.0;

// A green candidate may be this many ticks shorter than the minimum green.
pub const GREEN_CANDIDATE_SLACK: u32 = 5;
// Yellow / all-red candidates may exceed their configured duration by this much.
pub const CLEARANCE_SLACK: u32 = 2;
// Ticks past a phase's nominal duration before an unmanaged phase is recovered.
pub const UNMANAGED_GRACE: u32 = 10;

// Priority factor
pub const PRIORITY_FACTOR_LIMIT: f64 = 0.8;
pub const PRIORITY_EFFECT_CAP: f64 = 0.6;
pub const PRIORITY_BIAS_SCALE: f64 = 0.8;

// Network coordination
pub const COORDINATOR_INTERVAL: u64 = 10;
pub const CONGESTION_QUEUE_THRESHOLD: f64 = 15.0;
pub const CONGESTION_PERSISTENCE_THRESHOLD: u32 = 3;
pub const CONGESTION_MULTIPLIER: f64 = 1.8;

// Logging cadence for per-controller progress lines
pub const PROGRESS_INTERVAL: u64 = 300;

// Default length of a demo run
pub const DEFAULT_RUN_TICKS: u64 = 3600;
