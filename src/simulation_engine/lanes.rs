use crate::shared_data::{Approach, IntersectionId};

/// Lane id of the detector watching `approach` at `intersection`.
pub fn detector_lane_id(intersection: &str, approach: Approach) -> String {
    format!("{}_{}_in", intersection, approach.code())
}

/// Position of an approach's link in a phase state string ("WENS" order).
pub fn link_index(approach: Approach) -> usize {
    match approach {
        Approach::West => 0,
        Approach::East => 1,
        Approach::North => 2,
        Approach::South => 3,
    }
}

/// An incoming lane feeding one approach of a signalised intersection.
#[derive(Debug, Clone)]
pub struct ApproachLane {
    pub id: String,
    pub intersection: IntersectionId,
    pub approach: Approach,
    /// Probability that one vehicle arrives on a given tick.
    pub arrival_rate: f64,
    /// Vehicles currently queued at the stop line.
    pub halting: u32,
    /// Sum of the waiting seconds of every queued vehicle.
    pub waiting_time: f64,
    /// Vehicles that have crossed the stop line so far.
    pub discharged: u64,
}

impl ApproachLane {
    pub fn new(intersection: &IntersectionId, approach: Approach, arrival_rate: f64) -> Self {
        Self {
            id: detector_lane_id(intersection.as_str(), approach),
            intersection: intersection.clone(),
            approach,
            arrival_rate,
            halting: 0,
            waiting_time: 0.0,
            discharged: 0,
        }
    }

    pub fn add_vehicle(&mut self) {
        self.halting += 1;
    }

    /// Lets the head vehicle cross the stop line. Returns false if the lane is empty.
    pub fn discharge(&mut self) -> bool {
        if self.halting == 0 {
            return false;
        }
        // Queued vehicles share the accumulated wait evenly.
        let average_wait = self.waiting_time / self.halting as f64;
        self.halting -= 1;
        self.waiting_time = (self.waiting_time - average_wait).max(0.0);
        self.discharged += 1;
        true
    }

    /// Adds one tick of waiting to every queued vehicle.
    pub fn accumulate_wait(&mut self) {
        self.waiting_time += self.halting as f64;
    }

    /// Overwrites the queue, giving every vehicle the same wait so far.
    pub fn set_queue(&mut self, halting: u32, wait_per_vehicle: f64) {
        self.halting = halting;
        self.waiting_time = halting as f64 * wait_per_vehicle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_ids_follow_detector_naming() {
        assert_eq!(detector_lane_id("B1", Approach::North), "B1_N_in");
        assert_eq!(detector_lane_id("C3", Approach::West), "C3_W_in");
    }

    #[test]
    fn discharge_removes_average_wait() {
        let mut lane = ApproachLane::new(&IntersectionId::from("B1"), Approach::East, 0.0);
        lane.set_queue(4, 10.0);
        assert!(lane.discharge());
        assert_eq!(lane.halting, 3);
        assert!((lane.waiting_time - 30.0).abs() < 1e-9);
        assert_eq!(lane.discharged, 1);
    }

    #[test]
    fn empty_lane_cannot_discharge() {
        let mut lane = ApproachLane::new(&IntersectionId::from("B1"), Approach::East, 0.0);
        assert!(!lane.discharge());
        lane.accumulate_wait();
        assert_eq!(lane.waiting_time, 0.0);
    }
}
