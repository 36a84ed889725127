// Heading bookkeeping over the fused orientation sensor
//
// Pure offset-and-convention transform: no filtering, no caching. Every
// call reads the sensor again.

use tracing::debug;

use crate::hardware::{OrientationSensor, Result};

pub struct HeadingTracker {
    sensor: Box<dyn OrientationSensor>,
    offset: f32,
}

impl HeadingTracker {
    pub fn new(sensor: Box<dyn OrientationSensor>) -> Self {
        Self { sensor, offset: 0.0 }
    }

    /// Capture the current raw yaw as the new zero reference. Called once
    /// per session, or whenever the robot reaches a known heading (e.g.
    /// squared against a wall).
    pub fn reset(&mut self) -> Result<()> {
        self.offset = self.sensor.heading_degrees()?;
        debug!("heading zeroed at raw {:.1} deg", self.offset);
        Ok(())
    }

    /// Raw minus offset. Note: the difference is not re-wrapped into
    /// (-180, 180], so it can transiently exceed that range right after a
    /// reset near the sensor's wrap boundary.
    pub fn signed(&mut self) -> Result<f32> {
        Ok(self.sensor.heading_degrees()? - self.offset)
    }

    /// Signed heading mapped into [0, 360)
    pub fn unsigned(&mut self) -> Result<f32> {
        Ok(self.signed()?.rem_euclid(360.0))
    }

    pub fn is_calibrated(&mut self) -> Result<bool> {
        self.sensor.is_calibrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{ImuState, SimImu};
    use std::sync::{Arc, Mutex};

    fn tracker(heading: f32) -> (HeadingTracker, Arc<Mutex<ImuState>>) {
        let state = Arc::new(Mutex::new(ImuState {
            heading,
            calibrated: true,
        }));
        (HeadingTracker::new(Box::new(SimImu::new(state.clone()))), state)
    }

    #[test]
    fn signed_is_zero_right_after_reset() {
        let (mut h, _state) = tracker(37.5);
        h.reset().unwrap();
        assert_eq!(h.signed().unwrap(), 0.0);
    }

    #[test]
    fn unsigned_stays_in_range_for_any_raw_and_offset() {
        let cases = [(-200.0, 0.0), (-200.0, 359.0), (179.9, -180.0), (0.0, 359.0)];
        for (raw, offset) in cases {
            let (mut h, state) = tracker(offset);
            h.reset().unwrap();
            state.lock().unwrap().heading = raw;
            let unsigned = h.unsigned().unwrap();
            assert!(
                (0.0..360.0).contains(&unsigned),
                "raw {} offset {} gave {}",
                raw,
                offset,
                unsigned
            );
        }
    }

    #[test]
    fn signed_is_not_rewrapped_after_reset_near_wrap() {
        // Zeroed at +170, sensor wraps to -170: the signed value reads
        // -340, not +20. Callers near the wrap boundary see this.
        let (mut h, state) = tracker(170.0);
        h.reset().unwrap();
        state.lock().unwrap().heading = -170.0;
        assert_eq!(h.signed().unwrap(), -340.0);
        assert_eq!(h.unsigned().unwrap(), 20.0);
    }

    #[test]
    fn reset_rebases_on_raw_not_on_previous_offset() {
        let (mut h, state) = tracker(45.0);
        h.reset().unwrap();
        state.lock().unwrap().heading = 90.0;
        assert_eq!(h.signed().unwrap(), 45.0);

        // Second reset re-zeroes at the new raw angle
        h.reset().unwrap();
        assert_eq!(h.signed().unwrap(), 0.0);
    }
}
