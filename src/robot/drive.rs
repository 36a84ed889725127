// Drivetrain facade
//
// Holds the last-commanded 3-axis input vector and forwards it to the
// kinematics mixer on every setter call. Wheel-level mixing, relative
// move tracking, and the busy flag all belong to the mixer.

use crate::hardware::Result;

/// 3-degree-of-freedom drive intent
///
/// `x` = strafe (right positive), `y` = forward, `z` = rotate (clockwise
/// positive), each in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveInput {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// External kinematics component for an omnidirectional drivetrain
pub trait DriveMixer: Send {
    /// Apply a full input vector to the wheels
    fn set_input(&mut self, input: DriveInput) -> Result<()>;

    /// Start a relative straight-line move; sign of `inches` is direction
    fn set_forward_target(&mut self, inches: f64, speed: f64) -> Result<()>;

    /// True while a relative move is still in progress
    fn is_busy(&mut self) -> Result<bool>;
}

pub struct DriveTrain {
    mixer: Box<dyn DriveMixer>,
    input: DriveInput,
}

impl DriveTrain {
    pub fn new(mixer: Box<dyn DriveMixer>) -> Self {
        Self {
            mixer,
            input: DriveInput::default(),
        }
    }

    fn apply(&mut self, next: DriveInput) -> Result<()> {
        self.input = next;
        self.mixer.set_input(next)
    }

    pub fn set_input(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        self.apply(DriveInput { x, y, z })
    }

    // Single-axis setters keep the other two axes at their last-commanded
    // values; the whole vector is rebuilt and re-sent each call.

    pub fn set_input_x(&mut self, x: f64) -> Result<()> {
        let next = DriveInput { x, ..self.input };
        self.apply(next)
    }

    pub fn set_input_y(&mut self, y: f64) -> Result<()> {
        let next = DriveInput { y, ..self.input };
        self.apply(next)
    }

    pub fn set_input_z(&mut self, z: f64) -> Result<()> {
        let next = DriveInput { z, ..self.input };
        self.apply(next)
    }

    /// Last-commanded input vector
    pub fn input(&self) -> DriveInput {
        self.input
    }

    /// Relative straight-line move forward. A negative distance does not
    /// reverse direction; magnitude is taken first.
    pub fn move_forward(&mut self, inches: f64, speed: f64) -> Result<()> {
        self.mixer.set_forward_target(inches.abs(), speed)
    }

    pub fn move_backward(&mut self, inches: f64, speed: f64) -> Result<()> {
        self.mixer.set_forward_target(-inches.abs(), speed)
    }

    pub fn is_busy(&mut self) -> Result<bool> {
        self.mixer.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MixerLog {
        inputs: Vec<DriveInput>,
        targets: Vec<(f64, f64)>,
    }

    struct RecordingMixer(Arc<Mutex<MixerLog>>);

    impl DriveMixer for RecordingMixer {
        fn set_input(&mut self, input: DriveInput) -> Result<()> {
            self.0.lock().unwrap().inputs.push(input);
            Ok(())
        }

        fn set_forward_target(&mut self, inches: f64, speed: f64) -> Result<()> {
            self.0.lock().unwrap().targets.push((inches, speed));
            Ok(())
        }

        fn is_busy(&mut self) -> Result<bool> {
            Ok(false)
        }
    }

    fn drivetrain() -> (DriveTrain, Arc<Mutex<MixerLog>>) {
        let log = Arc::new(Mutex::new(MixerLog::default()));
        (DriveTrain::new(Box::new(RecordingMixer(log.clone()))), log)
    }

    #[test]
    fn single_axis_setters_keep_other_axes() {
        let (mut drive, log) = drivetrain();
        drive.set_input(0.0, 0.0, 0.4).unwrap();
        drive.set_input_x(0.7).unwrap();
        drive.set_input_y(-0.2).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            log.inputs.last(),
            Some(&DriveInput {
                x: 0.7,
                y: -0.2,
                z: 0.4
            })
        );
        // Every setter forwards to the mixer, no batching
        assert_eq!(log.inputs.len(), 3);
    }

    #[test]
    fn every_setter_reflects_in_retained_vector() {
        let (mut drive, _log) = drivetrain();
        drive.set_input_z(0.9).unwrap();
        assert_eq!(drive.input().z, 0.9);
        drive.set_input_x(0.1).unwrap();
        assert_eq!(drive.input(), DriveInput { x: 0.1, y: 0.0, z: 0.9 });
    }

    #[test]
    fn move_direction_comes_from_the_verb_not_the_sign() {
        let (mut drive, log) = drivetrain();
        drive.move_forward(5.0, 0.5).unwrap();
        drive.move_forward(-5.0, 0.5).unwrap();
        drive.move_backward(5.0, 0.5).unwrap();
        drive.move_backward(-5.0, 0.5).unwrap();

        let targets = &log.lock().unwrap().targets;
        assert_eq!(targets[0], (5.0, 0.5));
        assert_eq!(targets[1], (5.0, 0.5));
        assert_eq!(targets[2], (-5.0, 0.5));
        assert_eq!(targets[3], (-5.0, 0.5));
    }
}
