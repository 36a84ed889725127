// Robot hardware facade
//
// One API surface over the drivetrain, lift, collector arm, extension,
// collection gate, IMU, and the optional vision tracker. Built once per
// operating session; an external control loop drives it every cycle.
// Intents flow down, busy flags / positions / heading / samples flow up.

pub mod actuator;
pub mod drive;
pub mod gate;
pub mod heading;
pub mod vision;

use tracing::info;

use crate::config;
use crate::hardware::{
    Direction, HardwareRegistry, MecanumDrive, Motor, Result,
};

use self::actuator::Actuator;
use self::drive::{DriveInput, DriveMixer, DriveTrain};
use self::gate::{CollectorGate, ScaledServo};
use self::heading::HeadingTracker;
use self::vision::{CameraView, FieldPosition, MineralSample, Vision, VisionBackend, VisionConfig};

pub struct Robot {
    drive: DriveTrain,
    lift: Actuator,
    arm: Actuator,
    extend: Actuator,
    gate: CollectorGate,
    heading: HeadingTracker,
    vision: Vision,
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot").finish_non_exhaustive()
    }
}

fn acquire_motor(
    hw: &mut dyn HardwareRegistry,
    name: &str,
    direction: Direction,
    brake: bool,
) -> Result<Box<dyn Motor>> {
    let mut motor = hw.motor(name)?;
    motor.set_direction(direction)?;
    motor.set_brake_on_zero(brake)?;
    Ok(motor)
}

impl Robot {
    /// Acquire every device and build the default mecanum mixer from the
    /// four wheel motors. A missing device name fails construction; no
    /// partially-initialized facade ever exists.
    pub fn new(
        hw: &mut dyn HardwareRegistry,
        vision_backend: Box<dyn VisionBackend>,
    ) -> Result<Self> {
        let wheels = [
            acquire_motor(hw, config::FRONT_LEFT, Direction::Forward, false)?,
            acquire_motor(hw, config::FRONT_RIGHT, Direction::Reverse, false)?,
            acquire_motor(hw, config::BACK_LEFT, Direction::Forward, false)?,
            acquire_motor(hw, config::BACK_RIGHT, Direction::Reverse, false)?,
        ];
        let mixer = MecanumDrive::new(wheels)?;
        Self::with_mixer(hw, Box::new(mixer), vision_backend)
    }

    /// Like [`Robot::new`] but with an externally supplied mixer; the
    /// wheel motors then belong to the mixer, not the registry names.
    pub fn with_mixer(
        hw: &mut dyn HardwareRegistry,
        mixer: Box<dyn DriveMixer>,
        vision_backend: Box<dyn VisionBackend>,
    ) -> Result<Self> {
        let mut lift_motor = acquire_motor(hw, config::LIFT, Direction::Forward, true)?;
        lift_motor.reset_encoder()?;
        let lift = Actuator::new(lift_motor);

        let arm = Actuator::new(acquire_motor(hw, config::ARM, Direction::Forward, true)?);
        let extend = Actuator::new(acquire_motor(hw, config::EXTEND, Direction::Forward, true)?);

        // Gate servos are mirror-mounted; scaling is fixed here and never
        // changes for the rest of the session
        let gate = CollectorGate::new(
            ScaledServo::new(
                hw.servo(config::GATE_LEFT)?,
                Direction::Reverse,
                config::GATE_SCALE_MIN,
                config::GATE_SCALE_MAX,
            ),
            ScaledServo::new(
                hw.servo(config::GATE_RIGHT)?,
                Direction::Forward,
                config::GATE_SCALE_MIN,
                config::GATE_SCALE_MAX,
            ),
        );

        let heading = HeadingTracker::new(hw.orientation_sensor(config::IMU)?);
        let vision = Vision::new(vision_backend, VisionConfig::from_constants());

        info!("robot hardware acquired");
        Ok(Self {
            drive: DriveTrain::new(mixer),
            lift,
            arm,
            extend,
            gate,
            heading,
            vision,
        })
    }

    // ==== readiness & emergency stop =========================================

    /// True once the IMU reports self-calibrated. Hardware acquisition is
    /// already guaranteed by construction. Sensor read errors count as
    /// not ready.
    pub fn is_ready(&mut self) -> bool {
        self.heading.is_calibrated().unwrap_or(false)
    }

    /// Silence everything: zero the retained drive vector (not just wheel
    /// power), zero lift/arm/extend power without touching their control
    /// modes, and release the vision session. Every subsystem is
    /// attempted even if an earlier one faults.
    pub fn stop_all_motors(&mut self) -> Result<()> {
        info!("stopping all motors");
        let drive = self.drive.set_input(0.0, 0.0, 0.0);
        let arm = self.arm.stop();
        let extend = self.extend.stop();
        let lift = self.lift.stop();
        self.vision.disable();
        drive.and(arm).and(extend).and(lift)
    }

    // ==== vision =============================================================

    pub fn set_vision_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.vision.enable()
        } else {
            self.vision.disable();
            Ok(())
        }
    }

    pub fn use_rear_camera(&mut self) -> Result<()> {
        self.vision.select_camera(CameraView::Rear)
    }

    pub fn use_side_camera(&mut self) -> Result<()> {
        self.vision.select_camera(CameraView::Side)
    }

    /// One non-blocking detection attempt; `None` when nothing was seen
    /// or vision is disabled
    pub fn mineral_sample(&mut self) -> Option<MineralSample> {
        self.vision.try_sample()
    }

    pub fn field_position(&mut self) -> Option<FieldPosition> {
        self.vision.field_position()
    }

    // ==== heading ============================================================

    pub fn reset_heading(&mut self) -> Result<()> {
        self.heading.reset()
    }

    pub fn heading_signed(&mut self) -> Result<f32> {
        self.heading.signed()
    }

    pub fn heading_unsigned(&mut self) -> Result<f32> {
        self.heading.unsigned()
    }

    // ==== drivetrain =========================================================

    pub fn set_drive_input(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        self.drive.set_input(x, y, z)
    }

    pub fn set_drive_input_x(&mut self, x: f64) -> Result<()> {
        self.drive.set_input_x(x)
    }

    pub fn set_drive_input_y(&mut self, y: f64) -> Result<()> {
        self.drive.set_input_y(y)
    }

    pub fn set_drive_input_z(&mut self, z: f64) -> Result<()> {
        self.drive.set_input_z(z)
    }

    /// Last-commanded drive vector
    pub fn drive_input(&self) -> DriveInput {
        self.drive.input()
    }

    pub fn move_forward(&mut self, inches: f64, speed: f64) -> Result<()> {
        self.drive.move_forward(inches, speed)
    }

    pub fn move_backward(&mut self, inches: f64, speed: f64) -> Result<()> {
        self.drive.move_backward(inches, speed)
    }

    pub fn is_drive_busy(&mut self) -> Result<bool> {
        self.drive.is_busy()
    }

    // ==== lift ===============================================================

    pub fn set_lift_speed(&mut self, speed: f64) -> Result<()> {
        self.lift.set_velocity(speed)
    }

    /// Seek a normalized lift height. The fraction is clamped to [0, 1]
    /// before scaling to ticks, so out-of-range inputs degrade to the
    /// nearest end of travel instead of failing.
    pub fn set_lift_position(&mut self, position: f64, speed: f64) -> Result<()> {
        let position = position.clamp(0.0, 1.0);
        let ticks = (position * config::MAX_LIFT_TICKS as f64) as i32;
        self.lift.seek(ticks, speed)
    }

    /// Coarse normalized readout: whole-travel integer division, not a
    /// sub-unit fraction
    pub fn lift_position(&mut self) -> Result<i32> {
        Ok(self.lift.position()? / config::MAX_LIFT_TICKS)
    }

    pub fn is_lift_busy(&mut self) -> Result<bool> {
        self.lift.is_busy()
    }

    // ==== collector arm ======================================================

    pub fn set_arm_speed(&mut self, speed: f64) -> Result<()> {
        self.arm.set_velocity(speed)
    }

    pub fn set_arm_position(&mut self, ticks: i32, speed: f64) -> Result<()> {
        self.arm.seek(ticks, speed)
    }

    pub fn arm_position(&mut self) -> Result<i32> {
        self.arm.position()
    }

    pub fn is_arm_busy(&mut self) -> Result<bool> {
        self.arm.is_busy()
    }

    // ==== extension ==========================================================

    pub fn set_extend_speed(&mut self, speed: f64) -> Result<()> {
        self.extend.set_velocity(speed)
    }

    pub fn set_extend_position(&mut self, ticks: i32, speed: f64) -> Result<()> {
        self.extend.seek(ticks, speed)
    }

    pub fn extend_position(&mut self) -> Result<i32> {
        self.extend.position()
    }

    // ==== collection gate ====================================================

    /// `true` opens a side, `false` closes it
    pub fn collect(&mut self, left: bool, right: bool) -> Result<()> {
        self.gate.set(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{SimRegistry, SimVision};
    use crate::hardware::HardwareError;
    use super::vision::GoldPosition;

    fn robot() -> (Robot, SimRegistry) {
        let mut hw = SimRegistry::with_standard_devices();
        let backend = SimVision::new().with_sample(MineralSample {
            gold: GoldPosition::Left,
            confidence: 0.9,
        });
        let robot = Robot::new(&mut hw, Box::new(backend)).unwrap();
        (robot, hw)
    }

    #[test]
    fn missing_device_is_a_fatal_acquisition_error() {
        let mut hw = SimRegistry::with_standard_devices();
        let mut partial = SimRegistry::default();
        partial.add_motor(config::FRONT_LEFT);
        drop(hw.motor(config::LIFT).unwrap()); // sanity: full registry has it

        let err = Robot::new(&mut partial, Box::new(SimVision::new())).unwrap_err();
        assert!(matches!(err, HardwareError::MissingDevice { .. }));
    }

    #[test]
    fn lift_fraction_is_clamped_before_tick_conversion() {
        let (mut robot, hw) = robot();
        let lift = hw.motor_state(config::LIFT).unwrap();

        robot.set_lift_position(-0.5, 0.3).unwrap();
        let low = lift.lock().unwrap().target;
        robot.set_lift_position(0.0, 0.3).unwrap();
        assert_eq!(low, lift.lock().unwrap().target);
        assert_eq!(low, 0);

        robot.set_lift_position(1.5, 0.3).unwrap();
        assert_eq!(lift.lock().unwrap().target, config::MAX_LIFT_TICKS);
    }

    #[test]
    fn lift_readout_is_whole_travel_division() {
        let (mut robot, hw) = robot();
        let lift = hw.motor_state(config::LIFT).unwrap();
        lift.lock().unwrap().position = config::MAX_LIFT_TICKS - 1;
        assert_eq!(robot.lift_position().unwrap(), 0);
        lift.lock().unwrap().position = config::MAX_LIFT_TICKS;
        assert_eq!(robot.lift_position().unwrap(), 1);
    }

    #[test]
    fn arm_positions_are_raw_ticks() {
        let (mut robot, hw) = robot();
        let arm = hw.motor_state(config::ARM).unwrap();
        robot.set_arm_position(740, 0.6).unwrap();
        assert_eq!(arm.lock().unwrap().target, 740);
        arm.lock().unwrap().finish_move();
        assert_eq!(robot.arm_position().unwrap(), 740);
        assert!(!robot.is_arm_busy().unwrap());
    }

    #[test]
    fn stop_all_motors_silences_everything() {
        let (mut robot, hw) = robot();
        robot.set_drive_input(0.3, -0.2, 0.1).unwrap();
        robot.set_lift_speed(0.5).unwrap();
        robot.set_arm_speed(0.4).unwrap();
        robot.set_extend_speed(0.2).unwrap();
        robot.set_vision_enabled(true).unwrap();

        robot.stop_all_motors().unwrap();

        assert_eq!(robot.drive_input(), DriveInput::default());
        for name in [config::FRONT_LEFT, config::BACK_RIGHT] {
            assert_eq!(hw.motor_state(name).unwrap().lock().unwrap().power, 0.0);
        }
        for name in [config::LIFT, config::ARM, config::EXTEND] {
            assert_eq!(hw.motor_state(name).unwrap().lock().unwrap().power, 0.0);
        }
        assert!(robot.mineral_sample().is_none());
    }

    #[test]
    fn stop_does_not_change_actuator_modes() {
        let (mut robot, hw) = robot();
        robot.set_lift_position(0.5, 0.3).unwrap();
        robot.stop_all_motors().unwrap();
        // The lift motor is still in position mode, just unpowered
        let lift = hw.motor_state(config::LIFT).unwrap();
        assert_eq!(
            lift.lock().unwrap().run_mode,
            crate::hardware::RunMode::Position
        );
    }

    #[test]
    fn readiness_follows_imu_calibration() {
        let (mut robot, hw) = robot();
        let imu = hw.imu_state(config::IMU).unwrap();
        assert!(robot.is_ready());
        imu.lock().unwrap().calibrated = false;
        assert!(!robot.is_ready());
    }

    #[test]
    fn vision_queries_through_the_facade() {
        let (mut robot, _hw) = robot();
        assert!(robot.mineral_sample().is_none());
        robot.set_vision_enabled(true).unwrap();
        assert_eq!(robot.mineral_sample().unwrap().gold, GoldPosition::Left);
        robot.use_side_camera().unwrap();
        robot.set_vision_enabled(false).unwrap();
        assert!(robot.mineral_sample().is_none());
    }

    #[test]
    fn axis_updates_preserve_the_other_axes() {
        let (mut robot, _hw) = robot();
        robot.set_drive_input(0.0, 0.0, 0.4).unwrap();
        robot.set_drive_input_x(0.7).unwrap();
        robot.set_drive_input_y(-0.1).unwrap();
        assert_eq!(
            robot.drive_input(),
            DriveInput {
                x: 0.7,
                y: -0.1,
                z: 0.4
            }
        );
    }

    #[test]
    fn relative_moves_report_busy_until_wheels_arrive() {
        let (mut robot, hw) = robot();
        robot.move_forward(12.0, 0.5).unwrap();
        assert!(robot.is_drive_busy().unwrap());

        for name in [
            config::FRONT_LEFT,
            config::FRONT_RIGHT,
            config::BACK_LEFT,
            config::BACK_RIGHT,
        ] {
            hw.motor_state(name).unwrap().lock().unwrap().finish_move();
        }
        assert!(!robot.is_drive_busy().unwrap());
    }

    #[test]
    fn gate_mapping_through_the_facade() {
        let (mut robot, hw) = robot();
        let left = hw.servo_state(config::GATE_LEFT).unwrap();
        let right = hw.servo_state(config::GATE_RIGHT).unwrap();

        robot.collect(true, false).unwrap();
        assert_eq!(left.lock().unwrap().fraction, config::GATE_SCALE_MAX);
        assert_eq!(right.lock().unwrap().fraction, config::GATE_SCALE_MAX);

        robot.collect(false, false).unwrap();
        assert_eq!(left.lock().unwrap().fraction, config::GATE_SCALE_MIN);
        assert_eq!(right.lock().unwrap().fraction, config::GATE_SCALE_MAX);
    }
}
