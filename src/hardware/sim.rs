// In-memory simulated devices
//
// Backs the `--sim` runtime flag and the facade tests. Every handle
// shares its state through an Arc so tests can inspect what the facade
// commanded after handing the boxed device over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    Direction, HardwareError, HardwareRegistry, Motor, OrientationSensor, Result, RunMode, Servo,
};
use crate::config;
use crate::robot::vision::{
    CameraView, FieldPosition, MineralSample, VisionBackend, VisionConfig, VisionSession,
};

#[derive(Debug, Default)]
pub struct MotorState {
    pub direction: Direction,
    pub brake: bool,
    pub run_mode: RunMode,
    pub power: f64,
    pub target: i32,
    pub position: i32,
    pub moving: bool,
}

impl MotorState {
    /// Teleport the encoder to the current target and settle
    pub fn finish_move(&mut self) {
        self.position = self.target;
        self.moving = false;
    }
}

pub type SharedMotor = Arc<Mutex<MotorState>>;

pub struct SimMotor(SharedMotor);

impl SimMotor {
    pub fn new(state: SharedMotor) -> Self {
        Self(state)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MotorState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Motor for SimMotor {
    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.state().direction = direction;
        Ok(())
    }

    fn set_brake_on_zero(&mut self, brake: bool) -> Result<()> {
        self.state().brake = brake;
        Ok(())
    }

    fn set_run_mode(&mut self, mode: RunMode) -> Result<()> {
        let mut s = self.state();
        s.run_mode = mode;
        s.moving = false;
        Ok(())
    }

    fn set_power(&mut self, power: f64) -> Result<()> {
        self.state().power = power.clamp(-1.0, 1.0);
        Ok(())
    }

    fn set_target(&mut self, ticks: i32) -> Result<()> {
        let mut s = self.state();
        s.target = ticks;
        s.moving = s.position != ticks;
        Ok(())
    }

    fn position(&mut self) -> Result<i32> {
        Ok(self.state().position)
    }

    fn is_moving(&mut self) -> Result<bool> {
        let s = self.state();
        Ok(s.moving && s.run_mode == RunMode::Position)
    }

    fn reset_encoder(&mut self) -> Result<()> {
        self.state().position = 0;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ServoState {
    pub fraction: f64,
}

pub struct SimServo(Arc<Mutex<ServoState>>);

impl SimServo {
    pub fn new(state: Arc<Mutex<ServoState>>) -> Self {
        Self(state)
    }
}

impl Servo for SimServo {
    fn set_fraction(&mut self, fraction: f64) -> Result<()> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).fraction = fraction.clamp(0.0, 1.0);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ImuState {
    pub heading: f32,
    pub calibrated: bool,
}

impl Default for ImuState {
    fn default() -> Self {
        Self {
            heading: 0.0,
            calibrated: true,
        }
    }
}

pub struct SimImu(Arc<Mutex<ImuState>>);

impl SimImu {
    pub fn new(state: Arc<Mutex<ImuState>>) -> Self {
        Self(state)
    }
}

impl OrientationSensor for SimImu {
    fn heading_degrees(&mut self) -> Result<f32> {
        Ok(self.0.lock().unwrap_or_else(|e| e.into_inner()).heading)
    }

    fn is_calibrated(&mut self) -> Result<bool> {
        Ok(self.0.lock().unwrap_or_else(|e| e.into_inner()).calibrated)
    }
}

/// Simulated hardware registry
#[derive(Default)]
pub struct SimRegistry {
    motors: HashMap<String, SharedMotor>,
    servos: HashMap<String, Arc<Mutex<ServoState>>>,
    imus: HashMap<String, Arc<Mutex<ImuState>>>,
}

impl SimRegistry {
    /// Registry pre-populated with every device the facade acquires
    pub fn with_standard_devices() -> Self {
        let mut registry = Self::default();
        for name in [
            config::FRONT_LEFT,
            config::FRONT_RIGHT,
            config::BACK_LEFT,
            config::BACK_RIGHT,
            config::LIFT,
            config::ARM,
            config::EXTEND,
        ] {
            registry.add_motor(name);
        }
        registry.add_servo(config::GATE_LEFT);
        registry.add_servo(config::GATE_RIGHT);
        registry.add_imu(config::IMU);
        registry
    }

    pub fn add_motor(&mut self, name: &str) -> SharedMotor {
        let state = SharedMotor::default();
        self.motors.insert(name.to_string(), state.clone());
        state
    }

    pub fn add_servo(&mut self, name: &str) -> Arc<Mutex<ServoState>> {
        let state = Arc::new(Mutex::new(ServoState::default()));
        self.servos.insert(name.to_string(), state.clone());
        state
    }

    pub fn add_imu(&mut self, name: &str) -> Arc<Mutex<ImuState>> {
        let state = Arc::new(Mutex::new(ImuState::default()));
        self.imus.insert(name.to_string(), state.clone());
        state
    }

    /// Peek at a motor's simulated state (None if never registered)
    pub fn motor_state(&self, name: &str) -> Option<SharedMotor> {
        self.motors.get(name).cloned()
    }

    pub fn servo_state(&self, name: &str) -> Option<Arc<Mutex<ServoState>>> {
        self.servos.get(name).cloned()
    }

    pub fn imu_state(&self, name: &str) -> Option<Arc<Mutex<ImuState>>> {
        self.imus.get(name).cloned()
    }

    fn missing(name: &str) -> HardwareError {
        HardwareError::MissingDevice {
            name: name.to_string(),
        }
    }
}

impl HardwareRegistry for SimRegistry {
    fn motor(&mut self, name: &str) -> Result<Box<dyn Motor>> {
        let state = self.motors.get(name).ok_or_else(|| Self::missing(name))?;
        Ok(Box::new(SimMotor(state.clone())))
    }

    fn servo(&mut self, name: &str) -> Result<Box<dyn Servo>> {
        let state = self.servos.get(name).ok_or_else(|| Self::missing(name))?;
        Ok(Box::new(SimServo(state.clone())))
    }

    fn orientation_sensor(&mut self, name: &str) -> Result<Box<dyn OrientationSensor>> {
        let state = self.imus.get(name).ok_or_else(|| Self::missing(name))?;
        Ok(Box::new(SimImu(state.clone())))
    }
}

#[derive(Debug, Default)]
pub struct VisionStats {
    pub started: usize,
    pub stopped: usize,
}

/// Simulated vision backend with canned answers and session counters
pub struct SimVision {
    position: Option<FieldPosition>,
    sample: Option<MineralSample>,
    stats: Arc<Mutex<VisionStats>>,
}

impl SimVision {
    pub fn new() -> Self {
        Self {
            position: None,
            sample: None,
            stats: Arc::new(Mutex::new(VisionStats::default())),
        }
    }

    pub fn with_position(mut self, position: FieldPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_sample(mut self, sample: MineralSample) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn stats(&self) -> Arc<Mutex<VisionStats>> {
        self.stats.clone()
    }
}

impl Default for SimVision {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionBackend for SimVision {
    fn start(&mut self, _config: &VisionConfig) -> Result<Box<dyn VisionSession>> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).started += 1;
        Ok(Box::new(SimSession {
            position: self.position,
            sample: self.sample,
            stats: self.stats.clone(),
            stopped: false,
        }))
    }
}

struct SimSession {
    position: Option<FieldPosition>,
    sample: Option<MineralSample>,
    stats: Arc<Mutex<VisionStats>>,
    stopped: bool,
}

impl VisionSession for SimSession {
    fn select_camera(&mut self, _view: CameraView) -> Result<()> {
        Ok(())
    }

    fn field_position(&mut self) -> Option<FieldPosition> {
        self.position
    }

    fn try_sample(&mut self) -> Option<MineralSample> {
        self.sample
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stats.lock().unwrap_or_else(|e| e.into_inner()).stopped += 1;
        }
    }
}
