// Hardware abstraction layer
//
// Provides:
// - Device traits the facade talks to (Motor, Servo, OrientationSensor)
// - String-keyed hardware registry for one-time device acquisition
// - Serial bus backend for smart motors/servos
// - Mecanum drive mixer
// - In-memory simulated devices for tests and `--sim`

pub mod bus;
pub mod mecanum;
pub mod sim;

pub use bus::{DeviceBus, SerialRegistry};
pub use mecanum::MecanumDrive;
pub use sim::{SimRegistry, SimVision};

/// Error types for hardware access
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("no device named {name:?} in the hardware registry")]
    MissingDevice { name: String },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from device {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("checksum mismatch for device {id}")]
    ChecksumMismatch { id: u8 },

    #[error("device {id} returned error status: 0x{status:02X}")]
    DeviceFault { id: u8, status: u8 },

    #[error("timeout waiting for response from device {id}")]
    Timeout { id: u8 },

    #[error("vision tracker error: {0}")]
    Vision(String),
}

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Rotation polarity applied at acquisition time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Sign factor for power and tick values
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Motor control modes
///
/// A motor is in exactly one mode at a time; switching is an explicit
/// call, never a side effect of a power or target command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Closed-loop velocity control using the encoder
    #[default]
    Velocity,
    /// Position-seeking toward the last commanded target
    Position,
    /// Open-loop power, encoder ignored
    OpenLoop,
}

/// A velocity- and position-capable motor
pub trait Motor: Send {
    /// Set rotation polarity (fixed per mechanism, applied once at acquisition)
    fn set_direction(&mut self, direction: Direction) -> Result<()>;

    /// Whether the motor actively brakes when commanded zero power
    fn set_brake_on_zero(&mut self, brake: bool) -> Result<()>;

    fn set_run_mode(&mut self, mode: RunMode) -> Result<()>;

    /// Power in [-1, 1]. In `Position` mode this bounds the approach speed
    /// and only the magnitude is meaningful.
    fn set_power(&mut self, power: f64) -> Result<()>;

    /// Absolute encoder tick target for `Position` mode
    fn set_target(&mut self, ticks: i32) -> Result<()>;

    /// Current encoder position in ticks
    fn position(&mut self) -> Result<i32>;

    /// True while a position-seeking move has not reached its target
    fn is_moving(&mut self) -> Result<bool>;

    /// Re-zero the encoder at the current position
    fn reset_encoder(&mut self) -> Result<()>;
}

/// A servo commanded by a raw fraction of its full travel
pub trait Servo: Send {
    fn set_fraction(&mut self, fraction: f64) -> Result<()>;
}

/// A fused orientation sensor (IMU)
pub trait OrientationSensor: Send {
    /// Fused yaw in signed degrees, nominally (-180, 180]
    fn heading_degrees(&mut self) -> Result<f32>;

    /// True once the sensor's internal fusion reports self-calibrated
    fn is_calibrated(&mut self) -> Result<bool>;
}

/// String-keyed device lookup
///
/// Each device is acquired exactly once at facade construction; a name
/// that is not present is a fatal acquisition error.
pub trait HardwareRegistry {
    fn motor(&mut self, name: &str) -> Result<Box<dyn Motor>>;
    fn servo(&mut self, name: &str) -> Result<Box<dyn Servo>>;
    fn orientation_sensor(&mut self, name: &str) -> Result<Box<dyn OrientationSensor>>;
}
