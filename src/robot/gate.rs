// Two-servo collection gate
//
// Each servo gets its polarity and output range at acquisition and is
// never re-scaled afterwards. The gate itself is a two-bit present-state
// transform: open = logical 0, closed = logical 1.

use crate::hardware::{Direction, Result, Servo};

/// Servo handle with fixed direction and [min, max] output scaling
/// mapped from a logical [0, 1] input
pub struct ScaledServo {
    servo: Box<dyn Servo>,
    direction: Direction,
    min: f64,
    max: f64,
}

impl ScaledServo {
    pub fn new(servo: Box<dyn Servo>, direction: Direction, min: f64, max: f64) -> Self {
        Self {
            servo,
            direction,
            min,
            max,
        }
    }

    pub fn set(&mut self, logical: f64) -> Result<()> {
        let logical = logical.clamp(0.0, 1.0);
        let logical = match self.direction {
            Direction::Forward => logical,
            Direction::Reverse => 1.0 - logical,
        };
        self.servo.set_fraction(self.min + logical * (self.max - self.min))
    }
}

pub struct CollectorGate {
    left: ScaledServo,
    right: ScaledServo,
}

impl CollectorGate {
    pub fn new(left: ScaledServo, right: ScaledServo) -> Self {
        Self { left, right }
    }

    /// `true` opens a side, `false` closes it. The closed position is
    /// logical 1 by design of the scaled range.
    pub fn set(&mut self, left_open: bool, right_open: bool) -> Result<()> {
        self.left.set(if left_open { 0.0 } else { 1.0 })?;
        self.right.set(if right_open { 0.0 } else { 1.0 })
    }
}
