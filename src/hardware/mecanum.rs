// Four-wheel mecanum mixer
//
// Converts the 3-axis drive intent into per-wheel power and tracks
// relative straight-line moves via per-wheel encoder targets. Wheel
// polarity is configured on the handles before they arrive here, so
// "forward" is positive for every wheel.

use tracing::debug;

use super::{Motor, Result, RunMode};
use crate::robot::drive::{DriveInput, DriveMixer};

/// Drive motor encoder resolution (ticks per output revolution)
const TICKS_PER_REV: f64 = 1120.0;
/// Mecanum wheel diameter in inches
const WHEEL_DIAMETER_IN: f64 = 4.0;
const TICKS_PER_INCH: f64 = TICKS_PER_REV / (WHEEL_DIAMETER_IN * std::f64::consts::PI);

/// Wheel order: front-left, front-right, back-left, back-right
pub struct MecanumDrive {
    wheels: [Box<dyn Motor>; 4],
    seeking: bool,
}

impl MecanumDrive {
    pub fn new(mut wheels: [Box<dyn Motor>; 4]) -> Result<Self> {
        for wheel in &mut wheels {
            wheel.set_run_mode(RunMode::Velocity)?;
        }
        Ok(Self {
            wheels,
            seeking: false,
        })
    }

    fn enter_velocity(&mut self) -> Result<()> {
        if self.seeking {
            for wheel in &mut self.wheels {
                wheel.set_run_mode(RunMode::Velocity)?;
            }
            self.seeking = false;
        }
        Ok(())
    }
}

impl DriveMixer for MecanumDrive {
    fn set_input(&mut self, input: DriveInput) -> Result<()> {
        self.enter_velocity()?;

        let DriveInput { x, y, z } = input;
        let powers = [y + x + z, y - x - z, y - x + z, y + x - z];

        // Preserve the mix ratio when any wheel would exceed full power
        let peak = powers.iter().fold(1.0_f64, |m, p| m.max(p.abs()));
        for (wheel, power) in self.wheels.iter_mut().zip(powers) {
            wheel.set_power(power / peak)?;
        }
        Ok(())
    }

    fn set_forward_target(&mut self, inches: f64, speed: f64) -> Result<()> {
        let ticks = (inches * TICKS_PER_INCH).round() as i32;
        debug!("relative move: {:.1} in ({} ticks) at {:.2}", inches, ticks, speed);

        for wheel in &mut self.wheels {
            let target = wheel.position()? + ticks;
            wheel.set_run_mode(RunMode::Position)?;
            wheel.set_target(target)?;
            wheel.set_power(speed.clamp(0.0, 1.0))?;
        }
        self.seeking = true;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool> {
        if !self.seeking {
            return Ok(false);
        }
        for wheel in &mut self.wheels {
            if wheel.is_moving()? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
