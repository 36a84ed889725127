// Single-motor control abstraction shared by the lift, arm, and extend
// mechanisms.
//
// The underlying motor is always in exactly one control mode; the mode is
// tracked here as a tagged value and only changes through the entry points
// below, never as a side effect of a power or target command.

use crate::hardware::{Motor, Result, RunMode};

/// Current control mode of an actuator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMode {
    /// Closed-loop velocity; power follows `set_velocity`
    Velocity,
    /// Open-loop power with no encoder feedback
    OpenLoop,
    /// Driving toward an absolute tick target at a bounded speed
    Seeking { target: i32, speed: f64 },
}

pub struct Actuator {
    motor: Box<dyn Motor>,
    mode: ControlMode,
}

impl Actuator {
    /// Wrap an already-configured motor. Hardware powers up open-loop.
    pub fn new(motor: Box<dyn Motor>) -> Self {
        Self {
            motor,
            mode: ControlMode::OpenLoop,
        }
    }

    /// Command continuous closed-loop velocity in [-1, 1], switching the
    /// motor into velocity mode first if it is not already there.
    pub fn set_velocity(&mut self, power: f64) -> Result<()> {
        if self.mode != ControlMode::Velocity {
            self.motor.set_run_mode(RunMode::Velocity)?;
            self.mode = ControlMode::Velocity;
        }
        self.motor.set_power(power.clamp(-1.0, 1.0))
    }

    /// Command raw open-loop power in [-1, 1], encoder ignored
    pub fn set_open_loop(&mut self, power: f64) -> Result<()> {
        if self.mode != ControlMode::OpenLoop {
            self.motor.set_run_mode(RunMode::OpenLoop)?;
            self.mode = ControlMode::OpenLoop;
        }
        self.motor.set_power(power.clamp(-1.0, 1.0))
    }

    /// Seek an absolute encoder target at an approach speed in [0, 1]
    pub fn seek(&mut self, target: i32, speed: f64) -> Result<()> {
        if !matches!(self.mode, ControlMode::Seeking { .. }) {
            self.motor.set_run_mode(RunMode::Position)?;
        }
        let speed = speed.clamp(0.0, 1.0);
        self.motor.set_target(target)?;
        self.motor.set_power(speed)?;
        self.mode = ControlMode::Seeking { target, speed };
        Ok(())
    }

    /// True while a seek has not reached its target; always false in the
    /// velocity and open-loop modes.
    pub fn is_busy(&mut self) -> Result<bool> {
        match self.mode {
            ControlMode::Seeking { .. } => self.motor.is_moving(),
            _ => Ok(false),
        }
    }

    /// Raw encoder ticks
    pub fn position(&mut self) -> Result<i32> {
        self.motor.position()
    }

    /// Zero the power without leaving the current mode
    pub fn stop(&mut self) -> Result<()> {
        self.motor.set_power(0.0)
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::sim::{MotorState, SimMotor};
    use std::sync::{Arc, Mutex};

    fn actuator() -> (Actuator, Arc<Mutex<MotorState>>) {
        let state = Arc::new(Mutex::new(MotorState::default()));
        (Actuator::new(Box::new(SimMotor::new(state.clone()))), state)
    }

    #[test]
    fn velocity_entry_switches_mode_once() {
        let (mut act, state) = actuator();
        act.set_velocity(0.5).unwrap();
        assert_eq!(act.mode(), ControlMode::Velocity);
        assert_eq!(state.lock().unwrap().run_mode, RunMode::Velocity);

        // Idempotent: a second call must not re-issue the mode switch
        state.lock().unwrap().run_mode = RunMode::OpenLoop; // sentinel
        act.set_velocity(-0.3).unwrap();
        assert_eq!(state.lock().unwrap().run_mode, RunMode::OpenLoop);
        assert_eq!(state.lock().unwrap().power, -0.3);
    }

    #[test]
    fn power_is_clamped() {
        let (mut act, state) = actuator();
        act.set_velocity(3.0).unwrap();
        assert_eq!(state.lock().unwrap().power, 1.0);
        act.set_velocity(-3.0).unwrap();
        assert_eq!(state.lock().unwrap().power, -1.0);
    }

    #[test]
    fn seek_records_target_and_bounded_speed() {
        let (mut act, state) = actuator();
        act.seek(1200, 2.0).unwrap();
        assert_eq!(
            act.mode(),
            ControlMode::Seeking {
                target: 1200,
                speed: 1.0
            }
        );
        let s = state.lock().unwrap();
        assert_eq!(s.run_mode, RunMode::Position);
        assert_eq!(s.target, 1200);
        assert_eq!(s.power, 1.0);
    }

    #[test]
    fn busy_only_while_seeking() {
        let (mut act, state) = actuator();
        assert!(!act.is_busy().unwrap());

        act.seek(500, 0.4).unwrap();
        assert!(act.is_busy().unwrap());

        state.lock().unwrap().finish_move();
        assert!(!act.is_busy().unwrap());

        // Velocity mode never reports busy, even if the motor spins
        act.set_velocity(1.0).unwrap();
        assert!(!act.is_busy().unwrap());
    }

    #[test]
    fn stop_zeroes_power_but_keeps_mode() {
        let (mut act, state) = actuator();
        act.seek(500, 0.4).unwrap();
        act.stop().unwrap();
        assert_eq!(state.lock().unwrap().power, 0.0);
        assert!(matches!(act.mode(), ControlMode::Seeking { .. }));
    }
}
