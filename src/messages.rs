// Message types for the runtime's Zenoh surface

use serde::{Deserialize, Serialize};

use crate::robot::drive::DriveInput;

/// Drive intent from teleop/scripts -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct DriveCommand {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<&DriveCommand> for DriveInput {
    fn from(cmd: &DriveCommand) -> Self {
        Self {
            x: cmd.x,
            y: cmd.y,
            z: cmd.z,
        }
    }
}

/// Collector gate intent: `true` opens a side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GateCommand {
    pub left: bool,
    pub right: bool,
}

/// Lift intent: normalized height in [0, 1] plus approach speed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiftCommand {
    pub position: f64,
    pub speed: f64,
}

/// Health status published by the runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}

/// Per-tick state snapshot published for dashboards and scripts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Telemetry {
    pub ready: bool,
    pub heading_deg: f32,
    pub drive_busy: bool,
    pub lift_busy: bool,
    pub arm_busy: bool,
}
