// Timeouts, topics, device names, mechanism geometry
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "rover/cmd/drive"; // drive commands
pub const TOPIC_CMD_GATE: &str = "rover/cmd/gate"; // collector gate commands
pub const TOPIC_CMD_LIFT: &str = "rover/cmd/lift"; // lift commands
pub const TOPIC_TELEMETRY: &str = "rover/rt/telemetry"; // heading + busy flags
pub const TOPIC_HEALTH: &str = "rover/state/health"; // health status

// Default serial port for the motor/servo bus
pub const BUS_PORT: &str = "/dev/ttyACM0";

// Device names as they appear in the hardware registry
pub const FRONT_LEFT: &str = "front_left";
pub const FRONT_RIGHT: &str = "front_right";
pub const BACK_LEFT: &str = "back_left";
pub const BACK_RIGHT: &str = "back_right";
pub const LIFT: &str = "lift";
pub const ARM: &str = "arm";
pub const EXTEND: &str = "extend";
pub const GATE_LEFT: &str = "gate_left";
pub const GATE_RIGHT: &str = "gate_right";
pub const IMU: &str = "imu";

// Device name -> bus id for the serial registry
pub const BUS_MOTOR_IDS: [(&str, u8); 7] = [
    (FRONT_LEFT, 1),
    (FRONT_RIGHT, 2),
    (BACK_LEFT, 3),
    (BACK_RIGHT, 4),
    (LIFT, 5),
    (ARM, 6),
    (EXTEND, 7),
];
pub const BUS_SERVO_IDS: [(&str, u8); 2] = [(GATE_LEFT, 10), (GATE_RIGHT, 11)];

// Lift travel, in encoder ticks, from fully lowered to fully raised
pub const MAX_LIFT_TICKS: i32 = 3100;

// Collector gate servos only ever use the bottom 3/4 of their travel
pub const GATE_SCALE_MIN: f64 = 0.0;
pub const GATE_SCALE_MAX: f64 = 0.75;

// Vision tracker configuration: camera names and mounting offsets
// relative to the robot center (license key is set per deployment)
pub const VISION_KEY: &str = "";
pub const POSITION_CAMERA: &str = "position_camera";
pub const MINERAL_CAMERA: &str = "mineral_camera";
pub const CAM_FORWARD_OFFSET_IN: f32 = -8.0;
pub const CAM_LEFT_OFFSET_MM: f32 = 0.0;
pub const CAM_VERTICAL_OFFSET_IN: f32 = 5.5;
pub const CAM_ROTATIONAL_OFFSET_DEG: f32 = 0.0;
