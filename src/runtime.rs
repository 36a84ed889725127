// 50 Hz control loop with watchdog
//
// The facade itself never retries or times out; this loop is the
// cyclical re-invocation the error model leans on. If teleop stops
// sending drive commands the watchdog zeroes the drive vector.

use std::time::Instant;

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{
    CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_DRIVE, TOPIC_CMD_GATE, TOPIC_CMD_LIFT, TOPIC_HEALTH,
    TOPIC_TELEMETRY,
};
use crate::hardware::sim::SimVision;
use crate::hardware::{DeviceBus, SerialRegistry, SimRegistry};
use crate::messages::{DriveCommand, GateCommand, LiftCommand, RuntimeHealth, Telemetry};
use crate::robot::drive::DriveInput;
use crate::robot::Robot;

/// How the runtime reaches hardware
pub enum Backend {
    /// Serial device bus on the given port
    Serial { port: String },
    /// In-memory simulated devices
    Sim,
}

pub struct Runtime {
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    pub health: RuntimeHealth,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Record an incoming drive command
    pub fn on_command(&mut self, cmd: DriveCommand) {
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Drive vector for this tick, applying the watchdog
    pub fn compute_drive(&mut self) -> DriveInput {
        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > CMD_TIMEOUT {
            if self.health != RuntimeHealth::CmdStale {
                warn!("drive command stale ({:?} old), zeroing drive", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            DriveInput::default()
        } else if let Some(ref cmd) = self.latest_cmd {
            self.health = RuntimeHealth::Ok;
            DriveInput::from(cmd)
        } else {
            self.health = RuntimeHealth::CmdStale;
            DriveInput::default()
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

fn build_robot(backend: Backend) -> Result<Robot, Box<dyn std::error::Error + Send + Sync>> {
    match backend {
        Backend::Serial { port } => {
            info!("opening device bus on {}", port);
            let bus = DeviceBus::open(&port)?;
            // IMU driver wiring is deployment-specific; run with the
            // simulated sensor until the real driver is plugged in here
            let imu = crate::hardware::sim::SimImu::new(Default::default());
            let mut hw = SerialRegistry::new(bus, Box::new(imu));
            Ok(Robot::new(&mut hw, Box::new(SimVision::new()))?)
        }
        Backend::Sim => {
            info!("using simulated hardware");
            let mut hw = SimRegistry::with_standard_devices();
            Ok(Robot::new(&mut hw, Box::new(SimVision::new()))?)
        }
    }
}

pub async fn run(backend: Backend) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut robot = build_robot(backend)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_drive = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let sub_gate = session.declare_subscriber(TOPIC_CMD_GATE).await?;
    let sub_lift = session.declare_subscriber(TOPIC_CMD_LIFT).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_TELEMETRY).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new();
    let mut tick = interval(std::time::Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!(
        "Subscribed to: {}, {}, {}",
        TOPIC_CMD_DRIVE, TOPIC_CMD_GATE, TOPIC_CMD_LIFT
    );
    info!("Publishing to: {}, {}", TOPIC_TELEMETRY, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain pending drive commands (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_drive.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse drive command: {}", e),
            }
        }

        // 2. Gate and lift intents apply immediately; a bad hardware write
        // is dropped and the next cycle's command retries naturally
        while let Ok(Some(sample)) = sub_gate.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<GateCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = robot.collect(cmd.left, cmd.right) {
                        warn!("gate command failed: {}", e);
                    }
                }
                Err(e) => warn!("Failed to parse gate command: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_lift.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<LiftCommand>(&payload) {
                Ok(cmd) => {
                    if let Err(e) = robot.set_lift_position(cmd.position, cmd.speed) {
                        warn!("lift command failed: {}", e);
                    }
                }
                Err(e) => warn!("Failed to parse lift command: {}", e),
            }
        }

        // 3. Apply the drive vector (includes watchdog logic)
        let drive = runtime.compute_drive();
        if let Err(e) = robot.set_drive_input(drive.x, drive.y, drive.z) {
            warn!("drive update failed: {}", e);
        }

        // 4. Publish telemetry and health
        let telemetry = Telemetry {
            ready: robot.is_ready(),
            heading_deg: robot.heading_signed().unwrap_or(0.0),
            drive_busy: robot.is_drive_busy().unwrap_or(false),
            lift_busy: robot.is_lift_busy().unwrap_or(false),
            arm_busy: robot.is_arm_busy().unwrap_or(false),
        };
        pub_telemetry.put(serde_json::to_string(&telemetry)?).await?;
        pub_health.put(serde_json::to_string(&runtime.health)?).await?;
    }
}
