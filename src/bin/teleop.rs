// Keyboard teleop: WASD move, Z/X rotate, E/C gate open/close, R/F speed, Q quit
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::info;

use rover_zenoh_runtime::config::{TOPIC_CMD_DRIVE, TOPIC_CMD_GATE};
use rover_zenoh_runtime::messages::GateCommand;

const SPEEDS: [f64; 3] = [0.2, 0.5, 1.0];
const TURN_SPEEDS: [f64; 3] = [0.15, 0.4, 0.8];
const INPUT_TIMEOUT_MS: u64 = 100; // Reset the drive vector after this much time with no input

/// Keyboard teleop publisher
#[derive(Parser, Debug)]
struct Args {
    /// Publish rate in Hz
    #[arg(long, default_value_t = 50)]
    rate: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_drive = session.declare_publisher(TOPIC_CMD_DRIVE).await?;
    let pub_gate = session.declare_publisher(TOPIC_CMD_GATE).await?;

    info!("Controls: WASD=move, Z/X=rotate, E/C=gate, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&pub_drive, &pub_gate, args.rate).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    pub_drive: &zenoh::pubsub::Publisher<'_>,
    pub_gate: &zenoh::pubsub::Publisher<'_>,
    rate: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent drive state
    let mut x = 0.0;
    let mut y = 0.0;
    let mut z = 0.0;
    let mut gate = GateCommand::default();
    let mut last_movement_input = Instant::now();

    loop {
        if event::poll(Duration::from_millis(1000 / rate.max(1)))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update the vector and refresh the timestamp
                    KeyCode::Char('w') if pressed => {
                        y = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        y = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        x = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        x = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation
                    KeyCode::Char('z') if pressed => {
                        z = -TURN_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        z = TURN_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Gate
                    KeyCode::Char('e') if pressed => {
                        gate = GateCommand {
                            left: true,
                            right: true,
                        };
                        pub_gate.put(serde_json::to_string(&gate)?).await?;
                    }
                    KeyCode::Char('c') if pressed => {
                        gate = GateCommand::default();
                        pub_gate.put(serde_json::to_string(&gate)?).await?;
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset the drive vector if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x = 0.0;
            y = 0.0;
            z = 0.0;
        }

        let cmd = json!({ "x": x, "y": y, "z": z });
        pub_drive.put(cmd.to_string()).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
