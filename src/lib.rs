// Hardware facade and Zenoh runtime for a mecanum-drive collector rover
//
// The `robot` module is the single API surface over the drivetrain, lift,
// collector arm, extension, gate servos, IMU, and the optional vision
// tracker; `hardware` holds the device traits plus the serial-bus and
// simulated backends; `runtime` wraps the facade in a 50 Hz command loop.

pub mod config;
pub mod hardware;
pub mod messages;
pub mod robot;
pub mod runtime;

pub use robot::Robot;
