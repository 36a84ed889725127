// Serial smart-servo bus backend
//
// Half-duplex protocol in the Dynamixel 1.0 family:
// Packet format: [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
//
// All drive/mechanism motors and the gate servos live on one bus; the
// registry maps configured device names to bus ids.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use super::{
    Direction, HardwareError, HardwareRegistry, Motor, OrientationSensor, Result, RunMode, Servo,
};
use crate::config;

/// Default serial configuration for the device bus
pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Encoder resolution: one full output turn
const TICKS_PER_TURN: i32 = 4096;

/// Raw speed command corresponding to full power
const FULL_POWER_RAW: f64 = 3000.0;

/// Instruction set
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// Register addresses (RAM area)
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    OperatingMode = 33,   // 1 byte: 0=position, 1=velocity, 2=open-loop PWM
    TorqueEnable = 40,    // 1 byte: 0=off, 1=on
    GoalPosition = 42,    // 2 bytes
    GoalSpeed = 46,       // 2 bytes (sign-magnitude)
    PresentPosition = 56, // 2 bytes, read-only
    Moving = 66,          // 1 byte, read-only: 1 while seeking a goal position
}

/// Device bus - owns the serial port and speaks the packet protocol
pub struct DeviceBus {
    port: Box<dyn SerialPort>,
}

impl DeviceBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    /// Complement checksum over everything after the header
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    fn build_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8; // instruction + params + checksum
        let mut packet = Vec::with_capacity(6 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(id);
        packet.push(length);
        packet.push(instruction as u8);
        packet.extend_from_slice(params);
        let checksum = Self::checksum(&packet[2..]);
        packet.push(checksum);

        packet
    }

    /// Send one instruction and return the response parameters
    fn transact(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<Vec<u8>> {
        let packet = Self::build_packet(id, instruction, params);
        self.port.write_all(&packet)?;
        self.port.flush()?;
        self.read_response(id)
    }

    fn read_response(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                HardwareError::Timeout { id: expected_id }
            } else {
                HardwareError::Io(e)
            }
        })?;

        if header != HEADER {
            return Err(HardwareError::InvalidResponse {
                id: expected_id,
                reason: format!("invalid header: {:02X?}", header),
            });
        }

        let mut id_length = [0u8; 2];
        self.port.read_exact(&mut id_length)?;
        let [id, length] = id_length;

        if id != expected_id {
            return Err(HardwareError::InvalidResponse {
                id: expected_id,
                reason: format!("id mismatch: expected {}, got {}", expected_id, id),
            });
        }

        // error byte + params + checksum
        let mut body = vec![0u8; length as usize];
        self.port.read_exact(&mut body)?;

        let mut checked = vec![id, length];
        checked.extend_from_slice(&body[..body.len() - 1]);
        if Self::checksum(&checked) != body[body.len() - 1] {
            return Err(HardwareError::ChecksumMismatch { id });
        }

        let status = body[0];
        if status != 0 {
            return Err(HardwareError::DeviceFault { id, status });
        }

        Ok(body[1..body.len() - 1].to_vec())
    }

    /// Check whether a device answers on the bus
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        match self.transact(id, Instruction::Ping, &[]) {
            Ok(_) => Ok(true),
            Err(HardwareError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        debug!("write u8 to {}: reg={:?}, value={}", id, register, value);
        self.transact(id, Instruction::Write, &[register as u8, value])?;
        Ok(())
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        debug!("write u16 to {}: reg={:?}, value={}", id, register, value);
        let params = [register as u8, (value & 0xFF) as u8, (value >> 8) as u8];
        self.transact(id, Instruction::Write, &params)?;
        Ok(())
    }

    /// Write a signed value in the bus's sign-magnitude encoding
    pub fn write_i16(&mut self, id: u8, register: Register, value: i16) -> Result<()> {
        self.write_u16(id, register, encode_sign_magnitude(value))
    }

    pub fn read_u8(&mut self, id: u8, register: Register) -> Result<u8> {
        let response = self.transact(id, Instruction::Read, &[register as u8, 1])?;
        response
            .first()
            .copied()
            .ok_or_else(|| HardwareError::InvalidResponse {
                id,
                reason: "empty response".to_string(),
            })
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        let response = self.transact(id, Instruction::Read, &[register as u8, 2])?;
        if response.len() < 2 {
            return Err(HardwareError::InvalidResponse {
                id,
                reason: format!("expected 2 bytes, got {}", response.len()),
            });
        }
        Ok(u16::from_le_bytes([response[0], response[1]]))
    }
}

/// Sign-magnitude encoding: bit 15 = sign, bits 0-14 = magnitude
fn encode_sign_magnitude(value: i16) -> u16 {
    if value >= 0 {
        value as u16
    } else {
        0x8000 | (-(value as i32) as u16)
    }
}

fn run_mode_raw(mode: RunMode) -> u8 {
    match mode {
        RunMode::Position => 0,
        RunMode::Velocity => 1,
        RunMode::OpenLoop => 2,
    }
}

/// One motor on the shared bus
pub struct BusMotor {
    bus: Arc<Mutex<DeviceBus>>,
    id: u8,
    direction: Direction,
    brake: bool,
    mode: RunMode,
    encoder_offset: i32,
}

impl BusMotor {
    fn new(bus: Arc<Mutex<DeviceBus>>, id: u8) -> Self {
        Self {
            bus,
            id,
            direction: Direction::Forward,
            brake: false,
            mode: RunMode::Velocity,
            encoder_offset: 0,
        }
    }

    fn bus(&self) -> std::sync::MutexGuard<'_, DeviceBus> {
        // A poisoned mutex means a panic mid-transaction; the bus state is
        // unknowable either way, so keep going with the raw port.
        self.bus.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn raw_position(&mut self) -> Result<i32> {
        let raw = self.bus().read_u16(self.id, Register::PresentPosition)?;
        Ok(raw as i32)
    }
}

impl Motor for BusMotor {
    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.direction = direction;
        Ok(())
    }

    fn set_brake_on_zero(&mut self, brake: bool) -> Result<()> {
        self.brake = brake;
        Ok(())
    }

    fn set_run_mode(&mut self, mode: RunMode) -> Result<()> {
        let id = self.id;
        let mut bus = self.bus();
        // Torque must be off while the operating mode changes
        bus.write_u8(id, Register::TorqueEnable, 0)?;
        bus.write_u8(id, Register::OperatingMode, run_mode_raw(mode))?;
        bus.write_u8(id, Register::TorqueEnable, 1)?;
        drop(bus);
        self.mode = mode;
        Ok(())
    }

    fn set_power(&mut self, power: f64) -> Result<()> {
        let power = power.clamp(-1.0, 1.0);
        let raw = match self.mode {
            // Approach speed bound: magnitude only
            RunMode::Position => (power.abs() * FULL_POWER_RAW) as i16,
            _ => (power * FULL_POWER_RAW) as i16 * self.direction.sign() as i16,
        };
        let id = self.id;
        let mut bus = self.bus();
        bus.write_i16(id, Register::GoalSpeed, raw)?;
        if power == 0.0 && !self.brake {
            // Coast: release torque instead of actively holding
            bus.write_u8(id, Register::TorqueEnable, 0)?;
        }
        Ok(())
    }

    fn set_target(&mut self, ticks: i32) -> Result<()> {
        let raw = (self.encoder_offset + ticks * self.direction.sign()).clamp(0, u16::MAX as i32);
        self.bus().write_u16(self.id, Register::GoalPosition, raw as u16)
    }

    fn position(&mut self) -> Result<i32> {
        let raw = self.raw_position()?;
        Ok((raw - self.encoder_offset) * self.direction.sign())
    }

    fn is_moving(&mut self) -> Result<bool> {
        Ok(self.bus().read_u8(self.id, Register::Moving)? != 0)
    }

    fn reset_encoder(&mut self) -> Result<()> {
        self.encoder_offset = self.raw_position()?;
        Ok(())
    }
}

/// One gate servo on the shared bus, commanded as a fraction of a turn
pub struct BusServo {
    bus: Arc<Mutex<DeviceBus>>,
    id: u8,
}

impl Servo for BusServo {
    fn set_fraction(&mut self, fraction: f64) -> Result<()> {
        let ticks = (fraction.clamp(0.0, 1.0) * (TICKS_PER_TURN - 1) as f64) as u16;
        let mut bus = self.bus.lock().unwrap_or_else(|e| e.into_inner());
        bus.write_u16(self.id, Register::GoalPosition, ticks)
    }
}

/// Registry backed by the serial bus
///
/// Motors and servos resolve to bus ids from `config`; the orientation
/// sensor lives off-bus and is supplied by its own driver at construction.
pub struct SerialRegistry {
    bus: Arc<Mutex<DeviceBus>>,
    motors: HashMap<String, u8>,
    servos: HashMap<String, u8>,
    imu: Option<Box<dyn OrientationSensor>>,
}

impl SerialRegistry {
    pub fn new(bus: DeviceBus, imu: Box<dyn OrientationSensor>) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
            motors: config::BUS_MOTOR_IDS
                .iter()
                .map(|&(name, id)| (name.to_string(), id))
                .collect(),
            servos: config::BUS_SERVO_IDS
                .iter()
                .map(|&(name, id)| (name.to_string(), id))
                .collect(),
            imu: Some(imu),
        }
    }

    fn resolve(map: &HashMap<String, u8>, name: &str) -> Result<u8> {
        map.get(name)
            .copied()
            .ok_or_else(|| HardwareError::MissingDevice {
                name: name.to_string(),
            })
    }

    fn check_present(&self, id: u8, name: &str) -> Result<()> {
        let mut bus = self.bus.lock().unwrap_or_else(|e| e.into_inner());
        match bus.ping(id)? {
            true => Ok(()),
            false => Err(HardwareError::MissingDevice {
                name: name.to_string(),
            }),
        }
    }
}

impl HardwareRegistry for SerialRegistry {
    fn motor(&mut self, name: &str) -> Result<Box<dyn Motor>> {
        let id = Self::resolve(&self.motors, name)?;
        self.check_present(id, name)?;
        debug!("acquired motor {:?} (bus id {})", name, id);
        Ok(Box::new(BusMotor::new(self.bus.clone(), id)))
    }

    fn servo(&mut self, name: &str) -> Result<Box<dyn Servo>> {
        let id = Self::resolve(&self.servos, name)?;
        self.check_present(id, name)?;
        {
            let mut bus = self.bus.lock().unwrap_or_else(|e| e.into_inner());
            bus.write_u8(id, Register::OperatingMode, run_mode_raw(RunMode::Position))?;
            bus.write_u8(id, Register::TorqueEnable, 1)?;
        }
        debug!("acquired servo {:?} (bus id {})", name, id);
        Ok(Box::new(BusServo {
            bus: self.bus.clone(),
            id,
        }))
    }

    fn orientation_sensor(&mut self, name: &str) -> Result<Box<dyn OrientationSensor>> {
        if name != config::IMU {
            return Err(HardwareError::MissingDevice {
                name: name.to_string(),
            });
        }
        self.imu.take().ok_or_else(|| HardwareError::MissingDevice {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_complement_of_byte_sum() {
        // id=5, length=4, WRITE, addr=46, data
        let data = [5u8, 4, 0x03, 46, 0x10, 0x00];
        // ~(5+4+3+46+16) & 0xFF
        assert_eq!(DeviceBus::checksum(&data), !(74u8));
    }

    #[test]
    fn ping_packet_layout() {
        let packet = DeviceBus::build_packet(7, Instruction::Ping, &[]);
        assert_eq!(packet.len(), 6);
        assert_eq!(&packet[..2], &HEADER);
        assert_eq!(packet[2], 7); // id
        assert_eq!(packet[3], 2); // instruction + checksum
        assert_eq!(packet[4], 0x01);
        assert_eq!(packet[5], DeviceBus::checksum(&packet[2..5]));
    }

    #[test]
    fn sign_magnitude_encoding() {
        assert_eq!(encode_sign_magnitude(0), 0);
        assert_eq!(encode_sign_magnitude(1500), 1500);
        assert_eq!(encode_sign_magnitude(-1500), 0x8000 | 1500);
        assert_eq!(encode_sign_magnitude(i16::MIN), 0x8000 | 0x8000u16);
    }

    #[test]
    fn run_mode_register_values() {
        assert_eq!(run_mode_raw(RunMode::Position), 0);
        assert_eq!(run_mode_raw(RunMode::Velocity), 1);
        assert_eq!(run_mode_raw(RunMode::OpenLoop), 2);
    }
}
