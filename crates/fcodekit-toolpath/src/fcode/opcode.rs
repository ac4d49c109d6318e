//! Opcode bytes and container tags
//!
//! All multi-byte payloads are little-endian.

/// V1 container magic
pub const MAGIC_V1: &[u8; 8] = b"FCx0001\n";
/// V2 container magic
pub const MAGIC_V2: &[u8; 8] = b"FCx0002\n";

/// Motion opcode; the low bits carry [`MotionFlags`](crate::gcode::MotionFlags)
pub const MOVE: u8 = 0x80;
pub const HOME: u8 = 1;
/// Dwell, followed by milliseconds as f32 (sleep) or u32 (dwell)
pub const SLEEP: u8 = 4;
pub const PAUSE_TO_STANDBY: u8 = 5;
pub const PAUSE_IN_PLACE: u8 = 6;
pub const LASER_MODULE: u8 = 7;
pub const CALIBRATE: u8 = 8;
/// Heater without wait; shares its byte with the gradient group
pub const HEATER: u8 = 16;
pub const GRADIENT: u8 = 16;
pub const PRINTER_PACKET: u8 = 17;
pub const MOTION_SYNC: u8 = 18;
pub const CUSTOM: u8 = 19;
pub const HEATER_WAIT: u8 = 24;
pub const PWM: u8 = 32;
pub const FAN: u8 = 48;

/// Sub-codes following [`GRADIENT`]
pub mod gradient {
    pub const ON: u8 = 1;
    pub const LINE_PIXELS: u8 = 2;
    pub const FILL_32_PIXELS: u8 = 3;
    pub const FILL_END: u8 = 4;
    pub const LINE_STATUS: u8 = 5;
    pub const OFF: u8 = 6;
}

/// Sub-codes following [`PRINTER_PACKET`]
pub mod printer_packet {
    pub const LENGTH: u8 = 0;
    pub const PAYLOAD: u8 = 1;
    pub const CRC: u8 = 2;
    pub const START: u8 = 3;
    pub const END: u8 = 4;
    pub const PX_COUNT: u8 = 5;
}

/// Values carried by [`MOTION_SYNC`](super::MOTION_SYNC)
pub mod motion_sync {
    pub const WAIT_PRINTER_SYNC: u32 = 0;
    pub const ENTER_PRINTER_MODE: u32 = 1;
    pub const EXIT_PRINTER_MODE: u32 = 2;
}

/// V2 block tags
pub mod tag {
    pub const FILE: &[u8; 4] = b"FILE";
    pub const PREVIEW: &[u8; 4] = b"PREV";
    pub const CONTENT: &[u8; 4] = b"CONT";
    pub const POST_CONFIG: &[u8; 4] = b"POST";
}
