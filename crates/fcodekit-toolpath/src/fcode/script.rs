//! Script opcode encoder shared by the V1 and V2 writers

use crate::gcode::{MotionFlags, OneSegmentType};

use super::opcode::{self, gradient, motion_sync, printer_packet};

/// Reusable buffer holding the encoding of one contract event
#[derive(Debug, Default)]
pub struct ScriptEncoder {
    buf: Vec<u8>,
}

impl ScriptEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn op(&mut self, code: u8) {
        self.buf.push(code);
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Motion opcode. A feedrate flag without a positive feedrate is dropped
    /// so the opcode always matches the fields that follow.
    pub fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        let mut flags = flags;
        if feedrate.is_nan() || feedrate <= 0.0 {
            flags.remove(MotionFlags::HAS_FEEDRATE);
        }
        self.op(opcode::MOVE | flags.bits());
        if flags.contains(MotionFlags::HAS_FEEDRATE) {
            self.f32(feedrate);
        }
        if flags.contains(MotionFlags::HAS_X) {
            self.f32(x);
        }
        if flags.contains(MotionFlags::HAS_Y) {
            self.f32(y);
        }
        if flags.contains(MotionFlags::HAS_Z) {
            self.f32(z);
        }
        if flags.contains(MotionFlags::HAS_S) {
            self.f32(s);
        }
    }

    pub fn home(&mut self) {
        self.op(opcode::HOME);
    }

    pub fn sleep(&mut self, seconds: f32) {
        self.op(opcode::SLEEP);
        self.f32(seconds * 1000.0);
    }

    pub fn dwell(&mut self, milliseconds: u32) {
        self.op(opcode::SLEEP);
        self.u32(milliseconds);
    }

    pub fn pause(&mut self, to_standby: bool) {
        self.op(if to_standby {
            opcode::PAUSE_TO_STANDBY
        } else {
            opcode::PAUSE_IN_PLACE
        });
    }

    pub fn heater(&mut self, temperature: f32, wait: bool) {
        self.op(if wait { opcode::HEATER_WAIT } else { opcode::HEATER });
        self.f32(temperature);
    }

    pub fn fan(&mut self, strength: f32) {
        self.op(opcode::FAN);
        self.f32(strength);
    }

    pub fn pwm(&mut self, strength: f32) {
        self.op(opcode::PWM);
        self.f32(strength);
    }

    pub fn laser_module(&mut self, laser_type: u32) {
        self.op(opcode::LASER_MODULE);
        self.u32(laser_type);
    }

    pub fn calibrate(&mut self) {
        self.op(opcode::CALIBRATE);
        self.u32(1);
    }

    /// Gradient print group: sub-code with an optional payload
    pub fn gradient(&mut self, sub: u8) {
        self.op(opcode::GRADIENT);
        self.u8(sub);
    }

    pub fn gradient_on(&mut self, resolution: u8) {
        self.gradient(gradient::ON);
        self.u8(resolution);
    }

    pub fn gradient_u32(&mut self, sub: u8, value: u32) {
        self.gradient(sub);
        self.u32(value);
    }

    pub fn printer_packet(&mut self, sub: u8) {
        self.op(opcode::PRINTER_PACKET);
        self.u8(sub);
    }

    pub fn printer_packet_start(&mut self, packet_type: u8) {
        self.printer_packet(printer_packet::START);
        self.u8(packet_type);
    }

    pub fn printer_packet_u32(&mut self, sub: u8, value: u32) {
        self.printer_packet(sub);
        self.u32(value);
    }

    pub fn printer_packet_crc(&mut self, crc: u16) {
        self.printer_packet(printer_packet::CRC);
        self.u16(crc);
    }

    pub fn motion_sync(&mut self, value: u32) {
        self.op(opcode::MOTION_SYNC);
        self.u8(0);
        self.u32(value);
    }

    pub fn enter_printer_mode(&mut self) {
        self.motion_sync(motion_sync::ENTER_PRINTER_MODE);
    }

    pub fn wait_printer_mode_sync(&mut self) {
        self.motion_sync(motion_sync::WAIT_PRINTER_SYNC);
    }

    pub fn exit_printer_mode(&mut self) {
        self.motion_sync(motion_sync::EXIT_PRINTER_MODE);
    }

    pub fn custom(&mut self, value: u32) {
        self.op(opcode::CUSTOM);
        self.u8(0);
        self.u32(value);
    }

    pub fn one_segment(&mut self, kind: OneSegmentType, cmd: u8) {
        self.op(kind as u8);
        self.u8(cmd);
    }
}
