//! G-Code re-writer
//!
//! Emits one normalized text line per event. Positions are written in
//! millimeters in absolute machine coordinates, so the output needs no modal
//! preamble.

use std::fmt::Display;
use std::io::Write;

use super::{MotionFlags, ToolpathProcessor};

pub struct GcodeWriter<W: Write> {
    out: W,
    errors: Vec<String>,
    closed: bool,
}

impl<W: Write> GcodeWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            errors: Vec::new(),
            closed: false,
        }
    }

    /// Errors reported through `on_error`, prefixed `ERROR` / `WARNING`
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl Display) {
        if self.closed {
            return;
        }
        if let Err(err) = writeln!(self.out, "{text}") {
            tracing::error!("G-Code write failed: {}", err);
            self.errors.push(format!("ERROR IO_ERROR {err}"));
            self.closed = true;
        }
    }
}

/// 0..1 strength scaled to the 0..255 parameter range
fn to_byte_range(strength: f32) -> f32 {
    strength * 255.0
}

impl<W: Write> ToolpathProcessor for GcodeWriter<W> {
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        let mut text = String::from("G1");
        if flags.contains(MotionFlags::HAS_FEEDRATE) {
            text.push_str(&format!(" F{feedrate}"));
        }
        if flags.contains(MotionFlags::HAS_X) {
            text.push_str(&format!(" X{x}"));
        }
        if flags.contains(MotionFlags::HAS_Y) {
            text.push_str(&format!(" Y{y}"));
        }
        if flags.contains(MotionFlags::HAS_Z) {
            text.push_str(&format!(" Z{z}"));
        }
        if flags.contains(MotionFlags::HAS_S) {
            text.push_str(&format!(" S{s}"));
        }
        self.line(text);
    }

    fn home(&mut self) {
        self.line("G28");
    }

    fn sleep(&mut self, seconds: f32) {
        self.line(format_args!("G4 P{}", seconds * 1000.0));
    }

    fn dwell(&mut self, milliseconds: u32) {
        self.line(format_args!("G4 P{milliseconds}"));
    }

    fn enable_motor(&mut self) {
        self.line("M17");
    }

    fn disable_motor(&mut self) {
        self.line("M84");
    }

    fn pause(&mut self, to_standby: bool) {
        if to_standby {
            self.line("M25");
        } else {
            self.line("M25 Z0");
        }
    }

    fn set_toolhead_heater_temperature(&mut self, temperature: f32, wait: bool) {
        let code = if wait { "M109" } else { "M104" };
        self.line(format_args!("{code} S{temperature}"));
    }

    fn set_toolhead_fan_speed(&mut self, strength: f32) {
        if strength == 0.0 {
            self.line("M107");
        } else {
            self.line(format_args!("M106 S{}", to_byte_range(strength)));
        }
    }

    fn set_toolhead_pwm(&mut self, strength: f32) {
        if strength == 0.0 {
            self.line("X2 F");
        } else {
            self.line(format_args!("X2 O{}", to_byte_range(strength)));
        }
    }

    fn append_comment(&mut self, text: &str) {
        self.line(format_args!(";{text}"));
    }

    fn on_error(&mut self, critical: bool, message: &str) {
        if self.closed {
            return;
        }
        let prefix = if critical { "ERROR" } else { "WARNING" };
        self.errors.push(format!("{prefix} {message}"));
        self.line(format_args!(";{prefix} {message}"));
    }

    fn terminated(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.out.flush() {
            tracing::error!("G-Code flush failed: {}", err);
            self.errors.push(format!("ERROR IO_ERROR {err}"));
        }
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(writer: GcodeWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_motion_lines() {
        let mut w = GcodeWriter::new(Vec::new());
        w.moveto(
            MotionFlags::HAS_FEEDRATE | MotionFlags::HAS_X | MotionFlags::HAS_Y,
            1200.0,
            10.5,
            -2.0,
            0.0,
            0.0,
        );
        w.moveto(MotionFlags::HAS_Z | MotionFlags::HAS_S, 1200.0, 0.0, 0.0, 3.0, 0.5);
        w.home();
        w.sleep(1.5);
        assert_eq!(text(w), "G1 F1200 X10.5 Y-2\nG1 Z3 S0.5\nG28\nG4 P1500\n");
    }

    #[test]
    fn test_device_lines() {
        let mut w = GcodeWriter::new(Vec::new());
        w.pause(false);
        w.set_toolhead_heater_temperature(200.0, true);
        w.set_toolhead_fan_speed(1.0);
        w.set_toolhead_fan_speed(0.0);
        w.set_toolhead_pwm(0.0);
        w.set_calibrate();
        assert_eq!(text(w), "M25 Z0\nM109 S200\nM106 S255\nM107\nX2 F\n");
    }

    #[test]
    fn test_comments_and_errors() {
        let mut w = GcodeWriter::new(Vec::new());
        w.append_comment(" layer 1");
        w.on_error(true, "BAD_COMMAND G5");
        w.on_error(false, "DUPLICATE_F");
        assert_eq!(w.errors(), ["ERROR BAD_COMMAND G5", "WARNING DUPLICATE_F"]);
        assert_eq!(
            text(w),
            "; layer 1\n;ERROR BAD_COMMAND G5\n;WARNING DUPLICATE_F\n"
        );
    }
}
