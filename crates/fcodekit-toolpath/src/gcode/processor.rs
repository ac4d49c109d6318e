//! Toolpath processor contract
//!
//! Every backend (binary writers, the G-code re-writer, test recorders)
//! receives the same stream of events in the same order. Backends only differ
//! in how an event is realized; callers must treat them as interchangeable.

use super::MotionFlags;

/// Subsystem addressed by a single-byte custom command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OneSegmentType {
    /// User selection commands
    UserSelection = 20,
    /// Miscellaneous commands
    Miscellaneous = 21,
    /// Motion controller system commands
    GrblSystem = 22,
}

impl OneSegmentType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(Self::UserSelection),
            21 => Some(Self::Miscellaneous),
            22 => Some(Self::GrblSystem),
            _ => None,
        }
    }
}

/// Trait for toolpath event sinks
///
/// Motion, power and lifecycle events must be handled by every backend.
/// Device-specific events default to no-ops so a backend without the feature
/// silently ignores them.
pub trait ToolpathProcessor {
    /// Linear move. `x`, `y`, `z` are absolute machine coordinates; only the
    /// values whose flag is set were given on the source line. `feedrate` is
    /// in mm/min.
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32);

    /// Return to the home position
    fn home(&mut self);

    /// Dwell for `seconds`
    fn sleep(&mut self, seconds: f32);

    /// Dwell for a whole number of milliseconds
    fn dwell(&mut self, milliseconds: u32) {
        self.sleep(milliseconds as f32 / 1000.0);
    }

    fn enable_motor(&mut self);

    fn disable_motor(&mut self);

    /// Pause the program, optionally parking the head at standby
    fn pause(&mut self, to_standby: bool);

    fn set_toolhead_heater_temperature(&mut self, _temperature: f32, _wait: bool) {}

    /// Fan speed, normalized to `0.0..=1.0`
    fn set_toolhead_fan_speed(&mut self, _strength: f32) {}

    /// PWM strength, normalized to `0.0..=1.0`; negative values are passed
    /// through for device-specific meanings
    fn set_toolhead_pwm(&mut self, _strength: f32) {}

    fn set_toolhead_laser_module(&mut self, _laser_type: u32) {}

    fn set_calibrate(&mut self) {}

    fn turn_on_gradient_print_mode(&mut self, _resolution: u8) {}

    fn turn_off_gradient_print_mode(&mut self) {}

    fn set_line_pixels(&mut self, _pixel_number: u32) {}

    fn fill_32_pixels(&mut self, _pixels: u32) {}

    fn set_fill_end(&mut self) {}

    fn set_print_line_status(&mut self) {}

    fn enter_printer_mode(&mut self) {}

    fn wait_printer_mode_sync(&mut self) {}

    fn exit_printer_mode(&mut self) {}

    fn start_printer_packet(&mut self, _packet_type: u8) {}

    fn end_printer_packet(&mut self) {}

    fn set_printer_packet_px_count(&mut self, _count: u32) {}

    fn set_printer_packet_length(&mut self, _length: u32) {}

    fn start_printer_packet_payload(&mut self) {}

    fn add_printer_packet_payload(&mut self, _byte: u8) {}

    fn set_printer_packet_crc(&mut self, _crc: u16) {}

    fn sync_grbl_motion(&mut self, _value: u32) {}

    /// Generic 4-byte custom command
    fn flux_custom_cmd(&mut self, _value: u32) {}

    fn one_seg_custom_cmd(&mut self, _kind: OneSegmentType, _cmd: u8) {}

    /// Override the X acceleration used for time estimation, in mm/s²
    fn set_time_est_acc_x(&mut self, _acc: u32) {}

    /// Seal the content and assemble the container
    fn end_content(&mut self) {}

    fn write_post_config(&mut self, _config: &[u8]) {}

    fn append_anchor(&mut self, _value: u32) {}

    fn write_string(&mut self, _bytes: &[u8], _write_length: bool) {}

    fn start_task_script_block(&mut self, _header: [u8; 4], _proc_id: Option<[u8; 4]>) {}

    fn end_task_script_block(&mut self) {}

    fn append_comment(&mut self, text: &str);

    fn on_error(&mut self, critical: bool, message: &str);

    /// Finalize the output. Called once; later calls must be harmless.
    fn terminated(&mut self);
}

impl<P: ToolpathProcessor + ?Sized> ToolpathProcessor for &mut P {
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        (**self).moveto(flags, feedrate, x, y, z, s)
    }
    fn home(&mut self) {
        (**self).home()
    }
    fn sleep(&mut self, seconds: f32) {
        (**self).sleep(seconds)
    }
    fn dwell(&mut self, milliseconds: u32) {
        (**self).dwell(milliseconds)
    }
    fn enable_motor(&mut self) {
        (**self).enable_motor()
    }
    fn disable_motor(&mut self) {
        (**self).disable_motor()
    }
    fn pause(&mut self, to_standby: bool) {
        (**self).pause(to_standby)
    }
    fn set_toolhead_heater_temperature(&mut self, temperature: f32, wait: bool) {
        (**self).set_toolhead_heater_temperature(temperature, wait)
    }
    fn set_toolhead_fan_speed(&mut self, strength: f32) {
        (**self).set_toolhead_fan_speed(strength)
    }
    fn set_toolhead_pwm(&mut self, strength: f32) {
        (**self).set_toolhead_pwm(strength)
    }
    fn set_toolhead_laser_module(&mut self, laser_type: u32) {
        (**self).set_toolhead_laser_module(laser_type)
    }
    fn set_calibrate(&mut self) {
        (**self).set_calibrate()
    }
    fn turn_on_gradient_print_mode(&mut self, resolution: u8) {
        (**self).turn_on_gradient_print_mode(resolution)
    }
    fn turn_off_gradient_print_mode(&mut self) {
        (**self).turn_off_gradient_print_mode()
    }
    fn set_line_pixels(&mut self, pixel_number: u32) {
        (**self).set_line_pixels(pixel_number)
    }
    fn fill_32_pixels(&mut self, pixels: u32) {
        (**self).fill_32_pixels(pixels)
    }
    fn set_fill_end(&mut self) {
        (**self).set_fill_end()
    }
    fn set_print_line_status(&mut self) {
        (**self).set_print_line_status()
    }
    fn enter_printer_mode(&mut self) {
        (**self).enter_printer_mode()
    }
    fn wait_printer_mode_sync(&mut self) {
        (**self).wait_printer_mode_sync()
    }
    fn exit_printer_mode(&mut self) {
        (**self).exit_printer_mode()
    }
    fn start_printer_packet(&mut self, packet_type: u8) {
        (**self).start_printer_packet(packet_type)
    }
    fn end_printer_packet(&mut self) {
        (**self).end_printer_packet()
    }
    fn set_printer_packet_px_count(&mut self, count: u32) {
        (**self).set_printer_packet_px_count(count)
    }
    fn set_printer_packet_length(&mut self, length: u32) {
        (**self).set_printer_packet_length(length)
    }
    fn start_printer_packet_payload(&mut self) {
        (**self).start_printer_packet_payload()
    }
    fn add_printer_packet_payload(&mut self, byte: u8) {
        (**self).add_printer_packet_payload(byte)
    }
    fn set_printer_packet_crc(&mut self, crc: u16) {
        (**self).set_printer_packet_crc(crc)
    }
    fn sync_grbl_motion(&mut self, value: u32) {
        (**self).sync_grbl_motion(value)
    }
    fn flux_custom_cmd(&mut self, value: u32) {
        (**self).flux_custom_cmd(value)
    }
    fn one_seg_custom_cmd(&mut self, kind: OneSegmentType, cmd: u8) {
        (**self).one_seg_custom_cmd(kind, cmd)
    }
    fn set_time_est_acc_x(&mut self, acc: u32) {
        (**self).set_time_est_acc_x(acc)
    }
    fn end_content(&mut self) {
        (**self).end_content()
    }
    fn write_post_config(&mut self, config: &[u8]) {
        (**self).write_post_config(config)
    }
    fn append_anchor(&mut self, value: u32) {
        (**self).append_anchor(value)
    }
    fn write_string(&mut self, bytes: &[u8], write_length: bool) {
        (**self).write_string(bytes, write_length)
    }
    fn start_task_script_block(&mut self, header: [u8; 4], proc_id: Option<[u8; 4]>) {
        (**self).start_task_script_block(header, proc_id)
    }
    fn end_task_script_block(&mut self) {
        (**self).end_task_script_block()
    }
    fn append_comment(&mut self, text: &str) {
        (**self).append_comment(text)
    }
    fn on_error(&mut self, critical: bool, message: &str) {
        (**self).on_error(critical, message)
    }
    fn terminated(&mut self) {
        (**self).terminated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        moves: usize,
        sleeps: Vec<f32>,
        errors: Vec<(bool, String)>,
        terminated: usize,
    }

    impl ToolpathProcessor for Counter {
        fn moveto(&mut self, _: MotionFlags, _: f32, _: f32, _: f32, _: f32, _: f32) {
            self.moves += 1;
        }
        fn home(&mut self) {}
        fn sleep(&mut self, seconds: f32) {
            self.sleeps.push(seconds);
        }
        fn enable_motor(&mut self) {}
        fn disable_motor(&mut self) {}
        fn pause(&mut self, _: bool) {}
        fn append_comment(&mut self, _: &str) {}
        fn on_error(&mut self, critical: bool, message: &str) {
            self.errors.push((critical, message.to_string()));
        }
        fn terminated(&mut self) {
            self.terminated += 1;
        }
    }

    #[test]
    fn test_device_events_default_to_noop() {
        let mut counter = Counter::default();
        counter.set_toolhead_fan_speed(0.5);
        counter.start_printer_packet(1);
        counter.add_printer_packet_payload(0xAA);
        counter.write_post_config(b"{}");
        assert_eq!(counter.moves, 0);
        assert!(counter.errors.is_empty());
    }

    #[test]
    fn test_dwell_defaults_to_sleep() {
        let mut counter = Counter::default();
        counter.dwell(1500);
        assert_eq!(counter.sleeps, vec![1.5]);
    }

    #[test]
    fn test_forwarding_through_mut_reference() {
        let mut counter = Counter::default();
        {
            let mut forward: &mut Counter = &mut counter;
            let dynamic: &mut dyn ToolpathProcessor = &mut forward;
            dynamic.moveto(MotionFlags::HAS_X, 0.0, 1.0, 0.0, 0.0, 0.0);
            dynamic.on_error(true, "BAD_COMMAND G5");
            dynamic.terminated();
        }
        assert_eq!(counter.moves, 1);
        assert_eq!(counter.errors, vec![(true, "BAD_COMMAND G5".to_string())]);
        assert_eq!(counter.terminated, 1);
    }

    #[test]
    fn test_one_segment_type_codes() {
        assert_eq!(OneSegmentType::GrblSystem as u8, 22);
        assert_eq!(OneSegmentType::from_u8(21), Some(OneSegmentType::Miscellaneous));
        assert_eq!(OneSegmentType::from_u8(7), None);
    }
}
