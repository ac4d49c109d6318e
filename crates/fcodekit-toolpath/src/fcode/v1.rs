//! FCode V1 writer
//!
//! Layout: magic, a length-framed script followed by its checksum, a
//! length-framed `key=value\0` metadata block followed by its checksum,
//! length-prefixed previews and a zero terminator.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use fcodekit_core::{FcodeError, WriterWarning};
use fcodekit_settings::EstimatorSettings;

use super::checksum::Crc32;
use super::metadata::Metadata;
use super::opcode::{gradient, printer_packet, MAGIC_V1};
use super::script::ScriptEncoder;
use super::state::{format_extent, format_metric, TripState};
use super::stream::{FcodeStream, Marker};
use crate::gcode::{MotionFlags, OneSegmentType, ToolpathProcessor};

pub struct FcodeV1Writer<W: Write + Seek> {
    stream: FcodeStream<W>,
    encoder: ScriptEncoder,
    script_crc: Crc32,
    script_length: Marker,
    trip: TripState,
    head_type: String,
    metadata: Metadata,
    previews: Vec<Vec<u8>>,
    closed: bool,
}

impl FcodeV1Writer<BufWriter<File>> {
    /// Create `path` and start a container in it
    pub fn create(path: impl AsRef<Path>, head_type: impl Into<String>) -> Result<Self, FcodeError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| FcodeError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(BufWriter::new(file), head_type)
    }
}

impl<W: Write + Seek> FcodeV1Writer<W> {
    /// Start a container in `dest`
    ///
    /// Fails when `dest` cannot report its position or the header cannot be
    /// written.
    pub fn new(dest: W, head_type: impl Into<String>) -> Result<Self, FcodeError> {
        let mut stream = FcodeStream::new(dest)?;
        stream.write_bytes(MAGIC_V1, None)?;
        let script_length = stream.reserve_placeholder()?;
        Ok(Self {
            stream,
            encoder: ScriptEncoder::new(),
            script_crc: Crc32::new(),
            script_length,
            trip: TripState::default(),
            head_type: head_type.into(),
            metadata: Metadata::new(),
            previews: Vec::new(),
            closed: false,
        })
    }

    /// Caller metadata, written after the computed keys
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_previews(mut self, previews: Vec<Vec<u8>>) -> Self {
        self.previews = previews;
        self
    }

    pub fn with_estimator(mut self, settings: &EstimatorSettings) -> Self {
        self.trip = TripState::new(settings);
        self
    }

    /// Filament totals reported in `FILAMENT_USED`
    pub fn set_filament_used(&mut self, filament: &[f32]) {
        self.trip.set_filament_used(filament);
    }

    /// `ERROR ...` / `WARNING ...` strings in the order they were reported
    pub fn errors(&self) -> &[String] {
        self.trip.errors()
    }

    /// Metadata; after `terminated` this includes the computed keys
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn trip(&self) -> &TripState {
        &self.trip
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        self.stream.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.stream.into_inner()
    }

    fn emit(&mut self, encode: impl FnOnce(&mut ScriptEncoder)) {
        if self.closed {
            return;
        }
        self.encoder.clear();
        encode(&mut self.encoder);
        if let Err(err) = self
            .stream
            .write_bytes(self.encoder.as_bytes(), Some(&mut self.script_crc))
        {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: io::Error) {
        tracing::error!("FCode V1 write failed: {}", err);
        self.trip.record_error(true, &format!("IO_ERROR {err}"));
        self.closed = true;
    }

    fn final_metadata(&self) -> Metadata {
        let trip = &self.trip;
        let mut metadata = Metadata::new();
        metadata.push("VERSION", "1");
        metadata.push("HEAD_TYPE", self.head_type.as_str());
        metadata.push("TIME_COST", format_metric(trip.time_cost()));
        metadata.push("TRAVEL_DIST", format_metric(trip.traveled()));
        metadata.push("MAX_X", format_extent(trip.max_x()));
        metadata.push("MAX_Y", format_extent(trip.max_y()));
        metadata.push("MAX_Z", format_extent(trip.max_z()));
        metadata.push("MAX_R", format_extent(trip.max_radius()));
        metadata.push("FILAMENT_USED", trip.filament_summary());
        metadata.extend(&self.metadata);
        metadata
    }

    fn finish(&mut self) -> io::Result<()> {
        let script_length = self.stream.patch_length(self.script_length)?;
        self.stream.write_u32(self.script_crc.value(), None)?;

        let metadata = self.final_metadata();
        let marker = self.stream.reserve_placeholder()?;
        let mut metadata_crc = Crc32::new();
        self.stream
            .write_bytes(&metadata.to_v1_records(), Some(&mut metadata_crc))?;
        self.stream.patch_length(marker)?;
        self.stream.write_u32(metadata_crc.value(), None)?;
        self.metadata = metadata;

        for preview in &self.previews {
            self.stream.write_length_prefixed(preview)?;
        }
        self.stream.write_u32(0, None)?;
        self.stream.flush()?;

        tracing::debug!(
            script_length,
            traveled = self.trip.traveled(),
            time_cost = self.trip.time_cost(),
            previews = self.previews.len(),
            "FCode V1 container finalized"
        );
        Ok(())
    }
}

impl<W: Write + Seek> ToolpathProcessor for FcodeV1Writer<W> {
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        if self.closed {
            return;
        }
        self.trip.record_move(flags, feedrate, x, y, z);
        self.emit(|e| e.moveto(flags, feedrate, x, y, z, s));
    }

    fn home(&mut self) {
        if self.closed {
            return;
        }
        self.trip.record_home();
        self.emit(|e| e.home());
    }

    fn sleep(&mut self, seconds: f32) {
        if self.closed {
            return;
        }
        self.trip.record_sleep(seconds);
        self.emit(|e| e.sleep(seconds));
    }

    fn dwell(&mut self, milliseconds: u32) {
        if self.closed {
            return;
        }
        self.trip.record_sleep(milliseconds as f32 / 1000.0);
        self.emit(|e| e.dwell(milliseconds));
    }

    fn enable_motor(&mut self) {
        if !self.closed {
            self.trip
                .record_warning(WriterWarning::NotSupported("ENABLE_MOTOR"));
        }
    }

    fn disable_motor(&mut self) {
        if !self.closed {
            self.trip
                .record_warning(WriterWarning::NotSupported("DISABLE_MOTOR"));
        }
    }

    fn pause(&mut self, to_standby: bool) {
        self.emit(|e| e.pause(to_standby));
    }

    fn set_toolhead_heater_temperature(&mut self, temperature: f32, wait: bool) {
        self.emit(|e| e.heater(temperature, wait));
    }

    fn set_toolhead_fan_speed(&mut self, strength: f32) {
        self.emit(|e| e.fan(strength));
    }

    fn set_toolhead_pwm(&mut self, strength: f32) {
        self.emit(|e| e.pwm(strength));
    }

    fn set_toolhead_laser_module(&mut self, laser_type: u32) {
        self.emit(|e| e.laser_module(laser_type));
    }

    fn set_calibrate(&mut self) {
        self.emit(|e| e.calibrate());
    }

    fn turn_on_gradient_print_mode(&mut self, resolution: u8) {
        self.emit(|e| e.gradient_on(resolution));
    }

    fn turn_off_gradient_print_mode(&mut self) {
        self.emit(|e| e.gradient(gradient::OFF));
    }

    fn set_line_pixels(&mut self, pixel_number: u32) {
        self.emit(|e| e.gradient_u32(gradient::LINE_PIXELS, pixel_number));
    }

    fn fill_32_pixels(&mut self, pixels: u32) {
        self.emit(|e| e.gradient_u32(gradient::FILL_32_PIXELS, pixels));
    }

    fn set_fill_end(&mut self) {
        self.emit(|e| e.gradient(gradient::FILL_END));
    }

    fn set_print_line_status(&mut self) {
        self.emit(|e| e.gradient(gradient::LINE_STATUS));
    }

    fn enter_printer_mode(&mut self) {
        self.emit(|e| e.enter_printer_mode());
    }

    fn wait_printer_mode_sync(&mut self) {
        self.emit(|e| e.wait_printer_mode_sync());
    }

    fn exit_printer_mode(&mut self) {
        self.emit(|e| e.exit_printer_mode());
    }

    fn start_printer_packet(&mut self, packet_type: u8) {
        self.emit(|e| e.printer_packet_start(packet_type));
    }

    fn end_printer_packet(&mut self) {
        self.emit(|e| e.printer_packet(printer_packet::END));
    }

    fn set_printer_packet_px_count(&mut self, count: u32) {
        self.emit(|e| e.printer_packet_u32(printer_packet::PX_COUNT, count));
    }

    fn set_printer_packet_length(&mut self, length: u32) {
        self.emit(|e| e.printer_packet_u32(printer_packet::LENGTH, length));
    }

    fn start_printer_packet_payload(&mut self) {
        self.emit(|e| e.printer_packet(printer_packet::PAYLOAD));
    }

    fn add_printer_packet_payload(&mut self, byte: u8) {
        self.emit(|e| e.u8(byte));
    }

    fn set_printer_packet_crc(&mut self, crc: u16) {
        self.emit(|e| e.printer_packet_crc(crc));
    }

    fn sync_grbl_motion(&mut self, value: u32) {
        self.emit(|e| e.motion_sync(value));
    }

    fn flux_custom_cmd(&mut self, value: u32) {
        self.emit(|e| e.custom(value));
    }

    fn one_seg_custom_cmd(&mut self, kind: OneSegmentType, cmd: u8) {
        self.emit(|e| e.one_segment(kind, cmd));
    }

    fn set_time_est_acc_x(&mut self, acc: u32) {
        self.trip.set_acc_x(acc as f64);
    }

    fn append_comment(&mut self, _text: &str) {}

    fn on_error(&mut self, critical: bool, message: &str) {
        if !self.closed {
            self.trip.record_error(critical, message);
        }
    }

    fn terminated(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.finish() {
            self.fail(err);
        }
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn writer() -> FcodeV1Writer<Cursor<Vec<u8>>> {
        FcodeV1Writer::new(Cursor::new(Vec::new()), "LASER").unwrap()
    }

    #[test]
    fn test_header_and_placeholder() {
        let w = writer();
        assert_eq!(w.get_ref().get_ref(), b"FCx0001\n\0\0\0\0");
    }

    #[test]
    fn test_empty_container_layout() {
        let mut w = writer();
        w.terminated();
        let bytes = w.into_inner().into_inner();
        assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0u32.to_le_bytes());
        let metadata_len = u32::from_le_bytes(bytes[16..20].try_into().unwrap()) as usize;
        let records = &bytes[20..20 + metadata_len];
        assert!(records.starts_with(b"VERSION=1\0HEAD_TYPE=LASER\0TIME_COST=0.00\0"));
        assert_eq!(&bytes[bytes.len() - 4..], &0u32.to_le_bytes());
    }

    #[test]
    fn test_motor_events_only_warn() {
        let mut w = writer();
        w.enable_motor();
        w.disable_motor();
        assert_eq!(
            w.errors(),
            ["WARNING NOT_SUPPORT ENABLE_MOTOR", "WARNING NOT_SUPPORT DISABLE_MOTOR"]
        );
        assert_eq!(w.get_ref().get_ref().len(), 12);
    }

    #[test]
    fn test_events_after_terminate_are_ignored() {
        let mut w = writer();
        w.home();
        w.terminated();
        let len = w.get_ref().get_ref().len();
        w.home();
        w.on_error(true, "late");
        w.terminated();
        assert_eq!(w.get_ref().get_ref().len(), len);
        assert!(w.errors().is_empty());
    }

    #[test]
    fn test_acc_override_changes_estimate() {
        let flags = MotionFlags::HAS_FEEDRATE | MotionFlags::HAS_X;
        let mut fast = writer();
        fast.moveto(flags, 6000.0, 1.0, 0.0, 0.0, 0.0);
        let mut slow = writer();
        slow.set_time_est_acc_x(100);
        slow.moveto(flags, 6000.0, 1.0, 0.0, 0.0, 0.0);
        assert!(slow.trip().time_cost() > fast.trip().time_cost());
    }
}
