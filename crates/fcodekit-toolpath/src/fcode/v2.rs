//! FCode V2 writer
//!
//! Script bytes go to an in-memory content buffer. Sealing the content writes
//! the tagged `FILE`, `PREV` and `CONT` blocks to the destination, followed by
//! any `POST` configuration blocks.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, Write};
use std::path::Path;

use fcodekit_core::{FcodeError, WriterWarning};
use fcodekit_settings::EstimatorSettings;

use super::checksum::Crc32;
use super::metadata::Metadata;
use super::opcode::{gradient, printer_packet, tag, MAGIC_V2};
use super::script::ScriptEncoder;
use super::state::{format_extent, format_metric, TripState};
use super::stream::{FcodeStream, Marker};
use crate::gcode::{MotionFlags, OneSegmentType, ToolpathProcessor};

/// Distance and time spent inside one closed task-script block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSummary {
    pub header: [u8; 4],
    pub proc_id: Option<[u8; 4]>,
    /// mm
    pub traveled: f64,
    /// seconds
    pub time_cost: f64,
}

#[derive(Debug)]
struct OpenTask {
    header: [u8; 4],
    proc_id: Option<[u8; 4]>,
    length: Marker,
    traveled_at_start: f64,
    time_at_start: f64,
}

pub struct FcodeV2Writer<W: Write + Seek> {
    container: FcodeStream<W>,
    content: FcodeStream<Cursor<Vec<u8>>>,
    encoder: ScriptEncoder,
    trip: TripState,
    metadata: Metadata,
    previews: Vec<Vec<u8>>,
    open_tasks: Vec<OpenTask>,
    tasks: Vec<TaskSummary>,
    pending_post_config: Vec<Vec<u8>>,
    content_sealed: bool,
    closed: bool,
}

impl FcodeV2Writer<BufWriter<File>> {
    /// Create `path` and start a container in it
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FcodeError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| FcodeError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> FcodeV2Writer<W> {
    /// Start a container in `dest`
    pub fn new(dest: W) -> Result<Self, FcodeError> {
        let mut container = FcodeStream::new(dest)?;
        container.write_bytes(MAGIC_V2, None)?;
        Ok(Self {
            container,
            content: FcodeStream::new(Cursor::new(Vec::new()))?,
            encoder: ScriptEncoder::new(),
            trip: TripState::default(),
            metadata: Metadata::new(),
            previews: Vec::new(),
            open_tasks: Vec::new(),
            tasks: Vec::new(),
            pending_post_config: Vec::new(),
            content_sealed: false,
            closed: false,
        })
    }

    /// Caller metadata, written between `version` and the computed numbers
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

    pub fn errors(&self) -> &[String] {
        self.trip.errors()
    }

    /// Metadata; once the content is sealed this is the full written set
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn trip(&self) -> &TripState {
        &self.trip
    }

    /// Summaries of closed task blocks, in closing order
    pub fn tasks(&self) -> &[TaskSummary] {
        &self.tasks
    }

    /// Content bytes written so far
    pub fn content(&self) -> &[u8] {
        self.content.get_ref().get_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        self.container.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.container.into_inner()
    }

    fn accepts_content(&self) -> bool {
        if self.content_sealed && !self.closed {
            tracing::debug!("event after end_content ignored");
        }
        !(self.closed || self.content_sealed)
    }

    fn emit(&mut self, encode: impl FnOnce(&mut ScriptEncoder)) {
        if !self.accepts_content() {
            return;
        }
        self.encoder.clear();
        encode(&mut self.encoder);
        if let Err(err) = self.content.write_bytes(self.encoder.as_bytes(), None) {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: io::Error) {
        tracing::error!("FCode V2 write failed: {}", err);
        self.trip.record_error(true, &format!("IO_ERROR {err}"));
        self.closed = true;
    }

    fn close_task(&mut self, task: OpenTask) -> io::Result<()> {
        let length = self.content.patch_length(task.length)?;
        let summary = TaskSummary {
            header: task.header,
            proc_id: task.proc_id,
            traveled: self.trip.traveled() - task.traveled_at_start,
            time_cost: self.trip.time_cost() - task.time_at_start,
        };
        tracing::debug!(
            header = %String::from_utf8_lossy(&task.header),
            length,
            traveled = summary.traveled,
            time_cost = summary.time_cost,
            "task block closed"
        );
        self.tasks.push(summary);
        Ok(())
    }

    fn write_file_block(&mut self) -> io::Result<()> {
        let trip = &self.trip;
        let numbers = [
            ("max_x", format_extent(trip.max_x())),
            ("max_y", format_extent(trip.max_y())),
            ("max_z", format_extent(trip.max_z())),
            ("travel_dist", format_metric(trip.traveled())),
            ("time_cost", format_metric(trip.time_cost())),
        ];
        let mut strings = Metadata::new();
        strings.push("version", "2");
        strings.extend(&self.metadata);
        let json = strings.to_v2_json(&numbers);

        self.container.write_bytes(tag::FILE, None)?;
        let marker = self.container.reserve_placeholder()?;
        let mut crc = Crc32::new();
        self.container.write_bytes(&json, Some(&mut crc))?;
        self.container.patch_length(marker)?;
        self.container.write_u32(crc.value(), None)?;

        for (key, value) in numbers {
            strings.push(key, value);
        }
        self.metadata = strings;
        Ok(())
    }

    fn write_post_block(&mut self, config: &[u8]) -> io::Result<()> {
        let mut crc = Crc32::new();
        self.container.write_bytes(tag::POST_CONFIG, None)?;
        self.container.write_length(config.len())?;
        self.container.write_bytes(config, Some(&mut crc))?;
        self.container.write_u32(crc.value(), None)
    }

    fn seal_content(&mut self) -> io::Result<()> {
        self.write_file_block()?;

        self.container.write_bytes(tag::PREVIEW, None)?;
        for preview in &self.previews {
            self.container.write_length_prefixed(preview)?;
        }

        let content = self.content.get_ref().get_ref();
        let content_length = content.len();
        let mut crc = Crc32::new();
        self.container.write_bytes(tag::CONTENT, None)?;
        self.container.write_length(content_length)?;
        self.container.write_bytes(content, Some(&mut crc))?;
        self.container.write_u32(crc.value(), None)?;

        for config in std::mem::take(&mut self.pending_post_config) {
            self.write_post_block(&config)?;
        }

        tracing::debug!(
            content_length,
            traveled = self.trip.traveled(),
            time_cost = self.trip.time_cost(),
            tasks = self.tasks.len(),
            "FCode V2 content sealed"
        );
        Ok(())
    }
}

impl<W: Write + Seek> ToolpathProcessor for FcodeV2Writer<W> {
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        if !self.accepts_content() {
            return;
        }
        self.trip.record_move(flags, feedrate, x, y, z);
        self.emit(|e| e.moveto(flags, feedrate, x, y, z, s));
    }

    fn home(&mut self) {
        if !self.accepts_content() {
            return;
        }
        self.trip.record_home();
        self.emit(|e| e.home());
    }

    fn sleep(&mut self, seconds: f32) {
        if !self.accepts_content() {
            return;
        }
        self.trip.record_sleep(seconds);
        self.emit(|e| e.sleep(seconds));
    }

    fn dwell(&mut self, milliseconds: u32) {
        if !self.accepts_content() {
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

    fn end_content(&mut self) {
        if self.closed || self.content_sealed {
            return;
        }
        if !self.open_tasks.is_empty() {
            self.trip
                .record_warning(WriterWarning::TaskBlockNotClosed(self.open_tasks.len()));
            while let Some(task) = self.open_tasks.pop() {
                if let Err(err) = self.close_task(task) {
                    self.fail(err);
                    return;
                }
            }
        }
        self.content_sealed = true;
        if let Err(err) = self.seal_content() {
            self.fail(err);
        }
    }

    fn write_post_config(&mut self, config: &[u8]) {
        if self.closed {
            return;
        }
        if !self.content_sealed {
            self.pending_post_config.push(config.to_vec());
            return;
        }
        if let Err(err) = self.write_post_block(config) {
            self.fail(err);
        }
    }

    fn append_anchor(&mut self, value: u32) {
        self.emit(|e| e.u32(value));
    }

    fn write_string(&mut self, bytes: &[u8], write_length: bool) {
        self.emit(|e| {
            if write_length {
                e.u32(bytes.len() as u32);
            }
            e.raw(bytes);
        });
    }

    fn start_task_script_block(&mut self, header: [u8; 4], proc_id: Option<[u8; 4]>) {
        self.emit(|e| {
            e.raw(&header);
            if let Some(id) = proc_id {
                e.raw(&id);
            }
        });
        if !self.accepts_content() {
            return;
        }
        match self.content.reserve_placeholder() {
            Ok(length) => self.open_tasks.push(OpenTask {
                header,
                proc_id,
                length,
                traveled_at_start: self.trip.traveled(),
                time_at_start: self.trip.time_cost(),
            }),
            Err(err) => self.fail(err),
        }
    }

    fn end_task_script_block(&mut self) {
        if !self.accepts_content() {
            return;
        }
        match self.open_tasks.pop() {
            Some(task) => {
                if let Err(err) = self.close_task(task) {
                    self.fail(err);
                }
            }
            None => self.trip.record_warning(WriterWarning::TaskBlockNotOpen),
        }
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
        self.end_content();
        if self.closed {
            return;
        }
        if let Err(err) = self.container.flush() {
            self.fail(err);
        }
        self.closed = true;
    }
}
