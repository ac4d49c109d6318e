//! G-Code parser and modal state tracking
//!
//! The parser reads one line at a time, keeps the modal state (units,
//! absolute/relative positioning, active tool, G92 offsets) and turns every
//! recognized command into a call on a [`ToolpathProcessor`]. A bad line is
//! reported through `on_error` and never stops the rest of the program.

use std::io::BufRead;

use fcodekit_core::{GcodeError, MeasurementSystem};

use super::{MotionFlags, ToolpathProcessor};

/// Number of tools selectable with `T0`..`T3`
pub const TOOL_COUNT: usize = 4;

/// Modal state of one parse session
///
/// Positions are in the machine frame and always in millimeters, whatever
/// G20/G21 says.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserState {
    /// Absolute X/Y/Z in the machine frame
    pub position: [f32; 3],
    /// Offsets set by G92, `machine = logical + offset`
    pub position_offset: [f32; 3],
    /// Extruded filament per tool
    pub filament: [f32; TOOL_COUNT],
    /// Filament offsets set by `G92 E`
    pub filament_offset: [f32; TOOL_COUNT],
    /// Input values are inches (G20)
    pub from_inch: bool,
    /// Absolute positioning (G90) rather than relative (G91)
    pub absolute: bool,
    /// Tool selected by `T<n>`
    pub active_tool: usize,
    /// Session feedrate in mm/min, last positive `F` seen
    pub feedrate: f32,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            position_offset: [0.0; 3],
            filament: [0.0; TOOL_COUNT],
            filament_offset: [0.0; TOOL_COUNT],
            from_inch: false,
            absolute: true,
            active_tool: 0,
            feedrate: 0.0,
        }
    }
}

impl ParserState {
    /// Units of incoming values
    pub fn units(&self) -> MeasurementSystem {
        if self.from_inch {
            MeasurementSystem::Imperial
        } else {
            MeasurementSystem::Metric
        }
    }

    /// Position as the program sees it, after G92 offsets
    pub fn logical_position(&self) -> [f32; 3] {
        [
            self.position[0] - self.position_offset[0],
            self.position[1] - self.position_offset[1],
            self.position[2] - self.position_offset[2],
        ]
    }

    /// Filament of the active tool as the program sees it
    pub fn logical_filament(&self) -> f32 {
        self.filament[self.active_tool] - self.filament_offset[self.active_tool]
    }
}

/// Byte cursor over the code part of one line
struct LineCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(code: &'a str) -> Self {
        Self {
            bytes: code.as_bytes(),
            pos: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.pos < self.bytes.len() && matches!(self.bytes[self.pos], b' ' | b'\t') {
            self.pos += 1;
        }
    }

    /// Next non-space character, upper-cased
    fn next_letter(&mut self) -> Option<char> {
        self.skip_spaces();
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte.to_ascii_uppercase() as char)
    }

    fn take_digits(&mut self) -> usize {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        self.pos - start
    }

    fn take_sign(&mut self) {
        if matches!(self.bytes.get(self.pos), Some(b'+' | b'-')) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> &'a str {
        // Only ASCII bytes were consumed, so the range is on char boundaries.
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default()
    }

    fn int(&mut self) -> Option<i64> {
        self.skip_spaces();
        let start = self.pos;
        self.take_sign();
        if self.take_digits() == 0 {
            self.pos = start;
            return None;
        }
        self.slice(start).parse().ok()
    }

    fn float(&mut self) -> Option<f32> {
        self.skip_spaces();
        let start = self.pos;
        self.take_sign();
        let mut digits = self.take_digits();
        if self.bytes.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            digits += self.take_digits();
        }
        if digits == 0 {
            self.pos = start;
            return None;
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            let mantissa_end = self.pos;
            self.pos += 1;
            self.take_sign();
            if self.take_digits() == 0 {
                self.pos = mantissa_end;
            }
        }
        self.slice(start).parse().ok()
    }
}

/// Tracks parameter letters already seen on a line
#[derive(Default)]
struct SeenLetters(u32);

impl SeenLetters {
    /// Mark `letter`, returning true if it was already present
    fn mark(&mut self, letter: char) -> bool {
        let bit = 1u32 << ((letter as u8).saturating_sub(b'A') % 32);
        let seen = self.0 & bit != 0;
        self.0 |= bit;
        seen
    }
}

/// G-Code parser bound to one processor for one program
pub struct GcodeParser<'p> {
    processor: &'p mut dyn ToolpathProcessor,
    state: ParserState,
    line_number: usize,
}

impl<'p> GcodeParser<'p> {
    /// Create a parser that dispatches into `processor`
    pub fn new(processor: &'p mut dyn ToolpathProcessor) -> Self {
        Self {
            processor,
            state: ParserState::default(),
            line_number: 0,
        }
    }

    /// Current modal state
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Number of lines parsed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The bound processor, e.g. to finalize it after the last line
    pub fn processor(&mut self) -> &mut dyn ToolpathProcessor {
        &mut *self.processor
    }

    /// Parse every line of `text`
    pub fn parse_str(&mut self, text: &str) {
        for line in text.lines() {
            self.parse_line(line);
        }
    }

    /// Parse every line from `reader`, returning the number of lines read
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn parse_reader<R: BufRead>(&mut self, mut reader: R) -> std::io::Result<usize> {
        let mut buffer = Vec::new();
        let mut count = 0;
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buffer);
            self.parse_line(&line);
            count += 1;
        }
        Ok(count)
    }

    /// Parse a single line
    pub fn parse_line(&mut self, line: &str) {
        self.line_number += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        let (code, comment) = match line.find(';') {
            Some(idx) => (&line[..idx], Some(&line[idx + 1..])),
            None => (line, None),
        };

        if let Err(err) = self.dispatch(code, line) {
            self.report(err);
        }
        if let Some(comment) = comment {
            self.processor.append_comment(comment);
        }
    }

    fn report(&mut self, err: GcodeError) {
        tracing::debug!(line = self.line_number, "{}", err);
        self.processor.on_error(err.is_critical(), &err.to_string());
    }

    fn bad_command(line: &str) -> GcodeError {
        GcodeError::BadCommand {
            line: line.to_string(),
        }
    }

    fn bad_param(line: &str, fatal_to_line: bool) -> GcodeError {
        GcodeError::BadParam {
            line: line.to_string(),
            fatal_to_line,
        }
    }

    fn missing_param(line: &str) -> GcodeError {
        GcodeError::MissingParam {
            line: line.to_string(),
        }
    }

    fn dispatch(&mut self, code: &str, line: &str) -> Result<(), GcodeError> {
        let mut cursor = LineCursor::new(code);
        let Some(prefix) = cursor.next_letter() else {
            return Ok(());
        };
        let number = cursor.int().ok_or_else(|| Self::bad_command(line))?;

        match (prefix, number) {
            ('G', 0 | 1) => self.handle_move(&mut cursor, line),
            ('G', 4) => self.handle_dwell(&mut cursor, line),
            ('G', 20) => {
                self.state.from_inch = true;
                Ok(())
            }
            ('G', 21) => {
                self.state.from_inch = false;
                Ok(())
            }
            ('G', 28) => {
                if cursor.next_letter().is_some() {
                    self.report(GcodeError::HomeParamIgnored {
                        line: line.to_string(),
                    });
                }
                self.processor.home();
                Ok(())
            }
            ('G', 90) => {
                self.state.absolute = true;
                Ok(())
            }
            ('G', 91) => {
                self.state.absolute = false;
                Ok(())
            }
            ('G', 92) => self.handle_set_position(&mut cursor, line),
            ('M', 17) => {
                self.processor.enable_motor();
                Ok(())
            }
            ('M', 18 | 84) => {
                self.processor.disable_motor();
                Ok(())
            }
            ('M', 24 | 25 | 226) => self.handle_pause(&mut cursor, line),
            ('M', 104) => self.handle_heater(&mut cursor, line, false),
            ('M', 109) => self.handle_heater(&mut cursor, line, true),
            ('M', 106) => self.handle_fan(&mut cursor, line),
            ('M', 107) => {
                self.processor.set_toolhead_fan_speed(0.0);
                Ok(())
            }
            ('T', tool) if (0..TOOL_COUNT as i64).contains(&tool) => {
                self.state.active_tool = tool as usize;
                Ok(())
            }
            ('X', 2) => self.handle_pwm(&mut cursor, line),
            _ => Err(Self::bad_command(line)),
        }
    }

    /// G0/G1
    fn handle_move(&mut self, cursor: &mut LineCursor<'_>, line: &str) -> Result<(), GcodeError> {
        let units = self.state.units();
        let tool = self.state.active_tool;
        let mut flags = MotionFlags::empty();
        let mut seen = SeenLetters::default();
        let mut position = self.state.position;
        let mut filament = self.state.filament[tool];
        let mut feedrate = self.state.feedrate;
        let mut s = 0.0;

        while let Some(letter) = cursor.next_letter() {
            let value = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
            let duplicate = seen.mark(letter);
            match letter {
                'F' | 'S' | 'X' | 'Y' | 'Z' | 'E' if duplicate => {
                    self.report(GcodeError::DuplicateParam { letter });
                }
                _ => {}
            }
            match letter {
                'F' => {
                    if value > 0.0 {
                        feedrate = value;
                        flags |= MotionFlags::HAS_FEEDRATE;
                    }
                }
                'S' => {
                    s = value;
                    flags |= MotionFlags::HAS_S;
                }
                'X' | 'Y' | 'Z' => {
                    let axis = (letter as u8 - b'X') as usize;
                    let value = units.to_mm(value);
                    if self.state.absolute {
                        position[axis] = value + self.state.position_offset[axis];
                    } else {
                        position[axis] = self.state.position[axis] + value;
                    }
                    if let Some(flag) = MotionFlags::for_axis(letter) {
                        flags |= flag;
                    }
                }
                'E' => {
                    let value = units.to_mm(value);
                    if self.state.absolute {
                        filament = value + self.state.filament_offset[tool];
                    } else {
                        filament = self.state.filament[tool] + value;
                    }
                }
                _ => self.report(Self::bad_param(line, false)),
            }
        }

        self.state.feedrate = feedrate;
        self.state.position = position;
        self.state.filament[tool] = filament;
        self.processor
            .moveto(flags, feedrate, position[0], position[1], position[2], s);
        Ok(())
    }

    /// G4 P<milliseconds> / G4 S<seconds>
    fn handle_dwell(&mut self, cursor: &mut LineCursor<'_>, line: &str) -> Result<(), GcodeError> {
        match cursor.next_letter() {
            Some(letter @ ('P' | 'S')) => {
                let value = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
                let seconds = if letter == 'P' { value / 1000.0 } else { value };
                self.processor.sleep(seconds);
                Ok(())
            }
            _ => Err(Self::missing_param(line)),
        }
    }

    /// G92
    fn handle_set_position(
        &mut self,
        cursor: &mut LineCursor<'_>,
        line: &str,
    ) -> Result<(), GcodeError> {
        let units = self.state.units();
        let mut any_param = false;
        let mut has_param_error = false;

        while let Some(letter) = cursor.next_letter() {
            let value = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
            any_param = true;
            match letter {
                'X' | 'Y' | 'Z' => {
                    let axis = (letter as u8 - b'X') as usize;
                    self.state.position_offset[axis] =
                        self.state.position[axis] - units.to_mm(value);
                }
                'E' => {
                    let tool = self.state.active_tool;
                    self.state.filament_offset[tool] =
                        self.state.filament[tool] - units.to_mm(value);
                }
                _ => has_param_error = true,
            }
        }

        if !any_param {
            self.state.position_offset = [0.0; 3];
            self.state.filament_offset = [0.0; TOOL_COUNT];
        }
        if has_param_error {
            self.report(Self::bad_param(line, false));
        }
        Ok(())
    }

    /// M24/M25/M226 [Z<0|1>]
    fn handle_pause(&mut self, cursor: &mut LineCursor<'_>, line: &str) -> Result<(), GcodeError> {
        let to_standby = match cursor.next_letter() {
            Some('Z') => cursor.float().ok_or_else(|| Self::bad_param(line, true))? != 0.0,
            _ => true,
        };
        self.processor.pause(to_standby);
        Ok(())
    }

    /// M104/M109 S<temperature>
    fn handle_heater(
        &mut self,
        cursor: &mut LineCursor<'_>,
        line: &str,
        wait: bool,
    ) -> Result<(), GcodeError> {
        match cursor.next_letter() {
            Some('S') => {
                let temperature = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
                self.processor
                    .set_toolhead_heater_temperature(temperature, wait);
                Ok(())
            }
            _ => Err(Self::missing_param(line)),
        }
    }

    /// M106 S<0..255>
    fn handle_fan(&mut self, cursor: &mut LineCursor<'_>, line: &str) -> Result<(), GcodeError> {
        match cursor.next_letter() {
            Some('S') => {
                let strength = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
                self.processor.set_toolhead_fan_speed(strength / 255.0);
                Ok(())
            }
            _ => Err(Self::missing_param(line)),
        }
    }

    /// X2 O<0..255> / X2 F
    fn handle_pwm(&mut self, cursor: &mut LineCursor<'_>, line: &str) -> Result<(), GcodeError> {
        match cursor.next_letter() {
            Some('O') => {
                let strength = cursor.float().ok_or_else(|| Self::bad_param(line, true))?;
                self.processor.set_toolhead_pwm(strength / 255.0);
                Ok(())
            }
            Some('F') => {
                self.processor.set_toolhead_pwm(0.0);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(Self::missing_param(line)),
        }
    }
}
