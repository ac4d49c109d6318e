//! Shared helpers for toolpath integration tests

#![allow(dead_code)]

use std::io::{self, Seek, SeekFrom, Write};

use fcodekit_toolpath::{MotionFlags, ToolpathProcessor};

/// Event as seen by a processor
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Move {
        flags: MotionFlags,
        feedrate: f32,
        x: f32,
        y: f32,
        z: f32,
        s: f32,
    },
    Home,
    Sleep(f32),
    EnableMotor,
    DisableMotor,
    Pause(bool),
    Heater(f32, bool),
    Fan(f32),
    Pwm(f32),
    Comment(String),
    Error(bool, String),
    Terminated,
}

/// Processor that records every event in order
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn moves(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Move { .. }))
            .collect()
    }

    pub fn errors(&self) -> Vec<(bool, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Error(critical, message) => Some((*critical, message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl ToolpathProcessor for Recorder {
    fn moveto(&mut self, flags: MotionFlags, feedrate: f32, x: f32, y: f32, z: f32, s: f32) {
        self.events.push(Event::Move {
            flags,
            feedrate,
            x,
            y,
            z,
            s,
        });
    }
    fn home(&mut self) {
        self.events.push(Event::Home);
    }
    fn sleep(&mut self, seconds: f32) {
        self.events.push(Event::Sleep(seconds));
    }
    fn enable_motor(&mut self) {
        self.events.push(Event::EnableMotor);
    }
    fn disable_motor(&mut self) {
        self.events.push(Event::DisableMotor);
    }
    fn pause(&mut self, to_standby: bool) {
        self.events.push(Event::Pause(to_standby));
    }
    fn set_toolhead_heater_temperature(&mut self, temperature: f32, wait: bool) {
        self.events.push(Event::Heater(temperature, wait));
    }
    fn set_toolhead_fan_speed(&mut self, strength: f32) {
        self.events.push(Event::Fan(strength));
    }
    fn set_toolhead_pwm(&mut self, strength: f32) {
        self.events.push(Event::Pwm(strength));
    }
    fn append_comment(&mut self, text: &str) {
        self.events.push(Event::Comment(text.to_string()));
    }
    fn on_error(&mut self, critical: bool, message: &str) {
        self.events.push(Event::Error(critical, message.to_string()));
    }
    fn terminated(&mut self) {
        self.events.push(Event::Terminated);
    }
}

/// In-memory destination that starts failing after `limit` bytes
#[derive(Debug)]
pub struct FailingWriter {
    pub data: Vec<u8>,
    pub pos: usize,
    pub limit: usize,
    pub write_calls_after_failure: usize,
    failed: bool,
}

impl FailingWriter {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
            limit,
            write_calls_after_failure: 0,
            failed: false,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed {
            self.write_calls_after_failure += 1;
        }
        if self.pos + buf.len() > self.limit {
            self.failed = true;
            return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"));
        }
        let end = self.pos + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FailingWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek"));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

/// Destination whose position cannot be queried
pub struct PipeWriter(pub Vec<u8>);

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for PipeWriter {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "illegal seek"))
    }
}
