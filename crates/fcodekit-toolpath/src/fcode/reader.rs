//! FCode container and script decoding
//!
//! Every framed block is checked against its stored length and checksum.
//! Script decoding covers the opcodes produced by the writers, with two
//! ambiguities resolved toward the common form: opcode `4` always decodes as
//! an f32 sleep and opcode `16` as a heater command.

use fcodekit_core::FcodeError;

use super::checksum;
use super::metadata::Metadata;
use super::opcode::{self, motion_sync, printer_packet, tag, MAGIC_V1, MAGIC_V2};
use crate::gcode::{MotionFlags, OneSegmentType};

/// Decoded V1 container
#[derive(Debug, Clone, PartialEq)]
pub struct FcodeV1File {
    pub script: Vec<u8>,
    pub metadata: Metadata,
    pub previews: Vec<Vec<u8>>,
}

/// Decoded V2 container
#[derive(Debug, Clone, PartialEq)]
pub struct FcodeV2File {
    pub metadata: Metadata,
    pub previews: Vec<Vec<u8>>,
    pub content: Vec<u8>,
    pub post_configs: Vec<Vec<u8>>,
}

/// Either container version
#[derive(Debug, Clone, PartialEq)]
pub enum FcodeFile {
    V1(FcodeV1File),
    V2(FcodeV2File),
}

/// One decoded script command
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Move {
        flags: MotionFlags,
        feedrate: Option<f32>,
        x: Option<f32>,
        y: Option<f32>,
        z: Option<f32>,
        s: Option<f32>,
    },
    Home,
    Sleep {
        milliseconds: f32,
    },
    Pause {
        to_standby: bool,
    },
    LaserModule(u32),
    Calibrate,
    Heater {
        temperature: f32,
        wait: bool,
    },
    PrinterPacketStart(u8),
    PrinterPacketEnd,
    PrinterPacketPxCount(u32),
    PrinterPacketLength(u32),
    /// Payload bytes, sized by the last packet length
    PrinterPacketPayload(Vec<u8>),
    PrinterPacketCrc(u16),
    EnterPrinterMode,
    WaitPrinterModeSync,
    ExitPrinterMode,
    MotionSync(u32),
    Custom(u32),
    OneSegment {
        kind: OneSegmentType,
        cmd: u8,
    },
    Pwm(f32),
    Fan(f32),
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.bytes.get(self.pos..self.pos + n)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FcodeError> {
        let slice = self.peek(n).ok_or(FcodeError::Truncated { what })?;
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], FcodeError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FcodeError> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, FcodeError> {
        Ok(u16::from_le_bytes(self.array(what)?))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FcodeError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FcodeError> {
        Ok(f32::from_le_bytes(self.array(what)?))
    }

    /// `[u32 length][payload][u32 checksum]`
    fn checked_block(&mut self, block: &'static str) -> Result<&'a [u8], FcodeError> {
        let length = self.u32(block)? as usize;
        let payload = self.take(length, block)?;
        let stored = self.u32(block)?;
        let computed = checksum::checksum(payload);
        if stored != computed {
            return Err(FcodeError::ChecksumMismatch {
                block,
                stored,
                computed,
            });
        }
        Ok(payload)
    }

    fn length_prefixed(&mut self, what: &'static str) -> Result<&'a [u8], FcodeError> {
        let length = self.u32(what)? as usize;
        self.take(length, what)
    }
}

fn expect_magic(reader: &mut ByteReader<'_>, magic: &[u8; 8]) -> Result<(), FcodeError> {
    let found = reader.peek(8).unwrap_or(reader.bytes);
    if found != magic {
        return Err(FcodeError::BadMagic(found.to_vec()));
    }
    reader.pos += 8;
    Ok(())
}

/// Decode a container of either version
pub fn read(bytes: &[u8]) -> Result<FcodeFile, FcodeError> {
    match bytes.get(..8) {
        Some(magic) if magic == MAGIC_V1 => read_v1(bytes).map(FcodeFile::V1),
        Some(magic) if magic == MAGIC_V2 => read_v2(bytes).map(FcodeFile::V2),
        other => Err(FcodeError::BadMagic(other.unwrap_or(bytes).to_vec())),
    }
}

pub fn read_v1(bytes: &[u8]) -> Result<FcodeV1File, FcodeError> {
    let mut reader = ByteReader::new(bytes);
    expect_magic(&mut reader, MAGIC_V1)?;
    let script = reader.checked_block("script")?.to_vec();
    let metadata = Metadata::from_v1_records(reader.checked_block("metadata")?)?;

    let mut previews = Vec::new();
    loop {
        let length = reader.u32("preview")? as usize;
        if length == 0 {
            break;
        }
        previews.push(reader.take(length, "preview")?.to_vec());
    }

    Ok(FcodeV1File {
        script,
        metadata,
        previews,
    })
}

pub fn read_v2(bytes: &[u8]) -> Result<FcodeV2File, FcodeError> {
    let mut reader = ByteReader::new(bytes);
    expect_magic(&mut reader, MAGIC_V2)?;

    expect_tag(&mut reader, tag::FILE)?;
    let metadata = Metadata::from_v2_json(reader.checked_block("metadata")?)?;

    expect_tag(&mut reader, tag::PREVIEW)?;
    let mut previews = Vec::new();
    while reader.peek(4).ok_or(FcodeError::Truncated { what: "preview" })? != tag::CONTENT {
        previews.push(reader.length_prefixed("preview")?.to_vec());
    }

    expect_tag(&mut reader, tag::CONTENT)?;
    let content = reader.checked_block("content")?.to_vec();

    let mut post_configs = Vec::new();
    while !reader.is_empty() {
        expect_tag(&mut reader, tag::POST_CONFIG)?;
        post_configs.push(reader.checked_block("post config")?.to_vec());
    }

    Ok(FcodeV2File {
        metadata,
        previews,
        content,
        post_configs,
    })
}

fn expect_tag(reader: &mut ByteReader<'_>, expected: &[u8; 4]) -> Result<(), FcodeError> {
    let found = reader.array::<4>("block tag")?;
    if &found != expected {
        return Err(FcodeError::UnknownTag(
            String::from_utf8_lossy(&found).into_owned(),
        ));
    }
    Ok(())
}

/// Decode a script or content stream into commands
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptCommand>, FcodeError> {
    let mut reader = ByteReader::new(bytes);
    let mut commands = Vec::new();
    let mut packet_length = 0usize;

    while !reader.is_empty() {
        let offset = reader.pos;
        let op = reader.u8("opcode")?;
        let unknown = || FcodeError::UnknownOpcode { opcode: op, offset };

        let command = if op & opcode::MOVE != 0 {
            let flags = MotionFlags::from_bits(op & !opcode::MOVE).ok_or_else(unknown)?;
            let mut field = |flag: MotionFlags| -> Result<Option<f32>, FcodeError> {
                if flags.contains(flag) {
                    reader.f32("move").map(Some)
                } else {
                    Ok(None)
                }
            };
            ScriptCommand::Move {
                feedrate: field(MotionFlags::HAS_FEEDRATE)?,
                x: field(MotionFlags::HAS_X)?,
                y: field(MotionFlags::HAS_Y)?,
                z: field(MotionFlags::HAS_Z)?,
                s: field(MotionFlags::HAS_S)?,
                flags,
            }
        } else {
            match op {
                opcode::HOME => ScriptCommand::Home,
                opcode::SLEEP => ScriptCommand::Sleep {
                    milliseconds: reader.f32("sleep")?,
                },
                opcode::PAUSE_TO_STANDBY => ScriptCommand::Pause { to_standby: true },
                opcode::PAUSE_IN_PLACE => ScriptCommand::Pause { to_standby: false },
                opcode::LASER_MODULE => ScriptCommand::LaserModule(reader.u32("laser module")?),
                opcode::CALIBRATE => {
                    reader.u32("calibrate")?;
                    ScriptCommand::Calibrate
                }
                opcode::HEATER | opcode::HEATER_WAIT => ScriptCommand::Heater {
                    temperature: reader.f32("heater")?,
                    wait: op == opcode::HEATER_WAIT,
                },
                opcode::PRINTER_PACKET => match reader.u8("printer packet")? {
                    printer_packet::LENGTH => {
                        let length = reader.u32("printer packet")?;
                        packet_length = length as usize;
                        ScriptCommand::PrinterPacketLength(length)
                    }
                    printer_packet::PAYLOAD => ScriptCommand::PrinterPacketPayload(
                        reader.take(packet_length, "printer packet payload")?.to_vec(),
                    ),
                    printer_packet::CRC => {
                        ScriptCommand::PrinterPacketCrc(reader.u16("printer packet")?)
                    }
                    printer_packet::START => {
                        ScriptCommand::PrinterPacketStart(reader.u8("printer packet")?)
                    }
                    printer_packet::END => ScriptCommand::PrinterPacketEnd,
                    printer_packet::PX_COUNT => {
                        ScriptCommand::PrinterPacketPxCount(reader.u32("printer packet")?)
                    }
                    _ => return Err(unknown()),
                },
                opcode::MOTION_SYNC => {
                    reader.u8("motion sync")?;
                    match reader.u32("motion sync")? {
                        motion_sync::ENTER_PRINTER_MODE => ScriptCommand::EnterPrinterMode,
                        motion_sync::WAIT_PRINTER_SYNC => ScriptCommand::WaitPrinterModeSync,
                        motion_sync::EXIT_PRINTER_MODE => ScriptCommand::ExitPrinterMode,
                        value => ScriptCommand::MotionSync(value),
                    }
                }
                opcode::CUSTOM => {
                    reader.u8("custom")?;
                    ScriptCommand::Custom(reader.u32("custom")?)
                }
                opcode::PWM => ScriptCommand::Pwm(reader.f32("pwm")?),
                opcode::FAN => ScriptCommand::Fan(reader.f32("fan")?),
                other => match OneSegmentType::from_u8(other) {
                    Some(kind) => ScriptCommand::OneSegment {
                        kind,
                        cmd: reader.u8("one segment")?,
                    },
                    None => return Err(unknown()),
                },
            }
        };
        commands.push(command);
    }

    Ok(commands)
}
