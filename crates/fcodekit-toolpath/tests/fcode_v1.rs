//! V1 container construction, checksums and failure handling

mod common;

use std::io::Cursor;

use common::{FailingWriter, PipeWriter};
use fcodekit_core::FcodeError;
use fcodekit_toolpath::fcode::checksum::checksum;
use fcodekit_toolpath::{
    convert, decode_script, read_v1, FcodeV1Writer, Metadata, MotionFlags, ScriptCommand,
    ToolpathProcessor,
};

fn write_program(program: &str) -> (Vec<u8>, Vec<String>) {
    let mut caller = Metadata::new();
    caller.push("AUTHOR", "fcodekit");
    let mut writer = FcodeV1Writer::new(Cursor::new(Vec::new()), "EXTRUDER")
        .unwrap()
        .with_metadata(caller)
        .with_previews(vec![b"first".to_vec(), b"second".to_vec()]);
    convert(program.as_bytes(), &mut writer).unwrap();
    let errors = writer.errors().to_vec();
    (writer.into_inner().into_inner(), errors)
}

#[test]
fn test_container_blocks_verify() {
    let (bytes, errors) = write_program("G1 F3000 X10 Y10\nG4 P100\nM17\n");
    assert_eq!(errors, ["WARNING NOT_SUPPORT ENABLE_MOTOR"]);

    let file = read_v1(&bytes).unwrap();
    assert_eq!(file.previews, vec![b"first".to_vec(), b"second".to_vec()]);

    // Trailers recomputed by hand match the reader's view
    let script_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
    let script = &bytes[12..12 + script_len];
    let stored = u32::from_le_bytes(bytes[12 + script_len..16 + script_len].try_into().unwrap());
    assert_eq!(checksum(script), stored);
    assert_eq!(script, file.script.as_slice());
}

#[test]
fn test_metadata_keys_in_order() {
    let (bytes, _) = write_program("G1 F6000 X30 Y40\nG1 Z5\n");
    let file = read_v1(&bytes).unwrap();
    let keys: Vec<&str> = file.metadata.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![
            "VERSION",
            "HEAD_TYPE",
            "TIME_COST",
            "TRAVEL_DIST",
            "MAX_X",
            "MAX_Y",
            "MAX_Z",
            "MAX_R",
            "FILAMENT_USED",
            "AUTHOR"
        ]
    );
    assert_eq!(file.metadata.get("HEAD_TYPE"), Some("EXTRUDER"));
    assert_eq!(file.metadata.get("TRAVEL_DIST"), Some("55.00"));
    assert_eq!(file.metadata.get("MAX_X"), Some("30.20"));
    assert_eq!(file.metadata.get("MAX_R"), Some("50.20"));
    assert_eq!(file.metadata.get("MAX_Z"), Some("5.20"));
}

#[test]
fn test_script_decodes_to_program() {
    let (bytes, _) = write_program("G28\nG1 F600 X1.5\nG4 S1\nM25 Z0\nM106 S255\n");
    let commands = decode_script(&read_v1(&bytes).unwrap().script).unwrap();
    assert_eq!(
        commands,
        vec![
            ScriptCommand::Home,
            ScriptCommand::Move {
                flags: MotionFlags::HAS_FEEDRATE | MotionFlags::HAS_X,
                feedrate: Some(600.0),
                x: Some(1.5),
                y: None,
                z: None,
                s: None,
            },
            ScriptCommand::Sleep {
                milliseconds: 1000.0
            },
            ScriptCommand::Pause { to_standby: false },
            ScriptCommand::Fan(1.0),
        ]
    );
}

#[test]
fn test_double_terminate_appends_nothing() {
    let mut writer = FcodeV1Writer::new(Cursor::new(Vec::new()), "LASER").unwrap();
    writer.home();
    writer.terminated();
    let first = writer.get_ref().get_ref().clone();
    writer.terminated();
    writer.moveto(MotionFlags::HAS_X, 0.0, 1.0, 0.0, 0.0, 0.0);
    assert_eq!(writer.get_ref().get_ref(), &first);
    assert!(read_v1(&first).is_ok());
}

#[test]
fn test_unseekable_destination_is_rejected() {
    let result = FcodeV1Writer::new(PipeWriter(Vec::new()), "LASER");
    assert!(matches!(result, Err(FcodeError::NotSeekable(_))));
}

#[test]
fn test_create_reports_open_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.fc");
    let result = FcodeV1Writer::create(&path, "LASER");
    assert!(matches!(result, Err(FcodeError::Open { .. })));
}

#[test]
fn test_file_destination_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.fc");
    let mut writer = FcodeV1Writer::create(&path, "LASER").unwrap();
    convert("G1 F1200 X5 Y5\nX2 O255\n".as_bytes(), &mut writer).unwrap();
    drop(writer);

    let bytes = std::fs::read(&path).unwrap();
    let file = read_v1(&bytes).unwrap();
    let commands = decode_script(&file.script).unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[1], ScriptCommand::Pwm(1.0));
}

#[test]
fn test_failure_mid_write_goes_inert() {
    // Magic and placeholder fit; the first move does not
    let mut writer = FcodeV1Writer::new(FailingWriter::new(16), "LASER").unwrap();
    writer.home();
    writer.moveto(MotionFlags::HAS_X | MotionFlags::HAS_Y, 0.0, 1.0, 2.0, 0.0, 0.0);
    writer.home();
    writer.terminated();

    assert!(writer.is_closed());
    assert_eq!(writer.errors().len(), 1);
    assert!(writer.errors()[0].starts_with("ERROR IO_ERROR"));

    let dest = writer.into_inner();
    assert_eq!(dest.write_calls_after_failure, 0);
    assert_eq!(&dest.data[..8], b"FCx0001\n");
    assert_eq!(&dest.data[8..12], &[0, 0, 0, 0]);
    assert_eq!(dest.data[12], 1);
}
