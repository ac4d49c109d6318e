//! End-to-end runs of the `g2f` binary

use std::process::Command;

use fcodekit::{read, FcodeFile};

const PROGRAM: &str = "G28\nG1 F3000 X10 Y10\nG4 P100\nM104 S200\n";

fn g2f() -> Command {
    Command::new(env!("CARGO_BIN_EXE_g2f"))
}

#[test]
fn test_converts_to_v2_with_metadata_and_preview() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("part.gcode");
    let preview = dir.path().join("thumb.png");
    let output = dir.path().join("part.fc");
    std::fs::write(&input, PROGRAM).unwrap();
    std::fs::write(&preview, b"\x89PNG").unwrap();

    let status = g2f()
        .arg(&input)
        .arg(&output)
        .args(["--meta", "AUTHOR=tester", "--preview"])
        .arg(&preview)
        .status()
        .unwrap();
    assert!(status.success());

    let file = match read(&std::fs::read(&output).unwrap()).unwrap() {
        FcodeFile::V2(file) => file,
        FcodeFile::V1(_) => panic!("default output should be V2"),
    };
    assert_eq!(file.metadata.get("AUTHOR"), Some("tester"));
    assert_eq!(file.previews, vec![b"\x89PNG".to_vec()]);
}

#[test]
fn test_config_file_selects_v1() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("part.gcode");
    let config = dir.path().join("g2f.toml");
    let output = dir.path().join("part.fc");
    std::fs::write(&input, PROGRAM).unwrap();
    std::fs::write(
        &config,
        "[output]\nformat = \"v1\"\nhead_type = \"EXTRUDER\"\n",
    )
    .unwrap();

    let status = g2f()
        .arg(&input)
        .arg(&output)
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();
    assert!(status.success());

    match read(&std::fs::read(&output).unwrap()).unwrap() {
        FcodeFile::V1(file) => assert_eq!(file.metadata.get("HEAD_TYPE"), Some("EXTRUDER")),
        FcodeFile::V2(_) => panic!("config asked for V1"),
    }
}

#[test]
fn test_streams_gcode_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("part.gcode");
    std::fs::write(&input, "G1 F600 X1\nM107\n").unwrap();

    let out = g2f()
        .arg(&input)
        .args(["-", "--format", "gcode"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("X1"));
    assert!(text.contains("M107"));
}

#[test]
fn test_fcode_to_stdout_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("part.gcode");
    std::fs::write(&input, PROGRAM).unwrap();

    let out = g2f().arg(&input).arg("-").output().unwrap();
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let status = g2f()
        .arg(dir.path().join("absent.gcode"))
        .arg(dir.path().join("out.fc"))
        .status()
        .unwrap();
    assert!(!status.success());
}
