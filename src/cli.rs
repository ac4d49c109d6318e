//! `g2f` command line front end

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use fcodekit_settings::{Config, OutputFormat};
use fcodekit_toolpath::{
    convert_to_fcode, ConversionReport, GcodeParser, GcodeWriter, Metadata, ToolpathProcessor,
};

/// Output path that streams G-Code to stdout
pub const STDOUT_PATH: &str = "-";

#[derive(Parser, Debug)]
#[command(name = "g2f")]
#[command(about = "Convert G-Code into FCode containers")]
#[command(version)]
pub struct Cli {
    /// G-Code input file
    pub input: PathBuf,

    /// Output file (`-` streams G-Code to stdout)
    pub output: PathBuf,

    /// Output format: v1, v2 or gcode
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Settings file (.toml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Toolhead type recorded in V1 metadata
    #[arg(long)]
    pub head_type: Option<String>,

    /// Extra metadata entry, repeatable
    #[arg(short, long = "meta", value_name = "KEY=VALUE")]
    pub meta: Vec<String>,

    /// Preview image embedded in the container, repeatable
    #[arg(short, long = "preview", value_name = "FILE")]
    pub previews: Vec<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings file merged with the command line overrides
    pub fn settings(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)
                .with_context(|| format!("loading settings from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(head_type) = &self.head_type {
            config.output.head_type = head_type.clone();
        }
        for entry in &self.meta {
            config.push_metadata_entry(entry)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn writes_stdout(&self) -> bool {
        self.output.as_os_str() == STDOUT_PATH
    }
}

fn read_previews(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    paths
        .iter()
        .map(|path| {
            std::fs::read(path).with_context(|| format!("reading preview {}", path.display()))
        })
        .collect()
}

fn open_input(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Run one conversion as described by `cli`
pub fn run(cli: &Cli) -> anyhow::Result<ConversionReport> {
    let config = cli.settings()?;
    let input = open_input(&cli.input)?;

    if cli.writes_stdout() {
        if config.output.format != OutputFormat::Gcode {
            bail!(
                "{} output needs a seekable file, only gcode can be streamed to stdout",
                config.output.format
            );
        }
        let stdout = std::io::stdout();
        let mut writer = GcodeWriter::new(stdout.lock());
        let lines = GcodeParser::new(&mut writer).parse_reader(input)?;
        writer.terminated();
        return Ok(ConversionReport {
            lines,
            errors: writer.errors().to_vec(),
            ..ConversionReport::default()
        });
    }

    let previews = read_previews(&cli.previews)?;
    let output = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    tracing::info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        format = %config.output.format,
        "converting"
    );

    let report = convert_to_fcode(
        input,
        BufWriter::new(output),
        &config,
        Metadata::new(),
        previews,
    )?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_repeated_options() {
        let cli = Cli::try_parse_from([
            "g2f", "in.gcode", "out.fc", "-f", "v1", "-m", "AUTHOR=me", "--meta", "TITLE=x",
            "-p", "a.png", "-p", "b.png",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::V1));
        assert_eq!(cli.meta, vec!["AUTHOR=me", "TITLE=x"]);
        assert_eq!(cli.previews.len(), 2);
        assert!(!cli.writes_stdout());
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["g2f", "in.gcode", "out.fc", "--format", "v9"]).is_err());
    }

    #[test]
    fn test_settings_apply_overrides() {
        let cli = Cli::try_parse_from([
            "g2f", "in.gcode", "-", "--format", "gcode", "--head-type", "EXTRUDER", "-m",
            "AUTHOR=me",
        ])
        .unwrap();
        let config = cli.settings().unwrap();
        assert_eq!(config.output.format, OutputFormat::Gcode);
        assert_eq!(config.output.head_type, "EXTRUDER");
        assert_eq!(config.metadata, vec![("AUTHOR".to_string(), "me".to_string())]);
        assert!(cli.writes_stdout());
    }

    #[test]
    fn test_settings_reject_bad_metadata() {
        let cli = Cli::try_parse_from(["g2f", "in.gcode", "out.fc", "-m", "AUTHOR"]).unwrap();
        assert!(cli.settings().is_err());
    }
}
