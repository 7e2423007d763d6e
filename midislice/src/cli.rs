mod beats;

use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, ArgGroup, Command};

pub use beats::parse_beats;

/// Parse a tempo in beats per minute.
pub fn parse_bpm(value: &str) -> Result<f64, String> {
    let bpm: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid tempo '{value}'"))?;
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err("tempo must be greater than zero".into());
    }
    Ok(bpm)
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Glitch WAV recordings to the rhythm of a MIDI track")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("midi")
                .short('m')
                .long("midi")
                .value_name("MIDI_FILE")
                .help("MIDI file whose first track's notes set the segment lengths")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("beats")
                .short('d')
                .long("beats")
                .value_name("LIST")
                .help("Comma-separated segment lengths (e.g. 0.5,250ms,1s); bare numbers are seconds")
                .value_parser(ValueParser::new(parse_beats)),
        )
        .group(ArgGroup::new("timing").args(["midi", "beats"]).multiple(false))
        .arg(
            Arg::new("wav")
                .short('w')
                .long("wav")
                .value_name("WAV_FILE")
                .help("Source recording; repeat to cut from several files in turn")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bpm")
                .short('b')
                .long("bpm")
                .value_name("BPM")
                .help("Tempo used to convert MIDI ticks into seconds")
                .default_value("120")
                .value_parser(ValueParser::new(parse_bpm)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_FILE")
                .help("Where to write the result (default: <MIDI_FILE>_glitch.wav or glitch.wav)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Allow replacing an existing output file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the planned segments without writing a file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("block-align")
                .long("block-align")
                .help("Snap cut points to whole sample frames instead of the bits-per-sample grid")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("allow-length-mismatch")
                .long("allow-length-mismatch")
                .help("Accept source files whose data chunks differ in length")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every segment as it is cut")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn parses_repeated_wavs_and_beats() {
        let matches = build_cli()
            .try_get_matches_from([
                "midislice", "-d", "0.5,250ms", "-w", "a.wav", "--wav", "b.wav",
            ])
            .unwrap();

        let beats = matches.get_one::<Vec<f64>>("beats").unwrap();
        assert_eq!(beats, &vec![0.5, 0.25]);
        let wavs: Vec<_> = matches.get_many::<PathBuf>("wav").unwrap().collect();
        assert_eq!(wavs, [&PathBuf::from("a.wav"), &PathBuf::from("b.wav")]);
        assert_eq!(matches.get_one::<f64>("bpm"), Some(&120.0));
    }

    #[test]
    fn midi_and_beats_are_exclusive() {
        let result = build_cli().try_get_matches_from([
            "midislice", "-m", "beat.mid", "-d", "1", "-w", "a.wav",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_bpm_rejects_non_positive_tempos() {
        assert_eq!(parse_bpm("80").unwrap(), 80.0);
        assert!(parse_bpm("0").is_err());
        assert!(parse_bpm("-60").is_err());
        assert!(parse_bpm("fast").is_err());
    }
}
