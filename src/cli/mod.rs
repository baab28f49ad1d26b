//! CLI interface for Tonebank

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Oscillator bank tone generator
#[derive(Parser)]
#[command(name = "tonebank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play the oscillator bank from the terminal keyboard
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebank.yaml")]
        config: PathBuf,
    },

    /// Sound a chord on the output device until Ctrl-C
    Hold {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebank.yaml")]
        config: PathBuf,

        /// Notes to sound, e.g. C4 E4 G4
        #[arg(short, long, num_args = 1.., value_delimiter = ',', required = true)]
        notes: Vec<String>,
    },

    /// Render notes to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebank.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: f64,

        /// Notes to sound, e.g. A4 C#5
        #[arg(short, long, num_args = 1.., value_delimiter = ',', required = true)]
        notes: Vec<String>,
    },

    /// List available output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebank.yaml")]
        config: PathBuf,
    },

    /// Print the frequency of one or more note names
    Freq {
        /// Note names, e.g. A4 C#3
        #[arg(required = true)]
        notes: Vec<String>,
    },

    /// Generate an example configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from([
            "tonebank", "record", "-o", "out.wav", "-d", "2.5", "--notes", "A4", "C#5",
        ])
        .unwrap();

        match cli.command {
            Commands::Record { output, duration, notes, config } => {
                assert_eq!(output, PathBuf::from("out.wav"));
                assert_eq!(duration, 2.5);
                assert_eq!(notes, vec!["A4", "C#5"]);
                assert_eq!(config, PathBuf::from("tonebank.yaml"));
            }
            _ => panic!("expected record"),
        }
    }

    #[test]
    fn test_hold_requires_notes() {
        assert!(Cli::try_parse_from(["tonebank", "hold"]).is_err());
    }

    #[test]
    fn test_global_verbose() {
        let cli = Cli::try_parse_from(["tonebank", "freq", "A4", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
