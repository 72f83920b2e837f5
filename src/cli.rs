//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::export::ExportFormat;
use crate::templates::DEFAULT_TEMPLATE_URL;

#[derive(Debug, Parser)]
#[command(name = "sandbox")]
#[command(author, version, about = "Docker sandbox for running scraping scripts", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Sandbox root holding persistent_data/, user_scripts/ and the Dockerfile
    #[arg(long, global = true, env = "SANDBOX_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to <root>/sandbox.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print status as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Start an interactive interpreter inside the sandbox
    Interactive,

    /// Run a script from the scripts directory
    Script {
        /// File name of the script under user_scripts/
        script_name: String,
    },

    /// Create the example scraper script
    Example,

    /// Show image, instance and script status
    Status,

    /// Build the sandbox image
    Build,

    /// Stop the interactive instance
    Stop,

    /// Write a scraper template into the scripts directory
    Template {
        /// Script file name (".py" is appended when missing)
        name: String,

        /// URL the template scrapes
        #[arg(long, default_value = DEFAULT_TEMPLATE_URL)]
        url: String,

        /// Use the asyncio multi-URL template
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Generate a scraper with the code-generation assistant
    Generate {
        /// What the scraper should do
        prompt: String,

        /// Save into the scripts directory under this name instead of printing
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Convert a JSON results file to JSON or CSV
    Export {
        /// Results file, looked up in persistent_data/ when not found as given
        input: PathBuf,

        /// Output format (json or csv)
        #[arg(long, short, default_value = "csv")]
        format: ExportFormat,

        /// Output path (defaults to the input path with the format's extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_command() {
        let args = Args::try_parse_from(["sandbox", "script", "scraper.py"]).unwrap();
        match args.command {
            SubCommand::Script { script_name } => assert_eq!(script_name, "scraper.py"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn script_requires_a_name() {
        assert!(Args::try_parse_from(["sandbox", "script"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from(["sandbox", "status", "--json", "--root", "/srv/sb"]).unwrap();
        assert!(args.json);
        assert_eq!(args.root, PathBuf::from("/srv/sb"));
        assert!(matches!(args.command, SubCommand::Status));
    }

    #[test]
    fn template_defaults() {
        let args = Args::try_parse_from(["sandbox", "template", "quotes"]).unwrap();
        match args.command {
            SubCommand::Template {
                name,
                url,
                use_async,
            } => {
                assert_eq!(name, "quotes");
                assert_eq!(url, DEFAULT_TEMPLATE_URL);
                assert!(!use_async);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn export_parses_format() {
        let args =
            Args::try_parse_from(["sandbox", "export", "results.json", "--format", "json"]).unwrap();
        match args.command {
            SubCommand::Export { format, output, .. } => {
                assert_eq!(format, ExportFormat::Json);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(Args::try_parse_from(["sandbox", "destroy"]).is_err());
    }
}
