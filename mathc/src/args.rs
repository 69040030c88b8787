//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Moves OpenType MATH data between a font source and compiled fonts.
#[derive(Serialize, Deserialize, Parser, Debug, Clone, PartialEq)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Serialize, Deserialize, Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Reads the MATH table of a compiled font into the source
    Import {
        /// The source, as YAML
        #[arg(short, long)]
        source: PathBuf,

        /// A compiled font with a MATH table
        #[arg(short, long)]
        font: PathBuf,

        /// Index of the master to import into
        #[arg(short, long)]
        #[clap(default_value = "0")]
        master: usize,

        /// Where to write the updated source. Defaults to overwriting the source.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Writes the MATH data of the source into a compiled font
    Export {
        /// The source, as YAML
        #[arg(short, long)]
        source: PathBuf,

        /// The compiled font to add a MATH table to
        #[arg(short, long)]
        font: PathBuf,

        /// Instance to export; the first master if omitted
        #[arg(short, long)]
        instance: Option<String>,

        /// A compiled font whose MATH table is imported before exporting
        #[arg(long)]
        import_from: Option<PathBuf>,

        /// Where to write the font. Defaults to overwriting the font.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fills in MATH constants, variants and assemblies that can be guessed
    Guess {
        /// The source, as YAML
        #[arg(short, long)]
        source: PathBuf,

        /// Index of the master whose constants are guessed
        #[arg(short, long)]
        #[clap(default_value = "0")]
        master: usize,

        /// Where to write the updated source. Defaults to overwriting the source.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
