use clap::Subcommand;
use std::path::PathBuf;

pub mod batch;
pub mod convert;
mod execute;
pub mod inspect;
pub mod relocs;
pub mod roundtrip;

#[derive(Subcommand)]
pub enum Commands {
    /// Show container family, sections and relocation count
    Inspect {
        /// Container file
        path: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert between binary containers and JSON
    ///
    /// Binary to JSON when the destination ends in `.json`, JSON to binary otherwise.
    Convert {
        /// Source file
        #[arg(short, long)]
        source: PathBuf,

        /// Destination file
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Decode, re-encode and decode again, checking nothing changed
    Roundtrip {
        /// Container file
        path: PathBuf,

        /// Write the re-encoded bytes here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List relocation positions, relative to the container base
    Relocs {
        /// Container file
        path: PathBuf,
    },

    /// Decode every asset file under a directory
    Batch {
        /// Directory to search
        dir: PathBuf,

        /// File extensions to include (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Also re-encode and compare each file
        #[arg(long)]
        verify: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}
