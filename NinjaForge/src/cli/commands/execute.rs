//! Command execution implementations

use super::Commands;
use super::{batch, convert, inspect, relocs, roundtrip};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { path, json } => inspect::execute(path, *json),
            Commands::Convert {
                source,
                destination,
            } => convert::execute(source, destination),
            Commands::Roundtrip { path, output } => roundtrip::execute(path, output.as_deref()),
            Commands::Relocs { path } => relocs::execute(path),
            Commands::Batch {
                dir,
                extensions,
                verify,
                quiet,
            } => batch::execute(dir, extensions, *verify, *quiet),
        }
    }
}
