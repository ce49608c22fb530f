//! CLI command for checking a container survives decode and re-encode

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{print_done, print_step, DISK, GEAR, LOOKING_GLASS};
use crate::formats::round_trip;

pub fn execute(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let started = Instant::now();
    let steps = if output.is_some() { 3 } else { 2 };

    print_step(1, steps, LOOKING_GLASS, &format!("Reading {}...", path.display()));
    let data = std::fs::read(path)?;

    print_step(2, steps, GEAR, "Decoding and re-encoding...");
    let (asset, encoded) = round_trip(&data)?;
    if encoded == data {
        println!("  {} re-encodes byte-identically ({} bytes)", asset.kind(), data.len());
    } else {
        println!(
            "  {} decodes identically; bytes differ ({} -> {} bytes)",
            asset.kind(),
            data.len(),
            encoded.len()
        );
    }

    if let Some(output) = output {
        print_step(3, steps, DISK, &format!("Writing {}...", output.display()));
        std::fs::write(output, &encoded)?;
    }

    print_done(started.elapsed());
    Ok(())
}
