//! CLI command for batch decoding a directory

use std::path::Path;

use crate::batch::{batch_process, find_asset_files, BatchOptions};
use crate::cli::progress::{simple_bar, TRUCK};

pub fn execute(dir: &Path, extensions: &[String], verify: bool, quiet: bool) -> anyhow::Result<()> {
    let mut options = BatchOptions::new().with_verify(verify);
    if !extensions.is_empty() {
        options = options.with_extensions(extensions.iter().map(|e| e.trim_start_matches('.')));
    }

    let files = find_asset_files(dir, &options);
    if files.is_empty() {
        println!("No asset files found in: {}", dir.display());
        return Ok(());
    }

    println!("{TRUCK}Found {} files to decode", files.len());

    let pb = (!quiet).then(|| simple_bar(files.len() as u64, "Decoding"));
    let result = batch_process(&files, &options, |progress| {
        if let Some(pb) = &pb {
            pb.set_position(progress.current as u64);
            if let Some(ref name) = progress.current_file {
                pb.set_message(name.clone());
            }
        }
    });
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!();
    println!("Batch complete:");
    println!("  Success: {}", result.success_count);
    println!("  Failed: {}", result.fail_count);

    if result.fail_count > 0 {
        println!();
        println!("Failures:");
        for outcome in result.outcomes.iter().filter(|o| !o.is_success()) {
            println!(
                "  {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or_default()
            );
        }
    }

    Ok(())
}
