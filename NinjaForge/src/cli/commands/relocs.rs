//! CLI command for listing relocation positions

use std::path::Path;

use crate::formats::relocations;

pub fn execute(path: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let positions = relocations(&data)?;

    println!("{} relocations", positions.len());
    for position in positions {
        println!("  {position:#010x}");
    }
    Ok(())
}
