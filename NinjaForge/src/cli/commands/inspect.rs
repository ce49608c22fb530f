//! CLI command for inspecting a container

use std::path::Path;

use crate::formats::inspect;

pub fn execute(path: &Path, json: bool) -> anyhow::Result<()> {
    let data = std::fs::read(path)?;
    let info = inspect(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Container: {}", path.display());
    println!("==========");
    println!("Kind:        {}", info.kind);
    println!("Family:      {}", info.family);
    println!("Endian:      {}", info.endian);
    println!("Base:        {:#x}", info.base);
    println!("File size:   {} bytes", info.file_size);
    println!("Relocations: {}", info.relocation_count);
    println!();

    println!("Sections ({}):", info.sections.len());
    println!("---------");
    for section in &info.sections {
        println!(
            "  {:<40} {:#010x} | {:>6} x | {:>8} bytes",
            section.name, section.offset, section.count, section.size
        );
    }

    Ok(())
}
