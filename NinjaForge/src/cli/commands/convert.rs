//! CLI command for converting between binary containers and JSON

use std::path::Path;

use anyhow::Context;

use crate::formats::Asset;

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn execute(source: &Path, destination: &Path) -> anyhow::Result<()> {
    if is_json(destination) {
        let asset = Asset::read(source).with_context(|| format!("decoding {}", source.display()))?;
        let json = serde_json::to_string_pretty(&asset)?;
        std::fs::write(destination, json)?;
        println!("Wrote {} {} as JSON: {}", asset.kind(), source.display(), destination.display());
    } else {
        let text = std::fs::read_to_string(source)?;
        let asset: Asset =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", source.display()))?;
        asset.write(destination)?;
        println!("Wrote {}: {}", asset.kind(), destination.display());
    }
    Ok(())
}
