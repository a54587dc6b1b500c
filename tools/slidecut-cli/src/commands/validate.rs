//! Validate a composition manifest.

use std::path::PathBuf;

use slidecut_project_model::LoadedManifest;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating composition at: {}", path.display());

    let issues = LoadedManifest::validate(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read manifest: {e}"))?;

    if !issues.is_empty() {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!("\n{} issue(s) found. Composition cannot be loaded.", issues.len());
        anyhow::bail!("composition is invalid");
    }

    let loaded = super::load_manifest(&path)?;
    println!("  Name: {}", loaded.manifest.name);
    println!("  Assets: {}", loaded.state.assets.len());
    println!("  Clips: {}", loaded.state.timeline.len());
    println!("  Duration: {:.2}s", loaded.state.total_duration());
    println!("  Sources: All present");
    if loaded.state.timeline.is_empty() {
        println!("\nComposition is valid but has no clips; export will refuse it.");
    } else {
        println!("\nComposition is valid.");
    }

    Ok(())
}
