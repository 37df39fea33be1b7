//! `vek status`: read-only manifest summary.

use vek_cache::BuildCache;

use crate::project::Project;
use crate::StatusArgs;

/// Runs the `vek status` command. Never writes the manifest.
pub fn run(args: &StatusArgs, project: &Project) -> Result<i32, Box<dyn std::error::Error>> {
    let cache = project.open_cache();

    if args.json {
        println!("{}", serde_json::to_string_pretty(cache.manifest())?);
    } else {
        for (key, value) in summary_lines(&cache) {
            println!("{key:>14}: {value}");
        }
    }
    Ok(0)
}

fn summary_lines(cache: &BuildCache) -> Vec<(&'static str, String)> {
    let manifest = cache.manifest();
    let stale = manifest
        .entries()
        .keys()
        .filter(|path| !path.exists())
        .count();

    vec![
        ("manifest", cache.manifest_path().display().to_string()),
        ("exists", cache.manifest_path().is_file().to_string()),
        ("format", manifest.format_version.clone()),
        ("entries", manifest.len().to_string()),
        ("stale", stale.to_string()),
        ("max entries", cache.config().max_entries.to_string()),
        ("algorithm", cache.config().hash_algorithm.to_string()),
        ("created", manifest.metadata.created_at.to_string()),
        ("last modified", manifest.metadata.last_modified_at.to_string()),
        ("written by", manifest.metadata.tool_version.clone()),
    ]
}
