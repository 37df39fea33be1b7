//! `vek prune` and `vek clean`.

use crate::project::Project;
use crate::GlobalArgs;

/// Runs eviction outside of a build and saves the result.
pub fn prune(project: &Project, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cache = project.open_cache();
    let report = cache.prune();

    if !global.quiet {
        eprintln!(
            "    Pruned {} stale and {} over-capacity entries; {} remain",
            report.stale_removed,
            report.over_capacity_removed,
            cache.manifest().len()
        );
    }
    Ok(0)
}

/// Drops every cache entry and deletes the manifest file.
pub fn clean(project: &Project, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cache = project.open_cache();
    let dropped = cache.manifest().len();
    cache.clear()?;

    if !global.quiet {
        eprintln!(
            "   Removed {} ({dropped} entries)",
            cache.manifest_path().display()
        );
    }
    Ok(0)
}
