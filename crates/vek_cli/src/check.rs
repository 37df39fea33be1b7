//! `vek check`: one build cycle over an explicit file list.
//!
//! Drives the same lifecycle a bundler integration does (`begin_build`, one
//! `check` per file, `finish_build`) so the manifest is updated exactly as a
//! real build would update it.

use vek_cache::{CheckResult, Freshness};

use crate::project::Project;
use crate::{CheckArgs, GlobalArgs};

/// Runs the `vek check` command.
///
/// Prints one line per file to stdout. Returns exit code 1 when
/// `--fail-on-miss` is set and any file missed, 0 otherwise.
pub fn run(
    args: &CheckArgs,
    project: &Project,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cache = project.open_cache();

    cache.begin_build();
    for file in &args.files {
        let result = cache.check(file);
        if !global.quiet {
            println!("{:>9} {}", label(result.as_ref()), file.display());
        }
    }
    let summary = cache.finish_build();

    if !global.quiet {
        eprintln!(
            "    Cached {} hit(s), {} miss(es), {} skipped; {} entries",
            summary.hits, summary.misses, summary.skipped, summary.entries
        );
    }

    if args.fail_on_miss && summary.misses > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Short status word for one checked file.
fn label(result: Option<&CheckResult>) -> &'static str {
    match result.map(|r| r.freshness) {
        None => "skipped",
        Some(Freshness::Unchanged) => "fresh",
        Some(Freshness::Touched) => "touched",
        Some(Freshness::New) => "new",
        Some(Freshness::Modified) => "modified",
        Some(Freshness::Missing) => "missing",
    }
}
